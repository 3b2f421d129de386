//! Row validation: one parsed row plus a reference table in, a write-ready
//! record or the first failing field out.
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. required fields present
//! 2. enumerated fields in their allowed set
//! 3. format and numeric fields
//! 4. cross-references resolved

use once_cell::sync::Lazy;
use regex::Regex;

use crate::import::{ReferenceTable, Row};
use crate::storage::{ImportRowError, NewContact, NewVenue};
use crate::validation::fields::{PipelineStage, VenueStatus, VenueType};

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Returns true if `email` has a basic `local@domain.tld` shape.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

// ─────────────────────────────────────────────────────────────────────────────
// Venues
// ─────────────────────────────────────────────────────────────────────────────

/// Validates a venue row. `refs` maps operator names to ids.
pub fn validate_venue(row: &Row, refs: &ReferenceTable) -> Result<NewVenue, ImportRowError> {
    let line = row.line_number();

    let name = required(row, "name", "Name")?;
    let address = required(row, "address", "Address")?;
    let city = required(row, "city", "City")?;
    let state = required(row, "state", "State")?;

    let venue_type = enumerated(row, "type", "venue type", VenueType::parse)?;
    let stage = enumerated(row, "stage", "stage", PipelineStage::parse)?;
    let status = enumerated(row, "status", "status", VenueStatus::parse)?;

    let capacity = match row.get("capacity") {
        "" => None,
        raw => match raw.parse::<i64>() {
            Ok(n) if n >= 0 => Some(n),
            _ => {
                return Err(ImportRowError::validation(
                    line,
                    "capacity",
                    format!("Capacity must be a whole number (got \"{raw}\")"),
                ))
            }
        },
    };

    let deal_value = match row.get("dealValue") {
        "" => None,
        raw => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
            _ => {
                return Err(ImportRowError::validation(
                    line,
                    "dealValue",
                    format!("Deal value must be a number (got \"{raw}\")"),
                ))
            }
        },
    };

    let operator_id = match row.get("operatorName") {
        "" => None,
        raw => match refs.resolve(raw) {
            Some(id) => Some(id.to_string()),
            None => {
                return Err(ImportRowError::validation(
                    line,
                    "operatorName",
                    format!("Operator \"{raw}\" not found"),
                ))
            }
        },
    };

    Ok(NewVenue {
        name,
        address,
        city,
        state,
        venue_type,
        capacity,
        stage,
        status,
        deal_value,
        operator_id,
        notes: optional(row, "notes"),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Contacts
// ─────────────────────────────────────────────────────────────────────────────

/// Validates a contact row. `refs` maps venue names to ids.
pub fn validate_contact(row: &Row, refs: &ReferenceTable) -> Result<NewContact, ImportRowError> {
    let line = row.line_number();

    let name = required(row, "name", "Name")?;
    let email = required(row, "email", "Email")?;

    if !is_valid_email(&email) {
        return Err(ImportRowError::validation(
            line,
            "email",
            format!("Invalid email \"{email}\""),
        ));
    }

    let is_primary = match parse_flag(row.get("isPrimary")) {
        Some(flag) => flag,
        None => {
            return Err(ImportRowError::validation(
                line,
                "isPrimary",
                format!("Invalid primary flag \"{}\"", row.get("isPrimary")),
            ))
        }
    };

    let venue_id = match row.get("venueName") {
        "" => None,
        raw => match refs.resolve(raw) {
            Some(id) => Some(id.to_string()),
            None => {
                return Err(ImportRowError::validation(
                    line,
                    "venueName",
                    format!("Venue \"{raw}\" not found"),
                ))
            }
        },
    };

    Ok(NewContact {
        name,
        email,
        phone: optional(row, "phone"),
        role: optional(row, "role"),
        is_primary,
        linked_in: optional(row, "linkedIn"),
        venue_id,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn required(row: &Row, column: &str, label: &str) -> Result<String, ImportRowError> {
    match row.get(column) {
        "" => Err(ImportRowError::validation(
            row.line_number(),
            column,
            format!("{label} is required"),
        )),
        value => Ok(value.to_string()),
    }
}

fn optional(row: &Row, column: &str) -> Option<String> {
    match row.get(column) {
        "" => None,
        value => Some(value.to_string()),
    }
}

/// Empty takes the store default; anything else must parse.
fn enumerated<T: Default>(
    row: &Row,
    column: &str,
    label: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<T, ImportRowError> {
    match row.get(column) {
        "" => Ok(T::default()),
        raw => parse(raw).ok_or_else(|| {
            ImportRowError::validation(row.line_number(), column, format!("Invalid {label} \"{raw}\""))
        }),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "" | "false" | "no" | "n" | "0" => Some(false),
        "true" | "yes" | "y" | "1" => Some(true),
        _ => None,
    }
}
