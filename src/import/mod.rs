//! Bulk CSV import pipeline.
//!
//! A job parses the uploaded file into rows, resolves reference names once,
//! then validates and writes each row in order while checkpointing progress
//! to the job record.

pub mod controller;
pub mod parser;
pub mod resolver;
pub mod store;
pub mod writer;

pub use crate::storage::ImportKind;
pub use controller::ImportController;
pub use parser::{parse_rows, Row};
pub use resolver::{load_reference_table, ReferenceTable};
pub use store::{DatabaseStore, EntityStoreOps, JobStoreOps, NamedRef};
pub use writer::{write_row, ValidatedRow};

/// Columns read from a venue import file.
pub const VENUE_COLUMNS: &[&str] = &[
    "name",
    "address",
    "city",
    "state",
    "type",
    "capacity",
    "stage",
    "status",
    "dealValue",
    "operatorName",
    "notes",
];

/// Columns read from a contact import file.
pub const CONTACT_COLUMNS: &[&str] = &[
    "name",
    "email",
    "phone",
    "role",
    "isPrimary",
    "venueName",
    "linkedIn",
];

/// Returns the declared column set for an import kind.
pub fn columns_for(kind: ImportKind) -> &'static [&'static str] {
    match kind {
        ImportKind::Venues => VENUE_COLUMNS,
        ImportKind::Contacts => CONTACT_COLUMNS,
    }
}
