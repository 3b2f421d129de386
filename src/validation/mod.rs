//! Row validation for import files.
//!
//! Turns a parsed row into a write-ready entity, or the first rule it breaks.

mod fields;
mod row_validator;

pub use fields::{normalize_enum_value, PipelineStage, VenueStatus, VenueType};
pub use row_validator::{is_valid_email, validate_contact, validate_venue};
