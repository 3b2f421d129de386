//! Bulk CSV import jobs for a venue sales-pipeline CRM.
//!
//! Uploaded venue or contact files are parsed, validated row by row against
//! existing operators and venues, and written to the local SQLite store while
//! a job record tracks progress for polling clients.

pub mod config;
pub mod error;
pub mod import;
pub mod state;
pub mod storage;
pub mod validation;

pub use config::ImportConfig;
pub use error::AppError;
pub use state::AppState;
