//! Storage module for the local SQLite entity store and import job records.

mod database;
pub mod jobs;

pub use database::{Contact, Database, NewContact, NewVenue, Operator, Venue};
pub use jobs::{
    cleanup_old_jobs, create_import_job, get_import_job, list_import_jobs, update_import_job,
    ErrorOrigin, ImportJob, ImportJobUpdate, ImportKind, ImportRowError, JobStatus,
};
