//! Store seams used by the import pipeline, plus the SQLite-backed adapter.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::AppError;
use crate::storage::{
    create_import_job, get_import_job, update_import_job, Contact, Database, ImportJob,
    ImportJobUpdate, ImportKind, NewContact, NewVenue, Venue,
};

/// Name/id pair used to build reference lookup tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRef {
    pub id: String,
    pub name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Traits for Testing
// ─────────────────────────────────────────────────────────────────────────────

/// Job record persistence, allowing test fakes.
pub trait JobStoreOps: Send + Sync {
    fn create_import_job(
        &self,
        kind: ImportKind,
        source_file_name: &str,
        total_rows: u64,
    ) -> Pin<Box<dyn Future<Output = Result<ImportJob, AppError>> + Send + '_>>;

    fn get_import_job(
        &self,
        job_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<ImportJob, AppError>> + Send + '_>>;

    /// Returns the full job only when the update made it terminal.
    fn update_import_job(
        &self,
        job_id: &str,
        update: ImportJobUpdate,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ImportJob>, AppError>> + Send + '_>>;
}

/// Entity store reads and writes, allowing test fakes.
pub trait EntityStoreOps: Send + Sync {
    /// All operators as name/id pairs.
    fn list_operators_by_name(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<NamedRef>, AppError>> + Send + '_>>;

    /// All venues as name/id pairs.
    fn list_venues_by_name(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<NamedRef>, AppError>> + Send + '_>>;

    fn create_venue(
        &self,
        venue: NewVenue,
    ) -> Pin<Box<dyn Future<Output = Result<Venue, AppError>> + Send + '_>>;

    /// Creates a contact and its link to `venue_id`, if set, as one write.
    /// A failed link must leave no contact behind.
    fn create_contact(
        &self,
        contact: NewContact,
    ) -> Pin<Box<dyn Future<Output = Result<Contact, AppError>> + Send + '_>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Real implementation of both store traits over the local database.
#[derive(Clone)]
pub struct DatabaseStore {
    db: Arc<Database>,
}

impl DatabaseStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl JobStoreOps for DatabaseStore {
    fn create_import_job(
        &self,
        kind: ImportKind,
        source_file_name: &str,
        total_rows: u64,
    ) -> Pin<Box<dyn Future<Output = Result<ImportJob, AppError>> + Send + '_>> {
        let db = self.db.clone();
        let source_file_name = source_file_name.to_string();
        Box::pin(async move { create_import_job(&db, kind, &source_file_name, total_rows).await })
    }

    fn get_import_job(
        &self,
        job_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<ImportJob, AppError>> + Send + '_>> {
        let db = self.db.clone();
        let job_id = job_id.to_string();
        Box::pin(async move { get_import_job(&db, &job_id).await })
    }

    fn update_import_job(
        &self,
        job_id: &str,
        update: ImportJobUpdate,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ImportJob>, AppError>> + Send + '_>> {
        let db = self.db.clone();
        let job_id = job_id.to_string();
        Box::pin(async move { update_import_job(&db, &job_id, update).await })
    }
}

impl EntityStoreOps for DatabaseStore {
    fn list_operators_by_name(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<NamedRef>, AppError>> + Send + '_>> {
        let db = self.db.clone();
        Box::pin(async move {
            let operators = db.list_operators().await?;
            Ok(operators
                .into_iter()
                .map(|o| NamedRef {
                    id: o.id,
                    name: o.name,
                })
                .collect())
        })
    }

    fn list_venues_by_name(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<NamedRef>, AppError>> + Send + '_>> {
        let db = self.db.clone();
        Box::pin(async move {
            let venues = db.list_venues().await?;
            Ok(venues
                .into_iter()
                .map(|v| NamedRef {
                    id: v.id,
                    name: v.name,
                })
                .collect())
        })
    }

    fn create_venue(
        &self,
        venue: NewVenue,
    ) -> Pin<Box<dyn Future<Output = Result<Venue, AppError>> + Send + '_>> {
        let db = self.db.clone();
        Box::pin(async move { db.create_venue(venue).await })
    }

    fn create_contact(
        &self,
        contact: NewContact,
    ) -> Pin<Box<dyn Future<Output = Result<Contact, AppError>> + Send + '_>> {
        let db = self.db.clone();
        Box::pin(async move { db.create_contact(contact).await })
    }
}
