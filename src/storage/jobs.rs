//! Import job persistence for SQLite.
//!
//! Stores one record per import run plus its ordered per-row error list, so a
//! polling client can follow progress while the controller works.

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::storage::database::{current_timestamp, Database};

// ─────────────────────────────────────────────────────────────────────────────
// ImportKind
// ─────────────────────────────────────────────────────────────────────────────

/// Entity kind an import creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Venues,
    Contacts,
}

impl ImportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Venues => "venues",
            ImportKind::Contacts => "contacts",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "venues" | "venue" => Some(ImportKind::Venues),
            "contacts" | "contact" => Some(ImportKind::Contacts),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JobStatus
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of an import job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Record created, processing has not started.
    Pending,
    /// Rows are being validated and written.
    Processing,
    /// At least one row succeeded, or there was nothing to reject.
    Completed,
    /// Every processed row failed, or the file could not be read at all.
    Failed,
}

impl JobStatus {
    /// Converts the state to its string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Parses a stored status string.
    pub fn from_str(s: &str) -> Result<Self, AppError> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(AppError::Store(format!("Unknown job status '{other}'"))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    ///
    /// `Pending -> Failed` covers files that cannot be parsed at all.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }

    /// Terminal status for a finished pass: a total loss fails, anything else completes.
    pub fn from_outcome(success_rows: u64, error_rows: u64) -> Self {
        if success_rows == 0 && error_rows > 0 {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Where a row error came from. Persisted, but not part of the client-facing shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorOrigin {
    #[default]
    Validation,
    Write,
    /// File-level problems: unparseable input or cancellation.
    Job,
}

impl ErrorOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorOrigin::Validation => "validation",
            ErrorOrigin::Write => "write",
            ErrorOrigin::Job => "job",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "write" => ErrorOrigin::Write,
            "job" => ErrorOrigin::Job,
            _ => ErrorOrigin::Validation,
        }
    }
}

/// One entry of a job's error list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRowError {
    pub row_number: u64,
    pub field: String,
    pub message: String,
    #[serde(skip)]
    pub origin: ErrorOrigin,
}

impl ImportRowError {
    pub fn validation(row_number: u64, field: &str, message: impl Into<String>) -> Self {
        Self {
            row_number,
            field: field.to_string(),
            message: message.into(),
            origin: ErrorOrigin::Validation,
        }
    }

    /// Store rejections are reported against the `general` field.
    pub fn write(row_number: u64, message: impl Into<String>) -> Self {
        Self {
            row_number,
            field: "general".to_string(),
            message: message.into(),
            origin: ErrorOrigin::Write,
        }
    }

    pub fn job(row_number: u64, message: impl Into<String>) -> Self {
        Self {
            row_number,
            field: "general".to_string(),
            message: message.into(),
            origin: ErrorOrigin::Job,
        }
    }
}

/// Persisted state of one import run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: String,
    pub import_kind: ImportKind,
    pub status: JobStatus,
    pub source_file_name: String,
    pub total_rows: u64,
    pub processed_rows: u64,
    pub success_rows: u64,
    pub error_rows: u64,
    pub errors: Vec<ImportRowError>,
    pub created_at: i64,
    pub updated_at: i64,
    pub completed_at: Option<i64>,
}

/// Partial update applied at checkpoints and at finalization.
///
/// `None` leaves a field unchanged; `append_errors` are added after the
/// existing error list.
#[derive(Debug, Clone, Default)]
pub struct ImportJobUpdate {
    pub status: Option<JobStatus>,
    pub total_rows: Option<u64>,
    pub processed_rows: Option<u64>,
    pub success_rows: Option<u64>,
    pub error_rows: Option<u64>,
    pub append_errors: Vec<ImportRowError>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Creates a pending import job.
pub async fn create_import_job(
    db: &Database,
    kind: ImportKind,
    source_file_name: &str,
    total_rows: u64,
) -> Result<ImportJob, AppError> {
    let now = current_timestamp();
    let job = ImportJob {
        id: Uuid::new_v4().to_string(),
        import_kind: kind,
        status: JobStatus::Pending,
        source_file_name: source_file_name.to_string(),
        total_rows,
        processed_rows: 0,
        success_rows: 0,
        error_rows: 0,
        errors: Vec::new(),
        created_at: now,
        updated_at: now,
        completed_at: None,
    };
    let row = job.clone();

    db.with_connection("Create import job", move |conn| {
        conn.execute(
            r#"
            INSERT INTO import_jobs (id, import_kind, status, source_file_name, total_rows, processed_rows, success_rows, error_rows, created_at, updated_at, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, 0, ?6, ?7, NULL)
            "#,
            rusqlite::params![
                row.id,
                row.import_kind.as_str(),
                row.status.as_str(),
                row.source_file_name,
                row.total_rows as i64,
                row.created_at,
                row.updated_at,
            ],
        )
        .map_err(|e| AppError::Store(format!("Failed to insert import job: {e}")))?;
        Ok(())
    })
    .await?;

    Ok(job)
}

/// Gets an import job with its full error list.
pub async fn get_import_job(db: &Database, job_id: &str) -> Result<ImportJob, AppError> {
    let job_id = job_id.to_string();

    db.with_connection("Get import job", move |conn| {
        load_job(conn, &job_id)?
            .ok_or_else(|| AppError::NotFound(format!("Import job {job_id} not found")))
    })
    .await
}

/// Applies a partial update in one transaction.
///
/// Terminal jobs are never modified again. `completed_at` is stamped on the
/// transition into a terminal state, and only that update reloads and
/// returns the full job; checkpoints return `None`.
pub async fn update_import_job(
    db: &Database,
    job_id: &str,
    update: ImportJobUpdate,
) -> Result<Option<ImportJob>, AppError> {
    let job_id = job_id.to_string();
    let now = current_timestamp();

    db.with_connection("Update import job", move |conn| {
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Store(format!("Failed to start transaction: {e}")))?;

        let status: String = tx
            .query_row("SELECT status FROM import_jobs WHERE id = ?1", [&job_id], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| AppError::Store(format!("Failed to query import job: {e}")))?
            .ok_or_else(|| AppError::NotFound(format!("Import job {job_id} not found")))?;
        let current = JobStatus::from_str(&status)?;

        if current.is_terminal() {
            return Err(AppError::JobFinished {
                job_id,
                status: current.as_str().to_string(),
            });
        }

        if let Some(next) = update.status {
            if next != current && !current.can_transition_to(next) {
                return Err(AppError::Internal(format!(
                    "Illegal import job transition {} -> {}",
                    current.as_str(),
                    next.as_str()
                )));
            }
        }

        let completed_at = update
            .status
            .filter(|s| s.is_terminal())
            .map(|_| now);

        tx.execute(
            r#"
            UPDATE import_jobs
            SET status = COALESCE(?1, status),
                total_rows = COALESCE(?2, total_rows),
                processed_rows = COALESCE(?3, processed_rows),
                success_rows = COALESCE(?4, success_rows),
                error_rows = COALESCE(?5, error_rows),
                completed_at = COALESCE(completed_at, ?6),
                updated_at = ?7
            WHERE id = ?8
            "#,
            rusqlite::params![
                update.status.map(|s| s.as_str()),
                update.total_rows.map(|v| v as i64),
                update.processed_rows.map(|v| v as i64),
                update.success_rows.map(|v| v as i64),
                update.error_rows.map(|v| v as i64),
                completed_at,
                now,
                job_id,
            ],
        )
        .map_err(|e| AppError::Store(format!("Failed to update import job: {e}")))?;

        let next_seq: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(seq) + 1, 0) FROM import_job_errors WHERE job_id = ?1",
                [&job_id],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Store(format!("Failed to query import errors: {e}")))?;
        for (offset, error) in update.append_errors.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO import_job_errors (job_id, seq, row_number, field, message, origin)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                rusqlite::params![
                    job_id,
                    next_seq + offset as i64,
                    error.row_number as i64,
                    error.field,
                    error.message,
                    error.origin.as_str(),
                ],
            )
            .map_err(|e| AppError::Store(format!("Failed to insert import error: {e}")))?;
        }

        let updated = match completed_at {
            Some(_) => Some(
                load_job(&tx, &job_id)?
                    .ok_or_else(|| AppError::NotFound(format!("Import job {job_id} not found")))?,
            ),
            None => None,
        };

        tx.commit()
            .map_err(|e| AppError::Store(format!("Failed to commit job update: {e}")))?;

        Ok(updated)
    })
    .await
}

/// Lists the most recent import jobs, newest first.
pub async fn list_import_jobs(db: &Database, limit: u32) -> Result<Vec<ImportJob>, AppError> {
    db.with_connection("List import jobs", move |conn| {
        let ids: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT id FROM import_jobs ORDER BY created_at DESC, rowid DESC LIMIT ?1")
                .map_err(|e| AppError::Store(format!("Failed to prepare query: {e}")))?;

            let rows = stmt
                .query_map([limit], |row| row.get(0))
                .map_err(|e| AppError::Store(format!("Failed to query import jobs: {e}")))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::Store(format!("Failed to collect import jobs: {e}")))?
        };

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(job) = load_job(conn, &id)? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    })
    .await
}

/// Deletes terminal jobs (and their errors) not updated within `retention_days`.
/// Returns the number of deleted jobs.
pub async fn cleanup_old_jobs(db: &Database, retention_days: i64) -> Result<u64, AppError> {
    let cutoff = current_timestamp() - (retention_days * 24 * 60 * 60);

    db.with_connection("Cleanup import jobs", move |conn| {
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Store(format!("Failed to start transaction: {e}")))?;

        let job_ids: Vec<String> = {
            let mut stmt = tx
                .prepare(
                    r#"
                    SELECT id FROM import_jobs
                    WHERE status IN (?1, ?2)
                    AND updated_at < ?3
                    "#,
                )
                .map_err(|e| AppError::Store(format!("Failed to prepare query: {e}")))?;

            let rows = stmt
                .query_map(
                    rusqlite::params![
                        JobStatus::Completed.as_str(),
                        JobStatus::Failed.as_str(),
                        cutoff
                    ],
                    |row| row.get(0),
                )
                .map_err(|e| AppError::Store(format!("Failed to query old jobs: {e}")))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::Store(format!("Failed to collect job IDs: {e}")))?
        };

        for job_id in &job_ids {
            tx.execute("DELETE FROM import_job_errors WHERE job_id = ?1", [job_id])
                .map_err(|e| AppError::Store(format!("Failed to delete job errors: {e}")))?;
            tx.execute("DELETE FROM import_jobs WHERE id = ?1", [job_id])
                .map_err(|e| AppError::Store(format!("Failed to delete job: {e}")))?;
        }

        tx.commit()
            .map_err(|e| AppError::Store(format!("Failed to commit cleanup: {e}")))?;

        Ok(job_ids.len() as u64)
    })
    .await
}

/// Loads a job and its errors on an open connection.
fn load_job(conn: &Connection, job_id: &str) -> Result<Option<ImportJob>, AppError> {
    let header = conn
        .query_row(
            r#"
            SELECT id, import_kind, status, source_file_name, total_rows, processed_rows, success_rows, error_rows, created_at, updated_at, completed_at
            FROM import_jobs
            WHERE id = ?1
            "#,
            [job_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    [
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, i64>(7)?,
                    ],
                    row.get::<_, i64>(8)?,
                    row.get::<_, i64>(9)?,
                    row.get::<_, Option<i64>>(10)?,
                ))
            },
        )
        .optional()
        .map_err(|e| AppError::Store(format!("Failed to query import job: {e}")))?;

    let Some((id, kind, status, source_file_name, counts, created_at, updated_at, completed_at)) =
        header
    else {
        return Ok(None);
    };

    let import_kind = ImportKind::parse(&kind)
        .ok_or_else(|| AppError::Store(format!("Unknown import kind '{kind}'")))?;

    let mut stmt = conn
        .prepare(
            r#"
            SELECT row_number, field, message, origin
            FROM import_job_errors
            WHERE job_id = ?1
            ORDER BY seq ASC
            "#,
        )
        .map_err(|e| AppError::Store(format!("Failed to prepare query: {e}")))?;

    let errors = stmt
        .query_map([job_id], |row| {
            let origin: String = row.get(3)?;
            Ok(ImportRowError {
                row_number: row.get::<_, i64>(0)? as u64,
                field: row.get(1)?,
                message: row.get(2)?,
                origin: ErrorOrigin::from_str(&origin),
            })
        })
        .map_err(|e| AppError::Store(format!("Failed to query import errors: {e}")))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Store(format!("Failed to collect import errors: {e}")))?;

    Ok(Some(ImportJob {
        id,
        import_kind,
        status: JobStatus::from_str(&status)?,
        source_file_name,
        total_rows: counts[0] as u64,
        processed_rows: counts[1] as u64,
        success_rows: counts[2] as u64,
        error_rows: counts[3] as u64,
        errors,
        created_at,
        updated_at,
        completed_at,
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
