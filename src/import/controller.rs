//! Job controller: owns one import job's lifecycle from pending to terminal.
//!
//! Rows are processed strictly in order, one awaited write at a time. Progress
//! is checkpointed to the job record after every `checkpoint_interval`-th row
//! (by 0-based index) and the final write always carries the authoritative
//! counts and status.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::import::parser::{parse_rows, Row};
use crate::import::resolver::{load_reference_table, ReferenceTable};
use crate::import::store::{EntityStoreOps, JobStoreOps};
use crate::import::writer::{write_row, ValidatedRow};
use crate::import::columns_for;
use crate::storage::{ImportJob, ImportJobUpdate, ImportKind, ImportRowError, JobStatus};
use crate::validation::{validate_contact, validate_venue};

/// Default number of rows between progress checkpoints.
pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 10;

/// Running counters for one pass. `pending_errors` holds errors not yet
/// written to the job record.
#[derive(Debug, Default)]
struct Progress {
    processed: u64,
    success: u64,
    error_rows: u64,
    pending_errors: Vec<ImportRowError>,
}

impl Progress {
    fn take_update(&mut self, status: Option<JobStatus>) -> ImportJobUpdate {
        ImportJobUpdate {
            status,
            total_rows: None,
            processed_rows: Some(self.processed),
            success_rows: Some(self.success),
            error_rows: Some(self.error_rows),
            append_errors: std::mem::take(&mut self.pending_errors),
        }
    }
}

/// Runs import jobs against a job store and an entity store.
pub struct ImportController<J: JobStoreOps, E: EntityStoreOps> {
    jobs: Arc<J>,
    entities: Arc<E>,
    checkpoint_interval: u64,
}

impl<J: JobStoreOps, E: EntityStoreOps> ImportController<J, E> {
    pub fn new(jobs: Arc<J>, entities: Arc<E>, checkpoint_interval: u64) -> Self {
        Self {
            jobs,
            entities,
            checkpoint_interval: checkpoint_interval.max(1),
        }
    }

    /// Creates the pending job record for a file.
    ///
    /// `totalRows` is the parsed row count, or 0 when the file cannot be
    /// parsed (the run will then fail it).
    pub async fn create_job(
        &self,
        kind: ImportKind,
        source_file_name: &str,
        bytes: &[u8],
    ) -> Result<ImportJob, AppError> {
        let total_rows = parse_rows(bytes, columns_for(kind))
            .map(|rows| rows.len() as u64)
            .unwrap_or(0);

        let job = self
            .jobs
            .create_import_job(kind, source_file_name, total_rows)
            .await?;

        info!(
            "[IMPORT] Created {} job {} for '{}' ({} rows)",
            kind.as_str(),
            short_id(&job.id),
            source_file_name,
            total_rows
        );
        Ok(job)
    }

    /// Runs the single processing pass for a pending job.
    ///
    /// Returns the terminal job record. Only file-level failures (unparseable
    /// input, job store errors) come back as `Err`; the job is marked failed
    /// before returning when the store allows it.
    pub async fn run(
        &self,
        job_id: &str,
        kind: ImportKind,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<ImportJob, AppError> {
        let rows = match parse_rows(bytes, columns_for(kind)) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("[IMPORT] Job {} could not be parsed: {}", short_id(job_id), e);
                self.jobs
                    .update_import_job(
                        job_id,
                        ImportJobUpdate {
                            status: Some(JobStatus::Failed),
                            append_errors: vec![ImportRowError::job(0, e.to_string())],
                            ..Default::default()
                        },
                    )
                    .await?;
                return Err(e);
            }
        };

        let total_rows = rows.len() as u64;
        self.jobs
            .update_import_job(
                job_id,
                ImportJobUpdate {
                    status: Some(JobStatus::Processing),
                    total_rows: Some(total_rows),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            "[IMPORT] Job {} processing {} {} rows",
            short_id(job_id),
            total_rows,
            kind.as_str()
        );

        let refs = match load_reference_table(self.entities.as_ref(), kind).await {
            Ok(refs) => refs,
            Err(e) => {
                warn!(
                    "[IMPORT] Job {} failed to load reference data: {}",
                    short_id(job_id),
                    e
                );
                return self
                    .finish(
                        job_id,
                        JobStatus::Failed,
                        Progress {
                            pending_errors: vec![ImportRowError::job(
                                0,
                                format!("Failed to load reference data: {e}"),
                            )],
                            ..Default::default()
                        },
                    )
                    .await;
            }
        };

        let mut progress = Progress::default();
        let outcome = self
            .process_rows(job_id, kind, &rows, &refs, cancel, &mut progress)
            .await;
        match outcome {
            Ok(status) => self.finish(job_id, status, progress).await,
            Err(e) => {
                warn!("[IMPORT] Job {} aborted: {}", short_id(job_id), e);
                // Best effort: the store that just failed may reject this too.
                if let Err(update_err) = self
                    .jobs
                    .update_import_job(job_id, progress.take_update(Some(JobStatus::Failed)))
                    .await
                {
                    warn!(
                        "[IMPORT] Job {} could not be marked failed: {}",
                        short_id(job_id),
                        update_err
                    );
                }
                Err(e)
            }
        }
    }

    /// Validates and writes each row in order, returning the terminal status.
    async fn process_rows(
        &self,
        job_id: &str,
        kind: ImportKind,
        rows: &[Row],
        refs: &ReferenceTable,
        cancel: &CancellationToken,
        progress: &mut Progress,
    ) -> Result<JobStatus, AppError> {
        for (index, row) in rows.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(
                    "[IMPORT] Job {} cancelled after {} of {} rows",
                    short_id(job_id),
                    progress.processed,
                    rows.len()
                );
                progress.pending_errors.push(ImportRowError::job(
                    row.line_number(),
                    "Import cancelled before this row was processed",
                ));
                return Ok(JobStatus::Failed);
            }

            match self.process_row(kind, row, refs).await {
                Ok(()) => progress.success += 1,
                Err(error) => {
                    debug!(
                        "[IMPORT] Job {} row {} rejected ({}): {}",
                        short_id(job_id),
                        error.row_number,
                        error.field,
                        error.message
                    );
                    progress.error_rows += 1;
                    progress.pending_errors.push(error);
                }
            }
            progress.processed += 1;

            if index as u64 % self.checkpoint_interval == 0 {
                self.jobs
                    .update_import_job(job_id, progress.take_update(None))
                    .await?;
                debug!(
                    "[IMPORT] Job {} checkpoint at {}/{}",
                    short_id(job_id),
                    progress.processed,
                    rows.len()
                );
            }
        }

        Ok(JobStatus::from_outcome(progress.success, progress.error_rows))
    }

    /// Validates then writes one row. Every failure is a row error.
    async fn process_row(
        &self,
        kind: ImportKind,
        row: &Row,
        refs: &ReferenceTable,
    ) -> Result<(), ImportRowError> {
        let validated = match kind {
            ImportKind::Venues => ValidatedRow::Venue(validate_venue(row, refs)?),
            ImportKind::Contacts => ValidatedRow::Contact(validate_contact(row, refs)?),
        };
        write_row(self.entities.as_ref(), row.line_number(), validated).await?;
        Ok(())
    }

    /// Final write: authoritative counts, remaining errors and terminal status.
    async fn finish(
        &self,
        job_id: &str,
        status: JobStatus,
        mut progress: Progress,
    ) -> Result<ImportJob, AppError> {
        let job = self
            .jobs
            .update_import_job(job_id, progress.take_update(Some(status)))
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("Job {job_id} returned no record on completion"))
            })?;

        info!(
            "[IMPORT] Job {} {}: {} processed, {} succeeded, {} failed",
            short_id(job_id),
            job.status.as_str(),
            job.processed_rows,
            job.success_rows,
            job.error_rows
        );
        Ok(job)
    }
}

/// First 8 characters of an id, for log lines.
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
