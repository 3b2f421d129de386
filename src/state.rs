//! Application state: the submit/poll/cancel surface the API layer calls.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ImportConfig;
use crate::error::AppError;
use crate::import::controller::short_id;
use crate::import::{DatabaseStore, ImportController};
use crate::storage::{self, Database, ImportJob, ImportKind};

// ─────────────────────────────────────────────────────────────────────────────
// Cancellation Token Storage
// ─────────────────────────────────────────────────────────────────────────────

/// Storage for cancellation tokens of running imports, keyed by job_id.
pub struct CancellationTokens {
    tokens: Mutex<HashMap<String, CancellationToken>>,
}

impl CancellationTokens {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, job_id: String, token: CancellationToken) {
        self.tokens.lock().await.insert(job_id, token);
    }

    pub async fn get(&self, job_id: &str) -> Option<CancellationToken> {
        self.tokens.lock().await.get(job_id).cloned()
    }

    pub async fn remove(&self, job_id: &str) {
        self.tokens.lock().await.remove(job_id);
    }
}

impl Default for CancellationTokens {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Application State
// ─────────────────────────────────────────────────────────────────────────────

/// Shared state for import operations.
pub struct AppState {
    pub db: Arc<Database>,
    pub config: ImportConfig,
    store: Arc<DatabaseStore>,
    tokens: Arc<CancellationTokens>,
}

impl AppState {
    pub fn new(db: Database, config: ImportConfig) -> Self {
        let db = Arc::new(db);
        Self {
            store: Arc::new(DatabaseStore::new(db.clone())),
            db,
            config,
            tokens: Arc::new(CancellationTokens::new()),
        }
    }

    fn controller(&self) -> ImportController<DatabaseStore, DatabaseStore> {
        ImportController::new(
            self.store.clone(),
            self.store.clone(),
            self.config.checkpoint_interval,
        )
    }

    /// Creates a pending job and processes it in the background.
    ///
    /// Returns as soon as the job record exists; poll `get_import_job` for
    /// progress.
    pub async fn submit_import(
        &self,
        kind: ImportKind,
        source_file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ImportJob, AppError> {
        let controller = self.controller();
        let job = controller.create_job(kind, source_file_name, &bytes).await?;

        let token = CancellationToken::new();
        self.tokens.insert(job.id.clone(), token.clone()).await;

        let tokens = self.tokens.clone();
        let job_id = job.id.clone();
        tokio::spawn(async move {
            if let Err(e) = controller.run(&job_id, kind, &bytes, &token).await {
                warn!("[IMPORT] Background job {} ended with error: {}", short_id(&job_id), e);
            }
            tokens.remove(&job_id).await;
        });

        Ok(job)
    }

    /// Creates a job and runs it to completion.
    ///
    /// A file that cannot be parsed still yields its failed job record.
    pub async fn run_import(
        &self,
        kind: ImportKind,
        source_file_name: &str,
        bytes: &[u8],
    ) -> Result<ImportJob, AppError> {
        let controller = self.controller();
        let job = controller.create_job(kind, source_file_name, bytes).await?;

        let token = CancellationToken::new();
        self.tokens.insert(job.id.clone(), token.clone()).await;
        let result = controller.run(&job.id, kind, bytes, &token).await;
        self.tokens.remove(&job.id).await;

        match result {
            Ok(job) => Ok(job),
            Err(e) => match self.get_import_job(&job.id).await {
                Ok(failed) if failed.status.is_terminal() => Ok(failed),
                _ => Err(e),
            },
        }
    }

    pub async fn get_import_job(&self, job_id: &str) -> Result<ImportJob, AppError> {
        storage::get_import_job(&self.db, job_id).await
    }

    pub async fn list_import_jobs(&self, limit: u32) -> Result<Vec<ImportJob>, AppError> {
        storage::list_import_jobs(&self.db, limit).await
    }

    /// Signals a running import to stop before its next row.
    pub async fn cancel_import(&self, job_id: &str) -> Result<(), AppError> {
        let token = self
            .tokens
            .get(job_id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("No running import {job_id}")))?;

        info!("[IMPORT] Cancellation requested for job {}", short_id(job_id));
        token.cancel();
        Ok(())
    }

    /// Removes terminal jobs past the configured retention.
    pub async fn cleanup_old_jobs(&self) -> Result<u64, AppError> {
        let deleted = storage::cleanup_old_jobs(&self.db, self.config.job_retention_days).await?;
        info!("[IMPORT] Removed {} expired import jobs", deleted);
        Ok(deleted)
    }
}
