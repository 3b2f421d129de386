//! crm-import: run and inspect bulk CSV import jobs against the local CRM database.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crm_import::storage::{Database, ImportKind, JobStatus};
use crm_import::{AppState, ImportConfig};

#[derive(Parser)]
#[command(name = "crm-import")]
#[command(about = "Bulk CSV import jobs for venues and contacts")]
#[command(version)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "CRM_IMPORT_DB")]
    database: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true, env = "CRM_IMPORT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a CSV file and wait for the job to finish
    Import {
        /// What the file contains: venues or contacts
        #[arg(long, value_parser = parse_kind)]
        kind: ImportKind,
        /// Path to the CSV file
        file: PathBuf,
    },
    /// Show one import job, or the most recent jobs
    Status {
        /// Job ID to show
        job_id: Option<String>,
        /// Number of recent jobs to list
        #[arg(long, default_value = "10")]
        limit: u32,
    },
    /// Delete finished jobs older than the retention period
    Cleanup,
    /// Add an operator that venue imports can reference by name
    AddOperator {
        name: String,
    },
}

fn parse_kind(s: &str) -> Result<ImportKind, String> {
    ImportKind::parse(s).ok_or_else(|| format!("unknown import kind '{s}' (expected venues or contacts)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crm_import=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = ImportConfig::resolve(cli.config.as_deref(), cli.database)
        .context("Failed to load configuration")?;
    info!("[IMPORT] Database: {}", config.database_path.display());

    let db = Database::init(config.database_path.clone())
        .await
        .context("Failed to open database")?;
    db.health_check().await.context("Database health check failed")?;
    let state = AppState::new(db, config);

    match cli.command {
        Commands::Import { kind, file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());

            let job = state.run_import(kind, &file_name, &bytes).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);

            if job.status == JobStatus::Failed {
                bail!("Import {} failed ({} row errors)", job.id, job.errors.len());
            }
        }
        Commands::Status { job_id, limit } => match job_id {
            Some(job_id) => {
                let job = state.get_import_job(&job_id).await?;
                println!("{}", serde_json::to_string_pretty(&job)?);
            }
            None => {
                for job in state.list_import_jobs(limit).await? {
                    println!(
                        "{}  {:<8} {:<10} {:>5}/{:<5} ok={} err={}  {}",
                        job.id,
                        job.import_kind.as_str(),
                        job.status.as_str(),
                        job.processed_rows,
                        job.total_rows,
                        job.success_rows,
                        job.error_rows,
                        job.source_file_name
                    );
                }
            }
        },
        Commands::Cleanup => {
            let deleted = state.cleanup_old_jobs().await?;
            println!("Removed {deleted} import jobs");
        }
        Commands::AddOperator { name } => {
            let operator = state.db.insert_operator(&name).await?;
            println!("{}", operator.id);
        }
    }

    Ok(())
}
