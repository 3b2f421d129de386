//! SQLite database module with schema migrations.
//!
//! Holds the CRM entities the import pipeline reads and writes: operators,
//! venues, contacts and the contact-venue links.

use std::path::PathBuf;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::validation::{PipelineStage, VenueStatus, VenueType};

/// Current schema version. Increment when adding new migrations.
const SCHEMA_VERSION: i32 = 2;

/// V1 schema: CRM entity tables.
const V1_SCHEMA: &str = r#"
-- Concessionaire / venue operators
CREATE TABLE IF NOT EXISTS operators (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_operators_name ON operators(name COLLATE NOCASE);

-- Venues in the sales pipeline
CREATE TABLE IF NOT EXISTS venues (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    city TEXT NOT NULL,
    state TEXT NOT NULL,
    venue_type TEXT NOT NULL,
    capacity INTEGER,
    stage TEXT NOT NULL,
    status TEXT NOT NULL,
    deal_value REAL,
    operator_id TEXT REFERENCES operators(id),
    notes TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_venues_name ON venues(name COLLATE NOCASE);
CREATE INDEX IF NOT EXISTS idx_venues_operator_id ON venues(operator_id);

-- People at venues and operators
CREATE TABLE IF NOT EXISTS contacts (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone TEXT,
    role TEXT,
    is_primary INTEGER NOT NULL DEFAULT 0,
    linked_in TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS contact_venues (
    contact_id TEXT NOT NULL REFERENCES contacts(id),
    venue_id TEXT NOT NULL REFERENCES venues(id),
    is_primary INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (contact_id, venue_id)
);

CREATE INDEX IF NOT EXISTS idx_contact_venues_venue_id ON contact_venues(venue_id);
"#;

/// V2 migration: import job records and their per-row errors.
const V2_MIGRATION: &str = r#"
CREATE TABLE IF NOT EXISTS import_jobs (
    id TEXT PRIMARY KEY NOT NULL,
    import_kind TEXT NOT NULL,
    status TEXT NOT NULL,
    source_file_name TEXT NOT NULL,
    total_rows INTEGER NOT NULL DEFAULT 0,
    processed_rows INTEGER NOT NULL DEFAULT 0,
    success_rows INTEGER NOT NULL DEFAULT 0,
    error_rows INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    completed_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_import_jobs_status ON import_jobs(status);
CREATE INDEX IF NOT EXISTS idx_import_jobs_created_at ON import_jobs(created_at);

CREATE TABLE IF NOT EXISTS import_job_errors (
    job_id TEXT NOT NULL REFERENCES import_jobs(id),
    seq INTEGER NOT NULL,
    row_number INTEGER NOT NULL,
    field TEXT NOT NULL,
    message TEXT NOT NULL,
    origin TEXT NOT NULL,
    PRIMARY KEY (job_id, seq)
);
"#;

// ─────────────────────────────────────────────────────────────────────────────
// Models
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

/// Venue row as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub venue_type: String,
    pub capacity: Option<i64>,
    pub stage: String,
    pub status: String,
    pub deal_value: Option<f64>,
    pub operator_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Write-ready venue fields, produced by the row validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVenue {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub venue_type: VenueType,
    pub capacity: Option<i64>,
    pub stage: PipelineStage,
    pub status: VenueStatus,
    pub deal_value: Option<f64>,
    pub operator_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub is_primary: bool,
    pub linked_in: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Write-ready contact fields. `venue_id` is linked after the contact is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub is_primary: bool,
    pub linked_in: Option<String>,
    pub venue_id: Option<String>,
}

/// SQLite database handle.
#[derive(Debug)]
pub struct Database {
    db_path: PathBuf,
}

impl Database {
    /// Initializes the database at the given path.
    /// Creates parent directories if needed, opens the SQLite file, and runs migrations.
    pub async fn init(db_path: PathBuf) -> Result<Self, AppError> {
        let path = db_path.clone();

        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        AppError::Internal(format!("Failed to create database directory: {e}"))
                    })?;
                }
            }

            let mut conn = Connection::open(&path)
                .map_err(|e| AppError::Store(format!("Failed to open database: {e}")))?;

            configure_connection(&conn)?;
            run_migrations(&mut conn)?;

            Ok::<_, AppError>(())
        })
        .await
        .map_err(|e| AppError::Internal(format!("Database init task failed: {e}")))??;

        Ok(Self { db_path })
    }

    /// Simple health check: executes SELECT 1.
    pub async fn health_check(&self) -> Result<(), AppError> {
        self.with_connection("Health check", |conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))
                .map_err(|e| AppError::Store(format!("Health check failed: {e}")))
        })
        .await
    }

    /// Runs `f` against a freshly configured connection on the blocking pool.
    pub(crate) async fn with_connection<T, F>(&self, what: &'static str, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, AppError> + Send + 'static,
    {
        let db_path = self.db_path.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = open_connection(&db_path)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| AppError::Internal(format!("{what} task failed: {e}")))?
    }

    // ── Operators ─────────────────────────────────────────────────────────────

    /// Inserts a new operator and returns it.
    pub async fn insert_operator(&self, name: &str) -> Result<Operator, AppError> {
        let operator = Operator {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: current_timestamp(),
        };
        let row = operator.clone();

        self.with_connection("Insert operator", move |conn| {
            conn.execute(
                "INSERT INTO operators (id, name, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![row.id, row.name, row.created_at],
            )
            .map_err(|e| AppError::Store(format!("Failed to insert operator: {e}")))?;
            Ok(())
        })
        .await?;

        Ok(operator)
    }

    /// Lists all operators ordered by name.
    pub async fn list_operators(&self) -> Result<Vec<Operator>, AppError> {
        self.with_connection("List operators", |conn| {
            let mut stmt = conn
                .prepare("SELECT id, name, created_at FROM operators ORDER BY name ASC")
                .map_err(|e| AppError::Store(format!("Failed to prepare query: {e}")))?;

            let operators = stmt
                .query_map([], |row| {
                    Ok(Operator {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                })
                .map_err(|e| AppError::Store(format!("Failed to query operators: {e}")))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::Store(format!("Failed to collect operators: {e}")))?;

            Ok(operators)
        })
        .await
    }

    // ── Venues ────────────────────────────────────────────────────────────────

    /// Creates a venue from validated fields.
    pub async fn create_venue(&self, venue: NewVenue) -> Result<Venue, AppError> {
        let now = current_timestamp();
        let created = Venue {
            id: Uuid::new_v4().to_string(),
            name: venue.name,
            address: venue.address,
            city: venue.city,
            state: venue.state,
            venue_type: venue.venue_type.as_str().to_string(),
            capacity: venue.capacity,
            stage: venue.stage.as_str().to_string(),
            status: venue.status.as_str().to_string(),
            deal_value: venue.deal_value,
            operator_id: venue.operator_id,
            notes: venue.notes,
            created_at: now,
            updated_at: now,
        };
        let row = created.clone();

        self.with_connection("Create venue", move |conn| {
            conn.execute(
                r#"
                INSERT INTO venues (id, name, address, city, state, venue_type, capacity, stage, status, deal_value, operator_id, notes, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
                rusqlite::params![
                    row.id,
                    row.name,
                    row.address,
                    row.city,
                    row.state,
                    row.venue_type,
                    row.capacity,
                    row.stage,
                    row.status,
                    row.deal_value,
                    row.operator_id,
                    row.notes,
                    row.created_at,
                    row.updated_at,
                ],
            )
            .map_err(|e| AppError::Store(format!("Failed to insert venue: {e}")))?;
            Ok(())
        })
        .await?;

        Ok(created)
    }

    /// Lists all venues ordered by name.
    pub async fn list_venues(&self) -> Result<Vec<Venue>, AppError> {
        self.with_connection("List venues", |conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, name, address, city, state, venue_type, capacity, stage, status, deal_value, operator_id, notes, created_at, updated_at
                    FROM venues
                    ORDER BY name ASC
                    "#,
                )
                .map_err(|e| AppError::Store(format!("Failed to prepare query: {e}")))?;

            let venues = stmt
                .query_map([], map_venue)
                .map_err(|e| AppError::Store(format!("Failed to query venues: {e}")))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::Store(format!("Failed to collect venues: {e}")))?;

            Ok(venues)
        })
        .await
    }

    /// Gets a single venue by ID.
    pub async fn get_venue(&self, venue_id: &str) -> Result<Option<Venue>, AppError> {
        let venue_id = venue_id.to_string();

        self.with_connection("Get venue", move |conn| {
            conn.query_row(
                r#"
                SELECT id, name, address, city, state, venue_type, capacity, stage, status, deal_value, operator_id, notes, created_at, updated_at
                FROM venues
                WHERE id = ?1
                "#,
                [&venue_id],
                map_venue,
            )
            .optional()
            .map_err(|e| AppError::Store(format!("Failed to query venue: {e}")))
        })
        .await
    }

    // ── Contacts ──────────────────────────────────────────────────────────────

    /// Creates a contact and, when `venue_id` is set, its venue link.
    ///
    /// Both inserts share one transaction: a failed link leaves no contact.
    pub async fn create_contact(&self, contact: NewContact) -> Result<Contact, AppError> {
        let now = current_timestamp();
        let created = Contact {
            id: Uuid::new_v4().to_string(),
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            role: contact.role,
            is_primary: contact.is_primary,
            linked_in: contact.linked_in,
            created_at: now,
            updated_at: now,
        };
        let row = created.clone();
        let venue_id = contact.venue_id;

        self.with_connection("Create contact", move |conn| {
            let tx = conn
                .transaction()
                .map_err(|e| AppError::Store(format!("Failed to begin transaction: {e}")))?;

            tx.execute(
                r#"
                INSERT INTO contacts (id, name, email, phone, role, is_primary, linked_in, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                rusqlite::params![
                    row.id,
                    row.name,
                    row.email,
                    row.phone,
                    row.role,
                    row.is_primary as i32,
                    row.linked_in,
                    row.created_at,
                    row.updated_at,
                ],
            )
            .map_err(|e| AppError::Store(format!("Failed to insert contact: {e}")))?;

            if let Some(venue_id) = venue_id {
                insert_contact_link(&tx, &row.id, &venue_id, row.is_primary, now)?;
            }

            tx.commit()
                .map_err(|e| AppError::Store(format!("Failed to commit contact: {e}")))?;
            Ok(())
        })
        .await?;

        Ok(created)
    }

    /// Lists all contacts ordered by name.
    pub async fn list_contacts(&self) -> Result<Vec<Contact>, AppError> {
        self.with_connection("List contacts", |conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, name, email, phone, role, is_primary, linked_in, created_at, updated_at
                    FROM contacts
                    ORDER BY name ASC
                    "#,
                )
                .map_err(|e| AppError::Store(format!("Failed to prepare query: {e}")))?;

            let contacts = stmt
                .query_map([], |row| {
                    Ok(Contact {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        phone: row.get(3)?,
                        role: row.get(4)?,
                        is_primary: row.get::<_, i32>(5)? != 0,
                        linked_in: row.get(6)?,
                        created_at: row.get(7)?,
                        updated_at: row.get(8)?,
                    })
                })
                .map_err(|e| AppError::Store(format!("Failed to query contacts: {e}")))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::Store(format!("Failed to collect contacts: {e}")))?;

            Ok(contacts)
        })
        .await
    }

    /// Links a contact to a venue. Linking the same pair twice is a no-op.
    pub async fn link_contact_to_venue(
        &self,
        contact_id: &str,
        venue_id: &str,
        is_primary: bool,
    ) -> Result<(), AppError> {
        let contact_id = contact_id.to_string();
        let venue_id = venue_id.to_string();
        let created_at = current_timestamp();

        self.with_connection("Link contact", move |conn| {
            insert_contact_link(conn, &contact_id, &venue_id, is_primary, created_at)
        })
        .await
    }

    /// Returns the venue IDs a contact is linked to.
    pub async fn venue_ids_for_contact(&self, contact_id: &str) -> Result<Vec<String>, AppError> {
        let contact_id = contact_id.to_string();

        self.with_connection("Contact venues", move |conn| {
            let mut stmt = conn
                .prepare("SELECT venue_id FROM contact_venues WHERE contact_id = ?1 ORDER BY venue_id")
                .map_err(|e| AppError::Store(format!("Failed to prepare query: {e}")))?;

            let ids = stmt
                .query_map([&contact_id], |row| row.get(0))
                .map_err(|e| AppError::Store(format!("Failed to query contact venues: {e}")))?
                .collect::<Result<Vec<String>, _>>()
                .map_err(|e| AppError::Store(format!("Failed to collect contact venues: {e}")))?;

            Ok(ids)
        })
        .await
    }
}

fn map_venue(row: &rusqlite::Row<'_>) -> rusqlite::Result<Venue> {
    Ok(Venue {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        city: row.get(3)?,
        state: row.get(4)?,
        venue_type: row.get(5)?,
        capacity: row.get(6)?,
        stage: row.get(7)?,
        status: row.get(8)?,
        deal_value: row.get(9)?,
        operator_id: row.get(10)?,
        notes: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn insert_contact_link(
    conn: &Connection,
    contact_id: &str,
    venue_id: &str,
    is_primary: bool,
    created_at: i64,
) -> Result<(), AppError> {
    conn.execute(
        r#"
        INSERT INTO contact_venues (contact_id, venue_id, is_primary, created_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(contact_id, venue_id) DO NOTHING
        "#,
        rusqlite::params![contact_id, venue_id, is_primary as i32, created_at],
    )
    .map_err(|e| AppError::Store(format!("Failed to link contact to venue: {e}")))?;
    Ok(())
}

/// Returns current unix timestamp in seconds.
pub(crate) fn current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Opens a connection to the database file and configures it.
fn open_connection(db_path: &PathBuf) -> Result<Connection, AppError> {
    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Store(format!("Failed to open database: {e}")))?;
    configure_connection(&conn)?;
    Ok(conn)
}

/// Configures connection with busy timeout, WAL mode and foreign keys.
fn configure_connection(conn: &Connection) -> Result<(), AppError> {
    conn.busy_timeout(Duration::from_secs(10))
        .map_err(|e| AppError::Store(format!("Failed to set busy timeout: {e}")))?;

    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|e| AppError::Store(format!("Failed to set WAL mode: {e}")))?;

    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| AppError::Store(format!("Failed to enable foreign keys: {e}")))?;

    Ok(())
}

/// Runs database migrations using PRAGMA user_version.
fn run_migrations(conn: &mut Connection) -> Result<(), AppError> {
    let current_version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| AppError::Store(format!("Failed to get schema version: {e}")))?;

    if current_version >= SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .map_err(|e| AppError::Store(format!("Failed to start migration transaction: {e}")))?;

    if current_version < 1 {
        tx.execute_batch(V1_SCHEMA)
            .map_err(|e| AppError::Store(format!("V1 migration failed: {e}")))?;
    }

    if current_version < 2 {
        tx.execute_batch(V2_MIGRATION)
            .map_err(|e| AppError::Store(format!("V2 migration failed: {e}")))?;
    }

    tx.pragma_update(None, "user_version", SCHEMA_VERSION)
        .map_err(|e| AppError::Store(format!("Failed to update schema version: {e}")))?;

    tx.commit()
        .map_err(|e| AppError::Store(format!("Failed to commit migration: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_db_path() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        (temp_dir, db_path)
    }

    fn sample_venue(name: &str) -> NewVenue {
        NewVenue {
            name: name.to_string(),
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            venue_type: VenueType::Arena,
            capacity: Some(1000),
            stage: PipelineStage::Lead,
            status: VenueStatus::Prospect,
            deal_value: Some(50_000.0),
            operator_id: None,
            notes: None,
        }
    }

    fn sample_contact(name: &str) -> NewContact {
        NewContact {
            name: name.to_string(),
            email: "pat@example.com".to_string(),
            phone: None,
            role: Some("GM".to_string()),
            is_primary: true,
            linked_in: None,
            venue_id: None,
        }
    }

    #[tokio::test]
    async fn init_creates_db_file_and_tables() {
        let (_temp_dir, db_path) = test_db_path();

        let db = Database::init(db_path.clone())
            .await
            .expect("Failed to init database");

        assert!(db_path.exists(), "Database file should exist");

        let conn = Connection::open(&db_path).expect("Failed to open db");
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .expect("Failed to prepare")
            .query_map([], |row| row.get(0))
            .expect("Failed to query")
            .collect::<Result<Vec<_>, _>>()
            .expect("Failed to collect");

        for table in [
            "operators",
            "venues",
            "contacts",
            "contact_venues",
            "import_jobs",
            "import_job_errors",
        ] {
            assert!(
                tables.contains(&table.to_string()),
                "{} table should exist",
                table
            );
        }

        let version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("Failed to get version");
        assert_eq!(version, SCHEMA_VERSION, "Schema version should match");

        db.health_check().await.expect("Health check should pass");
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let (_temp_dir, db_path) = test_db_path();

        let _db1 = Database::init(db_path.clone())
            .await
            .expect("First init should succeed");
        let db2 = Database::init(db_path.clone())
            .await
            .expect("Second init should succeed");

        db2.health_check().await.expect("Health check should pass");
    }

    #[tokio::test]
    async fn creates_parent_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("nested").join("dirs").join("crm.db");

        let db = Database::init(db_path.clone())
            .await
            .expect("Should create nested directories");

        assert!(db_path.exists());
        db.health_check().await.expect("Health check should pass");
    }

    #[tokio::test]
    async fn insert_and_list_operators_sorted_by_name() {
        let (_temp_dir, db_path) = test_db_path();
        let db = Database::init(db_path).await.expect("init");

        db.insert_operator("Zebra Concessions").await.expect("insert");
        db.insert_operator("Acme Hospitality").await.expect("insert");

        let operators = db.list_operators().await.expect("list");
        assert_eq!(operators.len(), 2);
        assert_eq!(operators[0].name, "Acme Hospitality");
        assert_eq!(operators[1].name, "Zebra Concessions");
    }

    #[tokio::test]
    async fn create_venue_stores_canonical_enum_values() {
        let (_temp_dir, db_path) = test_db_path();
        let db = Database::init(db_path).await.expect("init");

        let operator = db.insert_operator("Acme").await.expect("insert operator");
        let mut new_venue = sample_venue("Test Arena");
        new_venue.stage = PipelineStage::ClosedWon;
        new_venue.venue_type = VenueType::ConventionCenter;
        new_venue.operator_id = Some(operator.id.clone());

        let created = db.create_venue(new_venue).await.expect("create venue");

        let fetched = db
            .get_venue(&created.id)
            .await
            .expect("get venue")
            .expect("venue exists");
        assert_eq!(fetched.stage, "closed_won");
        assert_eq!(fetched.venue_type, "convention_center");
        assert_eq!(fetched.operator_id.as_deref(), Some(operator.id.as_str()));
        assert_eq!(fetched.capacity, Some(1000));
    }

    #[tokio::test]
    async fn create_venue_rejects_unknown_operator() {
        let (_temp_dir, db_path) = test_db_path();
        let db = Database::init(db_path).await.expect("init");

        let mut new_venue = sample_venue("Orphan Hall");
        new_venue.operator_id = Some("does-not-exist".to_string());

        let err = db.create_venue(new_venue).await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)), "got {:?}", err);
        assert!(db.list_venues().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn get_venue_returns_none_for_missing() {
        let (_temp_dir, db_path) = test_db_path();
        let db = Database::init(db_path).await.expect("init");

        let result = db.get_venue("nonexistent").await.expect("Should not error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn contact_links_to_venue_once() {
        let (_temp_dir, db_path) = test_db_path();
        let db = Database::init(db_path).await.expect("init");

        let venue = db.create_venue(sample_venue("Test Arena")).await.expect("venue");
        let contact = db.create_contact(sample_contact("Pat")).await.expect("contact");

        db.link_contact_to_venue(&contact.id, &venue.id, true)
            .await
            .expect("link");
        db.link_contact_to_venue(&contact.id, &venue.id, true)
            .await
            .expect("second link is a no-op");

        let venue_ids = db.venue_ids_for_contact(&contact.id).await.expect("ids");
        assert_eq!(venue_ids, vec![venue.id]);

        let contacts = db.list_contacts().await.expect("list");
        assert_eq!(contacts.len(), 1);
        assert!(contacts[0].is_primary);
    }

    #[tokio::test]
    async fn link_to_missing_venue_fails() {
        let (_temp_dir, db_path) = test_db_path();
        let db = Database::init(db_path).await.expect("init");

        let contact = db.create_contact(sample_contact("Pat")).await.expect("contact");
        let err = db
            .link_contact_to_venue(&contact.id, "missing-venue", false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
    }

    #[tokio::test]
    async fn contact_with_venue_is_created_and_linked() {
        let (_temp_dir, db_path) = test_db_path();
        let db = Database::init(db_path).await.expect("init");

        let venue = db.create_venue(sample_venue("Test Arena")).await.expect("venue");
        let mut new_contact = sample_contact("Pat");
        new_contact.venue_id = Some(venue.id.clone());

        let contact = db.create_contact(new_contact).await.expect("contact");
        let venue_ids = db.venue_ids_for_contact(&contact.id).await.expect("ids");
        assert_eq!(venue_ids, vec![venue.id]);
    }

    #[tokio::test]
    async fn failed_link_rolls_back_contact() {
        let (_temp_dir, db_path) = test_db_path();
        let db = Database::init(db_path).await.expect("init");

        let mut new_contact = sample_contact("Pat");
        new_contact.venue_id = Some("missing-venue".to_string());

        let err = db.create_contact(new_contact).await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert!(db.list_contacts().await.expect("list").is_empty());
    }
}
