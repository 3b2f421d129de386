//! Entity writer: persists one validated row.

use crate::error::AppError;
use crate::import::store::EntityStoreOps;
use crate::storage::{ImportRowError, NewContact, NewVenue};

/// A row that passed validation and is ready to write.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedRow {
    Venue(NewVenue),
    Contact(NewContact),
}

/// Writes one row and returns the created entity's id.
///
/// Any store failure becomes a `general` row error carrying the store's
/// message. A contact and its venue link are written together, so a failed
/// link leaves no contact behind.
pub async fn write_row<S>(
    store: &S,
    row_number: u64,
    row: ValidatedRow,
) -> Result<String, ImportRowError>
where
    S: EntityStoreOps + ?Sized,
{
    match row {
        ValidatedRow::Venue(venue) => store
            .create_venue(venue)
            .await
            .map(|v| v.id)
            .map_err(|e| ImportRowError::write(row_number, store_message(e))),
        ValidatedRow::Contact(contact) => store
            .create_contact(contact)
            .await
            .map(|c| c.id)
            .map_err(|e| ImportRowError::write(row_number, store_message(e))),
    }
}

fn store_message(e: AppError) -> String {
    match e {
        AppError::Store(msg) | AppError::NotFound(msg) => msg,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::store::DatabaseStore;
    use crate::storage::{Database, ErrorOrigin};
    use crate::validation::{PipelineStage, VenueStatus, VenueType};
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn test_store() -> (TempDir, Arc<Database>, DatabaseStore) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Arc::new(
            Database::init(temp_dir.path().join("test.db"))
                .await
                .expect("Failed to init database"),
        );
        let store = DatabaseStore::new(db.clone());
        (temp_dir, db, store)
    }

    fn venue(name: &str, operator_id: Option<&str>) -> NewVenue {
        NewVenue {
            name: name.to_string(),
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            venue_type: VenueType::Arena,
            capacity: None,
            stage: PipelineStage::Lead,
            status: VenueStatus::Prospect,
            deal_value: None,
            operator_id: operator_id.map(str::to_string),
            notes: None,
        }
    }

    fn contact(venue_id: Option<&str>) -> NewContact {
        NewContact {
            name: "Ann Lee".to_string(),
            email: "ann@example.com".to_string(),
            phone: None,
            role: None,
            is_primary: true,
            linked_in: None,
            venue_id: venue_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn writes_venue() {
        let (_temp_dir, db, store) = test_store().await;

        let id = write_row(&store, 2, ValidatedRow::Venue(venue("Arena", None)))
            .await
            .unwrap();

        let stored = db.get_venue(&id).await.unwrap().expect("venue exists");
        assert_eq!(stored.name, "Arena");
    }

    #[tokio::test]
    async fn store_rejection_becomes_general_write_error() {
        let (_temp_dir, _db, store) = test_store().await;

        let err = write_row(&store, 5, ValidatedRow::Venue(venue("Arena", Some("no-such-op"))))
            .await
            .unwrap_err();

        assert_eq!(err.row_number, 5);
        assert_eq!(err.field, "general");
        assert_eq!(err.origin, ErrorOrigin::Write);
        assert!(!err.message.is_empty());
    }

    #[tokio::test]
    async fn contact_is_linked_to_resolved_venue() {
        let (_temp_dir, db, store) = test_store().await;
        let venue_id = write_row(&store, 2, ValidatedRow::Venue(venue("Arena", None)))
            .await
            .unwrap();

        let contact_id = write_row(&store, 2, ValidatedRow::Contact(contact(Some(&venue_id))))
            .await
            .unwrap();

        let linked = db.venue_ids_for_contact(&contact_id).await.unwrap();
        assert_eq!(linked, vec![venue_id]);
    }

    #[tokio::test]
    async fn failed_link_is_a_row_error_and_creates_nothing() {
        let (_temp_dir, db, store) = test_store().await;

        let err = write_row(&store, 9, ValidatedRow::Contact(contact(Some("gone"))))
            .await
            .unwrap_err();

        assert_eq!(err.row_number, 9);
        assert_eq!(err.field, "general");
        assert!(db.list_contacts().await.unwrap().is_empty());
    }
}
