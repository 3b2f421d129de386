//! Reference resolver: name-to-id lookups built once per job.

use std::collections::HashMap;

use tracing::debug;

use crate::error::AppError;
use crate::import::store::{EntityStoreOps, NamedRef};
use crate::storage::ImportKind;

/// Case-insensitive entity name to id map.
///
/// Holds operators for venue imports and venues for contact imports. Read-only
/// once built; a job never refreshes it mid-run.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    ids: HashMap<String, String>,
}

impl ReferenceTable {
    /// Builds a table from name/id pairs. When two entities share a name the
    /// first one listed wins.
    pub fn from_refs(refs: impl IntoIterator<Item = NamedRef>) -> Self {
        let mut ids = HashMap::new();
        for r in refs {
            ids.entry(lookup_key(&r.name)).or_insert(r.id);
        }
        Self { ids }
    }

    /// Resolves a display name to an entity id.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.ids.get(&lookup_key(name)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

fn lookup_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Loads the lookup table the given import kind references, in a single store read.
pub async fn load_reference_table<S>(store: &S, kind: ImportKind) -> Result<ReferenceTable, AppError>
where
    S: EntityStoreOps + ?Sized,
{
    let refs = match kind {
        ImportKind::Venues => store.list_operators_by_name().await?,
        ImportKind::Contacts => store.list_venues_by_name().await?,
    };

    let table = ReferenceTable::from_refs(refs);
    debug!(
        "[IMPORT] Loaded {} reference names for {} import",
        table.len(),
        kind.as_str()
    );
    Ok(table)
}
