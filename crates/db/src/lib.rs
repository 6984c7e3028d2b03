//! Keyed record storage for shelf modules.
//!
//! A [`RecordStore`] holds serde-serialisable records keyed by an `i64` id
//! that the store allocates on first save. Two engines are provided:
//! [`MemoryStore`] for tests and throwaway runs, and [`DurableStore`] backed
//! by a single redb file.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use shelf_kernel::settings::{DatabaseSettings, StoreBackend};

mod durable;
mod error;
mod memory;

pub use durable::DurableStore;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;

/// Identifier assigned to a record by its store.
pub type RecordId = i64;

/// A value that can live in a [`RecordStore`].
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Id assigned by the store, if the record has been saved.
    fn id(&self) -> Option<RecordId>;

    /// Return the record carrying `id`.
    fn with_id(self, id: RecordId) -> Self;
}

/// Predicate used by [`RecordStore::find_where`].
pub type Filter<'a, R> = &'a (dyn Fn(&R) -> bool + Send + Sync);

/// CRUD contract shared by all storage engines.
///
/// Every call is its own transaction. Sequences are returned in ascending id
/// order.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Insert a record without an id under a freshly allocated one, or
    /// replace the record stored under the record's id.
    async fn save(&self, record: R) -> StoreResult<R>;

    async fn find_by_id(&self, id: RecordId) -> StoreResult<Option<R>>;

    async fn find_all(&self) -> StoreResult<Vec<R>>;

    async fn exists_by_id(&self, id: RecordId) -> StoreResult<bool>;

    /// Remove the record; a missing id is not an error.
    async fn delete_by_id(&self, id: RecordId) -> StoreResult<()>;

    async fn find_where(&self, predicate: Filter<'_, R>) -> StoreResult<Vec<R>>;
}

/// Open the store for `table` on the engine selected in settings.
pub fn open<R: Record>(
    settings: &DatabaseSettings,
    table: &'static str,
) -> StoreResult<Arc<dyn RecordStore<R>>> {
    match settings.backend {
        StoreBackend::Memory => {
            tracing::info!(target: "shelf-db", table, "opening in-memory store");
            Ok(Arc::new(MemoryStore::<R>::new()))
        }
        StoreBackend::Redb => {
            tracing::info!(
                target: "shelf-db",
                table,
                path = %settings.path.display(),
                "opening redb store"
            );
            Ok(Arc::new(DurableStore::<R>::open(&settings.path, table)?))
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use serde::{Deserialize, Serialize};

    use super::{Record, RecordId};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Note {
        pub id: Option<RecordId>,
        pub body: String,
    }

    impl Note {
        pub fn new(body: &str) -> Self {
            Self {
                id: None,
                body: body.to_string(),
            }
        }
    }

    impl Record for Note {
        fn id(&self) -> Option<RecordId> {
            self.id
        }

        fn with_id(self, id: RecordId) -> Self {
            Self { id: Some(id), ..self }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Note;
    use super::*;

    #[tokio::test]
    async fn open_memory_backend() {
        let store = open::<Note>(&DatabaseSettings::in_memory(), "notes").unwrap();
        let saved = store.save(Note::new("hello")).await.unwrap();
        assert_eq!(saved.id, Some(1));
    }

    #[tokio::test]
    async fn open_redb_backend_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = DatabaseSettings {
            backend: StoreBackend::Redb,
            path: dir.path().join("nested").join("shelf.redb"),
        };
        let store = open::<Note>(&settings, "notes").unwrap();
        store.save(Note::new("hello")).await.unwrap();
        assert!(settings.path.exists());
    }
}
