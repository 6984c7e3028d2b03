//! ACID-durable record store backed by redb.
//!
//! Records are stored as JSON bytes keyed by id. Ids come from a per-table
//! counter in the `sequences` table so they are never handed out twice, even
//! after the highest record is deleted.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};

use crate::error::StoreError;
use crate::{Filter, Record, RecordId, RecordStore, StoreResult};

/// Table name → last allocated id.
const SEQUENCES: TableDefinition<&str, RecordId> = TableDefinition::new("sequences");

type Rows = TableDefinition<'static, RecordId, &'static [u8]>;

fn rows(table: &'static str) -> Rows {
    TableDefinition::new(table)
}

/// Record store living in a single redb file.
///
/// redb is a blocking engine, so every call runs on the blocking pool.
pub struct DurableStore<R> {
    db: Arc<Database>,
    table: &'static str,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> DurableStore<R> {
    /// Open or create the database file and make sure `table` exists.
    pub fn open(path: &Path, table: &'static str) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let db = Database::create(path).map_err(redb::Error::from)?;
        prepare(&db, table)?;

        Ok(Self {
            db: Arc::new(db),
            table,
            _record: PhantomData,
        })
    }

    async fn blocking<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database, Rows) -> Result<T, redb::Error> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let table = rows(self.table);
        let result = tokio::task::spawn_blocking(move || op(&*db, table)).await?;
        Ok(result?)
    }
}

fn prepare(db: &Database, table: &'static str) -> Result<(), redb::Error> {
    let txn = db.begin_write()?;
    txn.open_table(rows(table))?;
    txn.open_table(SEQUENCES)?;
    txn.commit()?;
    Ok(())
}

fn decode<R: Record>(id: RecordId, bytes: &[u8]) -> StoreResult<R> {
    Ok(serde_json::from_slice::<R>(bytes)?.with_id(id))
}

#[async_trait]
impl<R: Record> RecordStore<R> for DurableStore<R> {
    async fn save(&self, record: R) -> StoreResult<R> {
        let bytes = serde_json::to_vec(&record)?;
        let requested = record.id();
        let sequence = self.table;

        let id = self
            .blocking(move |db, table| {
                let txn = db.begin_write()?;
                let id = {
                    let mut sequences = txn.open_table(SEQUENCES)?;
                    let last = sequences
                        .get(sequence)?
                        .map(|guard| guard.value())
                        .unwrap_or(0);
                    let id = requested.unwrap_or(last + 1);
                    if id > last {
                        sequences.insert(sequence, id)?;
                    }

                    let mut records = txn.open_table(table)?;
                    records.insert(id, bytes.as_slice())?;
                    id
                };
                txn.commit()?;
                Ok(id)
            })
            .await?;

        Ok(record.with_id(id))
    }

    async fn find_by_id(&self, id: RecordId) -> StoreResult<Option<R>> {
        let bytes = self
            .blocking(move |db, table| {
                let txn = db.begin_read()?;
                let records = txn.open_table(table)?;
                let found = records.get(id)?.map(|guard| guard.value().to_vec());
                Ok(found)
            })
            .await?;

        bytes.map(|bytes| decode(id, &bytes)).transpose()
    }

    async fn find_all(&self) -> StoreResult<Vec<R>> {
        let entries = self
            .blocking(|db, table| {
                let txn = db.begin_read()?;
                let records = txn.open_table(table)?;
                let mut entries = Vec::new();
                for entry in records.iter()? {
                    let (key, value) = entry?;
                    entries.push((key.value(), value.value().to_vec()));
                }
                Ok(entries)
            })
            .await?;

        entries
            .into_iter()
            .map(|(id, bytes)| decode(id, &bytes))
            .collect()
    }

    async fn exists_by_id(&self, id: RecordId) -> StoreResult<bool> {
        self.blocking(move |db, table| {
            let txn = db.begin_read()?;
            let records = txn.open_table(table)?;
            let exists = records.get(id)?.is_some();
            Ok(exists)
        })
        .await
    }

    async fn delete_by_id(&self, id: RecordId) -> StoreResult<()> {
        self.blocking(move |db, table| {
            let txn = db.begin_write()?;
            {
                let mut records = txn.open_table(table)?;
                records.remove(id)?;
            }
            txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn find_where(&self, predicate: Filter<'_, R>) -> StoreResult<Vec<R>> {
        let mut records = self.find_all().await?;
        records.retain(|record| predicate(record));
        Ok(records)
    }
}

impl<R> std::fmt::Debug for DurableStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore")
            .field("table", &self.table)
            .finish()
    }
}
