use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Filter, Record, RecordId, RecordStore, StoreResult};

struct Table<R> {
    rows: BTreeMap<RecordId, R>,
    last_id: RecordId,
}

/// Process-local store; contents live as long as the value does.
pub struct MemoryStore<R> {
    table: RwLock<Table<R>>,
}

impl<R> MemoryStore<R> {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table {
                rows: BTreeMap::new(),
                last_id: 0,
            }),
        }
    }
}

impl<R> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for MemoryStore<R> {
    async fn save(&self, record: R) -> StoreResult<R> {
        let mut table = self.table.write().await;
        let id = match record.id() {
            Some(id) => id,
            None => table.last_id + 1,
        };
        table.last_id = table.last_id.max(id);

        let record = record.with_id(id);
        table.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: RecordId) -> StoreResult<Option<R>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<R>> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn exists_by_id(&self, id: RecordId) -> StoreResult<bool> {
        Ok(self.table.read().await.rows.contains_key(&id))
    }

    async fn delete_by_id(&self, id: RecordId) -> StoreResult<()> {
        self.table.write().await.rows.remove(&id);
        Ok(())
    }

    async fn find_where(&self, predicate: Filter<'_, R>) -> StoreResult<Vec<R>> {
        Ok(self
            .table
            .read()
            .await
            .rows
            .values()
            .filter(|record| predicate(*record))
            .cloned()
            .collect())
    }
}
