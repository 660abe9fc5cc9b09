//! In-memory history store
//!
//! Records live in a single vector behind an async `RwLock`, so insertion
//! order is the listing order and append/delete never interleave.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{record_not_found, HistoryRecord, HistoryStore, NewHistoryRecord, OwnerId};
use crate::types::Result;

#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: RwLock<Vec<HistoryRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records across all owners
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn append(&self, owner: &OwnerId, record: NewHistoryRecord) -> Result<HistoryRecord> {
        let record = HistoryRecord::create(owner, record);
        self.records.write().await.push(record.clone());
        debug!(owner = %owner, id = %record.id, "History record appended");
        Ok(record)
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<HistoryRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| &r.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn delete_by_owner_and_id(&self, owner: &OwnerId, id: &str) -> Result<()> {
        let mut records = self.records.write().await;
        let position = records
            .iter()
            .position(|r| r.id == id && &r.owner_id == owner)
            .ok_or_else(record_not_found)?;
        records.remove(position);
        debug!(owner = %owner, id, "History record deleted");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
