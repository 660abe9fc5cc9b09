//! Flat-file history store
//!
//! All records are kept in one JSON array on disk. Every mutation reads the
//! file, applies the change and writes a sibling temp file that is renamed
//! over the original, all while holding a single async mutex.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{record_not_found, HistoryRecord, HistoryStore, NewHistoryRecord, OwnerId};
use crate::types::{PolicyError, Result};

#[derive(Debug)]
pub struct FileHistoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileHistoryStore {
    /// Open (or lazily create) the history file at `path`
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PolicyError::StorageUnavailable(format!(
                    "Cannot create history directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let store = Self {
            path,
            lock: Mutex::new(()),
        };

        // Fail early on an unreadable or corrupt file
        let existing = store.read_all().await?;
        info!(
            path = %store.path.display(),
            records = existing.len(),
            "File history store opened"
        );

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<HistoryRecord>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                PolicyError::StorageUnavailable(format!(
                    "Corrupt history file {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(PolicyError::StorageUnavailable(format!(
                "Cannot read history file {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn write_all(&self, records: &[HistoryRecord]) -> Result<()> {
        let json = serde_json::to_vec_pretty(records)
            .map_err(|e| PolicyError::Internal(format!("Cannot encode history: {}", e)))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let io_err = |e: std::io::Error| {
            PolicyError::StorageUnavailable(format!(
                "Cannot write history file {}: {}",
                self.path.display(),
                e
            ))
        };

        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn append(&self, owner: &OwnerId, record: NewHistoryRecord) -> Result<HistoryRecord> {
        let _guard = self.lock.lock().await;

        let mut records = self.read_all().await?;
        let record = HistoryRecord::create(owner, record);
        records.push(record.clone());
        self.write_all(&records).await?;

        debug!(owner = %owner, id = %record.id, "History record appended");
        Ok(record)
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<HistoryRecord>> {
        let _guard = self.lock.lock().await;

        let records = self.read_all().await?;
        Ok(records
            .into_iter()
            .filter(|r| &r.owner_id == owner)
            .collect())
    }

    async fn delete_by_owner_and_id(&self, owner: &OwnerId, id: &str) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut records = self.read_all().await?;
        let position = records
            .iter()
            .position(|r| r.id == id && &r.owner_id == owner)
            .ok_or_else(record_not_found)?;
        records.remove(position);
        self.write_all(&records).await?;

        debug!(owner = %owner, id, "History record deleted");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.read_all().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Outcome;
    use crate::model::Label;
    use tempfile::TempDir;

    fn new_record(objective: &str, outcome: Option<Outcome>) -> NewHistoryRecord {
        NewHistoryRecord {
            objective: objective.to_string(),
            group: "Movilidad / Infraestructura".to_string(),
            predicted_label: Label::Failure,
            predicted_probability: 12.5,
            actual_outcome: outcome,
        }
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history").join("predicciones.json");
        let owner = OwnerId::new("owner-a");

        let saved = {
            let store = FileHistoryStore::open(&path).await.unwrap();
            store
                .append(&owner, new_record("Ciclovías", None))
                .await
                .unwrap()
        };

        let reopened = FileHistoryStore::open(&path).await.unwrap();
        let listed = reopened.list_by_owner(&owner).await.unwrap();
        assert_eq!(listed, vec![saved]);
        assert_eq!(listed[0].actual_outcome, None);
    }

    #[tokio::test]
    async fn test_delete_enforces_ownership() {
        let dir = TempDir::new().unwrap();
        let store = FileHistoryStore::open(dir.path().join("h.json")).await.unwrap();
        let a = OwnerId::new("a");
        let b = OwnerId::new("b");

        let record = store
            .append(&b, new_record("Peatonalizar", Some(Outcome::Unknown)))
            .await
            .unwrap();

        assert!(matches!(
            store.delete_by_owner_and_id(&a, &record.id).await,
            Err(PolicyError::NotFound(_))
        ));
        assert_eq!(store.list_by_owner(&b).await.unwrap().len(), 1);

        store.delete_by_owner_and_id(&b, &record.id).await.unwrap();
        assert!(store.list_by_owner(&b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("h.json");
        std::fs::write(&path, b"{ not json").unwrap();

        assert!(matches!(
            FileHistoryStore::open(&path).await,
            Err(PolicyError::StorageUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(
            FileHistoryStore::open(dir.path().join("h.json")).await.unwrap(),
        );
        let owner = OwnerId::new("busy");

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let owner = owner.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append(&owner, new_record(&format!("política {}", i), None))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.list_by_owner(&owner).await.unwrap().len(), 8);
    }
}
