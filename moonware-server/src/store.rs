//! Script storage
//!
//! Uploaded scripts live behind the [`ScriptStore`] trait so the HTTP layer
//! does not care where they are kept. [`MemoryStore`] is the only backend;
//! it holds everything in a map and forgets it on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moonware_core::TransformOptions;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// A stored script
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRecord {
    pub id: String,
    /// Transformed source served to clients
    pub content: String,
    /// Source as uploaded
    pub original: String,
    pub options: TransformOptions,
    pub created_at: DateTime<Utc>,
    pub enabled: bool,
    pub access_count: u64,
    /// Byte length of `content`
    pub size: usize,
}

impl ScriptRecord {
    pub fn new(id: String, original: String, content: String, options: TransformOptions) -> Self {
        let size = content.len();
        Self {
            id,
            content,
            original,
            options,
            created_at: Utc::now(),
            enabled: true,
            access_count: 0,
            size,
        }
    }

    pub fn summary(&self) -> ScriptSummary {
        ScriptSummary {
            id: self.id.clone(),
            created_at: self.created_at,
            enabled: self.enabled,
            access_count: self.access_count,
            size: self.size,
        }
    }
}

/// Listing view of a stored script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub enabled: bool,
    pub access_count: u64,
    pub size: usize,
}

/// Error types for script storage
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Script not found: {0}")]
    NotFound(String),

    #[error("Script has been disabled: {0}")]
    Disabled(String),

    #[error("Token limit reached ({max} max)")]
    CapacityReached { max: usize },

    #[error("Script id already in use: {0}")]
    DuplicateId(String),
}

/// Storage backend for uploaded scripts
#[async_trait]
pub trait ScriptStore: Send + Sync {
    /// Store a new record, refusing it once `capacity()` records exist
    async fn insert(&self, record: ScriptRecord) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Option<ScriptRecord>;

    /// Fetch the content of an enabled script and count the access
    async fn record_access(&self, id: &str) -> Result<String, StoreError>;

    async fn remove(&self, id: &str) -> Result<(), StoreError>;

    /// Flip the enabled flag, returning the new value
    async fn toggle(&self, id: &str) -> Result<bool, StoreError>;

    async fn list(&self) -> Vec<ScriptRecord>;

    async fn len(&self) -> usize;

    /// Maximum number of records held at once
    fn capacity(&self) -> usize;
}

/// In-memory store
#[derive(Debug)]
pub struct MemoryStore {
    capacity: usize,
    scripts: RwLock<HashMap<String, ScriptRecord>>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            scripts: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ScriptStore for MemoryStore {
    async fn insert(&self, record: ScriptRecord) -> Result<(), StoreError> {
        let mut scripts = self.scripts.write().await;
        if scripts.len() >= self.capacity {
            return Err(StoreError::CapacityReached { max: self.capacity });
        }
        if scripts.contains_key(&record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }
        scripts.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Option<ScriptRecord> {
        self.scripts.read().await.get(id).cloned()
    }

    async fn record_access(&self, id: &str) -> Result<String, StoreError> {
        let mut scripts = self.scripts.write().await;
        let record = scripts
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if !record.enabled {
            return Err(StoreError::Disabled(id.to_string()));
        }
        record.access_count += 1;
        Ok(record.content.clone())
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.scripts
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn toggle(&self, id: &str) -> Result<bool, StoreError> {
        let mut scripts = self.scripts.write().await;
        let record = scripts
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.enabled = !record.enabled;
        Ok(record.enabled)
    }

    async fn list(&self) -> Vec<ScriptRecord> {
        self.scripts.read().await.values().cloned().collect()
    }

    async fn len(&self) -> usize {
        self.scripts.read().await.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(id: &str) -> ScriptRecord {
        ScriptRecord::new(
            id.to_string(),
            "print(1)".to_string(),
            "-- wrapped\nprint(1)".to_string(),
            TransformOptions::default(),
        )
    }

    #[test]
    fn test_new_record_defaults() {
        let r = record("abc");
        assert!(r.enabled);
        assert_eq!(r.access_count, 0);
        assert_eq!(r.size, "-- wrapped\nprint(1)".len());
    }

    #[test]
    fn test_size_counts_utf8_bytes() {
        let r = ScriptRecord::new("a".into(), String::new(), "☾".into(), TransformOptions::default());
        assert_eq!(r.size, 3);
    }

    #[tokio::test]
    async fn test_capacity_is_enforced() {
        let store = MemoryStore::new(1);
        store.insert(record("a")).await.unwrap();
        let err = store.insert(record("b")).await.unwrap_err();
        assert!(matches!(err, StoreError::CapacityReached { max: 1 }));
        assert_eq!(store.len().await, 1);

        store.remove("a").await.unwrap();
        store.insert(record("b")).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = MemoryStore::new(4);
        store.insert(record("a")).await.unwrap();
        assert!(matches!(
            store.insert(record("a")).await,
            Err(StoreError::DuplicateId(_))
        ));
    }

    #[tokio::test]
    async fn test_record_access_counts_and_respects_toggle() {
        let store = MemoryStore::new(1);
        store.insert(record("a")).await.unwrap();

        assert_eq!(store.record_access("a").await.unwrap(), "-- wrapped\nprint(1)");
        store.record_access("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().access_count, 2);

        assert!(!store.toggle("a").await.unwrap());
        assert!(matches!(
            store.record_access("a").await,
            Err(StoreError::Disabled(_))
        ));
        assert_eq!(store.get("a").await.unwrap().access_count, 2);

        assert!(store.toggle("a").await.unwrap());
        store.record_access("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let store = MemoryStore::new(1);
        assert!(store.get("nope").await.is_none());
        assert!(matches!(store.record_access("nope").await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.remove("nope").await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.toggle("nope").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_inserts_never_exceed_capacity() {
        let store = Arc::new(MemoryStore::new(3));
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert(record(&format!("id{i}"))).await.is_ok()
            }));
        }
        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 3);
        assert_eq!(store.list().await.len(), 3);
    }
}
