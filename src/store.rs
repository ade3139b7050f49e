//! Snippet versions per entity. Versions are dense: the first save of an
//! entity is version 1 and every later save is the latest plus one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{CanvasError, CanvasResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetRecord {
    pub id: Uuid,
    pub entity_id: String,
    pub version: u32,
    pub snippet: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// Highest version of the entity, if it has any.
    async fn get_latest(&self, entity_id: &str) -> CanvasResult<Option<SnippetRecord>>;

    async fn get_version(&self, entity_id: &str, version: u32) -> CanvasResult<Option<SnippetRecord>>;

    /// Version numbers of the entity, ascending.
    async fn list_versions(&self, entity_id: &str) -> CanvasResult<Vec<u32>>;

    async fn save_new_version(&self, entity_id: &str, snippet: &str) -> CanvasResult<SnippetRecord>;
}

/// In-process store. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemorySnippetStore {
    records: Arc<DashMap<String, Vec<SnippetRecord>>>,
}

impl MemorySnippetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities with at least one version.
    pub fn entity_count(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl SnippetStore for MemorySnippetStore {
    async fn get_latest(&self, entity_id: &str) -> CanvasResult<Option<SnippetRecord>> {
        Ok(self
            .records
            .get(entity_id)
            .and_then(|versions| versions.last().cloned()))
    }

    async fn get_version(&self, entity_id: &str, version: u32) -> CanvasResult<Option<SnippetRecord>> {
        Ok(self.records.get(entity_id).and_then(|versions| {
            versions.iter().find(|r| r.version == version).cloned()
        }))
    }

    async fn list_versions(&self, entity_id: &str) -> CanvasResult<Vec<u32>> {
        Ok(self
            .records
            .get(entity_id)
            .map(|versions| versions.iter().map(|r| r.version).collect())
            .unwrap_or_default())
    }

    async fn save_new_version(&self, entity_id: &str, snippet: &str) -> CanvasResult<SnippetRecord> {
        if entity_id.trim().is_empty() {
            return Err(CanvasError::Persistence("entity id is required".to_string()));
        }
        if snippet.trim().is_empty() {
            return Err(CanvasError::Persistence("snippet is required".to_string()));
        }

        // the entry guard holds the shard lock, so concurrent saves never share a version
        let mut versions = self.records.entry(entity_id.to_string()).or_default();
        let version = versions.last().map(|r| r.version + 1).unwrap_or(1);
        let record = SnippetRecord {
            id: Uuid::new_v4(),
            entity_id: entity_id.to_string(),
            version,
            snippet: snippet.to_string(),
            created_at: Utc::now(),
        };
        versions.push(record.clone());
        drop(versions);

        info!(entity_id, version, "saved snippet version");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn versions_count_up_from_one() {
        let store = MemorySnippetStore::new();
        assert!(store.get_latest("E").await.unwrap().is_none());

        let first = store.save_new_version("E", "<p>a</p>").await.unwrap();
        let second = store.save_new_version("E", "<p>b</p>").await.unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
        assert_ne!(first.id, second.id);

        assert_eq!(store.list_versions("E").await.unwrap(), vec![1, 2]);
        assert_eq!(store.get_latest("E").await.unwrap().unwrap().snippet, "<p>b</p>");
        assert_eq!(store.get_version("E", 1).await.unwrap().unwrap().snippet, "<p>a</p>");
        assert!(store.get_version("E", 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn entities_are_independent() {
        let store = MemorySnippetStore::new();
        store.save_new_version("a", "<p>1</p>").await.unwrap();
        let other = store.save_new_version("b", "<p>1</p>").await.unwrap();
        assert_eq!(other.version, 1);
        assert_eq!(store.entity_count(), 2);
        assert!(store.list_versions("c").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_missing_fields() {
        let store = MemorySnippetStore::new();
        let err = store.save_new_version("", "<p/>").await.unwrap_err();
        assert!(matches!(err, CanvasError::Persistence(_)));
        assert!(store.save_new_version("E", "  ").await.is_err());
        assert_eq!(store.entity_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_get_distinct_versions() {
        let store = MemorySnippetStore::new();
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .save_new_version("E", &format!("<p>{}</p>", i))
                    .await
                    .unwrap()
                    .version
            }));
        }
        let mut versions = Vec::new();
        for handle in handles {
            versions.push(handle.await.unwrap());
        }
        versions.sort_unstable();
        assert_eq!(versions, (1..=16).collect::<Vec<u32>>());
    }

    #[test]
    fn record_wire_names() {
        let record = SnippetRecord {
            id: Uuid::nil(),
            entity_id: "E".to_string(),
            version: 1,
            snippet: "<p/>".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["entityId"], "E");
        assert!(json.get("createdAt").is_some());
    }
}
