//! Shared content cache for generated diagrams.
//!
//! Entries are keyed by the normalized `(topic, map type)` pair and expire
//! through the store's own TTL. The cache is shared by all users: any user
//! asking for the same topic and map type reuses the stored source.

use std::sync::Arc;
use std::time::Duration;

use crate::config::CACHE_TTL_SECONDS;
use crate::error::Result;
use crate::keys;
use crate::model::mindmap::{CachedDiagram, CachedMapKey};
use crate::storage::KeyValueStore;

pub struct ContentCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl ContentCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(CACHE_TTL_SECONDS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Store diagram source for a topic and map type, replacing any live entry.
    pub async fn put(&self, topic: &str, map_type: &str, source: &str) -> Result<()> {
        let key = keys::cache_key(topic, map_type);
        let value = serde_json::to_string(&CachedDiagram {
            mermaid: source.to_string(),
        })?;
        self.store.set_with_ttl(&key, &value, self.ttl).await
    }

    /// Look up cached diagram source.
    ///
    /// An entry that does not decode is reported as a miss and left in place.
    pub async fn get(&self, topic: &str, map_type: &str) -> Result<Option<String>> {
        let key = keys::cache_key(topic, map_type);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<CachedDiagram>(&raw) {
            Ok(entry) => Ok(Some(entry.mermaid)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to decode cached map, treating as miss");
                Ok(None)
            }
        }
    }

    /// Delete the entry for a topic and map type. Returns whether one existed.
    pub async fn remove(&self, topic: &str, map_type: &str) -> Result<bool> {
        let key = keys::cache_key(topic, map_type);
        let removed = self.store.delete(&key).await?;
        if !removed {
            tracing::debug!(key = %key, "cache key not found");
        }
        Ok(removed)
    }

    /// All live entries whose key parses as `mindmap:{topic}:{type}`.
    pub async fn list_all(&self) -> Result<Vec<CachedMapKey>> {
        let keys = self.store.scan_prefix(keys::CACHE_PREFIX).await?;
        Ok(keys
            .iter()
            .filter_map(|k| keys::parse_cache_key(k))
            .map(|(topic, map_type)| CachedMapKey { topic, map_type })
            .collect())
    }
}
