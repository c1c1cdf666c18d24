//! Per-user ledger of generated mind maps with quota enforcement.
//!
//! Each user's records live in the `user:{email}:mindmaps` hash. The number of
//! records is capped by the `limit` field of the user's profile hash, which an
//! administrator may change at any time, so it is re-read on every insert.

use std::sync::Arc;

use crate::config::DEFAULT_MAP_LIMIT;
use crate::error::{Error, Result};
use crate::keys;
use crate::model::mindmap::MindMapRecord;
use crate::model::user::{fields, parse_limit};
use crate::model::utc_now_iso;
use crate::storage::KeyValueStore;

pub struct UserMapLedger {
    store: Arc<dyn KeyValueStore>,
    default_limit: usize,
}

impl UserMapLedger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            default_limit: DEFAULT_MAP_LIMIT,
        }
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    /// Configured ledger limit for a user, or the default when unset.
    pub async fn get_limit(&self, email: &str) -> Result<usize> {
        let raw = self
            .store
            .hash_get(&keys::user_key(email), fields::LIMIT)
            .await?;
        Ok(raw
            .as_deref()
            .and_then(parse_limit)
            .unwrap_or(self.default_limit))
    }

    pub async fn set_limit(&self, email: &str, limit: usize) -> Result<()> {
        self.store
            .hash_set(&keys::user_key(email), fields::LIMIT, &limit.to_string())
            .await
    }

    /// Add a record to the user's ledger.
    ///
    /// Fails with [`Error::QuotaExceeded`] without writing anything when the
    /// ledger already holds `limit` records.
    pub async fn insert(&self, email: &str, record: &MindMapRecord) -> Result<()> {
        let limit = self.get_limit(email).await?;
        let key = keys::ledger_key(email);
        let value = serde_json::to_string(record)?;
        let stored = self
            .store
            .hash_set_if_len_below(&key, &record.id, &value, limit)
            .await?;
        if !stored {
            let used = self.store.hash_len(&key).await?;
            tracing::info!(user = %email, used, limit, "mind map limit reached");
            return Err(Error::QuotaExceeded { used, limit });
        }
        tracing::debug!(user = %email, map_id = %record.id, "mind map recorded");
        Ok(())
    }

    /// Stamp the user's `last_active` field with the current time.
    pub async fn update_last_activity(&self, email: &str) -> Result<()> {
        self.store
            .hash_set(&keys::user_key(email), fields::LAST_ACTIVE, &utc_now_iso())
            .await
    }

    pub async fn count(&self, email: &str) -> Result<usize> {
        self.store.hash_len(&keys::ledger_key(email)).await
    }

    /// The user's records, newest first. Records that fail to decode are skipped.
    pub async fn list(&self, email: &str) -> Result<Vec<MindMapRecord>> {
        let entries = self.store.hash_get_all(&keys::ledger_key(email)).await?;
        let mut records: Vec<MindMapRecord> = entries
            .iter()
            .filter_map(|(id, raw)| match serde_json::from_str(raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(user = %email, map_id = %id, error = %e, "skipping undecodable ledger entry");
                    None
                }
            })
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Drop every record of the user. Returns whether the ledger existed.
    pub async fn reset(&self, email: &str) -> Result<bool> {
        self.store.delete(&keys::ledger_key(email)).await
    }
}
