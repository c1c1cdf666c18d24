pub mod duckdb;
pub mod memory;
pub mod migrations;

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::Result;

/// Shared key-value store with plain string keys, field-map (hash) keys and
/// per-key expiration.
///
/// A key holds either a string value or a hash, never both. Every component
/// that touches persistent state receives an `Arc<dyn KeyValueStore>`; there
/// is no process-global handle.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    // String keys
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Remove a key of either kind. Returns `true` only if a live key was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Live keys (string or hash) starting with `prefix`, in lexical order.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    // Hash keys
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>>;
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()>;
    async fn hash_set_many(&self, key: &str, fields: &[(&str, &str)]) -> Result<()>;
    async fn hash_get_all(&self, key: &str) -> Result<BTreeMap<String, String>>;
    async fn hash_len(&self, key: &str) -> Result<usize>;
    async fn hash_delete_field(&self, key: &str, field: &str) -> Result<bool>;

    /// Atomically write `field` into the hash at `key` only if the hash holds
    /// fewer than `max_len` fields. Returns `false` (and writes nothing) when
    /// the hash is already full.
    ///
    /// The length check and the write must not be observable separately by a
    /// concurrent caller.
    async fn hash_set_if_len_below(
        &self,
        key: &str,
        field: &str,
        value: &str,
        max_len: usize,
    ) -> Result<bool>;
}
