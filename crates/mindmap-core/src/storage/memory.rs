//! In-process store backend.
//!
//! Keeps every key in a `HashMap` behind a single mutex, so each trait call
//! is atomic with respect to every other call. Expiry is checked lazily on
//! access using `tokio::time::Instant`, which lets tests drive TTLs with a
//! paused clock.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::storage::KeyValueStore;

enum Value {
    Str(String),
    Hash(BTreeMap<String, String>),
}

struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Slot>>,
}

fn wrong_type(key: &str) -> Error {
    Error::Storage(format!(
        "WRONGTYPE operation against key '{key}' holding the wrong kind of value"
    ))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock().values().filter(|s| s.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drop `key` if it has expired, then return the live slot, if any.
fn live_slot<'a>(entries: &'a mut HashMap<String, Slot>, key: &str) -> Option<&'a mut Slot> {
    let now = Instant::now();
    if entries.get(key).is_some_and(|s| !s.is_live(now)) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

/// Borrow the hash at `key`, creating it when absent.
fn hash_mut<'a>(
    entries: &'a mut HashMap<String, Slot>,
    key: &str,
) -> Result<&'a mut BTreeMap<String, String>> {
    if live_slot(entries, key).is_none() {
        entries.insert(
            key.to_string(),
            Slot {
                value: Value::Hash(BTreeMap::new()),
                expires_at: None,
            },
        );
    }
    match entries.get_mut(key).map(|s| &mut s.value) {
        Some(Value::Hash(map)) => Ok(map),
        _ => Err(wrong_type(key)),
    }
}

fn hash_ref<'a>(
    entries: &'a mut HashMap<String, Slot>,
    key: &str,
) -> Result<Option<&'a BTreeMap<String, String>>> {
    match live_slot(entries, key).map(|s| &s.value) {
        None => Ok(None),
        Some(Value::Hash(map)) => Ok(Some(map)),
        Some(Value::Str(_)) => Err(wrong_type(key)),
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.lock();
        match live_slot(&mut entries, key).map(|s| &s.value) {
            None => Ok(None),
            Some(Value::Str(v)) => Ok(Some(v.clone())),
            Some(Value::Hash(_)) => Err(wrong_type(key)),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.lock().insert(
            key.to_string(),
            Slot {
                value: Value::Str(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.lock();
        let now = Instant::now();
        Ok(entries.remove(key).is_some_and(|s| s.is_live(now)))
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut entries = self.lock();
        let now = Instant::now();
        entries.retain(|_, s| s.is_live(now));
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut entries = self.lock();
        Ok(hash_ref(&mut entries, key)?.and_then(|m| m.get(field).cloned()))
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut entries = self.lock();
        hash_mut(&mut entries, key)?.insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_set_many(&self, key: &str, fields: &[(&str, &str)]) -> Result<()> {
        let mut entries = self.lock();
        let map = hash_mut(&mut entries, key)?;
        for (field, value) in fields {
            map.insert(field.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<BTreeMap<String, String>> {
        let mut entries = self.lock();
        Ok(hash_ref(&mut entries, key)?.cloned().unwrap_or_default())
    }

    async fn hash_len(&self, key: &str) -> Result<usize> {
        let mut entries = self.lock();
        Ok(hash_ref(&mut entries, key)?.map_or(0, |m| m.len()))
    }

    async fn hash_delete_field(&self, key: &str, field: &str) -> Result<bool> {
        let mut entries = self.lock();
        let removed = match live_slot(&mut entries, key) {
            None => return Ok(false),
            Some(Slot {
                value: Value::Hash(map),
                ..
            }) => (map.remove(field).is_some(), map.is_empty()),
            Some(_) => return Err(wrong_type(key)),
        };
        // An emptied hash stops existing, as in Redis.
        if removed.1 {
            entries.remove(key);
        }
        Ok(removed.0)
    }

    async fn hash_set_if_len_below(
        &self,
        key: &str,
        field: &str,
        value: &str,
        max_len: usize,
    ) -> Result<bool> {
        let mut entries = self.lock();
        if hash_ref(&mut entries, key)?.map_or(0, |m| m.len()) >= max_len {
            return Ok(false);
        }
        hash_mut(&mut entries, key)?.insert(field.to_string(), value.to_string());
        Ok(true)
    }
}
