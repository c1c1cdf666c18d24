use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::storage::KeyValueStore;

/// Durable store backend on an embedded DuckDB database.
///
/// String keys live in `kv_strings` with an absolute `expires_at`
/// (epoch milliseconds); hash keys live one row per field in `kv_hashes`.
/// Expired rows are filtered on read and purged lazily on write.
pub struct DuckDbStore {
    conn: Arc<Mutex<duckdb::Connection>>,
}

impl DuckDbStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = duckdb::Connection::open(path)?;
        super::migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = duckdb::Connection::open_in_memory()?;
        super::migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Delete every expired string key. Returns the number of rows removed.
    pub async fn purge_expired(&self) -> Result<usize> {
        let conn = self.conn.lock().await;
        let removed = conn.execute(
            "DELETE FROM kv_strings WHERE expires_at IS NOT NULL AND expires_at <= ?",
            duckdb::params![now_millis()],
        )?;
        Ok(removed)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn wrong_type(key: &str) -> Error {
    Error::Storage(format!(
        "WRONGTYPE operation against key '{key}' holding the wrong kind of value"
    ))
}

fn live_string(conn: &duckdb::Connection, key: &str, now: i64) -> Result<Option<String>> {
    let mut stmt = conn.prepare(
        "SELECT value FROM kv_strings WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)",
    )?;
    let result = stmt.query_row(duckdb::params![key, now], |row| row.get::<_, String>(0));
    match result {
        Ok(value) => Ok(Some(value)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::Storage(e.to_string())),
    }
}

fn hash_field_count(conn: &duckdb::Connection, key: &str) -> Result<usize> {
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM kv_hashes WHERE key = ?")?;
    let count: i64 = stmt.query_row(duckdb::params![key], |row| row.get(0))?;
    Ok(count as usize)
}

/// Fail when `key` currently holds a string; drop it when that string expired.
fn claim_for_hash(conn: &duckdb::Connection, key: &str, now: i64) -> Result<()> {
    if live_string(conn, key, now)?.is_some() {
        return Err(wrong_type(key));
    }
    conn.execute("DELETE FROM kv_strings WHERE key = ?", duckdb::params![key])?;
    Ok(())
}

fn upsert_field(conn: &duckdb::Connection, key: &str, field: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO kv_hashes (key, field, value) VALUES (?, ?, ?)",
        duckdb::params![key, field, value],
    )?;
    Ok(())
}

#[async_trait::async_trait]
impl KeyValueStore for DuckDbStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let value = live_string(&conn, key, now_millis())?;
        if value.is_none() && hash_field_count(&conn, key)? > 0 {
            return Err(wrong_type(key));
        }
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let expires_at = now_millis().saturating_add(ttl.as_millis() as i64);
        let tx = conn.transaction()?;
        // SET replaces a key of any kind.
        tx.execute("DELETE FROM kv_hashes WHERE key = ?", duckdb::params![key])?;
        tx.execute(
            "INSERT OR REPLACE INTO kv_strings (key, value, expires_at) VALUES (?, ?, ?)",
            duckdb::params![key, value, expires_at],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let existed = live_string(&tx, key, now_millis())?.is_some()
            || hash_field_count(&tx, key)? > 0;
        tx.execute("DELETE FROM kv_strings WHERE key = ?", duckdb::params![key])?;
        tx.execute("DELETE FROM kv_hashes WHERE key = ?", duckdb::params![key])?;
        tx.commit()?;
        Ok(existed)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT key FROM kv_strings WHERE starts_with(key, ?) AND (expires_at IS NULL OR expires_at > ?) \
             UNION \
             SELECT DISTINCT key FROM kv_hashes WHERE starts_with(key, ?) \
             ORDER BY key",
        )?;
        let rows = stmt.query_map(duckdb::params![prefix, now_millis(), prefix], |row| {
            row.get::<_, String>(0)
        })?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row.map_err(|e| Error::Storage(e.to_string()))?);
        }
        Ok(keys)
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT value FROM kv_hashes WHERE key = ? AND field = ?")?;
        let result = stmt.query_row(duckdb::params![key, field], |row| row.get::<_, String>(0));
        match result {
            Ok(value) => Ok(Some(value)),
            Err(duckdb::Error::QueryReturnedNoRows) => {
                if live_string(&conn, key, now_millis())?.is_some() {
                    return Err(wrong_type(key));
                }
                Ok(None)
            }
            Err(e) => Err(Error::Storage(e.to_string())),
        }
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.hash_set_many(key, &[(field, value)]).await
    }

    async fn hash_set_many(&self, key: &str, fields: &[(&str, &str)]) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        claim_for_hash(&tx, key, now_millis())?;
        for (field, value) in fields {
            upsert_field(&tx, key, field, value)?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<BTreeMap<String, String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT field, value FROM kv_hashes WHERE key = ?")?;
        let rows = stmt.query_map(duckdb::params![key], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut map = BTreeMap::new();
        for row in rows {
            let (field, value) = row.map_err(|e| Error::Storage(e.to_string()))?;
            map.insert(field, value);
        }
        if map.is_empty() && live_string(&conn, key, now_millis())?.is_some() {
            return Err(wrong_type(key));
        }
        Ok(map)
    }

    async fn hash_len(&self, key: &str) -> Result<usize> {
        let conn = self.conn.lock().await;
        hash_field_count(&conn, key)
    }

    async fn hash_delete_field(&self, key: &str, field: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let affected = conn.execute(
            "DELETE FROM kv_hashes WHERE key = ? AND field = ?",
            duckdb::params![key, field],
        )?;
        Ok(affected > 0)
    }

    async fn hash_set_if_len_below(
        &self,
        key: &str,
        field: &str,
        value: &str,
        max_len: usize,
    ) -> Result<bool> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        claim_for_hash(&tx, key, now_millis())?;
        if hash_field_count(&tx, key)? >= max_len {
            // Dropping the transaction rolls it back.
            return Ok(false);
        }
        upsert_field(&tx, key, field, value)?;
        tx.commit()?;
        Ok(true)
    }
}
