pub const CREATE_KV_STRINGS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS kv_strings (
    key VARCHAR PRIMARY KEY,
    value TEXT NOT NULL,
    expires_at BIGINT
);
CREATE INDEX IF NOT EXISTS idx_kv_strings_expires_at ON kv_strings(expires_at);
";

pub const CREATE_KV_HASHES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS kv_hashes (
    key VARCHAR NOT NULL,
    field VARCHAR NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (key, field)
);
";

pub fn run_migrations(conn: &duckdb::Connection) -> duckdb::Result<()> {
    conn.execute_batch(CREATE_KV_STRINGS_TABLE)?;
    conn.execute_batch(CREATE_KV_HASHES_TABLE)?;
    Ok(())
}
