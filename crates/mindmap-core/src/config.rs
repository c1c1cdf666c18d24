use std::path::PathBuf;
use std::time::Duration;

/// Seconds a generated diagram stays in the shared content cache.
pub const CACHE_TTL_SECONDS: u64 = 86_400;

/// Ledger size allowed for users without an explicit `limit` field.
pub const DEFAULT_MAP_LIMIT: usize = 5;

/// A user counts as online when active within this window.
pub const ONLINE_WINDOW_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
pub struct MindMapConfig {
    /// DuckDB file backing the store. `None` keeps everything in process.
    pub db_path: Option<PathBuf>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub admin_email: Option<String>,
    pub mmdc_path: PathBuf,
    pub cache_ttl: Duration,
    pub default_limit: usize,
    pub image_results: usize,
    pub image_cache_ttl: Duration,
}

impl Default for MindMapConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            gemini_api_key: None,
            gemini_model: "gemini-2.0-flash".to_string(),
            admin_email: None,
            mmdc_path: PathBuf::from("mmdc"),
            cache_ttl: Duration::from_secs(CACHE_TTL_SECONDS),
            default_limit: DEFAULT_MAP_LIMIT,
            image_results: 5,
            image_cache_ttl: Duration::from_secs(3600),
        }
    }
}
