use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use mindmap_core::config::MindMapConfig;
use mindmap_core::generation::gemini::GeminiGenerator;
use mindmap_core::generation::{ContentGenerator, UnavailableGenerator};
use mindmap_core::images::google::GoogleImageSearch;
use mindmap_core::query::MindMapEngine;
use mindmap_core::render::mermaid_cli::MermaidCliRenderer;
use mindmap_core::storage::KeyValueStore;
use mindmap_core::storage::duckdb::DuckDbStore;
use mindmap_core::storage::memory::MemoryStore;

#[derive(Parser)]
#[command(name = "mindmap", about = "Mind map generation service")]
struct Cli {
    /// Path to the DuckDB database file (omit to keep all state in memory)
    #[arg(long, env = "MINDMAP_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Gemini API key used for mind map generation
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, default_value = "gemini-2.0-flash", env = "MINDMAP_GEMINI_MODEL")]
    gemini_model: String,

    /// HTTP port
    #[arg(long, default_value = "5000", env = "MINDMAP_PORT")]
    port: u16,

    /// Email of the administrator allowed on /api/admin routes
    #[arg(long, env = "ADMIN_EMAIL")]
    admin_email: Option<String>,

    /// Path to the Mermaid CLI executable
    #[arg(long, default_value = "mmdc", env = "MINDMAP_MMDC_PATH")]
    mmdc_path: PathBuf,

    /// Per-user mind map limit when none is set explicitly
    #[arg(long, default_value = "5", env = "MINDMAP_DEFAULT_LIMIT")]
    default_limit: usize,
}

impl Cli {
    fn into_config(self) -> MindMapConfig {
        MindMapConfig {
            db_path: self.db_path,
            gemini_api_key: self.gemini_api_key.filter(|k| !k.is_empty()),
            gemini_model: self.gemini_model,
            admin_email: self.admin_email.filter(|e| !e.is_empty()),
            mmdc_path: self.mmdc_path,
            default_limit: self.default_limit,
            ..MindMapConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mindmap=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let port = cli.port;
    let config = cli.into_config();

    let store: Arc<dyn KeyValueStore> = match &config.db_path {
        Some(path) => {
            let store = DuckDbStore::open(path)?;
            let purged = store.purge_expired().await?;
            tracing::info!("Database opened at {:?} ({purged} expired entries purged)", path);
            Arc::new(store)
        }
        None => {
            tracing::warn!("No MINDMAP_DB_PATH set, state is kept in memory and lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let generator: Arc<dyn ContentGenerator> = match &config.gemini_api_key {
        Some(key) => {
            tracing::info!("Using Gemini generation ({})", config.gemini_model);
            Arc::new(GeminiGenerator::new(key.clone(), config.gemini_model.clone()))
        }
        None => {
            tracing::warn!("No GEMINI_API_KEY set, mind map generation will fail");
            Arc::new(UnavailableGenerator)
        }
    };

    if config.admin_email.is_none() {
        tracing::warn!("No ADMIN_EMAIL set, admin routes will refuse every caller");
    }

    let engine = Arc::new(
        MindMapEngine::new(
            store,
            generator,
            Arc::new(MermaidCliRenderer::new(config.mmdc_path.clone())),
            Arc::new(GoogleImageSearch::new(config.image_cache_ttl)),
        )
        .with_config(&config),
    );

    let app = mindmap_rest::router(engine.clone()).merge(mindmap_admin::router(engine));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("Mind map API listening on 0.0.0.0:{port}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
