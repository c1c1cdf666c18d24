pub mod mermaid_cli;

use crate::error::Result;

/// Turns diagram source into an image (SVG bytes).
#[async_trait::async_trait]
pub trait DiagramRenderer: Send + Sync {
    async fn render(&self, source: &str) -> Result<Vec<u8>>;
}
