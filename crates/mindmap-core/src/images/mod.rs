pub mod cache;
pub mod google;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageResult {
    pub url: String,
    pub alt: String,
}

/// External image search used for the "related images" panel.
#[async_trait::async_trait]
pub trait ImageSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ImageResult>>;
}
