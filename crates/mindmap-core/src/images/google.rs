use std::time::Duration;

use scraper::{Html, Selector};

use crate::error::{Error, Result};
use crate::images::cache::ImageCache;
use crate::images::{ImageResult, ImageSearch};

const SEARCH_URL: &str = "https://www.google.com/search";
const USER_AGENT: &str = "Mozilla/5.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Large,
    Medium,
}

impl ImageSize {
    fn tbs(self) -> &'static str {
        match self {
            ImageSize::Large => "isz:l",
            ImageSize::Medium => "isz:m",
        }
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageSize::Large => write!(f, "large"),
            ImageSize::Medium => write!(f, "medium"),
        }
    }
}

/// Scrapes the Google Images results page.
pub struct GoogleImageSearch {
    client: reqwest::Client,
    search_url: String,
    size: ImageSize,
    cache: ImageCache,
}

impl GoogleImageSearch {
    pub fn new(cache_ttl: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_else(|e| {
                    tracing::error!(error = %e, "failed to build HTTP client with timeouts, using default");
                    reqwest::Client::default()
                }),
            search_url: SEARCH_URL.to_string(),
            size: ImageSize::Large,
            cache: ImageCache::new(cache_ttl, 512),
        }
    }

    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    fn search_query(&self, query: &str) -> String {
        match self.size {
            ImageSize::Large => format!("{query} high resolution"),
            ImageSize::Medium => query.to_string(),
        }
    }
}

/// Extract up to `max_results` images from a results page.
///
/// Only the first `max_results + 1` `<img>` elements are considered, and only
/// absolute `http(s)` sources are kept. The first kept image is the page logo
/// and is dropped whenever something else was found.
pub fn parse_image_results(html: &str, query: &str, max_results: usize) -> Vec<ImageResult> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };

    let mut images: Vec<ImageResult> = document
        .select(&selector)
        .take(max_results + 1)
        .filter_map(|img| {
            let src = img.value().attr("src")?;
            if !src.starts_with("http") {
                return None;
            }
            let alt = img
                .value()
                .attr("alt")
                .map(str::to_string)
                .unwrap_or_else(|| format!("{query} image"));
            Some(ImageResult {
                url: src.to_string(),
                alt,
            })
        })
        .collect();

    if images.len() > 1 {
        images.remove(0);
    }
    images
}

#[async_trait::async_trait]
impl ImageSearch for GoogleImageSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ImageResult>> {
        let search_query = self.search_query(query);
        let cache_key = format!("{search_query}_{max_results}_{}", self.size);
        if let Some(hit) = self.cache.get(&cache_key) {
            tracing::debug!(query = %query, "image search cache hit");
            return Ok(hit);
        }

        let response = self
            .client
            .get(&self.search_url)
            .query(&[
                ("q", search_query.as_str()),
                ("tbm", "isch"),
                ("tbs", self.size.tbs()),
            ])
            .send()
            .await
            .map_err(|e| Error::ImageSearch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::ImageSearch(format!(
                "search returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::ImageSearch(e.to_string()))?;
        let images = parse_image_results(&body, query, max_results);
        self.cache.put(cache_key, images.clone());
        Ok(images)
    }
}
