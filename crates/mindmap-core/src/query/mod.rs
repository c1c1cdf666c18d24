pub mod account;
pub mod admin;
pub mod generate;

use std::sync::Arc;
use std::time::Duration;

use crate::cache::ContentCache;
use crate::config::MindMapConfig;
use crate::error::{Error, Result};
use crate::generation::ContentGenerator;
use crate::images::{ImageResult, ImageSearch};
use crate::ledger::UserMapLedger;
use crate::model::mindmap::MindMapRecord;
use crate::render::DiagramRenderer;
use crate::sessions::UserDirectory;
use crate::storage::KeyValueStore;

pub struct MindMapEngine {
    pub store: Arc<dyn KeyValueStore>,
    pub cache: ContentCache,
    pub ledger: UserMapLedger,
    pub users: UserDirectory,
    pub generator: Arc<dyn ContentGenerator>,
    pub renderer: Arc<dyn DiagramRenderer>,
    pub images: Arc<dyn ImageSearch>,
    pub admin_email: Option<String>,
    pub image_results: usize,
}

impl MindMapEngine {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        generator: Arc<dyn ContentGenerator>,
        renderer: Arc<dyn DiagramRenderer>,
        images: Arc<dyn ImageSearch>,
    ) -> Self {
        Self {
            cache: ContentCache::new(store.clone()),
            ledger: UserMapLedger::new(store.clone()),
            users: UserDirectory::new(store.clone()),
            store,
            generator,
            renderer,
            images,
            admin_email: None,
            image_results: 5,
        }
    }

    pub fn with_admin_email(mut self, email: impl Into<String>) -> Self {
        self.admin_email = Some(email.into());
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = ContentCache::new(self.store.clone()).with_ttl(ttl);
        self
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.ledger = UserMapLedger::new(self.store.clone()).with_default_limit(limit);
        self
    }

    pub fn with_image_results(mut self, n: usize) -> Self {
        self.image_results = n;
        self
    }

    /// Apply the tunables of a loaded configuration.
    pub fn with_config(self, config: &MindMapConfig) -> Self {
        let engine = self
            .with_cache_ttl(config.cache_ttl)
            .with_default_limit(config.default_limit)
            .with_image_results(config.image_results);
        match &config.admin_email {
            Some(email) => engine.with_admin_email(email.clone()),
            None => engine,
        }
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_email
            .as_deref()
            .is_some_and(|admin| !admin.is_empty() && admin == email)
    }

    pub async fn generate(
        &self,
        email: &str,
        request: generate::GenerateRequest,
    ) -> Result<generate::GenerateResponse> {
        generate::execute(self, email, request).await
    }

    /// The caller's ledger, newest first.
    pub async fn list_mind_maps(&self, email: &str) -> Result<Vec<MindMapRecord>> {
        self.ledger.list(email).await
    }

    pub async fn related_images(&self, topic: &str) -> Result<Vec<ImageResult>> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(Error::Validation("topic is required".to_string()));
        }
        self.images.search(topic, self.image_results).await
    }
}
