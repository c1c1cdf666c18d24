pub mod gemini;
pub mod prompt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

/// External generative-text service.
#[async_trait::async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Generator used when no API credentials are configured. Every call fails.
pub struct UnavailableGenerator;

#[async_trait::async_trait]
impl ContentGenerator for UnavailableGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(Error::Generation(
            "no generation API key configured".to_string(),
        ))
    }
}

static MERMAID_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```mermaid\s*(.*?)```").expect("mermaid fence pattern is valid")
});

/// Pull Mermaid source out of a model response.
///
/// Prefers a fenced ```` ```mermaid ```` block. Without one, a response that
/// mentions `mindmap` is taken as bare source once fences and the word
/// `mermaid` are stripped. Anything else yields `None`.
pub fn extract_mermaid_code(response: &str) -> Option<String> {
    if response.contains("```mermaid") {
        return MERMAID_FENCE
            .captures(response)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|code| !code.is_empty());
    }
    if response.contains("mindmap") {
        let code = response.replace("```", "").replace("mermaid", "");
        let code = code.trim();
        return (!code.is_empty()).then(|| code.to_string());
    }
    None
}
