use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::generation::extract_mermaid_code;
use crate::generation::prompt::build_prompt;
use crate::model::mindmap::{MapType, MindMapRecord};
use crate::query::MindMapEngine;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(rename = "type", default)]
    pub map_type: String,
    /// Source paragraph for text-to-mindmap requests.
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateRequest {
    pub fn new(topic: impl Into<String>, map_type: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            map_type: map_type.into(),
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub mermaid_code: String,
    pub svg: String,
    pub mind_map_id: String,
    /// Whether the diagram source came from the shared cache.
    pub cached: bool,
}

pub async fn execute(
    engine: &MindMapEngine,
    email: &str,
    request: GenerateRequest,
) -> Result<GenerateResponse> {
    if request.topic.trim().is_empty() || request.map_type.trim().is_empty() {
        return Err(Error::Validation("topic and type are required".to_string()));
    }
    let topic = request.topic.as_str();
    let map_type = request.map_type.as_str();

    engine.ledger.update_last_activity(email).await?;

    if let Some(code) = engine.cache.get(topic, map_type).await? {
        tracing::info!(topic = %topic, map_type = %map_type, "cache hit");
        let svg = render_svg(engine, &code).await?;
        let record = MindMapRecord::new(topic, map_type, &code);
        engine.ledger.insert(email, &record).await?;
        return Ok(GenerateResponse {
            mermaid_code: code,
            svg,
            mind_map_id: record.id,
            cached: true,
        });
    }

    let prompt = build_prompt(
        MapType::from_label(map_type),
        topic,
        request.text.as_deref(),
    );
    let response = engine.generator.generate(&prompt).await?;
    let code = extract_mermaid_code(&response).ok_or_else(|| {
        tracing::warn!(topic = %topic, "generator response held no mermaid code");
        Error::Generation("failed to extract mermaid code from response".to_string())
    })?;
    let svg = render_svg(engine, &code).await?;

    engine.cache.put(topic, map_type, &code).await?;
    tracing::info!(topic = %topic, map_type = %map_type, "cache store");

    let record = MindMapRecord::new(topic, map_type, &code);
    engine.ledger.insert(email, &record).await?;

    Ok(GenerateResponse {
        mermaid_code: code,
        svg,
        mind_map_id: record.id,
        cached: false,
    })
}

async fn render_svg(engine: &MindMapEngine, code: &str) -> Result<String> {
    let bytes = engine.renderer.render(code).await?;
    String::from_utf8(bytes).map_err(|e| Error::Render(format!("renderer output is not UTF-8: {e}")))
}
