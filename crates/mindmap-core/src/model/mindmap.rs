use serde::{Deserialize, Serialize};

/// One generated mind map held in a user's ledger.
///
/// Serialized with the field names existing ledger hashes already use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MindMapRecord {
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    pub topic: String,
    #[serde(rename = "type")]
    pub map_type: String,
    #[serde(rename = "mermaidCode")]
    pub mermaid_code: String,
}

impl MindMapRecord {
    /// Build a record with a fresh time-ordered id and the current timestamp.
    pub fn new(topic: &str, map_type: &str, mermaid_code: &str) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            created_at: super::utc_now_iso(),
            topic: topic.to_string(),
            map_type: map_type.to_string(),
            mermaid_code: mermaid_code.to_string(),
        }
    }
}

/// Stored value of a content cache entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedDiagram {
    pub mermaid: String,
}

/// A live cache entry as reported by listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct CachedMapKey {
    pub topic: String,
    pub map_type: String,
}

/// Generation style selected by the request's map type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapType {
    Simple,
    Analogy,
    Text,
}

impl MapType {
    /// Resolve a free-text map type. Anything unrecognised gets the simple style.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or(MapType::Simple)
    }
}

impl std::fmt::Display for MapType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapType::Simple => write!(f, "simple"),
            MapType::Analogy => write!(f, "analogy"),
            MapType::Text => write!(f, "text"),
        }
    }
}

impl std::str::FromStr for MapType {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match crate::keys::normalize(s).as_str() {
            "simple" => Ok(MapType::Simple),
            "analogy" => Ok(MapType::Analogy),
            "text" | "text-to-mindmap" => Ok(MapType::Text),
            _ => Err(crate::error::Error::Validation(format!(
                "invalid map type: {s}"
            ))),
        }
    }
}
