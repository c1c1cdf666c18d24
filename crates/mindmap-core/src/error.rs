use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("quota exceeded: {used} of {limit} mind maps used")]
    QuotaExceeded { used: usize, limit: usize },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("generation error: {0}")]
    Generation(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("image search error: {0}")]
    ImageSearch(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the failure came from an external collaborator rather than
    /// from this service or its store.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::Generation(_) | Error::Render(_) | Error::ImageSearch(_)
        )
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Generation(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Internal(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
