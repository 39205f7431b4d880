use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Search query cannot be empty")]
    EmptyQuery,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unsupported search method: {0}")]
    UnsupportedBackend(String),

    #[error("Resource unavailable: {0}")]
    Resource(String),

    #[error("Search backend failed: {0}")]
    Backend(#[source] BoxError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap any underlying engine failure (tantivy, candle, tokenizers, ...).
    pub fn backend<E: Into<BoxError>>(err: E) -> Self {
        Self::Backend(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
