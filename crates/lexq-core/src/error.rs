use thiserror::Error;

/// Top-level error type for the lexq system.
///
/// Each variant corresponds to one external collaborator or cross-cutting
/// concern. Crates with their own error types implement
/// `From<LexqError>` so that `?` works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LexqError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Secret store error: {0}")]
    Secret(String),

    #[error("Secret parameter not found: {name}")]
    SecretNotFound { name: String },

    #[error("Credential exchange error: {0}")]
    Credentials(String),

    #[error("QA service error: {0}")]
    QaService(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Run tracing error: {0}")]
    Tracing(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for LexqError {
    fn from(err: toml::de::Error) -> Self {
        LexqError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for LexqError {
    fn from(err: toml::ser::Error) -> Self {
        LexqError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for LexqError {
    fn from(err: serde_json::Error) -> Self {
        LexqError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for lexq operations.
pub type Result<T> = std::result::Result<T, LexqError>;
