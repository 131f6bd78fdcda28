//! Error handling for the decision pipeline.

use thiserror::Error;

/// Main error type for the decision pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// A required input (metric field, portfolio, price history) is absent.
    /// Never substituted with a default.
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// A stage tried to write a context slot that was already published
    #[error("Context slot already published: {0}")]
    AlreadyPublished(&'static str),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Data-related errors (e.g. malformed snapshot or price file)
    #[error("Data error: {0}")]
    DataError(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// CSV errors
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

/// Result type for the decision pipeline
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a missing named input.
    pub fn missing(what: impl Into<String>) -> Self {
        Error::MissingInput(what.into())
    }

    /// True for errors that must stop the pipeline because an input contract was violated.
    pub fn is_missing_input(&self) -> bool {
        matches!(self, Error::MissingInput(_))
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}
