//! Error handling for configuration loading.

use thiserror::Error;

/// Result type alias using the core error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is missing, malformed or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid TOML: {err}"))
    }
}
