//! Server configuration.
//!
//! Listener and secret-store settings come from environment variables;
//! protocol settings live in [`idp_core::IdpConfig`].

use std::path::PathBuf;

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,

    /// Port to bind to.
    pub port: u16,

    /// Directory holding one file per secret. Secrets are read from
    /// environment variables when unset.
    pub secrets_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            secrets_dir: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `IDP_PORT` is not a port number.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `IDP_PORT` is not a port number.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let port = match lookup("IDP_PORT") {
            Some(port) => port
                .parse()
                .map_err(|e| anyhow::anyhow!("IDP_PORT must be a port number: {e}"))?,
            None => defaults.port,
        };

        Ok(Self {
            host: lookup("IDP_HOST").unwrap_or(defaults.host),
            port,
            secrets_dir: lookup("IDP_SECRETS_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
        })
    }

    /// The `host:port` listen address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
