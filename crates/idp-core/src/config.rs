//! Identity provider configuration.
//!
//! Loaded once at startup from an optional TOML file (`IDP_CONFIG_FILE`)
//! followed by environment overrides, then validated. A `.env` file in the
//! working directory is honoured.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Account, Error, Result};

/// Default validity window for assertions: 5 minutes.
pub const DEFAULT_CLOCK_SKEW_SECS: u64 = 300;

/// Default session lifetime: 8 hours.
pub const DEFAULT_SESSION_LIFETIME_SECS: u64 = 8 * 60 * 60;

/// Immutable identity provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdpConfig {
    /// Entity ID used as the `Issuer` of responses and metadata.
    pub entity_id: String,
    /// Public base URL of this IdP; `/sso` is appended for metadata.
    pub endpoint: String,
    /// ACS URL requests must name, when set.
    pub expected_acs_url: Option<String>,
    /// Assertion validity window in seconds.
    pub clock_skew_secs: u64,
    /// Authenticated session lifetime in seconds.
    pub session_lifetime_secs: u64,
    /// Accounts accepted at the login form.
    pub accounts: Vec<Account>,
    /// Names of the signing secrets in the secret store.
    pub secrets: SecretNames,
}

/// Secret store names of the signing material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretNames {
    /// Name of the PEM private key.
    pub private_key: String,
    /// Name of the PEM certificate.
    pub certificate: String,
}

impl Default for SecretNames {
    fn default() -> Self {
        Self {
            private_key: "PRIVATE_KEY".to_string(),
            certificate: "PUBLIC_CRT".to_string(),
        }
    }
}

impl Default for IdpConfig {
    fn default() -> Self {
        Self {
            entity_id: "urn:example:idp".to_string(),
            endpoint: "http://localhost:8080".to_string(),
            expected_acs_url: None,
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
            session_lifetime_secs: DEFAULT_SESSION_LIFETIME_SECS,
            accounts: Vec::new(),
            secrets: SecretNames::default(),
        }
    }
}

impl IdpConfig {
    /// Parses configuration from TOML. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Loads configuration from `IDP_CONFIG_FILE` (if set) and the
    /// environment, then validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, an override is malformed,
    /// or the result fails [`IdpConfig::validate`].
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match std::env::var("IDP_CONFIG_FILE") {
            Ok(path) => {
                tracing::info!(%path, "loading configuration file");
                Self::from_file(path)?
            }
            Err(_) => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `IDP_*` overrides obtained from `lookup`.
    ///
    /// An empty `IDP_EXPECTED_ACS_URL` clears the expected ACS URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a numeric override does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("IDP_ENTITY_ID") {
            self.entity_id = v;
        }
        if let Some(v) = lookup("IDP_ENDPOINT") {
            self.endpoint = v;
        }
        if let Some(v) = lookup("IDP_EXPECTED_ACS_URL") {
            self.expected_acs_url = if v.is_empty() { None } else { Some(v) };
        }
        if let Some(v) = lookup("IDP_CLOCK_SKEW_SECS") {
            self.clock_skew_secs = parse_secs("IDP_CLOCK_SKEW_SECS", &v)?;
        }
        if let Some(v) = lookup("IDP_SESSION_LIFETIME_SECS") {
            self.session_lifetime_secs = parse_secs("IDP_SESSION_LIFETIME_SECS", &v)?;
        }
        if let Some(v) = lookup("IDP_PRIVATE_KEY_SECRET") {
            self.secrets.private_key = v;
        }
        if let Some(v) = lookup("IDP_CERTIFICATE_SECRET") {
            self.secrets.certificate = v;
        }
        Ok(())
    }

    /// Checks the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.entity_id.trim().is_empty() {
            return Err(Error::Config("entity_id must not be empty".to_string()));
        }
        if self.endpoint.trim().is_empty() {
            return Err(Error::Config("endpoint must not be empty".to_string()));
        }
        validate_window("clock_skew_secs", self.clock_skew_secs)?;
        validate_window("session_lifetime_secs", self.session_lifetime_secs)?;
        if self.secrets.private_key.is_empty() || self.secrets.certificate.is_empty() {
            return Err(Error::Config("secret names must not be empty".to_string()));
        }
        Ok(())
    }

    /// Assertion validity window.
    #[must_use]
    pub fn clock_skew(&self) -> chrono::Duration {
        seconds(self.clock_skew_secs)
    }

    /// Session lifetime.
    #[must_use]
    pub fn session_lifetime(&self) -> chrono::Duration {
        seconds(self.session_lifetime_secs)
    }

    /// URL of the single sign-on service.
    #[must_use]
    pub fn sso_url(&self) -> String {
        format!("{}/sso", self.endpoint.trim_end_matches('/'))
    }
}

/// Largest accepted window: 10 years.
const MAX_WINDOW_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn validate_window(name: &str, secs: u64) -> Result<()> {
    if secs == 0 {
        return Err(Error::Config(format!("{name} must be positive")));
    }
    if secs > MAX_WINDOW_SECS {
        return Err(Error::Config(format!("{name} is unreasonably large")));
    }
    Ok(())
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be a whole number of seconds, got {value:?}")))
}

fn seconds(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}
