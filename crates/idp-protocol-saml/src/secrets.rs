//! Signing material retrieval.
//!
//! Key material lives in an external secret store reached through
//! [`SecretProvider`]. It is fetched per request, held only while a response
//! is signed, and never cached.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use idp_core::SecretNames;
use thiserror::Error;

use crate::signature::XmlSigner;
use crate::SamlResult;

/// Secret store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    /// The named secret does not exist.
    #[error("secret not found: {0}")]
    NotFound(String),

    /// The store failed in a way that may succeed on retry.
    #[error("transient secret store failure: {0}")]
    Transient(String),
}

/// Source of named secrets.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Fetches a secret. `Ok(None)` is treated as [`SecretError::NotFound`].
    async fn get_secret(&self, name: &str) -> Result<Option<String>, SecretError>;
}

/// Bounded exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles afterwards.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt number `attempt` (1-based; the first attempt
    /// has none).
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        self.base_delay
            .saturating_mul(1u32.checked_shl(attempt - 2).unwrap_or(u32::MAX))
    }
}

/// Fetches `name`, retrying transient failures per `policy`.
///
/// # Errors
///
/// Returns [`SecretError::NotFound`] immediately for a missing secret and
/// the last [`SecretError::Transient`] once attempts are exhausted.
pub async fn fetch_secret(
    provider: &dyn SecretProvider,
    name: &str,
    policy: RetryPolicy,
) -> Result<String, SecretError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match provider.get_secret(name).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => return Err(SecretError::NotFound(name.to_string())),
            Err(SecretError::NotFound(_)) => return Err(SecretError::NotFound(name.to_string())),
            Err(SecretError::Transient(reason)) if attempt < attempts => {
                attempt += 1;
                let delay = policy.delay_before(attempt);
                tracing::warn!(secret = name, %reason, attempt, ?delay, "transient secret failure, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(err @ SecretError::Transient(_)) => return Err(err),
        }
    }
}

/// PEM key and certificate for one signing operation.
pub struct SigningMaterial {
    private_key_pem: String,
    certificate_pem: String,
}

impl SigningMaterial {
    /// Wraps PEM strings.
    pub fn new(private_key_pem: impl Into<String>, certificate_pem: impl Into<String>) -> Self {
        Self {
            private_key_pem: private_key_pem.into(),
            certificate_pem: certificate_pem.into(),
        }
    }

    /// Fetches both secrets from `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SamlError::SecretRetrieval`] if either fetch fails.
    pub async fn load(
        provider: &dyn SecretProvider,
        names: &SecretNames,
        policy: RetryPolicy,
    ) -> SamlResult<Self> {
        let private_key_pem = fetch_secret(provider, &names.private_key, policy).await?;
        let certificate_pem = fetch_secret(provider, &names.certificate, policy).await?;
        Ok(Self::new(private_key_pem, certificate_pem))
    }

    /// The certificate PEM.
    #[must_use]
    pub fn certificate_pem(&self) -> &str {
        &self.certificate_pem
    }

    /// Decodes the material into a signer, consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SamlError::Signing`] if either PEM is invalid.
    pub fn into_signer(self) -> SamlResult<XmlSigner> {
        XmlSigner::from_pem(&self.private_key_pem, &self.certificate_pem)
    }
}

impl fmt::Debug for SigningMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningMaterial").finish_non_exhaustive()
    }
}

/// Secrets read from environment variables named after the secret.
///
/// Literal `\n` sequences are turned into newlines so PEM can be kept on
/// one line.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretProvider;

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    async fn get_secret(&self, name: &str) -> Result<Option<String>, SecretError> {
        match std::env::var(name) {
            Ok(value) if value.is_empty() => Ok(None),
            Ok(value) => Ok(Some(value.replace("\\n", "\n"))),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(SecretError::NotFound(format!("{name}: {e}"))),
        }
    }
}

/// Secrets read from files in a directory, one file per secret name.
#[derive(Debug, Clone)]
pub struct FileSecretProvider {
    dir: PathBuf,
}

impl FileSecretProvider {
    /// Reads secrets from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SecretProvider for FileSecretProvider {
    async fn get_secret(&self, name: &str) -> Result<Option<String>, SecretError> {
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(SecretError::NotFound(name.to_string()));
        }
        match tokio::fs::read_to_string(self.dir.join(name)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SecretError::Transient(format!("{name}: {e}"))),
        }
    }
}

/// Fixed in-memory secrets.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretProvider {
    secrets: HashMap<String, String>,
}

impl StaticSecretProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a secret.
    #[must_use]
    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretProvider for StaticSecretProvider {
    async fn get_secret(&self, name: &str) -> Result<Option<String>, SecretError> {
        Ok(self.secrets.get(name).cloned())
    }
}
