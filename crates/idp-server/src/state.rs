//! Application state shared by all request handlers.

use std::sync::Arc;

use idp_core::{AccountList, Authenticator, IdpConfig};
use idp_protocol_saml::secrets::SecretProvider;
use idp_protocol_saml::sso::SsoService;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Request-to-response pipeline.
    pub sso: Arc<SsoService>,

    /// Login credential check.
    pub authenticator: Arc<dyn Authenticator>,
}

impl AppState {
    /// Builds state from configuration, authenticating against the
    /// configured accounts.
    pub fn new(config: IdpConfig, secrets: Arc<dyn SecretProvider>) -> Self {
        let accounts = AccountList::new(config.accounts.clone());
        let sso = SsoService::new(Arc::new(config), secrets);
        Self::with_parts(sso, Arc::new(accounts))
    }

    /// Builds state from an existing pipeline and authenticator.
    pub fn with_parts(sso: SsoService, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            sso: Arc::new(sso),
            authenticator,
        }
    }
}
