//! # idp-server
//!
//! Entry point for the SAML identity provider.

#![forbid(unsafe_code)]

use idp_core::IdpConfig;
use idp_server::{Server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let idp = IdpConfig::load()?;
    let config = ServerConfig::from_env()?;
    tracing::info!(
        entity_id = %idp.entity_id,
        sso_url = %idp.sso_url(),
        accounts = idp.accounts.len(),
        "SAML IdP starting"
    );

    Server::new(config, idp).run().await
}
