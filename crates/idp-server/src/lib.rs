//! # idp-server
//!
//! Axum front end for the SAML identity provider.
//!
//! ## Routes
//!
//! | Method | Path        | Purpose                                        |
//! |--------|-------------|------------------------------------------------|
//! | GET    | `/`         | banner                                         |
//! | GET    | `/metadata` | IdP metadata                                   |
//! | GET    | `/sso`      | HTTP-Redirect entry point, forwards to `/login`|
//! | GET    | `/login`    | login form                                     |
//! | POST   | `/login`    | authenticate and POST the signed response      |
//! | GET    | `/health`   | liveness                                       |
//!
//! ## Usage
//!
//! ```ignore
//! use idp_server::{Server, ServerConfig};
//!
//! let server = Server::new(ServerConfig::from_env()?, IdpConfig::load()?);
//! server.run().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod handlers;
pub mod router;
pub mod state;
pub mod ui;

pub use config::ServerConfig;
pub use router::create_router;
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use idp_core::IdpConfig;
use idp_protocol_saml::secrets::{EnvSecretProvider, FileSecretProvider, SecretProvider};
use tokio::net::TcpListener;

/// The identity provider HTTP server.
pub struct Server {
    config: ServerConfig,
    idp: IdpConfig,
}

impl Server {
    /// Creates a server from listener and protocol configuration.
    #[must_use]
    pub fn new(config: ServerConfig, idp: IdpConfig) -> Self {
        Self { config, idp }
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Builds the router without binding a listener.
    pub fn router(&self) -> Router {
        create_router(AppState::new(self.idp.clone(), self.secret_provider()))
    }

    /// Runs the server until a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound or serving fails.
    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    fn secret_provider(&self) -> Arc<dyn SecretProvider> {
        match &self.config.secrets_dir {
            Some(dir) => {
                tracing::info!(dir = %dir.display(), "reading signing secrets from files");
                Arc::new(FileSecretProvider::new(dir))
            }
            None => Arc::new(EnvSecretProvider),
        }
    }
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
