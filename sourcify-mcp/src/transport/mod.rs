//! Transport bindings.
//!
//! Both bindings drive the same [`McpServer`]; [`serve`] picks one from the
//! configured [`TransportMode`].

pub mod http;
pub mod session;
pub mod stdio;

pub use http::{DispatcherFactory, SESSION_HEADER};
pub use session::{EvictionReason, SessionStore, TeardownHook};

use crate::clients::{ClientInitError, SourcifyApi, SourcifyClient, SourcifyConfig, TransportMode};
use crate::server::McpServer;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Transport error types.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Building the Sourcify client failed
    #[error("Client setup failed: {0}")]
    Client(#[from] ClientInitError),

    /// Socket or stream failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the configured binding until it ends.
pub async fn serve(config: &SourcifyConfig) -> Result<(), TransportError> {
    let client: Arc<dyn SourcifyApi> = Arc::new(SourcifyClient::new(
        config.endpoint.clone(),
        config.timeout(),
    )?);
    info!(
        "Using Sourcify API at {} (timeout {}ms)",
        config.endpoint.base_url, config.timeout_ms
    );

    match config.transport {
        TransportMode::Stdio => {
            info!("Serving MCP over stdio");
            let server = Arc::new(McpServer::sourcify(client));
            stdio::serve(server, tokio::io::stdin(), tokio::io::stdout()).await?;
        }
        TransportMode::Http => {
            let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
            let sessions = Arc::new(SessionStore::new(
                config.session_ttl(),
                config.max_sessions,
            ));
            let factory: Arc<dyn DispatcherFactory> =
                Arc::new(move || Arc::new(McpServer::sourcify(client.clone())));
            http::serve_on(listener, sessions, factory).await?;
        }
    }

    Ok(())
}
