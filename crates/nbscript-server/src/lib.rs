//! HTTP endpoint that starts nbscript batch runs.
//!
//! Meant to sit next to a notebook server: the web UI asks for a batch run
//! of a notebook by its path relative to the notebook root, and this server
//! runs the configured command (by default `nbscript --save --timestamp`).
//!
//! # Architecture
//!
//! - **Routes**: `/health` and `/nbscript/batch` (GET query or POST form)
//! - **Batch**: path validation, command templates, process launch

pub mod batch;
pub mod error;
pub mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

pub use batch::{BatchResponse, CommandTemplate};
pub use error::{ServerError, ServerResult};
pub use routes::{AppState, create_router};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory request paths are relative to.
    pub root: PathBuf,
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Required in the `Authorization` header when set.
    pub token: Option<String>,
    /// Return immediately instead of waiting for the command.
    pub asynchronous: bool,
    /// Command run for each request.
    pub command: CommandTemplate,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            host: "127.0.0.1".to_string(),
            port: 8890,
            token: None,
            asynchronous: false,
            command: CommandTemplate::default(),
        }
    }
}

/// Start the batch server.
pub async fn serve(config: BatchConfig) -> ServerResult<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|_| ServerError::Io {
            path: PathBuf::new(),
            message: format!("Invalid address: {}:{}", config.host, config.port),
        })?;

    if config.token.is_none() {
        tracing::warn!("no token configured, batch requests are not authenticated");
    }
    tracing::info!(
        "Serving batch runs for {} at http://{}/nbscript/batch",
        config.root.display(),
        addr
    );

    let app = create_router(Arc::new(AppState { config }));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
