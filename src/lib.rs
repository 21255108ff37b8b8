pub mod api;
pub mod appointments;
pub mod client;
pub mod config;
pub mod connections;
pub mod db;
pub mod doctors;
pub mod error;
pub mod meeting;
pub mod models;
pub mod reports;
pub mod state;
pub mod summarizer;
pub mod triage;
pub mod workflow;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::server::ServerError;
use crate::config::PortalConfig;
use crate::state::{PortalState, StateError};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(std::io::Error),
}

/// Install the global subscriber. `RUST_LOG` wins over `fallback`.
pub fn init_tracing(fallback: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .try_init();
}

/// Open state, serve the API and block until Ctrl-C.
pub async fn run(config: PortalConfig) -> Result<(), RunError> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let addr = config.bind_addr;
    let state = Arc::new(PortalState::open(config)?);
    let mut server = api::start_server(state, addr).await?;
    tracing::info!(url = %server.info.base_url(), "Portal API listening");

    let signal = tokio::signal::ctrl_c().await;
    server.shutdown();
    server.wait().await;
    signal.map_err(RunError::Signal)
}
