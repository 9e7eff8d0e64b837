//! `delos serve`: HTTP control surface

use std::path::Path;

use delos_core::config::toml_config::load_config;
use delos_core::config::DelosConfig;
use delos_core::error::DelosError;
use tokio::net::TcpListener;
use tracing::info;

use super::{build_state, provision, shutdown_signal};
use crate::api::{create_router, AppState};

/// Run the server until Ctrl-C or SIGTERM
///
/// Both supervisors are torn down on every exit path, including a failed
/// provision or bind.
pub async fn run_serve(
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), DelosError> {
    let mut config = load_config(config_path)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let state = build_state(&config)?;
    let result = serve(&state, &config).await;
    state.shutdown().await;
    result
}

async fn serve(state: &AppState, config: &DelosConfig) -> Result<(), DelosError> {
    provision(state, config, false).await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, create_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
