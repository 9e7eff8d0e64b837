//! CLI command implementations
//!
//! `serve` runs the HTTP control surface; `up` is the interactive
//! bring-up that tears everything down on Enter.

pub mod serve;
pub mod up;

use std::sync::Arc;

use delos_core::config::DelosConfig;
use delos_core::error::DelosError;
use delos_core::supervisor::SystemCommands;
use tracing::{info, warn};

use crate::api::AppState;

/// Build supervisor state for the host platform
fn build_state(config: &DelosConfig) -> Result<AppState, DelosError> {
    let commands = SystemCommands::detect(config.tools.clone())?;
    info!("Using {} command table", commands.platform());

    let missing = commands.missing_tools();
    if !missing.is_empty() {
        warn!("Tools not found in PATH: {}", missing.join(", "));
    }

    Ok(AppState::new(
        Arc::new(commands),
        config.supervisor.settings(),
    ))
}

/// Register configured tunnels and remotes
///
/// Tunnels come first since a remote may only be reachable through one.
/// With `activate_all` every entry is started regardless of its
/// `autostart`/`automount` flag.
async fn provision(
    state: &AppState,
    config: &DelosConfig,
    activate_all: bool,
) -> Result<(), DelosError> {
    let mut tunnels = state.tunnels.lock().await;
    for tunnel in &config.tunnels {
        tunnels
            .add_and_start(&tunnel.name, activate_all || tunnel.autostart)
            .await?;
    }
    drop(tunnels);

    let mut mounts = state.mounts.lock().await;
    for remote in &config.remotes {
        mounts
            .add_and_mount(
                &remote.name,
                remote.mount_path.clone(),
                activate_all || remote.automount,
            )
            .await?;
    }

    info!(
        "Provisioned {} tunnel(s) and {} remote(s)",
        config.tunnels.len(),
        config.remotes.len()
    );
    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
