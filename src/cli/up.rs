//! `delos up`: interactive bring-up
//!
//! Starts every configured tunnel and mount, prints what came up and holds
//! them until the operator presses Enter.

use std::path::Path;

use colored::Colorize;
use delos_core::config::toml_config::load_config;
use delos_core::config::DelosConfig;
use delos_core::error::DelosError;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{build_state, provision, shutdown_signal};
use crate::api::AppState;

pub async fn run_up(config_path: Option<&Path>) -> Result<(), DelosError> {
    let config = load_config(config_path)?;
    if config.tunnels.is_empty() && config.remotes.is_empty() {
        println!("{}", "Nothing configured: add [[tunnels]] or [[remotes]]".yellow());
        return Ok(());
    }

    let state = build_state(&config)?;
    let result = hold(&state, &config).await;

    println!("Tearing down...");
    state.shutdown().await;
    println!("{} All instances stopped", "✓".green());
    result
}

async fn hold(state: &AppState, config: &DelosConfig) -> Result<(), DelosError> {
    provision(state, config, true).await?;
    print_summary(state).await;

    println!("{}", "Press Enter to stop".bold());
    let mut line = String::new();
    let mut stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        read = stdin.read_line(&mut line) => {
            read?;
        }
        _ = shutdown_signal() => {}
    }
    Ok(())
}

async fn print_summary(state: &AppState) {
    for (name, status) in state.tunnels.lock().await.status().await {
        println!("{}", summary_line("tunnel", &name, status.started, None));
    }
    for (name, status) in state.mounts.lock().await.status() {
        let target = status.mount_path.display().to_string();
        println!(
            "{}",
            summary_line("mount", &name, status.mounted, Some(target.as_str()))
        );
    }
}

fn summary_line(kind: &str, name: &str, up: bool, target: Option<&str>) -> String {
    let marker = if up { "✓".green() } else { "✗".red() };
    let label = format!("[{}]", kind).cyan();
    match target {
        Some(target) => format!("{} {} {} -> {}", marker, label, name, target),
        None => format!("{} {} {}", marker, label, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line_names_target() {
        colored::control::set_override(false);

        assert_eq!(
            summary_line("mount", "nas:", true, Some("/mnt/nas")),
            "✓ [mount] nas: -> /mnt/nas"
        );
        assert_eq!(summary_line("tunnel", "client", false, None), "✗ [tunnel] client");
    }
}
