//! delos - rclone mount and WireGuard tunnel supervisor
//!
//! Keeps named mounts and tunnels under supervision and exposes them over
//! a small HTTP control surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use delos_core::{
    error::{DelosError, SupervisorError},
    init_logging,
};

mod api;
mod cli;

#[derive(Parser)]
#[command(name = "delos")]
#[command(about = "Supervise rclone mounts and WireGuard tunnels")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP control surface
    Serve {
        /// Address to bind (overrides the config file)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides the config file)
        #[arg(long)]
        port: Option<u16>,
        /// Configuration file to load instead of the default
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Bring up configured tunnels and mounts until Enter is pressed
    Up {
        /// Configuration file to load instead of the default
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize logging
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { host, port, config } => {
            cli::serve::run_serve(config.as_deref(), host, port).await
        }
        Commands::Up { config } => cli::up::run_up(config.as_deref()).await,
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            let exit_code = match e {
                // Configuration errors (exit code 2)
                DelosError::Config(_) | DelosError::Toml(_) | DelosError::TomlSerialize(_) => 2,
                // Nothing can run on this host
                DelosError::Supervisor(SupervisorError::UnsupportedPlatform { .. }) => 2,
                // Runtime failures (exit code 1)
                DelosError::Supervisor(_) | DelosError::Io(_) => 1,
            };

            eprintln!("{}", e);
            std::process::exit(exit_code);
        }
    }
}
