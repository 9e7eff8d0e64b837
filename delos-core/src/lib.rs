//! Core library for the delos supervisor
//!
//! This crate tracks named rclone mounts and WireGuard tunnels, drives the
//! external tools that realise them and retires their processes on teardown.

pub mod error;
pub mod types;

pub mod config;
pub mod supervisor;

/// Initialize logging infrastructure
///
/// Sets up tracing with systemd journal logging when running as a unit.
/// Otherwise logs to stderr with pretty formatting. `RUST_LOG` overrides
/// the default `info` level.
pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    #[cfg(target_os = "linux")]
    {
        if std::env::var("JOURNAL_STREAM").is_ok() {
            let journal_layer = tracing_journald::layer()?;
            tracing_subscriber::registry()
                .with(journal_layer)
                .with(filter)
                .try_init()?;
            return Ok(());
        }
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().pretty())
        .with(filter)
        .try_init()?;

    Ok(())
}
