//! Configuration module
//!
//! Handles loading and saving supervisor configuration from TOML files.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::supervisor::SupervisorSettings;

pub mod toml_config;

/// Complete delos configuration
///
/// Every section is optional in the file; missing sections fall back to
/// their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelosConfig {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// Process supervision timings
    pub supervisor: SupervisorConfig,

    /// External tool settings
    pub tools: ToolsConfig,

    /// Remotes registered at startup
    pub remotes: Vec<RemoteConfig>,

    /// Tunnels registered at startup
    pub tunnels: Vec<TunnelConfig>,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
        }
    }
}

/// Timings used by both supervisors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Pause after launching a background mount
    pub settle_delay_ms: u64,

    /// How long a terminated process gets before SIGKILL
    pub grace_period_ms: u64,

    /// How long to wait for SIGKILL to take effect
    pub kill_wait_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1000,
            grace_period_ms: 5000,
            kill_wait_ms: 1000,
        }
    }
}

impl SupervisorConfig {
    /// Convert to the runtime settings consumed by the supervisors
    pub fn settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            grace_period: Duration::from_millis(self.grace_period_ms),
            kill_wait: Duration::from_millis(self.kill_wait_ms),
        }
    }
}

/// External tool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// rclone binary name or path
    pub rclone: String,

    /// Value passed to `--vfs-cache-mode`
    pub vfs_cache_mode: String,

    /// Prefix WireGuard commands with sudo on Unix
    pub elevate: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            rclone: "rclone".to_string(),
            vfs_cache_mode: "writes".to_string(),
            elevate: true,
        }
    }
}

/// A remote to register at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// rclone remote name (e.g. "nas:")
    pub name: String,

    /// Local mount point
    pub mount_path: PathBuf,

    /// Mount immediately after registering
    #[serde(default)]
    pub automount: bool,
}

/// A WireGuard configuration to register at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelConfig {
    /// wg-quick configuration name
    pub name: String,

    /// Bring the tunnel up immediately after registering
    #[serde(default)]
    pub autostart: bool,
}

impl DelosConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server.host.is_empty() {
            return Err("Server host cannot be empty".to_string());
        }

        if self.server.port == 0 {
            return Err("Port cannot be zero".to_string());
        }

        if self.supervisor.grace_period_ms == 0 {
            return Err("Grace period cannot be zero".to_string());
        }

        if self.supervisor.kill_wait_ms == 0 {
            return Err("Kill wait cannot be zero".to_string());
        }

        if self.tools.rclone.is_empty() {
            return Err("rclone binary cannot be empty".to_string());
        }

        let mut seen = HashSet::new();
        for remote in &self.remotes {
            if remote.name.is_empty() {
                return Err("Remote name cannot be empty".to_string());
            }
            if remote.mount_path.as_os_str().is_empty() {
                return Err(format!("Mount path of remote '{}' cannot be empty", remote.name));
            }
            if !seen.insert(remote.name.as_str()) {
                return Err(format!("Duplicate remote '{}'", remote.name));
            }
        }

        let mut seen = HashSet::new();
        for tunnel in &self.tunnels {
            if tunnel.name.is_empty() {
                return Err("Tunnel name cannot be empty".to_string());
            }
            if !seen.insert(tunnel.name.as_str()) {
                return Err(format!("Duplicate tunnel '{}'", tunnel.name));
            }
        }

        Ok(())
    }
}
