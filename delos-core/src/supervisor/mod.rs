//! Instance supervision
//!
//! Registries of named mounts and tunnels plus the process plumbing behind
//! them.

pub mod commands;
pub mod mount;
pub mod process;
pub mod registry;
pub mod tunnel;

use std::time::Duration;

// Public re-exports
pub use commands::{CommandProvider, Platform, SystemCommands};
pub use mount::{MountInstance, MountSupervisor};
pub use process::{CommandOutput, ProcessHandle, Termination};
pub use registry::{Instance, Registry};
pub use tunnel::{TunnelInstance, TunnelSupervisor};

/// Timings applied to background processes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSettings {
    /// Pause after launching a mount before reporting it up
    pub settle_delay: Duration,
    /// Time between SIGTERM and SIGKILL
    pub grace_period: Duration,
    /// Time allowed for SIGKILL to take effect
    pub kill_wait: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(1),
            grace_period: Duration::from_secs(5),
            kill_wait: Duration::from_secs(1),
        }
    }
}
