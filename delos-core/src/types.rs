//! Status snapshot types
//!
//! Reported by the supervisors and serialized as-is by the HTTP layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Live state of one mount instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountStatus {
    /// True iff the background rclone process is alive
    pub mounted: bool,
    /// Where the remote is mounted
    pub mount_path: PathBuf,
}

/// Live state of one tunnel instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelStatus {
    /// True iff the tunnel tool currently reports the configuration
    pub started: bool,
}

/// Snapshot of a mount registry, keyed by remote name
pub type MountStatusMap = BTreeMap<String, MountStatus>;

/// Snapshot of a tunnel registry, keyed by configuration name
pub type TunnelStatusMap = BTreeMap<String, TunnelStatus>;
