// Shared fixtures for supervisor integration tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use delos_core::error::SupervisorError;
use delos_core::supervisor::{CommandProvider, SupervisorSettings};
use tempfile::TempDir;

/// Command provider backed by shell snippets
///
/// Tunnels are marker files in a temp directory: up creates the file, down
/// deletes it and status lists the directory. Mounts are plain `sleep`
/// processes unless overridden.
#[derive(Debug)]
pub struct ScriptedCommands {
    dir: TempDir,
    mount_script: String,
    unmount_script: String,
    up_script: Option<String>,
    down_script: Option<String>,
}

impl ScriptedCommands {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
            mount_script: "sleep 30".to_string(),
            unmount_script: "true".to_string(),
            up_script: None,
            down_script: None,
        }
    }

    pub fn with_mount(mut self, script: &str) -> Self {
        self.mount_script = script.to_string();
        self
    }

    pub fn with_unmount(mut self, script: &str) -> Self {
        self.unmount_script = script.to_string();
        self
    }

    pub fn with_tunnel_up(mut self, script: &str) -> Self {
        self.up_script = Some(script.to_string());
        self
    }

    pub fn with_tunnel_down(mut self, script: &str) -> Self {
        self.down_script = Some(script.to_string());
        self
    }

    /// Directory holding one marker file per running tunnel
    pub fn state_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn marker(&self, config: &str) -> PathBuf {
        self.dir.path().join(config)
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl CommandProvider for ScriptedCommands {
    fn mount(&self, _remote: &str, _mount_path: &Path) -> Result<String, SupervisorError> {
        Ok(self.mount_script.clone())
    }

    fn unmount(&self, _mount_path: &Path) -> Result<String, SupervisorError> {
        Ok(self.unmount_script.clone())
    }

    fn tunnel_up(&self, config: &str) -> Result<String, SupervisorError> {
        Ok(self
            .up_script
            .clone()
            .unwrap_or_else(|| format!("touch '{}'", self.marker(config).display())))
    }

    fn tunnel_down(&self, config: &str) -> Result<String, SupervisorError> {
        Ok(self
            .down_script
            .clone()
            .unwrap_or_else(|| format!("rm '{}'", self.marker(config).display())))
    }

    fn tunnel_status(&self, _config: &str) -> Result<String, SupervisorError> {
        Ok(format!("ls '{}'", self.state_dir().display()))
    }
}

/// Short timings so escalation tests finish quickly
pub fn fast_settings() -> SupervisorSettings {
    SupervisorSettings {
        settle_delay: Duration::from_millis(100),
        grace_period: Duration::from_millis(300),
        kill_wait: Duration::from_secs(2),
    }
}

/// Whether a process with this pid is still alive
///
/// Zombies awaiting a reap count as dead.
#[cfg(unix)]
pub fn pid_exists(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let stat = Path::new("/proc").join(pid.to_string()).join("stat");
    if Path::new("/proc/self/stat").exists() {
        return match std::fs::read_to_string(stat) {
            Ok(contents) => contents
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.trim_start().chars().next())
                .is_some_and(|state| state != 'Z' && state != 'X'),
            Err(_) => false,
        };
    }

    kill(Pid::from_raw(pid as i32), None).is_ok()
}
