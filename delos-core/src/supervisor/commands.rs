//! Command provider for the external tools
//!
//! Maps (operation, platform) to the shell command that realises it.
//! The supervisors execute the returned strings without looking inside them.

use std::fmt;
use std::path::Path;

use crate::config::ToolsConfig;
use crate::error::SupervisorError;

/// Operating systems with a known command table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// Map a `std::env::consts::OS` value to a platform
    pub fn from_os(os: &str) -> Result<Self, SupervisorError> {
        match os {
            "linux" => Ok(Platform::Linux),
            "macos" => Ok(Platform::MacOs),
            "windows" => Ok(Platform::Windows),
            other => Err(SupervisorError::UnsupportedPlatform {
                operation: "detect".to_string(),
                platform: other.to_string(),
            }),
        }
    }

    /// Platform this binary runs on
    pub fn current() -> Result<Self, SupervisorError> {
        Self::from_os(std::env::consts::OS)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "Linux",
            Platform::MacOs => "Darwin",
            Platform::Windows => "Windows",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source of the shell commands run by the supervisors
///
/// Every method is a pure function of its arguments and the platform. A
/// missing mapping fails with [`SupervisorError::UnsupportedPlatform`].
pub trait CommandProvider: Send + Sync + fmt::Debug {
    /// Long-running command that keeps `remote` mounted at `mount_path`
    fn mount(&self, remote: &str, mount_path: &Path) -> Result<String, SupervisorError>;

    /// Run-to-completion command that releases `mount_path`
    fn unmount(&self, mount_path: &Path) -> Result<String, SupervisorError>;

    /// Run-to-completion command that brings tunnel `config` up
    fn tunnel_up(&self, config: &str) -> Result<String, SupervisorError>;

    /// Run-to-completion command that brings tunnel `config` down
    fn tunnel_down(&self, config: &str) -> Result<String, SupervisorError>;

    /// Command whose output names `config` while the tunnel is up
    fn tunnel_status(&self, config: &str) -> Result<String, SupervisorError>;
}

/// rclone and WireGuard commands for the host platform
#[derive(Debug, Clone)]
pub struct SystemCommands {
    platform: Platform,
    tools: ToolsConfig,
}

impl SystemCommands {
    pub fn new(platform: Platform, tools: ToolsConfig) -> Self {
        Self { platform, tools }
    }

    /// Build the command table for the platform this binary runs on
    pub fn detect(tools: ToolsConfig) -> Result<Self, SupervisorError> {
        Ok(Self::new(Platform::current()?, tools))
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// External binaries required on this platform that are absent from PATH
    pub fn missing_tools(&self) -> Vec<String> {
        let mut required = vec![self.tools.rclone.clone()];
        if let Some(program) = unmount_program(self.platform) {
            required.push(program.to_string());
        }
        required.push("wg-quick".to_string());
        required.push("wg".to_string());

        required
            .into_iter()
            .filter(|tool| which::which(tool).is_err())
            .collect()
    }

    fn unsupported(&self, operation: &str) -> SupervisorError {
        SupervisorError::UnsupportedPlatform {
            operation: operation.to_string(),
            platform: self.platform.to_string(),
        }
    }

    fn elevated(&self, command: String) -> String {
        match self.platform {
            Platform::Linux | Platform::MacOs if self.tools.elevate => format!("sudo {}", command),
            _ => command,
        }
    }

    fn quote(&self, arg: &str) -> String {
        quote_arg(self.platform, arg)
    }
}

/// Program that releases a FUSE mount, per platform
fn unmount_program(platform: Platform) -> Option<&'static str> {
    match platform {
        Platform::Linux => Some("fusermount"),
        Platform::MacOs => Some("umount"),
        Platform::Windows => None,
    }
}

/// Quote an argument for the platform shell when it carries special characters
fn quote_arg(platform: Platform, arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-:@+=,".contains(c));
    if plain {
        return arg.to_string();
    }

    match platform {
        Platform::Windows => format!("\"{}\"", arg.replace('"', "\"\"")),
        Platform::Linux | Platform::MacOs => format!("'{}'", arg.replace('\'', "'\\''")),
    }
}

impl CommandProvider for SystemCommands {
    fn mount(&self, remote: &str, mount_path: &Path) -> Result<String, SupervisorError> {
        Ok(format!(
            "{} mount {} {} --vfs-cache-mode {}",
            self.quote(&self.tools.rclone),
            self.quote(remote),
            self.quote(&mount_path.to_string_lossy()),
            self.quote(&self.tools.vfs_cache_mode)
        ))
    }

    fn unmount(&self, mount_path: &Path) -> Result<String, SupervisorError> {
        let path = self.quote(&mount_path.to_string_lossy());
        match self.platform {
            Platform::Linux => Ok(format!("fusermount -u {}", path)),
            Platform::MacOs => Ok(format!("umount {}", path)),
            Platform::Windows => Err(self.unsupported("unmount")),
        }
    }

    fn tunnel_up(&self, config: &str) -> Result<String, SupervisorError> {
        Ok(self.elevated(format!("wg-quick up {}", self.quote(config))))
    }

    fn tunnel_down(&self, config: &str) -> Result<String, SupervisorError> {
        Ok(self.elevated(format!("wg-quick down {}", self.quote(config))))
    }

    fn tunnel_status(&self, config: &str) -> Result<String, SupervisorError> {
        Ok(self.elevated(format!("wg show {}", self.quote(config))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn commands(platform: Platform) -> SystemCommands {
        SystemCommands::new(platform, ToolsConfig::default())
    }

    #[test]
    fn test_platform_from_os() {
        assert_eq!(Platform::from_os("linux").unwrap(), Platform::Linux);
        assert_eq!(Platform::from_os("macos").unwrap(), Platform::MacOs);
        assert_eq!(Platform::from_os("windows").unwrap(), Platform::Windows);
        assert!(matches!(
            Platform::from_os("haiku"),
            Err(SupervisorError::UnsupportedPlatform { .. })
        ));
    }

    #[test]
    fn test_mount_command_is_platform_independent() {
        let path = PathBuf::from("/mnt/nas");
        for platform in [Platform::Linux, Platform::MacOs, Platform::Windows] {
            assert_eq!(
                commands(platform).mount("nas:", &path).unwrap(),
                "rclone mount nas: /mnt/nas --vfs-cache-mode writes"
            );
        }
    }

    #[test]
    fn test_unmount_per_platform() {
        let path = PathBuf::from("/mnt/nas");
        assert_eq!(
            commands(Platform::Linux).unmount(&path).unwrap(),
            "fusermount -u /mnt/nas"
        );
        assert_eq!(
            commands(Platform::MacOs).unmount(&path).unwrap(),
            "umount /mnt/nas"
        );
        assert!(matches!(
            commands(Platform::Windows).unmount(&path),
            Err(SupervisorError::UnsupportedPlatform { .. })
        ));
    }

    #[test]
    fn test_tunnel_commands_elevate_on_unix_only() {
        assert_eq!(
            commands(Platform::Linux).tunnel_up("client").unwrap(),
            "sudo wg-quick up client"
        );
        assert_eq!(
            commands(Platform::MacOs).tunnel_down("client").unwrap(),
            "sudo wg-quick down client"
        );
        assert_eq!(
            commands(Platform::Windows).tunnel_status("client").unwrap(),
            "wg show client"
        );

        let tools = ToolsConfig {
            elevate: false,
            ..ToolsConfig::default()
        };
        let plain = SystemCommands::new(Platform::Linux, tools);
        assert_eq!(plain.tunnel_status("client").unwrap(), "wg show client");
    }

    #[test]
    fn test_arguments_with_spaces_are_quoted() {
        let path = PathBuf::from("/mnt/my drive");
        assert_eq!(
            commands(Platform::Linux).unmount(&path).unwrap(),
            "fusermount -u '/mnt/my drive'"
        );
        assert_eq!(quote_arg(Platform::Linux, "it's"), "'it'\\''s'");
        assert_eq!(quote_arg(Platform::Windows, "a b"), "\"a b\"");
    }
}
