//! TOML configuration file I/O
//!
//! Handles loading and saving supervisor configuration to/from TOML files
//! in the user's configuration directory.

use crate::config::DelosConfig;
use crate::error::{ConfigError, DelosError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default configuration file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the default configuration directory
///
/// Returns ~/.config/delos, or DELOS_CONFIG_DIR environment variable if set.
/// Under sudo the invoking user's home is used.
pub fn get_config_dir() -> Result<PathBuf, DelosError> {
    if let Ok(config_dir) = std::env::var("DELOS_CONFIG_DIR") {
        return Ok(PathBuf::from(config_dir));
    }

    let home = if let Ok(sudo_user) = std::env::var("SUDO_USER") {
        std::env::var("SUDO_HOME").unwrap_or_else(|_| format!("/home/{}", sudo_user))
    } else {
        std::env::var("HOME").map_err(|_| {
            DelosError::Config(ConfigError::IoError {
                message: "HOME environment variable not set".to_string(),
            })
        })?
    };

    Ok(PathBuf::from(home).join(".config").join("delos"))
}

/// Get the default configuration file path
pub fn get_config_path() -> Result<PathBuf, DelosError> {
    let config_dir = get_config_dir()?;
    Ok(config_dir.join(CONFIG_FILE_NAME))
}

/// Check if the default configuration file exists
pub fn config_exists() -> Result<bool, DelosError> {
    let config_path = get_config_path()?;
    Ok(config_path.exists())
}

/// Load configuration
///
/// An explicit path must exist. Without one the default file is used when
/// present, and built-in defaults otherwise.
pub fn load_config(explicit: Option<&Path>) -> Result<DelosConfig, DelosError> {
    if let Some(path) = explicit {
        return load_config_from_path(path);
    }

    let config_path = get_config_path()?;
    if !config_path.exists() {
        debug!(
            "No configuration at {}, using defaults",
            config_path.display()
        );
        return Ok(DelosConfig::default());
    }

    load_config_from_path(&config_path)
}

/// Load configuration from a specific TOML file
pub fn load_config_from_path<P: AsRef<Path>>(path: P) -> Result<DelosConfig, DelosError> {
    let contents = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DelosError::Config(ConfigError::LoadFailed {
            path: path.as_ref().to_string_lossy().to_string(),
        }),
        _ => DelosError::Config(ConfigError::IoError {
            message: format!("Failed to read config file: {}", e),
        }),
    })?;

    let config: DelosConfig = toml::from_str(&contents)?;

    config
        .validate()
        .map_err(|e| DelosError::Config(ConfigError::ValidationError { message: e }))?;

    info!(
        "Loaded configuration from {} ({} remote(s), {} tunnel(s))",
        path.as_ref().display(),
        config.remotes.len(),
        config.tunnels.len()
    );

    Ok(config)
}

/// Save configuration to a specific TOML file
pub fn save_config_to_path<P: AsRef<Path>>(
    config: &DelosConfig,
    path: P,
) -> Result<(), DelosError> {
    config
        .validate()
        .map_err(|e| DelosError::Config(ConfigError::ValidationError { message: e }))?;

    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            DelosError::Config(ConfigError::IoError {
                message: format!("Failed to create config directory: {}", e),
            })
        })?;
    }

    let contents = toml::to_string_pretty(config)?;

    std::fs::write(&path, contents).map_err(|_e| {
        DelosError::Config(ConfigError::SaveFailed {
            path: path.as_ref().to_string_lossy().to_string(),
        })
    })?;

    info!("Saved configuration to {:?}", path.as_ref());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RemoteConfig, TunnelConfig};
    use tempfile::tempdir;

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = DelosConfig::default();
        original.server.port = 9100;
        original.remotes.push(RemoteConfig {
            name: "nas:".to_string(),
            mount_path: PathBuf::from("/mnt/nas"),
            automount: true,
        });
        original.tunnels.push(TunnelConfig {
            name: "client".to_string(),
            autostart: false,
        });

        save_config_to_path(&original, &config_path).unwrap();
        let loaded = load_config_from_path(&config_path).unwrap();

        assert_eq!(original, loaded);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let temp_dir = tempdir().unwrap();
        let missing = temp_dir.path().join("absent.toml");

        let result = load_config(Some(&missing));
        assert!(matches!(
            result,
            Err(DelosError::Config(ConfigError::LoadFailed { .. }))
        ));
    }

    #[test]
    fn test_invalid_config_is_not_saved() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = DelosConfig::default();
        config.server.port = 0;

        assert!(save_config_to_path(&config, &config_path).is_err());
        assert!(!config_path.exists());
    }
}
