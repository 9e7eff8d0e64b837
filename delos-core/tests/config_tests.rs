//! Configuration file tests

use std::io::Write;
use std::path::PathBuf;

use delos_core::config::toml_config::{get_config_path, load_config, load_config_from_path};
use delos_core::error::{ConfigError, DelosError};
use tempfile::{tempdir, NamedTempFile};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_partial_config_uses_defaults() {
    let file = write_config(
        r#"
[server]
port = 9000
"#,
    );

    let config = load_config_from_path(file.path()).unwrap();
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.supervisor.grace_period_ms, 5000);
    assert_eq!(config.tools.vfs_cache_mode, "writes");
    assert!(config.remotes.is_empty());
}

#[test]
fn test_full_config() {
    let file = write_config(
        r#"
[server]
host = "0.0.0.0"
port = 8080

[supervisor]
settle_delay_ms = 250
grace_period_ms = 2000
kill_wait_ms = 500

[tools]
rclone = "/usr/local/bin/rclone"
vfs_cache_mode = "full"
elevate = false

[[remotes]]
name = "sgnas:"
mount_path = "/home/user/sg_nas"
automount = true

[[remotes]]
name = "backup:"
mount_path = "/mnt/backup"

[[tunnels]]
name = "client"
autostart = true
"#,
    );

    let config = load_config_from_path(file.path()).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.supervisor.settle_delay_ms, 250);
    assert!(!config.tools.elevate);
    assert_eq!(config.remotes.len(), 2);
    assert!(config.remotes[0].automount);
    assert!(!config.remotes[1].automount);
    assert_eq!(config.remotes[0].mount_path, PathBuf::from("/home/user/sg_nas"));
    assert_eq!(config.tunnels[0].name, "client");
    assert!(config.tunnels[0].autostart);
}

#[test]
fn test_invalid_toml_is_rejected() {
    let file = write_config("[server\nport = ");
    assert!(matches!(
        load_config_from_path(file.path()),
        Err(DelosError::Toml(_))
    ));
}

#[test]
fn test_validation_failure_is_rejected() {
    let file = write_config(
        r#"
[[tunnels]]
name = ""
"#,
    );
    assert!(matches!(
        load_config_from_path(file.path()),
        Err(DelosError::Config(ConfigError::ValidationError { .. }))
    ));
}

#[test]
fn test_config_dir_override() {
    let dir = tempdir().unwrap();
    std::env::set_var("DELOS_CONFIG_DIR", dir.path());

    assert_eq!(get_config_path().unwrap(), dir.path().join("config.toml"));
    // No file present: defaults
    let config = load_config(None).unwrap();
    assert_eq!(config.server.port, 8001);

    std::env::remove_var("DELOS_CONFIG_DIR");
}
