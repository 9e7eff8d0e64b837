//! Unit tests for error types and conversions

use delos_core::error::{ConfigError, DelosError, SupervisorError};

#[test]
fn test_supervisor_error_display() {
    let error = SupervisorError::NotFound {
        name: "nas:".to_string(),
    };
    assert_eq!(error.to_string(), "Instance [ nas: ] not found");

    let error = SupervisorError::UnmountFailed {
        name: "nas:".to_string(),
        output: "target is busy".to_string(),
    };
    assert_eq!(error.to_string(), "Failed to unmount [ nas: ]: target is busy");
}

#[test]
fn test_kill_failed_names_the_pid() {
    let error = SupervisorError::KillFailed {
        name: "nas:".to_string(),
        pid: 4242,
    };
    assert!(error.to_string().contains("4242"));
    assert!(error.is_fatal());
}

#[test]
fn test_instance_name() {
    let error = SupervisorError::StartFailed {
        name: "client".to_string(),
        output: String::new(),
    };
    assert_eq!(error.instance_name(), Some("client"));

    let error = SupervisorError::UnsupportedPlatform {
        operation: "unmount".to_string(),
        platform: "Windows".to_string(),
    };
    assert_eq!(error.instance_name(), None);
    assert!(error.is_fatal());
}

#[test]
fn test_registry_errors_are_not_fatal() {
    for error in [
        SupervisorError::AlreadyExists {
            name: "a".to_string(),
        },
        SupervisorError::NotFound {
            name: "a".to_string(),
        },
        SupervisorError::AlreadyRunning {
            name: "a".to_string(),
        },
    ] {
        assert!(!error.is_fatal());
    }
}

#[test]
fn test_delos_error_from_supervisor() {
    let error: DelosError = SupervisorError::NotFound {
        name: "a".to_string(),
    }
    .into();
    assert!(matches!(error, DelosError::Supervisor(_)));
}

#[test]
fn test_delos_error_from_config() {
    let error: DelosError = ConfigError::ValidationError {
        message: "bad".to_string(),
    }
    .into();
    assert!(matches!(error, DelosError::Config(_)));
}

#[test]
fn test_delos_error_from_toml() {
    let toml_error: toml::de::Error =
        toml::from_str::<serde_json::Value>("invalid toml").unwrap_err();
    let error: DelosError = toml_error.into();
    assert!(matches!(error, DelosError::Toml(_)));
}
