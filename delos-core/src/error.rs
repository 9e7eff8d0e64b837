//! Error types for the delos supervisor
//!
//! This module defines all error types used throughout the application,
//! providing consistent error handling and operator-readable messages.

use thiserror::Error;

/// Main error type for the delos application
#[derive(Error, Debug)]
pub enum DelosError {
    /// Errors related to configuration loading/parsing
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors raised by a supervisor or one of its instances
    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {path}")]
    LoadFailed { path: String },

    #[error("Failed to save configuration file: {path}")]
    SaveFailed { path: String },

    #[error("Configuration validation error: {message}")]
    ValidationError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// Instance registry and process lifecycle errors
///
/// Registry-level variants (`AlreadyExists`, `NotFound`) are always
/// recoverable by the caller. The external-tool variants carry the tool's
/// combined stdout/stderr so the HTTP layer can hand it back verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("Instance [ {name} ] already exists")]
    AlreadyExists { name: String },

    #[error("Instance [ {name} ] not found")]
    NotFound { name: String },

    #[error("Instance [ {name} ] is already running")]
    AlreadyRunning { name: String },

    #[error("Failed to start [ {name} ]: {output}")]
    StartFailed { name: String, output: String },

    #[error("Failed to stop [ {name} ]: {output}")]
    StopFailed { name: String, output: String },

    #[error("Failed to unmount [ {name} ]: {output}")]
    UnmountFailed { name: String, output: String },

    /// The process survived SIGKILL; somebody has to clean it up by hand
    #[error("Process {pid} of [ {name} ] failed to die. Please kill it manually.")]
    KillFailed { name: String, pid: u32 },

    #[error("Command '{operation}' is not supported on {platform}")]
    UnsupportedPlatform { operation: String, platform: String },

    #[error("Failed to launch command for [ {name} ]: {reason}")]
    SpawnFailed { name: String, reason: String },

    #[error("Mount process of [ {name} ] exited during startup ({status}): {output}")]
    MountExited {
        name: String,
        status: String,
        output: String,
    },
}

impl SupervisorError {
    /// Name of the instance the error refers to, if any
    pub fn instance_name(&self) -> Option<&str> {
        match self {
            SupervisorError::AlreadyExists { name }
            | SupervisorError::NotFound { name }
            | SupervisorError::AlreadyRunning { name }
            | SupervisorError::StartFailed { name, .. }
            | SupervisorError::StopFailed { name, .. }
            | SupervisorError::UnmountFailed { name, .. }
            | SupervisorError::KillFailed { name, .. }
            | SupervisorError::SpawnFailed { name, .. }
            | SupervisorError::MountExited { name, .. } => Some(name),
            SupervisorError::UnsupportedPlatform { .. } => None,
        }
    }

    /// Whether the failure needs operator intervention
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SupervisorError::KillFailed { .. } | SupervisorError::UnsupportedPlatform { .. }
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, DelosError>;
