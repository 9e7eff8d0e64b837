//! HTTP control surface
//!
//! Thin request/response mapping over the two supervisors. Each supervisor
//! sits behind its own mutex, so requests against one kind are serialized.

pub mod mount;
pub mod tunnel;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use delos_core::error::SupervisorError;
use delos_core::supervisor::{
    CommandProvider, MountSupervisor, SupervisorSettings, TunnelSupervisor,
};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub mounts: Arc<Mutex<MountSupervisor>>,
    pub tunnels: Arc<Mutex<TunnelSupervisor>>,
}

impl AppState {
    pub fn new(provider: Arc<dyn CommandProvider>, settings: SupervisorSettings) -> Self {
        let tunnels = TunnelSupervisor::new(Arc::clone(&provider));
        let mounts = MountSupervisor::new(provider, settings);
        Self {
            mounts: Arc::new(Mutex::new(mounts)),
            tunnels: Arc::new(Mutex::new(tunnels)),
        }
    }

    /// Tear down both supervisors: mounts first, then the tunnels they may
    /// depend on
    pub async fn shutdown(&self) {
        info!("Shutting down supervisors");
        let mut failures = self.mounts.lock().await.shutdown().await;
        failures.extend(self.tunnels.lock().await.shutdown().await);

        for failure in &failures {
            if failure.is_fatal() {
                error!("Teardown left work for the operator: {}", failure);
            } else {
                warn!("Teardown failure: {}", failure);
            }
        }
        if failures.is_empty() {
            info!("All instances stopped");
        }
    }
}

/// Build the complete router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/rclone", mount::routes())
        .nest("/vpn", tunnel::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Body of a successful POST
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub action: String,
    pub message: String,
}

impl PostResponse {
    pub fn new(action: &str, message: String) -> Json<Self> {
        Json(Self {
            action: action.to_string(),
            message,
        })
    }
}

/// Body of a status GET
#[derive(Debug, Serialize)]
pub struct StatusResponse<T> {
    pub action: &'static str,
    pub instances: T,
}

/// Body of any failed request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Supervisor failure mapped to an HTTP status
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl From<SupervisorError> for ApiError {
    fn from(e: SupervisorError) -> Self {
        let status = match &e {
            SupervisorError::NotFound { .. } => StatusCode::NOT_FOUND,
            SupervisorError::AlreadyExists { .. } | SupervisorError::AlreadyRunning { .. } => {
                StatusCode::CONFLICT
            }
            SupervisorError::UnsupportedPlatform { .. } => StatusCode::NOT_IMPLEMENTED,
            SupervisorError::StartFailed { .. }
            | SupervisorError::StopFailed { .. }
            | SupervisorError::UnmountFailed { .. }
            | SupervisorError::KillFailed { .. }
            | SupervisorError::SpawnFailed { .. }
            | SupervisorError::MountExited { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            detail: e.to_string(),
        }
    }
}

impl ApiError {
    /// Prepend context to the detail, keeping the status
    fn prefixed(mut self, prefix: &str) -> Self {
        self.detail = format!("{}: {}", prefix, self.detail);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("API error: {} - {}", self.status, self.detail);
        } else {
            warn!("API error: {} - {}", self.status, self.detail);
        }

        let body = Json(ErrorResponse {
            detail: self.detail,
        });
        (self.status, body).into_response()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (
                SupervisorError::NotFound {
                    name: "a".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                SupervisorError::AlreadyExists {
                    name: "a".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                SupervisorError::AlreadyRunning {
                    name: "a".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                SupervisorError::UnmountFailed {
                    name: "a".to_string(),
                    output: "busy".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SupervisorError::KillFailed {
                    name: "a".to_string(),
                    pid: 1,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SupervisorError::UnsupportedPlatform {
                    operation: "unmount".to_string(),
                    platform: "Windows".to_string(),
                },
                StatusCode::NOT_IMPLEMENTED,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).status, expected);
        }
    }

    #[test]
    fn test_prefixed_keeps_status() {
        let error = ApiError::from(SupervisorError::UnmountFailed {
            name: "nas:".to_string(),
            output: "busy".to_string(),
        })
        .prefixed("Drive [ nas: ] added but unmount failed");

        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            error.detail,
            "Drive [ nas: ] added but unmount failed: Failed to unmount [ nas: ]: busy"
        );
    }

    #[test]
    fn test_error_detail_is_the_message() {
        let error = ApiError::from(SupervisorError::NotFound {
            name: "nas:".to_string(),
        });
        assert_eq!(error.detail, "Instance [ nas: ] not found");
    }
}
