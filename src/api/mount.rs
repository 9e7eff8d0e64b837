//! `/rclone` routes

use std::path::PathBuf;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::{ApiError, AppState, PostResponse, StatusResponse};
use delos_core::types::MountStatusMap;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(add))
        .route("/mount", post(mount))
        .route("/unmount", post(unmount))
        .route("/remove", post(remove))
        .route("/status", get(status))
}

#[derive(Debug, Deserialize)]
struct AddParams {
    remote_name: String,
    mount_path: PathBuf,
    #[serde(default)]
    automount: bool,
}

#[derive(Debug, Deserialize)]
struct RemoteParams {
    remote_name: String,
}

async fn add(
    State(state): State<AppState>,
    Query(params): Query<AddParams>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let name = params.remote_name;
    let mut rcm = state.mounts.lock().await;
    rcm.add(&name, params.mount_path)?;

    let message = if params.automount {
        // The remote stays registered when the mount fails
        rcm.mount(&name).await.map_err(|e| {
            ApiError::from(e).prefixed(&format!("Drive [ {} ] added but mount failed", name))
        })?;
        format!("Drive [ {} ] added and mounted", name)
    } else {
        format!("Drive [ {} ] added", name)
    };
    Ok((StatusCode::CREATED, PostResponse::new("add", message)))
}

async fn mount(
    State(state): State<AppState>,
    Query(params): Query<RemoteParams>,
) -> Result<Json<PostResponse>, ApiError> {
    let name = params.remote_name;
    state.mounts.lock().await.mount(&name).await?;
    Ok(PostResponse::new("mount", format!("Drive [ {} ] mounted", name)))
}

async fn unmount(
    State(state): State<AppState>,
    Query(params): Query<RemoteParams>,
) -> Result<Json<PostResponse>, ApiError> {
    let name = params.remote_name;
    state.mounts.lock().await.unmount(&name).await?;
    Ok(PostResponse::new(
        "unmount",
        format!("Drive [ {} ] unmounted", name),
    ))
}

async fn remove(
    State(state): State<AppState>,
    Query(params): Query<RemoteParams>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let name = params.remote_name;
    state.mounts.lock().await.remove(&name).await?;
    Ok((
        StatusCode::CREATED,
        PostResponse::new("remove", format!("Drive [ {} ] removed", name)),
    ))
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse<MountStatusMap>> {
    let instances = state.mounts.lock().await.status();
    Json(StatusResponse {
        action: "status",
        instances,
    })
}
