//! `/vpn` routes

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::{ApiError, AppState, PostResponse, StatusResponse};
use delos_core::types::TunnelStatusMap;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(add))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/remove", post(remove))
        .route("/status", get(status))
}

#[derive(Debug, Deserialize)]
struct AddParams {
    config_name: String,
    #[serde(default)]
    autostart: bool,
}

#[derive(Debug, Deserialize)]
struct TunnelParams {
    config_name: String,
}

async fn add(
    State(state): State<AppState>,
    Query(params): Query<AddParams>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let name = params.config_name;
    let mut wgm = state.tunnels.lock().await;
    wgm.add(&name)?;

    let message = if params.autostart {
        // The config stays registered when the start fails
        wgm.start(&name).await.map_err(|e| {
            ApiError::from(e).prefixed(&format!("Tunnel [ {} ] added but start failed", name))
        })?;
        format!("Tunnel [ {} ] added and started", name)
    } else {
        format!("Tunnel [ {} ] added", name)
    };
    Ok((StatusCode::CREATED, PostResponse::new("add", message)))
}

async fn start(
    State(state): State<AppState>,
    Query(params): Query<TunnelParams>,
) -> Result<Json<PostResponse>, ApiError> {
    let name = params.config_name;
    state.tunnels.lock().await.start(&name).await?;
    Ok(PostResponse::new("start", format!("Tunnel [ {} ] started", name)))
}

async fn stop(
    State(state): State<AppState>,
    Query(params): Query<TunnelParams>,
) -> Result<Json<PostResponse>, ApiError> {
    let name = params.config_name;
    state.tunnels.lock().await.stop(&name).await?;
    Ok(PostResponse::new("stop", format!("Tunnel [ {} ] stopped", name)))
}

async fn remove(
    State(state): State<AppState>,
    Query(params): Query<TunnelParams>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let name = params.config_name;
    state.tunnels.lock().await.remove(&name).await?;
    Ok((
        StatusCode::CREATED,
        PostResponse::new("remove", format!("Tunnel [ {} ] removed", name)),
    ))
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse<TunnelStatusMap>> {
    let instances = state.tunnels.lock().await.status().await;
    Json(StatusResponse {
        action: "status",
        instances,
    })
}
