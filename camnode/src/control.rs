use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use api::request::ControlRequest;
use api::response::{ControlResponse, StatusInfo};

use crate::error::NodeError;
use crate::AppState;

pub fn route() -> Router<AppState> {
    Router::new()
        .route(api::path::CONTROL, post(control))
        .route(api::path::STATUS, get(status))
}

async fn control(
    State(state): State<AppState>,
    Json(req): Json<ControlRequest>,
) -> Result<Json<ControlResponse>, NodeError> {
    Ok(Json(state.service.handle(req).await?))
}

async fn status(State(state): State<AppState>) -> Json<StatusInfo> {
    Json(state.service.status().await)
}
