use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use api::request::Action;

use crate::dispatch::{self, DispatchReport};
use crate::error::AppError;
use crate::result::Result;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DispatchBody {
    /// Subset of node aliases to target. Absent means the whole fleet.
    #[serde(default)]
    pub targets: Option<Vec<String>>,
}

pub async fn dispatch(
    State(state): State<AppState>,
    Path(action): Path<String>,
    body: Option<Json<DispatchBody>>,
) -> Result<Json<DispatchReport>> {
    let action: Action = action
        .parse()
        .map_err(|_| AppError::UnknownAction(action.clone()))?;
    let targets = body.and_then(|Json(b)| b.targets);
    let report = dispatch::dispatch(&state, action, targets).await?;
    Ok(Json(report))
}

pub async fn stop_session(State(state): State<AppState>) -> Result<Json<DispatchReport>> {
    let report = dispatch::stop_session(&state).await?;
    Ok(Json(report))
}
