use axum::{extract::State, Json};

use crate::store::NodeEntry;
use crate::{probe, AppState};

/// Fleet view with fresh reachability. Every call re-probes rather than
/// serving the background tick's last observation.
pub async fn index(State(state): State<AppState>) -> Json<Vec<NodeEntry>> {
    Json(probe::probe_all(&state).await)
}
