use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::config::Config;
use crate::AppState;

pub mod fleet;
pub mod ingest;
pub mod node;

pub fn route(cfg: &Config) -> Router<AppState> {
    Router::new()
        .route("/api/fleet/:action", post(fleet::dispatch))
        .route("/api/session/stop", post(fleet::stop_session))
        .route("/api/nodes", get(node::index))
        .route(
            "/api/ingest/:name",
            post(ingest::ingest)
                // A whole recording arrives in one push, far past axum's
                // 2 MB default.
                .layer(DefaultBodyLimit::max(
                    cfg.storage.max_artifact_size_mb * 1024 * 1024,
                )),
        )
}
