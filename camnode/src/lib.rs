use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::ptz::LogPtzDriver;
use crate::session::NodeService;

pub mod backend;
pub mod config;
pub mod control;
pub mod error;
pub mod ptz;
pub mod session;
pub mod transfer;

mod test;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<NodeService>,
}

pub async fn serve<F>(cfg: Config, listener: TcpListener, shutdown: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let backend = backend::detect(&cfg.capture).await;
    info!(
        alias = %cfg.node.alias,
        backend = backend.kind().as_str(),
        "node service starting"
    );

    let (restart_tx, mut restart_rx) = mpsc::channel::<&'static str>(1);
    let service = Arc::new(NodeService::new(
        &cfg,
        backend,
        Box::new(LogPtzDriver),
        restart_tx,
    ));

    let app = control::route()
        .with_state(AppState { service })
        .layer(if cfg.http.cors {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        })
        .layer(TraceLayer::new_for_http());

    let graceful = async move {
        tokio::select! {
            _ = shutdown => {}
            reason = restart_rx.recv() => {
                // "Restart requested": exit cleanly and let the external
                // supervisor relaunch the process.
                info!(reason = reason.unwrap_or("unknown"), "restart requested, shutting down");
            }
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(graceful)
        .await
        .unwrap_or_else(|e| error!("Application error: {e}"));
}
