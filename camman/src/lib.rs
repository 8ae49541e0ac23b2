use std::{future::Future, time::Duration};

use axum::{extract::Request, Router};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, info_span};

use crate::config::Config;
use crate::store::NodeRegistry;

pub mod config;
pub mod dispatch;
pub mod error;
pub mod probe;
pub mod remote;
pub mod result;
pub mod roles;
pub mod route;
pub mod store;
pub mod tick;


#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Control-plane client for fan-out calls; per-request timeout is
    /// applied at the call site from the fleet config.
    pub client: reqwest::Client,
    /// Short-timeout client reserved for liveness probes.
    pub probe_client: reqwest::Client,
    pub registry: NodeRegistry,
}

impl AppState {
    pub fn new(cfg: Config) -> Self {
        let probe_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(cfg.probe.connect_timeout_ms))
            .timeout(Duration::from_millis(cfg.probe.timeout_ms))
            .build()
            .unwrap();
        Self {
            client: reqwest::Client::new(),
            probe_client,
            registry: NodeRegistry::new(&cfg.nodes),
            config: cfg,
        }
    }
}

pub async fn serve<F>(cfg: Config, listener: TcpListener, signal: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Server listening on {}", listener.local_addr().unwrap());
    let app_state = AppState::new(cfg.clone());

    let app = Router::new()
        .merge(route::route(&cfg))
        .layer(if cfg.http.cors {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        })
        .with_state(app_state.clone())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                info_span!(
                    "http_request",
                    uri = ?request.uri(),
                    method = ?request.method(),
                )
            }),
        );

    tokio::spawn(tick::health_check(app_state));
    axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await
        .unwrap_or_else(|e| error!("Application error: {e}"));
}
