use std::time::Duration;

use crate::{probe, AppState};

/// Background liveness loop. Keeps the registry's reachability view
/// fresh between explicit status queries.
pub async fn health_check(state: AppState) {
    loop {
        let timeout = tokio::time::sleep(Duration::from_millis(state.config.probe.tick_time_ms));
        tokio::pin!(timeout);
        let _ = timeout.as_mut().await;
        let _ = probe::probe_all(&state).await;
    }
}
