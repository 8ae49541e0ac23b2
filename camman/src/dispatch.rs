use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use api::request::{Action, ControlRequest, StartParams};
use api::response::{ControlResponse, RecordingState};

use crate::error::AppError;
use crate::result::Result;
use crate::store::NodeEntry;
use crate::{remote, roles, AppState};

/// Outcome of one node call inside a fan-out. Failures carry the node's
/// own error text when it produced one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResult {
    pub alias: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchReport {
    pub action: String,
    pub all_ok: bool,
    pub results: Vec<DispatchResult>,
}

impl DispatchReport {
    fn new(action: impl Into<String>, results: Vec<DispatchResult>) -> Self {
        Self {
            action: action.into(),
            all_ok: results.iter().all(|r| r.ok),
            results,
        }
    }
}

/// Fan an action out to the targeted nodes, or the whole fleet when no
/// targets are named. Results come back in configuration order no matter
/// how the calls interleave.
pub async fn dispatch(
    state: &AppState,
    action: Action,
    targets: Option<Vec<String>>,
) -> Result<DispatchReport> {
    let nodes = resolve_targets(state, targets)?;

    if action == Action::UpdateService {
        if let Some(report) = update_guard(state, &nodes).await {
            return Ok(report);
        }
    }

    let session = Uuid::new_v4();
    let results = fan_out(state, action, session, nodes).await;
    let report = DispatchReport::new(action.as_str(), results);
    info!(action = %report.action, all_ok = report.all_ok, "fan-out complete");
    Ok(report)
}

/// End a capture session across the fleet: stop every recording, then
/// collect the artifacts from exactly the nodes that stopped cleanly.
/// The two phases merge into one report per node.
pub async fn stop_session(state: &AppState) -> Result<DispatchReport> {
    let nodes = resolve_targets(state, None)?;
    let stopped = fan_out(state, Action::StopRecording, Uuid::new_v4(), nodes.clone()).await;

    let transfer_targets: Vec<NodeEntry> = nodes
        .into_iter()
        .zip(stopped.iter())
        .filter(|(_, r)| r.ok)
        .map(|(n, _)| n)
        .collect();
    let transferred = fan_out(
        state,
        Action::TransferRecording,
        Uuid::new_v4(),
        transfer_targets,
    )
    .await;

    let report = DispatchReport::new("stop_session", merge_phases(stopped, transferred));
    info!(all_ok = report.all_ok, "session stop complete");
    Ok(report)
}

/// Merge the stop and transfer phases into one result per node. Transfer
/// results are matched back by alias, never by position, so a node is
/// never credited with another node's outcome.
pub(crate) fn merge_phases(
    stopped: Vec<DispatchResult>,
    transferred: Vec<DispatchResult>,
) -> Vec<DispatchResult> {
    let mut transfers: HashMap<String, DispatchResult> = transferred
        .into_iter()
        .map(|r| (r.alias.clone(), r))
        .collect();
    stopped
        .into_iter()
        .map(|stop| {
            if !stop.ok {
                return stop;
            }
            match transfers.remove(&stop.alias) {
                Some(transfer) => transfer,
                None => DispatchResult {
                    alias: stop.alias,
                    ok: false,
                    error: Some("transfer result missing".to_string()),
                    payload: None,
                },
            }
        })
        .collect()
}

fn resolve_targets(state: &AppState, targets: Option<Vec<String>>) -> Result<Vec<NodeEntry>> {
    let all = state.registry.snapshot();
    match targets {
        None => Ok(all),
        Some(aliases) => {
            for alias in &aliases {
                if !all.iter().any(|n| &n.alias == alias) {
                    return Err(AppError::UnknownNode(alias.clone()));
                }
            }
            // Keep configuration order, not request order.
            Ok(all
                .into_iter()
                .filter(|n| aliases.iter().any(|a| a == &n.alias))
                .collect())
        }
    }
}

/// A service update must never interrupt a live session. Any node that
/// reports a non-idle state blocks the whole fan-out.
async fn update_guard(state: &AppState, nodes: &[NodeEntry]) -> Option<DispatchReport> {
    let statuses = crate::probe::statuses(state).await;
    let blocking: Vec<DispatchResult> = nodes
        .iter()
        .filter_map(|node| {
            let status = statuses
                .iter()
                .find(|(alias, _)| alias == &node.alias)
                .and_then(|(_, s)| s.as_ref())?;
            if status.state == RecordingState::Idle {
                None
            } else {
                Some(DispatchResult {
                    alias: node.alias.clone(),
                    ok: false,
                    error: Some(format!("session in progress ({:?})", status.state)),
                    payload: None,
                })
            }
        })
        .collect();

    if blocking.is_empty() {
        None
    } else {
        warn!(count = blocking.len(), "update blocked by live sessions");
        Some(DispatchReport::new(Action::UpdateService.as_str(), blocking))
    }
}

async fn fan_out(
    state: &AppState,
    action: Action,
    session: Uuid,
    nodes: Vec<NodeEntry>,
) -> Vec<DispatchResult> {
    let semaphore = Arc::new(Semaphore::new(state.config.fleet.max_in_flight));
    let timeout = Duration::from_millis(state.config.fleet.request_timeout_ms);

    let handles: Vec<_> = nodes
        .into_iter()
        .map(|node| {
            let alias = node.alias.clone();
            let semaphore = semaphore.clone();
            let state = state.clone();
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire().await;
                run_one(&state, action, session, node, timeout).await
            });
            (alias, handle)
        })
        .collect();

    // Exactly one result per target node, even when a task dies.
    let mut results = Vec::with_capacity(handles.len());
    for (alias, handle) in handles {
        results.push(match handle.await {
            Ok(result) => result,
            Err(err) => {
                warn!(%alias, %err, "dispatch task failed");
                DispatchResult {
                    alias,
                    ok: false,
                    error: Some(format!("dispatch task failed: {}", err)),
                    payload: None,
                }
            }
        });
    }
    results
}

async fn run_one(
    state: &AppState,
    action: Action,
    session: Uuid,
    node: NodeEntry,
    timeout: Duration,
) -> DispatchResult {
    let outcome = if action.is_remote() {
        remote::run_action(state, action, &node).await
    } else {
        call_node(state, action, session, &node, timeout).await
    };
    match outcome {
        Ok(payload) => DispatchResult {
            alias: node.alias,
            ok: true,
            error: None,
            payload,
        },
        Err(error) => {
            warn!(alias = %node.alias, %action, %error, "node call failed");
            DispatchResult {
                alias: node.alias,
                ok: false,
                error: Some(error),
                payload: None,
            }
        }
    }
}

async fn call_node(
    state: &AppState,
    action: Action,
    session: Uuid,
    node: &NodeEntry,
    timeout: Duration,
) -> std::result::Result<Option<serde_json::Value>, String> {
    let params = match action {
        Action::StartRecording => {
            let role = roles::role_for(&state.config, &node.alias);
            Some(
                serde_json::to_value(StartParams { session, role })
                    .map_err(|e| e.to_string())?,
            )
        }
        _ => None,
    };
    let request = ControlRequest { action, params };

    let url = format!("{}{}", node.url, api::path::CONTROL);
    let resp = state
        .client
        .post(&url)
        .timeout(timeout)
        .json(&request)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = resp.status();
    let body: ControlResponse = resp
        .json()
        .await
        .map_err(|_| format!("node returned {}", status))?;
    if body.success {
        Ok(body.payload)
    } else {
        // The node's own error text travels back verbatim.
        Err(body
            .error
            .unwrap_or_else(|| format!("node returned {}", status)))
    }
}
