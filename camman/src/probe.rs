use tracing::debug;

use api::response::StatusInfo;

use crate::store::NodeEntry;
use crate::AppState;

/// Probe every node's status endpoint concurrently with the short-timeout
/// client and fold the outcome into the registry. A timeout marks the
/// node unreachable for this observation only.
pub async fn probe_all(state: &AppState) -> Vec<NodeEntry> {
    let nodes = state.registry.snapshot();

    let handles: Vec<_> = nodes
        .into_iter()
        .map(|node| {
            let client = state.probe_client.clone();
            tokio::spawn(async move {
                let result = probe_one(&client, &node).await;
                (node, result)
            })
        })
        .collect();

    for handle in handles {
        if let Ok((node, result)) = handle.await {
            match result {
                Some(info) => {
                    debug!(alias = %node.alias, identity = %info.identity, "node reachable");
                    state
                        .registry
                        .set_health(&node.alias, true, Some(info.identity));
                }
                None => {
                    debug!(alias = %node.alias, "node unreachable");
                    state.registry.set_health(&node.alias, false, None);
                }
            }
        }
    }

    state.registry.snapshot()
}

/// One-shot reachability check against a single node, on the short
/// probe timeouts.
pub async fn is_responsive(state: &AppState, node: &NodeEntry) -> bool {
    probe_one(&state.probe_client, node).await.is_some()
}

async fn probe_one(client: &reqwest::Client, node: &NodeEntry) -> Option<StatusInfo> {
    let url = format!("{}{}", node.url, api::path::STATUS);
    let resp = client.get(&url).send().await.ok()?;
    if !resp.status().is_success() {
        return None;
    }
    resp.json::<StatusInfo>().await.ok()
}

/// Status of every reachable node, keyed by alias, for operations that
/// must inspect session state fleet-wide (the update guard).
pub async fn statuses(state: &AppState) -> Vec<(String, Option<StatusInfo>)> {
    let nodes = state.registry.snapshot();

    let handles: Vec<_> = nodes
        .into_iter()
        .map(|node| {
            let client = state.probe_client.clone();
            tokio::spawn(async move {
                let status = probe_one(&client, &node).await;
                (node.alias, status)
            })
        })
        .collect();

    let mut out = Vec::new();
    for handle in handles {
        if let Ok(pair) = handle.await {
            out.push(pair);
        }
    }
    out
}
