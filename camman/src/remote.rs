use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::info;

use api::request::Action;

use crate::store::NodeEntry;
use crate::{probe, AppState};

/// Execute a service lifecycle action over the out-of-band channel.
/// Restart is idempotent: a node that already answers its status
/// endpoint is left alone.
pub async fn run_action(
    state: &AppState,
    action: Action,
    node: &NodeEntry,
) -> Result<Option<serde_json::Value>, String> {
    let template = match action {
        Action::RestartService => {
            if probe::is_responsive(state, node).await {
                return Ok(Some(serde_json::json!({"detail": "already running"})));
            }
            &state.config.remote.start_command
        }
        Action::StopService => &state.config.remote.stop_command,
        Action::UpdateService => &state.config.remote.update_command,
        other => return Err(format!("{} is not a remote action", other)),
    };
    run_command(state, node, template).await?;
    Ok(None)
}

async fn run_command(state: &AppState, node: &NodeEntry, template: &str) -> Result<(), String> {
    if node.host.is_empty() {
        return Err("no remote host configured".to_string());
    }
    let rendered = template.replace("{host}", &node.host);
    info!(alias = %node.alias, command = %rendered, "remote command");

    let child = Command::new("sh")
        .arg("-c")
        .arg(&rendered)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("spawn: {}", e))?;

    let timeout = Duration::from_millis(state.config.remote.command_timeout_ms);
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| format!("remote command timed out after {:?}", timeout))?
        .map_err(|e| e.to_string())?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!(
            "remote command failed ({}): {}",
            output.status,
            stderr.trim()
        ))
    }
}
