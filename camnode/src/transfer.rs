use std::path::Path;

use reqwest::multipart::{Form, Part};
use tracing::info;

use crate::error::NodeError;

/// Push one named artifact (plus an optional timestamp log) to the
/// collection point. Success is transport-level completion, nothing more;
/// the caller deletes local copies only after this returns Ok.
pub async fn push_artifact(
    client: &reqwest::Client,
    collect_url: &str,
    artifact: &Path,
    pts_log: Option<&Path>,
) -> Result<(), NodeError> {
    let filename = file_name(artifact)?;

    let mut form = Form::new().part("artifact", file_part(artifact).await?);
    if let Some(pts_path) = pts_log {
        form = form.part("pts", file_part(pts_path).await?);
    }

    let url = format!("{}{}", collect_url, api::path::ingest(&filename));
    let resp = client
        .post(&url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| NodeError::Transfer(format!("push {}: {}", filename, e)))?;

    if !resp.status().is_success() {
        return Err(NodeError::Transfer(format!(
            "push {}: collection point returned {}",
            filename,
            resp.status()
        )));
    }
    info!(%filename, "artifact transferred");
    Ok(())
}

async fn file_part(path: &Path) -> Result<Part, NodeError> {
    let bytes = tokio::fs::read(path).await.map_err(NodeError::Storage)?;
    Ok(Part::bytes(bytes).file_name(file_name(path)?))
}

fn file_name(path: &Path) -> Result<String, NodeError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| NodeError::Transfer(format!("artifact path has no name: {:?}", path)))
}
