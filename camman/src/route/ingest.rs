use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path, State};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::AppError;
use crate::result::Result;
use crate::AppState;

/// Receive a node's artifact push. Storage is append-only: a name that
/// already exists is refused, never overwritten. Fields stream to disk;
/// a recording does not fit in memory.
pub async fn ingest(
    State(state): State<AppState>,
    Path(name): Path<String>,
    mut multipart: Multipart,
) -> Result<&'static str> {
    check_name(&name)?;

    let dir = &state.config.storage.directory;
    tokio::fs::create_dir_all(dir).await?;

    let mut saved = 0usize;
    while let Some(mut field) = multipart.next_field().await? {
        let filename = match field.file_name() {
            Some(f) => f.to_string(),
            None => name.clone(),
        };
        check_name(&filename)?;

        let path = dir.join(&filename);
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(AppError::ArtifactExists(filename));
            }
            Err(e) => return Err(e.into()),
        };

        let bytes = match store_field(&mut field, &mut file).await {
            Ok(bytes) => bytes,
            Err(e) => {
                // A partial file must not block the node's retry.
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e);
            }
        };
        info!(file = %filename, bytes, "artifact stored");
        saved += 1;
    }

    if saved == 0 {
        return Err(AppError::BadArtifactName(name));
    }
    Ok("ok")
}

async fn store_field(field: &mut Field<'_>, file: &mut File) -> Result<u64> {
    let mut bytes = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        bytes += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(bytes)
}

fn check_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.');
    if bad {
        Err(AppError::BadArtifactName(name.to_string()))
    } else {
        Ok(())
    }
}
