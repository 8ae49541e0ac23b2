use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::Capture;
use crate::error::NodeError;

use super::{BackendKind, CaptureBackend, RecordingHandle, RecordingPaths};

/// Raspberry Pi camera stack. `rpicam-vid` writes the MJPEG stream and,
/// with `--save-pts`, the per-frame timestamp sidecar we need for offline
/// alignment.
pub struct RpicamBackend {
    capture: Capture,
}

impl RpicamBackend {
    pub fn new(capture: Capture) -> Self {
        Self { capture }
    }
}

pub async fn available() -> bool {
    match tokio::time::timeout(
        Duration::from_secs(3),
        Command::new("rpicam-vid").arg("--version").output(),
    )
    .await
    {
        Ok(Ok(out)) => out.status.success(),
        _ => false,
    }
}

#[async_trait]
impl CaptureBackend for RpicamBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Rpicam
    }

    fn start(&self, paths: &RecordingPaths) -> Result<RecordingHandle, NodeError> {
        let mut cmd = Command::new("rpicam-vid");
        cmd.arg("-n")
            .args(["-t", "0"])
            .args(["--codec", "mjpeg"])
            .args(["--width", &self.capture.width.to_string()])
            .args(["--height", &self.capture.height.to_string()])
            .args(["--framerate", &self.capture.fps.to_string()])
            .arg("-o")
            .arg(&paths.video)
            .arg("--save-pts")
            .arg(&paths.pts);
        debug!(?cmd, "starting rpicam-vid");
        Ok(RecordingHandle::new(super::spawn_quiet(cmd)?))
    }

    async fn capture_still(&self, path: &Path) -> Result<(), NodeError> {
        let mut cmd = Command::new("rpicam-still");
        cmd.arg("-n")
            .args(["--width", &self.capture.width.to_string()])
            .args(["--height", &self.capture.height.to_string()])
            .arg("-o")
            .arg(path);
        debug!(?cmd, "capturing still");
        let out = cmd
            .output()
            .await
            .map_err(|e| NodeError::Backend(format!("spawn rpicam-still: {}", e)))?;
        if !out.status.success() {
            return Err(NodeError::Backend(format!(
                "rpicam-still exited with {}",
                out.status
            )));
        }
        Ok(())
    }
}
