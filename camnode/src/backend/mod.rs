use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::config::Capture;
use crate::error::NodeError;

pub mod ffmpeg;
pub mod rpicam;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BackendKind {
    Rpicam,
    Ffmpeg,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Rpicam => "rpicam",
            BackendKind::Ffmpeg => "ffmpeg",
        }
    }
}

/// Output locations of one recording: the raw MJPEG stream and its
/// per-frame timestamp log.
#[derive(Debug, Clone)]
pub struct RecordingPaths {
    pub video: PathBuf,
    pub pts: PathBuf,
}

/// A capture device producing timestamped frames. Selected once at node
/// startup; the state machine never cares which implementation it drives.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Spawn the capture process writing to `paths` until stopped.
    fn start(&self, paths: &RecordingPaths) -> Result<RecordingHandle, NodeError>;

    /// Grab a single JPEG. Only valid while no recording runs; the capture
    /// device is exclusive.
    async fn capture_still(&self, path: &Path) -> Result<(), NodeError>;
}

/// Owns the spawned capture process for one recording.
pub struct RecordingHandle {
    child: Option<Child>,
}

impl RecordingHandle {
    pub fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    /// Handle without a process, for backends that produce their output
    /// up-front (tests).
    pub fn detached() -> Self {
        Self { child: None }
    }

    /// Stop the capture process, giving it a chance to flush its output
    /// files before being killed.
    pub async fn stop(mut self) -> Result<(), NodeError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        #[cfg(unix)]
        if let Some(pid) = child.id() {
            // SIGINT lets rpicam-vid/ffmpeg finalize the MJPEG tail.
            unsafe {
                libc::kill(pid as i32, libc::SIGINT);
            }
        }

        match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
            Ok(Ok(status)) => {
                info!(?status, "capture process exited");
                Ok(())
            }
            Ok(Err(e)) => Err(NodeError::Backend(format!("wait capture process: {}", e))),
            Err(_) => {
                warn!("capture process ignored SIGINT, killing");
                child
                    .kill()
                    .await
                    .map_err(|e| NodeError::Backend(format!("kill capture process: {}", e)))?;
                Ok(())
            }
        }
    }
}

/// Pick the backend for this node. A backend is a node-local capability
/// decision: the orchestrator never selects one.
pub async fn detect(capture: &Capture) -> Box<dyn CaptureBackend> {
    match capture.backend.as_str() {
        "rpicam" => Box::new(rpicam::RpicamBackend::new(capture.clone())),
        "ffmpeg" => Box::new(ffmpeg::FfmpegBackend::new(capture.clone())),
        _ => {
            if rpicam::available().await {
                info!("rpicam-vid found, using rpicam backend");
                Box::new(rpicam::RpicamBackend::new(capture.clone()))
            } else {
                info!("rpicam-vid not found, using ffmpeg backend");
                Box::new(ffmpeg::FfmpegBackend::new(capture.clone()))
            }
        }
    }
}

pub(crate) fn spawn_quiet(mut cmd: Command) -> Result<Child, NodeError> {
    cmd.stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| NodeError::Backend(format!("spawn {:?}: {}", cmd.as_std().get_program(), e)))
}
