use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::Capture;
use crate::error::NodeError;

use super::{BackendKind, CaptureBackend, RecordingHandle, RecordingPaths};

/// ffmpeg capture: a V4L2 device when one is configured, otherwise the
/// built-in test pattern source. The `mkvtimestamp_v2` muxer provides the
/// per-frame timestamp sidecar.
pub struct FfmpegBackend {
    capture: Capture,
}

impl FfmpegBackend {
    pub fn new(capture: Capture) -> Self {
        Self { capture }
    }

    fn input_args(&self) -> Vec<String> {
        match &self.capture.device {
            Some(device) => vec![
                "-f".into(),
                "v4l2".into(),
                "-framerate".into(),
                self.capture.fps.to_string(),
                "-video_size".into(),
                format!("{}x{}", self.capture.width, self.capture.height),
                "-i".into(),
                device.clone(),
            ],
            None => vec![
                "-f".into(),
                "lavfi".into(),
                "-i".into(),
                format!(
                    "testsrc=size={}x{}:rate={}",
                    self.capture.width, self.capture.height, self.capture.fps
                ),
            ],
        }
    }
}

#[async_trait]
impl CaptureBackend for FfmpegBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Ffmpeg
    }

    fn start(&self, paths: &RecordingPaths) -> Result<RecordingHandle, NodeError> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(self.input_args())
            .args(["-map", "0:v", "-c:v", "mjpeg", "-q:v", "2", "-f", "mjpeg"])
            .arg(&paths.video)
            .args(["-map", "0:v", "-vsync", "0", "-f", "mkvtimestamp_v2"])
            .arg(&paths.pts);
        debug!(?cmd, "starting ffmpeg capture");
        Ok(RecordingHandle::new(super::spawn_quiet(cmd)?))
    }

    async fn capture_still(&self, path: &Path) -> Result<(), NodeError> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(self.input_args())
            .args(["-frames:v", "1", "-q:v", "2"])
            .arg(path);
        debug!(?cmd, "capturing still");
        let out = cmd
            .output()
            .await
            .map_err(|e| NodeError::Backend(format!("spawn ffmpeg: {}", e)))?;
        if !out.status.success() {
            return Err(NodeError::Backend(format!(
                "ffmpeg exited with {}",
                out.status
            )));
        }
        Ok(())
    }
}
