use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::fs;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use api::request::{Action, ControlRequest, Role, StartParams};
use api::response::{ControlResponse, PtzAngles, RecordingState, StatusInfo};

use crate::backend::{CaptureBackend, RecordingHandle, RecordingPaths};
use crate::config::Config;
use crate::error::NodeError;
use crate::ptz::{self, PtzDriver};
use crate::transfer;

/// One capture session on this node, alive from a successful
/// `start_recording` until its artifact left the node.
#[derive(Debug, Clone)]
pub struct RecordingSession {
    pub id: Uuid,
    pub role: Role,
    pub state: RecordingState,
    pub paths: RecordingPaths,
}

#[derive(Default)]
struct Inner {
    session: Option<RecordingSession>,
    handle: Option<RecordingHandle>,
    still: Option<PathBuf>,
    ptz: PtzAngles,
}

/// The node's single owner of session state, PTZ angles and the capture
/// backend. Every control command goes through the mutex, so overlapping
/// requests are strictly serialized: a second `start_recording` racing an
/// in-flight one observes "already recording", never a double start.
pub struct NodeService {
    alias: String,
    media_dir: PathBuf,
    collect_url: String,
    exit_after_transfer: bool,
    backend: Box<dyn CaptureBackend>,
    driver: Box<dyn PtzDriver>,
    client: reqwest::Client,
    restart_tx: mpsc::Sender<&'static str>,
    inner: Mutex<Inner>,
}

impl NodeService {
    pub fn new(
        cfg: &Config,
        backend: Box<dyn CaptureBackend>,
        driver: Box<dyn PtzDriver>,
        restart_tx: mpsc::Sender<&'static str>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_millis(cfg.collect.timeout_ms))
            .build()
            .expect("build http client");
        Self {
            alias: cfg.node.alias.clone(),
            media_dir: cfg.node.media_dir.clone(),
            collect_url: cfg.collect.url.clone(),
            exit_after_transfer: cfg.service.exit_after_transfer,
            backend,
            driver,
            client,
            restart_tx,
            inner: Mutex::new(Inner {
                ptz: ptz::default_angles(),
                ..Default::default()
            }),
        }
    }

    pub async fn handle(&self, req: ControlRequest) -> Result<ControlResponse, NodeError> {
        match req.action {
            Action::StartRecording => self.start_recording(req.params).await,
            Action::StopRecording => self.stop_recording().await,
            Action::TransferRecording => self.transfer_recording().await,
            Action::CaptureStill => self.capture_still().await,
            Action::TransferStill => self.transfer_still().await,
            Action::PanLeft
            | Action::PanRight
            | Action::TiltUp
            | Action::TiltDown
            | Action::ZoomIn
            | Action::ZoomOut => self.adjust(req.action).await,
            Action::RestartService | Action::StopService | Action::UpdateService => {
                Err(NodeError::InvalidParams(format!(
                    "{} is handled out-of-band, not by the control endpoint",
                    req.action
                )))
            }
        }
    }

    pub async fn status(&self) -> StatusInfo {
        let inner = self.inner.lock().await;
        StatusInfo {
            identity: self.alias.clone(),
            state: inner
                .session
                .as_ref()
                .map(|s| s.state)
                .unwrap_or(RecordingState::Idle),
            backend: self.backend.kind().as_str().to_string(),
            ptz: inner.ptz,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    async fn start_recording(
        &self,
        params: Option<serde_json::Value>,
    ) -> Result<ControlResponse, NodeError> {
        let mut inner = self.inner.lock().await;
        match inner.session.as_ref().map(|s| s.state) {
            Some(RecordingState::Recording) => return Err(NodeError::AlreadyRecording),
            Some(_) => return Err(NodeError::PendingTransfer),
            None => {}
        }

        let params = match params {
            Some(value) => serde_json::from_value::<StartParams>(value)
                .map_err(|e| NodeError::InvalidParams(format!("start params: {}", e)))?,
            None => StartParams {
                session: Uuid::new_v4(),
                role: Role::Client,
            },
        };

        fs::create_dir_all(&self.media_dir).await?;
        let paths = self.session_paths(params.session);
        let handle = self.backend.start(&paths)?;

        info!(
            session = %params.session,
            role = ?params.role,
            video = %paths.video.display(),
            "recording started"
        );
        inner.handle = Some(handle);
        inner.session = Some(RecordingSession {
            id: params.session,
            role: params.role,
            state: RecordingState::Recording,
            paths,
        });

        Ok(ControlResponse::ok_with_payload(
            "recording started",
            json!({
                "session": params.session,
                "role": params.role,
                "backend": self.backend.kind().as_str(),
            }),
        ))
    }

    async fn stop_recording(&self) -> Result<ControlResponse, NodeError> {
        let mut inner = self.inner.lock().await;
        let paths = match inner.session.as_ref() {
            Some(s) if s.state == RecordingState::Recording => s.paths.clone(),
            _ => return Err(NodeError::NotRecording),
        };

        if let Some(handle) = inner.handle.take() {
            if let Err(e) = handle.stop().await {
                // Fatal backend error: reset to Idle, leave the partial
                // artifact on disk for manual recovery.
                warn!(error = %e, "capture backend failed on stop, resetting to idle");
                inner.session = None;
                return Err(e);
            }
        }

        let frames = match self.finalize_pts(&paths).await {
            Ok(frames) => frames,
            Err(e) => {
                warn!(error = %e, "finalizing timestamp log failed, resetting to idle");
                inner.session = None;
                return Err(e);
            }
        };

        if let Some(session) = inner.session.as_mut() {
            session.state = RecordingState::Stopped;
        }
        info!(frames, video = %paths.video.display(), "recording stopped");
        Ok(ControlResponse::ok_with_payload(
            "recording stopped",
            json!({ "frames": frames }),
        ))
    }

    async fn transfer_recording(&self) -> Result<ControlResponse, NodeError> {
        // The push runs without the lock so status and ptz stay
        // responsive during a long upload; the Transferring state blocks
        // every conflicting transition until we re-lock.
        let paths = {
            let mut inner = self.inner.lock().await;
            let session = match inner.session.as_mut() {
                None => return Err(NodeError::NoArtifact),
                Some(s) if s.state == RecordingState::Recording => {
                    return Err(NodeError::StillRecording)
                }
                Some(s) if s.state == RecordingState::Transferring => {
                    return Err(NodeError::TransferInProgress)
                }
                Some(s) => s,
            };
            session.state = RecordingState::Transferring;
            session.paths.clone()
        };

        match transfer::push_artifact(
            &self.client,
            &self.collect_url,
            &paths.video,
            Some(&paths.pts),
        )
        .await
        {
            Ok(()) => {
                // Delete the local copy only after the push completed.
                for path in [&paths.video, &paths.pts] {
                    if let Err(e) = fs::remove_file(path).await {
                        warn!(path = %path.display(), error = %e, "removing transferred artifact");
                    }
                }
                self.inner.lock().await.session = None;
                if self.exit_after_transfer {
                    // Asynchronous on purpose: the restart must not delay
                    // this success response.
                    let tx = self.restart_tx.clone();
                    tokio::spawn(async move {
                        let _ = tx.send("transfer complete").await;
                    });
                }
                Ok(ControlResponse::ok("artifact transferred"))
            }
            Err(e) => {
                // Artifact retained, eligible for manual retry.
                let mut inner = self.inner.lock().await;
                if let Some(session) = inner.session.as_mut() {
                    session.state = RecordingState::Stopped;
                }
                Err(e)
            }
        }
    }

    async fn capture_still(&self) -> Result<ControlResponse, NodeError> {
        let mut inner = self.inner.lock().await;
        if inner.session.as_ref().map(|s| s.state) == Some(RecordingState::Recording) {
            // The backend owns the camera while recording.
            return Err(NodeError::StillRecording);
        }

        fs::create_dir_all(&self.media_dir).await?;
        let path = self.media_dir.join(format!(
            "{}_{}_still.jpg",
            self.alias,
            Utc::now().format("%Y%m%d%H%M%S")
        ));
        self.backend.capture_still(&path).await?;
        info!(path = %path.display(), "still captured");

        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        inner.still = Some(path);
        Ok(ControlResponse::ok_with_payload(
            "still captured",
            json!({ "file": name }),
        ))
    }

    async fn transfer_still(&self) -> Result<ControlResponse, NodeError> {
        // Taking the path releases the lock for the push; a failed push
        // puts it back unless a newer still landed meanwhile.
        let path = {
            self.inner
                .lock()
                .await
                .still
                .take()
                .ok_or(NodeError::NoArtifact)?
        };

        match transfer::push_artifact(&self.client, &self.collect_url, &path, None).await {
            Ok(()) => {
                if let Err(e) = fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %e, "removing transferred still");
                }
                Ok(ControlResponse::ok("still transferred"))
            }
            Err(e) => {
                self.inner.lock().await.still.get_or_insert(path);
                Err(e)
            }
        }
    }

    async fn adjust(&self, action: Action) -> Result<ControlResponse, NodeError> {
        let mut inner = self.inner.lock().await;
        let Some((channel, angle)) = ptz::apply(action, &mut inner.ptz) else {
            return Err(NodeError::InvalidParams(format!(
                "{} is not a ptz action",
                action
            )));
        };
        self.driver.set_angle(channel, angle);
        Ok(ControlResponse::ok_with_payload(
            "ptz adjusted",
            json!({
                "pan": inner.ptz.pan,
                "tilt": inner.ptz.tilt,
                "zoom": inner.ptz.zoom,
            }),
        ))
    }

    fn session_paths(&self, session: Uuid) -> RecordingPaths {
        // Node-unique, timestamp-qualified: the collection point never
        // sees two nodes write the same name.
        let short = session.simple().to_string();
        let base = format!(
            "{}_{}_{}",
            self.alias,
            Utc::now().format("%Y%m%d%H%M%S"),
            &short[..8]
        );
        RecordingPaths {
            video: self.media_dir.join(format!("{}.mjpeg", base)),
            pts: self.media_dir.join(format!("{}.pts", base)),
        }
    }

    /// The timestamp log must line up one-to-one with the frames actually
    /// written. Capture teardown can leave one side longer; the surplus
    /// timestamps are dropped, surplus frames only warned about.
    async fn finalize_pts(&self, paths: &RecordingPaths) -> Result<usize, NodeError> {
        let frames = mjpeg::count_frames(&paths.video)
            .map_err(|e| NodeError::Backend(e.to_string()))?;
        let mut series =
            pts::read_series(&paths.pts).map_err(|e| NodeError::Backend(e.to_string()))?;

        if series.len() > frames {
            warn!(
                timestamps = series.len(),
                frames, "truncating timestamp log to frame count"
            );
            series.truncate(frames);
            pts::write_series(&paths.pts, &series)
                .map_err(|e| NodeError::Backend(e.to_string()))?;
        } else if series.len() < frames {
            warn!(
                timestamps = series.len(),
                frames, "frames beyond the timestamp log will be unusable for alignment"
            );
        }
        Ok(frames)
    }
}
