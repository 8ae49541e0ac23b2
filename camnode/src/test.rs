#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;
    use tokio::sync::mpsc;

    use api::request::{Action, ControlRequest};
    use api::response::{ControlResponse, RecordingState, StatusInfo};
    use async_trait::async_trait;

    use crate::backend::{BackendKind, CaptureBackend, RecordingHandle, RecordingPaths};
    use crate::config::Config;
    use crate::error::NodeError;
    use crate::ptz::LogPtzDriver;
    use crate::session::NodeService;
    use crate::AppState;

    /// Structurally valid one-segment JPEG, good enough for the splitter.
    fn fake_jpeg(fill: u8) -> Vec<u8> {
        let mut f = vec![0xFF, 0xD8];
        f.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x04, b'J', b'F']);
        f.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);
        f.extend_from_slice(&[fill, 0xFF, 0x00, fill]);
        f.extend_from_slice(&[0xFF, 0xD9]);
        f
    }

    /// Backend writing its whole output up-front; no process involved.
    struct MockBackend {
        frames: usize,
        pts_lines: usize,
    }

    impl MockBackend {
        fn new(frames: usize) -> Self {
            Self {
                frames,
                pts_lines: frames,
            }
        }
    }

    #[async_trait]
    impl CaptureBackend for MockBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Ffmpeg
        }

        fn start(&self, paths: &RecordingPaths) -> Result<RecordingHandle, NodeError> {
            let mut stream = Vec::new();
            for i in 0..self.frames {
                stream.extend_from_slice(&fake_jpeg(i as u8));
            }
            std::fs::write(&paths.video, stream)?;

            let mut pts = String::from("# timecode format v2\n");
            for i in 0..self.pts_lines {
                pts.push_str(&format!("{}\n", i as f64 * 33366.7));
            }
            std::fs::write(&paths.pts, pts)?;
            Ok(RecordingHandle::detached())
        }

        async fn capture_still(&self, path: &Path) -> Result<(), NodeError> {
            std::fs::write(path, fake_jpeg(0x77))?;
            Ok(())
        }
    }

    fn make_service(
        media: &Path,
        collect_url: &str,
        backend: MockBackend,
        exit_after_transfer: bool,
    ) -> (Arc<NodeService>, mpsc::Receiver<&'static str>) {
        let mut cfg = Config::default();
        cfg.node.alias = "cam01".to_string();
        cfg.node.media_dir = media.to_path_buf();
        cfg.collect.url = collect_url.to_string();
        cfg.service.exit_after_transfer = exit_after_transfer;
        let (tx, rx) = mpsc::channel(1);
        let service = Arc::new(NodeService::new(
            &cfg,
            Box::new(backend),
            Box::new(LogPtzDriver),
            tx,
        ));
        (service, rx)
    }

    /// Collection point stub: accepts any ingest push with a 200.
    async fn spawn_collector() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app: axum::Router = axum::Router::new().route(
            "/api/ingest/:name",
            axum::routing::post(|| async { "ok" }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// Collection point that sits on each push for a while before
    /// acknowledging, like a real upload would.
    async fn slow_collector(delay: std::time::Duration) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app: axum::Router = axum::Router::new().route(
            "/api/ingest/:name",
            axum::routing::post(move || async move {
                tokio::time::sleep(delay).await;
                "ok"
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// A loopback URL with nothing listening behind it.
    async fn dead_collector() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    fn start_req() -> ControlRequest {
        ControlRequest {
            action: Action::StartRecording,
            params: None,
        }
    }

    fn req(action: Action) -> ControlRequest {
        ControlRequest {
            action,
            params: None,
        }
    }

    #[tokio::test]
    async fn start_while_recording_is_a_state_conflict() {
        let media = tempfile::tempdir().unwrap();
        let (service, _rx) =
            make_service(media.path(), "http://127.0.0.1:1", MockBackend::new(3), false);

        assert!(service.handle(start_req()).await.unwrap().success);
        match service.handle(start_req()).await {
            Err(NodeError::AlreadyRecording) => {}
            other => panic!("expected AlreadyRecording, got {:?}", other.map(|r| r.success)),
        }
        // Still exactly one live session.
        assert_eq!(service.status().await.state, RecordingState::Recording);
    }

    #[tokio::test]
    async fn stop_without_recording_fails() {
        let media = tempfile::tempdir().unwrap();
        let (service, _rx) =
            make_service(media.path(), "http://127.0.0.1:1", MockBackend::new(3), false);

        assert!(matches!(
            service.handle(req(Action::StopRecording)).await,
            Err(NodeError::NotRecording)
        ));
    }

    #[tokio::test]
    async fn start_is_blocked_while_artifact_pends_transfer() {
        let media = tempfile::tempdir().unwrap();
        let (service, _rx) =
            make_service(media.path(), "http://127.0.0.1:1", MockBackend::new(3), false);

        service.handle(start_req()).await.unwrap();
        service.handle(req(Action::StopRecording)).await.unwrap();
        assert!(matches!(
            service.handle(start_req()).await,
            Err(NodeError::PendingTransfer)
        ));
    }

    #[tokio::test]
    async fn full_cycle_and_transfer_idempotence() {
        let media = tempfile::tempdir().unwrap();
        let collector = spawn_collector().await;
        let (service, _rx) = make_service(media.path(), &collector, MockBackend::new(3), false);

        service.handle(start_req()).await.unwrap();
        let stopped = service.handle(req(Action::StopRecording)).await.unwrap();
        assert_eq!(stopped.payload.unwrap()["frames"], json!(3));

        service
            .handle(req(Action::TransferRecording))
            .await
            .unwrap();
        assert_eq!(service.status().await.state, RecordingState::Idle);

        // Local copy gone after the acknowledged push.
        let leftovers: Vec<PathBuf> = std::fs::read_dir(media.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert!(leftovers.is_empty(), "leftovers: {:?}", leftovers);

        // A second transfer has nothing to resend.
        assert!(matches!(
            service.handle(req(Action::TransferRecording)).await,
            Err(NodeError::NoArtifact)
        ));
    }

    #[tokio::test]
    async fn failed_transfer_retains_artifact() {
        let media = tempfile::tempdir().unwrap();
        let collector = dead_collector().await;
        let (service, _rx) = make_service(media.path(), &collector, MockBackend::new(2), false);

        service.handle(start_req()).await.unwrap();
        service.handle(req(Action::StopRecording)).await.unwrap();
        assert!(matches!(
            service.handle(req(Action::TransferRecording)).await,
            Err(NodeError::Transfer(_))
        ));

        // Back in Stopped, artifact on disk, manual retry possible.
        assert_eq!(service.status().await.state, RecordingState::Stopped);
        assert_eq!(std::fs::read_dir(media.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn surplus_timestamps_are_truncated_on_stop() {
        let media = tempfile::tempdir().unwrap();
        let backend = MockBackend {
            frames: 3,
            pts_lines: 5,
        };
        let (service, _rx) = make_service(media.path(), "http://127.0.0.1:1", backend, false);

        service.handle(start_req()).await.unwrap();
        service.handle(req(Action::StopRecording)).await.unwrap();

        let pts_path = std::fs::read_dir(media.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .find(|p| p.extension().is_some_and(|e| e == "pts"))
            .unwrap();
        assert_eq!(pts::read_series(&pts_path).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn transfer_success_requests_restart_when_configured() {
        let media = tempfile::tempdir().unwrap();
        let collector = spawn_collector().await;
        let (service, mut rx) = make_service(media.path(), &collector, MockBackend::new(1), true);

        service.handle(start_req()).await.unwrap();
        service.handle(req(Action::StopRecording)).await.unwrap();
        service
            .handle(req(Action::TransferRecording))
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some("transfer complete"));
    }

    #[tokio::test]
    async fn status_stays_responsive_during_a_slow_transfer() {
        let media = tempfile::tempdir().unwrap();
        let collector = slow_collector(std::time::Duration::from_millis(400)).await;
        let (service, _rx) = make_service(media.path(), &collector, MockBackend::new(2), false);

        service.handle(start_req()).await.unwrap();
        service.handle(req(Action::StopRecording)).await.unwrap();

        let pushing = service.clone();
        let push = tokio::spawn(async move { pushing.handle(req(Action::TransferRecording)).await });
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        // The upload must not hold the control plane: status answers well
        // inside a prober's deadline and shows the transfer.
        let status = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            service.status(),
        )
        .await
        .expect("status blocked behind the transfer");
        assert_eq!(status.state, RecordingState::Transferring);

        // A second transfer during the push is a conflict, not a resend.
        assert!(matches!(
            service.handle(req(Action::TransferRecording)).await,
            Err(NodeError::TransferInProgress)
        ));

        push.await.unwrap().unwrap();
        assert_eq!(service.status().await.state, RecordingState::Idle);
    }

    #[tokio::test]
    async fn still_capture_conflicts_with_recording() {
        let media = tempfile::tempdir().unwrap();
        let (service, _rx) =
            make_service(media.path(), "http://127.0.0.1:1", MockBackend::new(3), false);

        service.handle(start_req()).await.unwrap();
        assert!(matches!(
            service.handle(req(Action::CaptureStill)).await,
            Err(NodeError::StillRecording)
        ));
    }

    #[tokio::test]
    async fn still_transfer_is_idempotent() {
        let media = tempfile::tempdir().unwrap();
        let collector = spawn_collector().await;
        let (service, _rx) = make_service(media.path(), &collector, MockBackend::new(1), false);

        service.handle(req(Action::CaptureStill)).await.unwrap();
        service.handle(req(Action::TransferStill)).await.unwrap();
        assert!(matches!(
            service.handle(req(Action::TransferStill)).await,
            Err(NodeError::NoArtifact)
        ));
    }

    #[tokio::test]
    async fn control_endpoint_round_trip() {
        let media = tempfile::tempdir().unwrap();
        let (service, _rx) =
            make_service(media.path(), "http://127.0.0.1:1", MockBackend::new(3), false);
        let app = crate::control::route().with_state(AppState { service });
        let server = TestServer::new(app).unwrap();

        let response = server
            .post(api::path::CONTROL)
            .json(&json!({ "action": "start_recording" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: ControlResponse = response.json();
        assert!(body.success);

        let status: StatusInfo = server.get(api::path::STATUS).await.json();
        assert_eq!(status.identity, "cam01");
        assert_eq!(status.state, RecordingState::Recording);

        // Property: a concurrent/second start yields a state conflict.
        let response = server
            .post(api::path::CONTROL)
            .json(&json!({ "action": "start_recording" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);
        let body: ControlResponse = response.json();
        assert_eq!(body.error.as_deref(), Some("already recording"));
    }

    #[tokio::test]
    async fn ptz_adjust_reports_clamped_angles() {
        let media = tempfile::tempdir().unwrap();
        let (service, _rx) =
            make_service(media.path(), "http://127.0.0.1:1", MockBackend::new(1), false);

        let resp = service.handle(req(Action::PanRight)).await.unwrap();
        assert_eq!(resp.payload.unwrap()["pan"], json!(92));

        for _ in 0..60 {
            service.handle(req(Action::ZoomIn)).await.unwrap();
        }
        let resp = service.handle(req(Action::ZoomIn)).await.unwrap();
        assert_eq!(resp.payload.unwrap()["zoom"], json!(180));
    }
}
