use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use thiserror::Error;

use api::response::ControlResponse;

/// Node-local failures. None of these ever crash the service; every
/// variant becomes a failure response on the control endpoint.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("already recording")]
    AlreadyRecording,
    #[error("not recording")]
    NotRecording,
    #[error("previous recording pending transfer")]
    PendingTransfer,
    #[error("recording in progress")]
    StillRecording,
    #[error("transfer in progress")]
    TransferInProgress,
    #[error("no artifact to transfer")]
    NoArtifact,
    #[error("invalid request: {0}")]
    InvalidParams(String),
    #[error("capture backend: {0}")]
    Backend(String),
    #[error("transfer: {0}")]
    Transfer(String),
    #[error("local storage: {0}")]
    Storage(#[from] std::io::Error),
}

impl NodeError {
    fn status(&self) -> StatusCode {
        match self {
            NodeError::AlreadyRecording
            | NodeError::NotRecording
            | NodeError::PendingTransfer
            | NodeError::StillRecording
            | NodeError::TransferInProgress
            | NodeError::NoArtifact => StatusCode::CONFLICT,
            NodeError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            NodeError::Backend(_) | NodeError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            NodeError::Transfer(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        (self.status(), Json(ControlResponse::err(self.to_string()))).into_response()
    }
}
