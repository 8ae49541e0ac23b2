use serde::{Deserialize, Serialize};

/// Response shape shared by every control action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl ControlResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            payload: None,
        }
    }

    pub fn ok_with_payload(message: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            payload: Some(payload),
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            payload: None,
        }
    }
}

/// Recording state machine position, as reported by the status endpoint.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
    Stopped,
    Transferring,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtzAngles {
    pub pan: u8,
    pub tilt: u8,
    pub zoom: u8,
}

/// Body of the node status endpoint. Reachability itself is implied by
/// getting an HTTP 200 at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub identity: String,
    pub state: RecordingState,
    pub backend: String,
    pub ptz: PtzAngles,
    pub version: String,
}
