use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One fleet control command. Immutable once issued.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    StartRecording,
    StopRecording,
    TransferRecording,
    CaptureStill,
    TransferStill,
    PanLeft,
    PanRight,
    TiltUp,
    TiltDown,
    ZoomIn,
    ZoomOut,
    RestartService,
    StopService,
    UpdateService,
}

impl Action {
    /// Service lifecycle actions ride the out-of-band remote execution
    /// channel instead of the node's control endpoint.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Action::RestartService | Action::StopService | Action::UpdateService
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::StartRecording => "start_recording",
            Action::StopRecording => "stop_recording",
            Action::TransferRecording => "transfer_recording",
            Action::CaptureStill => "capture_still",
            Action::TransferStill => "transfer_still",
            Action::PanLeft => "pan_left",
            Action::PanRight => "pan_right",
            Action::TiltUp => "tilt_up",
            Action::TiltDown => "tilt_down",
            Action::ZoomIn => "zoom_in",
            Action::ZoomOut => "zoom_out",
            Action::RestartService => "restart_service",
            Action::StopService => "stop_service",
            Action::UpdateService => "update_service",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start_recording" => Ok(Action::StartRecording),
            "stop_recording" => Ok(Action::StopRecording),
            "transfer_recording" => Ok(Action::TransferRecording),
            "capture_still" => Ok(Action::CaptureStill),
            "transfer_still" => Ok(Action::TransferStill),
            "pan_left" => Ok(Action::PanLeft),
            "pan_right" => Ok(Action::PanRight),
            "tilt_up" => Ok(Action::TiltUp),
            "tilt_down" => Ok(Action::TiltDown),
            "zoom_in" => Ok(Action::ZoomIn),
            "zoom_out" => Ok(Action::ZoomOut),
            "restart_service" => Ok(Action::RestartService),
            "stop_service" => Ok(Action::StopService),
            "update_service" => Ok(Action::UpdateService),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}

/// Capture session role. The master's timestamp series is the timeline
/// every client gets resampled onto, offline.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Master,
    #[default]
    Client,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlRequest {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// Parameters attached to a `start_recording` fan-out.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct StartParams {
    pub session: Uuid,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_round_trips_through_str() {
        for action in [
            Action::StartRecording,
            Action::TransferStill,
            Action::PanLeft,
            Action::UpdateService,
        ] {
            assert_eq!(action.as_str().parse::<Action>(), Ok(action));
        }
        assert!("reboot".parse::<Action>().is_err());
    }

    #[test]
    fn remote_actions_are_flagged() {
        assert!(Action::RestartService.is_remote());
        assert!(Action::UpdateService.is_remote());
        assert!(!Action::StartRecording.is_remote());
        assert!(!Action::ZoomOut.is_remote());
    }
}
