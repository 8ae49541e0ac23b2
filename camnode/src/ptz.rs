use api::request::Action;
use api::response::PtzAngles;
use tracing::debug;

/// Servo channel assignment, matching the PCA9685 wiring order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PtzChannel {
    Tilt = 0,
    Pan = 1,
    Zoom = 2,
}

/// Seam for the servo hardware. The real PCA9685 driver lives outside this
/// crate; the default implementation only records the commanded angle.
pub trait PtzDriver: Send + Sync {
    fn set_angle(&self, channel: PtzChannel, angle: u8);
}

pub struct LogPtzDriver;

impl PtzDriver for LogPtzDriver {
    fn set_angle(&self, channel: PtzChannel, angle: u8) {
        debug!(?channel, angle, "ptz set angle");
    }
}

const STEP: i16 = 2;
const MAX_ANGLE: i16 = 180;

pub fn clamp_angle(angle: i16) -> u8 {
    angle.clamp(0, MAX_ANGLE) as u8
}

/// Apply one adjust action to the current angles; returns the touched
/// channel and its new value. Non-PTZ actions return None.
pub fn apply(action: Action, angles: &mut PtzAngles) -> Option<(PtzChannel, u8)> {
    let (channel, delta) = match action {
        Action::PanLeft => (PtzChannel::Pan, -STEP),
        Action::PanRight => (PtzChannel::Pan, STEP),
        Action::TiltUp => (PtzChannel::Tilt, STEP),
        Action::TiltDown => (PtzChannel::Tilt, -STEP),
        Action::ZoomIn => (PtzChannel::Zoom, STEP),
        Action::ZoomOut => (PtzChannel::Zoom, -STEP),
        _ => return None,
    };
    let slot = match channel {
        PtzChannel::Pan => &mut angles.pan,
        PtzChannel::Tilt => &mut angles.tilt,
        PtzChannel::Zoom => &mut angles.zoom,
    };
    *slot = clamp_angle(*slot as i16 + delta);
    Some((channel, *slot))
}

pub fn default_angles() -> PtzAngles {
    PtzAngles {
        pan: 90,
        tilt: 90,
        zoom: 90,
    }
}
