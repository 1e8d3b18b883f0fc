//! `trackbot-types` – shared data model for the trackbot control core.
//!
//! Every other crate in the workspace speaks in these types: frames flowing
//! from the capture thread, detections produced by external perception
//! models, servo and drive commands flowing to the hardware, and the
//! operating [`Mode`] that owns actuator output at any instant.

pub mod config;

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use config::{
    AvoidanceConfig, ControlConfig, DriveConfig, FollowConfig, ServoAxis, TimingConfig,
    TrackingConfig,
};

// ────────────────────────────────────────────────────────────────────────────
// Frames
// ────────────────────────────────────────────────────────────────────────────

/// An opaque image buffer stamped with its monotonic capture time.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Raw pixel data (e.g. BGR24 or greyscale); never interpreted by the core.
    pub data: Vec<u8>,
    /// Capture counter assigned by the camera driver.
    pub sequence: u64,
    /// Monotonic capture timestamp.
    pub captured_at: Instant,
}

impl Frame {
    /// Build a frame stamped with the current instant.
    pub fn new(width: u32, height: u32, data: Vec<u8>, sequence: u64) -> Self {
        Self {
            width,
            height,
            data,
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// Time elapsed since the frame was captured.
    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Detections
// ────────────────────────────────────────────────────────────────────────────

/// Hand gestures reported by the gesture classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    OpenPalm,
    Fist,
    ThumbsUp,
    ThumbsDown,
    Peace,
    Pointing,
    OkSign,
    Three,
    Four,
    Unknown,
}

/// Object classes supported by the 3-D object detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Shoe,
    Chair,
    Cup,
    Camera,
}

/// What a [`DetectionResult`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "class", rename_all = "snake_case")]
pub enum DetectionLabel {
    Face,
    Hand(Gesture),
    Object(ObjectKind),
}

/// One detection produced by an external detector for a single frame.
///
/// Positions are normalized to `[-1, 1]` relative to the frame center
/// (`+x` right, `+y` down).  Results are consumed once and never retained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub center_x: f32,
    pub center_y: f32,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
    pub label: DetectionLabel,
    /// Bounding area as a fraction of the frame, when the detector reports one.
    #[serde(default)]
    pub area: Option<f32>,
    /// Bounding-box width as a fraction of the frame width.
    #[serde(default)]
    pub width: Option<f32>,
    /// Estimated distance to the target (relative units), when available.
    #[serde(default)]
    pub distance_estimate: Option<f32>,
}

impl DetectionResult {
    pub fn new(label: DetectionLabel, center_x: f32, center_y: f32, confidence: f32) -> Self {
        Self {
            center_x,
            center_y,
            confidence,
            label,
            area: None,
            width: None,
            distance_estimate: None,
        }
    }

    pub fn with_area(mut self, area: f32) -> Self {
        self.area = Some(area);
        self
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_distance(mut self, distance: f32) -> Self {
        self.distance_estimate = Some(distance);
        self
    }

    /// `true` when position and confidence are finite and confidence lies in
    /// `[0, 1]`.
    pub fn is_well_formed(&self) -> bool {
        self.center_x.is_finite()
            && self.center_y.is_finite()
            && self.confidence.is_finite()
            && (0.0..=1.0).contains(&self.confidence)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Actuator state
// ────────────────────────────────────────────────────────────────────────────

/// Pan/tilt servo angles in degrees.
///
/// Owned by the control loop; only the servo tracker and explicit resets
/// mutate it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServoState {
    pub pan: f32,
    pub tilt: f32,
}

impl ServoState {
    pub fn new(pan: f32, tilt: f32) -> Self {
        Self { pan, tilt }
    }

    /// Both axes at their configured centers.
    pub fn centered(tracking: &TrackingConfig) -> Self {
        Self {
            pan: tracking.pan.center,
            tilt: tracking.tilt.center,
        }
    }
}

/// A drive command for the omnidirectional base.
///
/// Velocities are signed multiples of the speed level they were scaled by:
/// `+linear` drives forward, `+lateral` slides right and `+angular` turns
/// right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotCommand {
    pub linear_velocity: f32,
    pub lateral_velocity: f32,
    pub angular_velocity: f32,
    pub speed_level: f32,
}

impl RobotCommand {
    /// The all-zero command.
    pub const STOP: RobotCommand = RobotCommand {
        linear_velocity: 0.0,
        lateral_velocity: 0.0,
        angular_velocity: 0.0,
        speed_level: 0.0,
    };

    pub fn linear(direction: f32, speed_level: f32) -> Self {
        Self {
            linear_velocity: direction * speed_level,
            speed_level,
            ..Self::STOP
        }
    }

    pub fn lateral(direction: f32, speed_level: f32) -> Self {
        Self {
            lateral_velocity: direction * speed_level,
            speed_level,
            ..Self::STOP
        }
    }

    pub fn angular(direction: f32, speed_level: f32) -> Self {
        Self {
            angular_velocity: direction * speed_level,
            speed_level,
            ..Self::STOP
        }
    }

    /// `true` when no velocity component is non-zero.
    pub fn is_stopped(&self) -> bool {
        self.linear_velocity == 0.0 && self.lateral_velocity == 0.0 && self.angular_velocity == 0.0
    }
}

impl Default for RobotCommand {
    fn default() -> Self {
        Self::STOP
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Modes and input
// ────────────────────────────────────────────────────────────────────────────

/// Mutually exclusive operating behaviors.  Exactly one owns actuator output
/// at any tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Startup state before any input has been received.
    Idle,
    Manual,
    GestureControl,
    FaceTracking,
    ObstacleAvoidance,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::Idle,
        Mode::Manual,
        Mode::GestureControl,
        Mode::FaceTracking,
        Mode::ObstacleAvoidance,
    ];
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Idle => "idle",
            Mode::Manual => "manual",
            Mode::GestureControl => "gesture_control",
            Mode::FaceTracking => "face_tracking",
            Mode::ObstacleAvoidance => "obstacle_avoidance",
        };
        f.write_str(name)
    }
}

/// Keys on the IR remote, already decoded by the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteKey {
    Power,
    Up,
    Down,
    Left,
    Right,
    TurnLeft,
    TurnRight,
    Light,
    Sound,
    Plus,
    Minus,
    Zero,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
}

impl RemoteKey {
    /// `Plus` or `Minus`.
    pub fn is_speed_key(self) -> bool {
        matches!(self, RemoteKey::Plus | RemoteKey::Minus)
    }
}

/// A discrete operator input: a remote key press or a classified gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum InputEvent {
    Remote { key: RemoteKey },
    Gesture {
        gesture: Gesture,
        /// Normalized horizontal position of the hand, used by `Pointing`.
        center_x: f32,
    },
}

impl InputEvent {
    pub fn remote(key: RemoteKey) -> Self {
        InputEvent::Remote { key }
    }

    pub fn gesture(gesture: Gesture, center_x: f32) -> Self {
        InputEvent::Gesture { gesture, center_x }
    }

    /// The remote key, if this is a remote event.
    pub fn remote_key(&self) -> Option<RemoteKey> {
        match self {
            InputEvent::Remote { key } => Some(*key),
            InputEvent::Gesture { .. } => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Workspace error type spanning driver faults, sensing failures and
/// configuration problems.
///
/// None of these are fatal to the control loop: it logs them and degrades to
/// the most conservative output.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackError {
    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    #[error("No detector available: {0}")]
    DetectorUnavailable(String),

    #[error("Detector failed: {0}")]
    DetectorFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Capture error: {0}")]
    Capture(String),
}

impl TrackError {
    /// Shorthand for [`TrackError::HardwareFault`].
    pub fn hardware(component: impl Into<String>, details: impl Into<String>) -> Self {
        TrackError::HardwareFault {
            component: component.into(),
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_command_is_all_zero() {
        let stop = RobotCommand::STOP;
        assert!(stop.is_stopped());
        assert_eq!(stop.speed_level, 0.0);
        assert_eq!(RobotCommand::default(), stop);
    }

    #[test]
    fn linear_command_scales_by_speed_level() {
        let cmd = RobotCommand::linear(-1.0, 60.0);
        assert_eq!(cmd.linear_velocity, -60.0);
        assert_eq!(cmd.lateral_velocity, 0.0);
        assert_eq!(cmd.angular_velocity, 0.0);
        assert_eq!(cmd.speed_level, 60.0);
        assert!(!cmd.is_stopped());
    }

    #[test]
    fn detection_well_formedness() {
        let ok = DetectionResult::new(DetectionLabel::Face, 0.2, -0.4, 0.9);
        assert!(ok.is_well_formed());

        let nan = DetectionResult::new(DetectionLabel::Face, f32::NAN, 0.0, 0.9);
        assert!(!nan.is_well_formed());

        let overconfident = DetectionResult::new(DetectionLabel::Face, 0.0, 0.0, 1.5);
        assert!(!overconfident.is_well_formed());
    }

    #[test]
    fn detection_label_serialization_roundtrip() {
        let det = DetectionResult::new(DetectionLabel::Hand(Gesture::ThumbsUp), 0.1, 0.2, 0.8)
            .with_area(0.05);
        let json = serde_json::to_string(&det).unwrap();
        assert!(json.contains("thumbs_up"));
        let back: DetectionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, det);
    }

    #[test]
    fn input_event_accessors() {
        assert_eq!(
            InputEvent::remote(RemoteKey::Up).remote_key(),
            Some(RemoteKey::Up)
        );
        assert_eq!(InputEvent::gesture(Gesture::Peace, 0.0).remote_key(), None);
        assert!(RemoteKey::Plus.is_speed_key());
        assert!(!RemoteKey::Power.is_speed_key());
    }

    #[test]
    fn mode_display_matches_serde_name() {
        for mode in Mode::ALL {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{mode}\""));
        }
    }

    #[test]
    fn frame_age_is_monotonic() {
        let frame = Frame::new(2, 2, vec![0; 12], 7);
        assert_eq!(frame.sequence, 7);
        assert!(frame.age() >= Duration::ZERO);
    }

    #[test]
    fn track_error_display() {
        let err = TrackError::hardware("pan_tilt", "i2c nack");
        assert!(err.to_string().contains("pan_tilt"));
        assert!(err.to_string().contains("i2c nack"));

        let err = TrackError::InvalidConfig("tracking.dead_zone".into());
        assert!(err.to_string().contains("Invalid configuration"));
    }
}
