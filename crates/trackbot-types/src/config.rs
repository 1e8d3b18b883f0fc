//! [`ControlConfig`] – immutable snapshot of the control-core tunables.
//!
//! Loaded once at startup (see the `trackbot` CLI for the TOML file and
//! environment overrides) and handed to the control loop by value.  The core
//! never mutates it; the only runtime-adjustable quantity is the current
//! speed level, which lives on the control loop.
//!
//! Every field has a default, so a partial TOML table deserializes cleanly:
//!
//! ```
//! use trackbot_types::ControlConfig;
//!
//! let cfg: ControlConfig = toml::from_str("[tracking]\ndead_zone = 0.2\n").unwrap();
//! assert_eq!(cfg.tracking.dead_zone, 0.2);
//! assert_eq!(cfg.avoidance.far_cm, 40.0);
//! assert!(cfg.validate().is_ok());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::TrackError;

/// Bounds and center for a single servo axis, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServoAxis {
    pub center: f32,
    pub min: f32,
    pub max: f32,
    /// Flip the correction direction for mirrored servo mounting.
    #[serde(default)]
    pub inverted: bool,
}

impl ServoAxis {
    pub fn new(center: f32, min: f32, max: f32) -> Self {
        Self {
            center,
            min,
            max,
            inverted: false,
        }
    }

    /// Clamp `angle` into `[min, max]`.  NaN input falls back to the center
    /// so the result is always a valid angle.
    ///
    /// Never panics, even for bounds [`ControlConfig::validate`] would
    /// reject (inverted or NaN); those yield an unspecified angle.
    pub fn clamp(&self, angle: f32) -> f32 {
        if angle.is_nan() {
            return self.center;
        }
        angle.max(self.min).min(self.max)
    }

    fn validate(&self, name: &str) -> Result<(), TrackError> {
        let finite = self.center.is_finite() && self.min.is_finite() && self.max.is_finite();
        if !finite || self.min > self.max {
            return Err(TrackError::InvalidConfig(format!(
                "tracking.{name}: bounds [{}, {}] are not a valid range",
                self.min, self.max
            )));
        }
        if self.center < self.min || self.center > self.max {
            return Err(TrackError::InvalidConfig(format!(
                "tracking.{name}.center {} is outside [{}, {}]",
                self.center, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Base following in face-tracking mode.
///
/// When enabled, the base turns toward a face outside the dead zone and,
/// once the face is centered, approaches or retreats to hold its apparent
/// width near `target_width`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowConfig {
    pub enabled: bool,
    /// Desired face width as a fraction of the frame width.
    pub target_width: f32,
    /// Relative width error tolerated before moving.
    pub tolerance: f32,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            target_width: 0.3,
            tolerance: 0.2,
        }
    }
}

/// Servo tracking tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Normalized offset below which an axis is not corrected.
    pub dead_zone: f32,
    /// Largest single-tick angle change, in degrees.
    pub max_step: f32,
    /// Detections below this confidence are ignored.
    pub min_confidence: f32,
    pub pan: ServoAxis,
    pub tilt: ServoAxis,
    pub follow: FollowConfig,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            dead_zone: 0.15,
            max_step: 8.0,
            min_confidence: 0.5,
            pan: ServoAxis::new(90.0, 0.0, 180.0),
            tilt: ServoAxis::new(55.0, 0.0, 110.0),
            follow: FollowConfig::default(),
        }
    }
}

/// Distance thresholds for obstacle avoidance, in centimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceConfig {
    pub near_cm: f32,
    pub far_cm: f32,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            near_cm: 20.0,
            far_cm: 40.0,
        }
    }
}

/// Drive speed settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Ordered set of selectable speed levels (motor duty units).
    pub speed_levels: Vec<f32>,
    /// Index into `speed_levels` used at startup.
    pub default_speed_index: usize,
    /// Angular rate used by the spin gesture.
    pub spin_rate: f32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            speed_levels: (1..=12).map(|n| n as f32 * 20.0).collect(),
            default_speed_index: 4,
            spin_rate: 100.0,
        }
    }
}

/// Loop timing, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Target tick period; defaults to one frame interval at 30 fps.
    pub tick_period_ms: u64,
    /// Detector calls slower than this are treated as "no detection".
    pub detection_timeout_ms: u64,
    /// Frames older than this are treated as "no frame".
    pub frame_max_age_ms: u64,
    /// How long a gesture command is held after the hand disappears.
    pub gesture_hold_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 33,
            detection_timeout_ms: 200,
            frame_max_age_ms: 500,
            gesture_hold_ms: 1000,
        }
    }
}

impl TimingConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn detection_timeout(&self) -> Duration {
        Duration::from_millis(self.detection_timeout_ms)
    }

    pub fn frame_max_age(&self) -> Duration {
        Duration::from_millis(self.frame_max_age_ms)
    }

    pub fn gesture_hold(&self) -> Duration {
        Duration::from_millis(self.gesture_hold_ms)
    }
}

/// The full control-core configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub tracking: TrackingConfig,
    pub avoidance: AvoidanceConfig,
    pub drive: DriveConfig,
    pub timing: TimingConfig,
}

impl ControlConfig {
    /// Check every invariant the control core relies on.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), TrackError> {
        let t = &self.tracking;
        if !(0.0..1.0).contains(&t.dead_zone) {
            return Err(TrackError::InvalidConfig(format!(
                "tracking.dead_zone {} must be in [0, 1)",
                t.dead_zone
            )));
        }
        if !(t.max_step > 0.0 && t.max_step.is_finite()) {
            return Err(TrackError::InvalidConfig(format!(
                "tracking.max_step {} must be positive",
                t.max_step
            )));
        }
        if !(0.0..=1.0).contains(&t.min_confidence) {
            return Err(TrackError::InvalidConfig(format!(
                "tracking.min_confidence {} must be in [0, 1]",
                t.min_confidence
            )));
        }
        t.pan.validate("pan")?;
        t.tilt.validate("tilt")?;
        if !(t.follow.target_width > 0.0 && t.follow.target_width <= 1.0) {
            return Err(TrackError::InvalidConfig(format!(
                "tracking.follow.target_width {} must be in (0, 1]",
                t.follow.target_width
            )));
        }
        if !(0.0..1.0).contains(&t.follow.tolerance) {
            return Err(TrackError::InvalidConfig(format!(
                "tracking.follow.tolerance {} must be in [0, 1)",
                t.follow.tolerance
            )));
        }

        let a = &self.avoidance;
        if !(a.near_cm > 0.0 && a.near_cm < a.far_cm && a.far_cm.is_finite()) {
            return Err(TrackError::InvalidConfig(format!(
                "avoidance: need 0 < near_cm ({}) < far_cm ({})",
                a.near_cm, a.far_cm
            )));
        }

        let d = &self.drive;
        if d.speed_levels.is_empty() {
            return Err(TrackError::InvalidConfig(
                "drive.speed_levels must not be empty".to_string(),
            ));
        }
        if d.speed_levels.iter().any(|l| !(*l > 0.0 && l.is_finite()))
            || d.speed_levels.windows(2).any(|w| w[0] >= w[1])
        {
            return Err(TrackError::InvalidConfig(
                "drive.speed_levels must be positive and strictly ascending".to_string(),
            ));
        }
        if d.default_speed_index >= d.speed_levels.len() {
            return Err(TrackError::InvalidConfig(format!(
                "drive.default_speed_index {} out of range for {} levels",
                d.default_speed_index,
                d.speed_levels.len()
            )));
        }
        if !(d.spin_rate > 0.0 && d.spin_rate.is_finite()) {
            return Err(TrackError::InvalidConfig(format!(
                "drive.spin_rate {} must be positive",
                d.spin_rate
            )));
        }

        if self.timing.tick_period_ms == 0 {
            return Err(TrackError::InvalidConfig(
                "timing.tick_period_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
