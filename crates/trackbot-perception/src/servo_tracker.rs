//! [`ServoTracker`] – turns a target's offset from frame center into a
//! bounded pan/tilt correction.
//!
//! Per axis, with `offset` the normalized position in `[-1, 1]`:
//!
//! | Condition | Correction |
//! |---|---|
//! | `|offset| < dead_zone` | none |
//! | otherwise | `clamp(offset * max_step, -max_step, max_step)` |
//!
//! Pan follows `x` and tilt follows `y`.  An axis configured as `inverted`
//! has its correction negated.  The corrected angle is always clamped to the
//! axis bounds, so the returned state is valid whatever the input.
//!
//! No detection means no call and the servo holds its position; the tracker
//! never recenters on its own.

use trackbot_types::{DetectionResult, ServoAxis, ServoState, TrackingConfig};

#[derive(Debug, Clone)]
pub struct ServoTracker {
    dead_zone: f32,
    max_step: f32,
    pan: ServoAxis,
    tilt: ServoAxis,
}

impl ServoTracker {
    /// Build a tracker from `config`.
    ///
    /// `config` is expected to have passed [`ControlConfig::validate`];
    /// unvalidated bounds do not panic but may produce out-of-range angles.
    ///
    /// [`ControlConfig::validate`]: trackbot_types::ControlConfig::validate
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            dead_zone: config.dead_zone,
            max_step: config.max_step,
            pan: config.pan,
            tilt: config.tilt,
        }
    }

    /// Angle change for one axis.  Zero inside the dead zone or for a
    /// non-finite offset.
    pub fn step(&self, offset: f32) -> f32 {
        if !offset.is_finite() || offset.abs() < self.dead_zone {
            return 0.0;
        }
        (offset * self.max_step).clamp(-self.max_step, self.max_step)
    }

    fn correct(&self, axis: &ServoAxis, angle: f32, offset: f32) -> f32 {
        let step = self.step(offset);
        let step = if axis.inverted { -step } else { step };
        axis.clamp(angle + step)
    }

    /// The servo state after correcting `current` toward `target`.
    pub fn track(&self, current: &ServoState, target: &DetectionResult) -> ServoState {
        ServoState {
            pan: self.correct(&self.pan, current.pan, target.center_x),
            tilt: self.correct(&self.tilt, current.tilt, target.center_y),
        }
    }

    /// Clamp an externally supplied state into bounds.
    pub fn clamp(&self, state: &ServoState) -> ServoState {
        ServoState {
            pan: self.pan.clamp(state.pan),
            tilt: self.tilt.clamp(state.tilt),
        }
    }

    /// Both axes at their configured centers.
    pub fn recenter(&self) -> ServoState {
        ServoState::new(self.pan.center, self.tilt.center)
    }
}
