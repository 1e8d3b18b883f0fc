//! Drive base abstraction and mecanum wheel mixing.
//!
//! The base has four mecanum wheels driven by a motor board that accepts one
//! `(motor, direction, duty)` write per wheel.  [`MecanumMixer`] maps a
//! [`RobotCommand`] onto that interface:
//!
//! | Motion | front-left | rear-left | front-right | rear-right |
//! |---|---|---|---|---|
//! | forward (`+linear`) | + | + | + | + |
//! | slide right (`+lateral`) | + | − | − | + |
//! | turn right (`+angular`) | + | + | − | − |

use trackbot_types::{RobotCommand, TrackError};

/// The drive base.
///
/// Applying the same command repeatedly must be safe; the control loop
/// re-applies the active command every tick.
pub trait DriveDriver: Send {
    /// # Errors
    ///
    /// Returns [`TrackError::HardwareFault`] if the motor board rejects the
    /// write.
    fn apply(&mut self, command: &RobotCommand) -> Result<(), TrackError>;
}

/// Signed per-wheel duty, positive = forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WheelDuties {
    pub front_left: i16,
    pub rear_left: i16,
    pub front_right: i16,
    pub rear_right: i16,
}

impl WheelDuties {
    /// Board-level writes in motor-id order: `(motor_id, reverse, duty)`.
    pub fn motor_writes(&self) -> [(u8, bool, u8); 4] {
        let write = |id: u8, duty: i16| (id, duty < 0, duty.unsigned_abs().min(255) as u8);
        [
            write(0, self.front_left),
            write(1, self.rear_left),
            write(2, self.front_right),
            write(3, self.rear_right),
        ]
    }
}

/// Converts body-frame velocities into mecanum wheel duties.
#[derive(Debug, Clone, Copy)]
pub struct MecanumMixer {
    max_duty: f32,
}

impl Default for MecanumMixer {
    fn default() -> Self {
        Self { max_duty: 255.0 }
    }
}

impl MecanumMixer {
    /// Mixer whose outputs are clamped to `±max_duty` (at most 255).
    pub fn new(max_duty: f32) -> Self {
        Self {
            max_duty: max_duty.clamp(0.0, 255.0),
        }
    }

    pub fn mix(&self, command: &RobotCommand) -> WheelDuties {
        let v = command.linear_velocity;
        let s = command.lateral_velocity;
        let w = command.angular_velocity;
        let duty = |raw: f32| {
            if raw.is_finite() {
                raw.clamp(-self.max_duty, self.max_duty).round() as i16
            } else {
                0
            }
        };
        WheelDuties {
            front_left: duty(v + s + w),
            rear_left: duty(v - s + w),
            front_right: duty(v - s - w),
            rear_right: duty(v + s - w),
        }
    }
}
