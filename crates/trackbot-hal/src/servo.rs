//! Generic `ServoDriver` trait for the pan/tilt camera mount.

use trackbot_types::TrackError;

/// A two-axis servo mount.
///
/// Angles arrive already clamped to the configured bounds, so drivers only
/// translate degrees into whatever the board expects.
pub trait ServoDriver: Send {
    /// Command both servos, in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::HardwareFault`] if the write fails.  The caller
    /// logs the fault and does not retry within the same tick.
    fn set_angles(&mut self, pan: f32, tilt: f32) -> Result<(), TrackError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockServo {
        last: Option<(f32, f32)>,
    }

    impl ServoDriver for MockServo {
        fn set_angles(&mut self, pan: f32, tilt: f32) -> Result<(), TrackError> {
            self.last = Some((pan, tilt));
            Ok(())
        }
    }

    #[test]
    fn mock_servo_records_angles() {
        let mut servo = MockServo { last: None };
        servo.set_angles(90.0, 55.0).unwrap();
        assert_eq!(servo.last, Some((90.0, 55.0)));
    }
}
