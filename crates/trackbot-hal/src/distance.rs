//! Generic `DistanceSensor` trait for the ultrasonic range finder.

use trackbot_types::TrackError;

/// A forward-facing range sensor.
pub trait DistanceSensor: Send {
    /// Read the current distance in centimetres.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::SensorUnavailable`] when no reading could be
    /// taken.  Callers treat that the same as an implausible reading.
    fn read_cm(&mut self) -> Result<f32, TrackError>;

    /// Power the sensor up or down.  Sensors without a power switch can rely
    /// on the default no-op.
    fn set_enabled(&mut self, _enabled: bool) -> Result<(), TrackError> {
        Ok(())
    }
}

/// Filter a raw reading down to a usable distance.
///
/// The board reports `0` when every retry failed, so zero, negative and
/// non-finite values are all "unavailable".
pub fn plausible(reading_cm: f32) -> Option<f32> {
    (reading_cm.is_finite() && reading_cm > 0.0).then_some(reading_cm)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSensor(f32);

    impl DistanceSensor for FixedSensor {
        fn read_cm(&mut self) -> Result<f32, TrackError> {
            Ok(self.0)
        }
    }

    #[test]
    fn default_enable_is_noop() {
        let mut sensor = FixedSensor(32.0);
        assert!(sensor.set_enabled(true).is_ok());
        assert_eq!(sensor.read_cm().unwrap(), 32.0);
    }

    #[test]
    fn plausible_rejects_failed_reads() {
        assert_eq!(plausible(25.0), Some(25.0));
        assert_eq!(plausible(0.0), None);
        assert_eq!(plausible(-3.0), None);
        assert_eq!(plausible(f32::NAN), None);
        assert_eq!(plausible(f32::INFINITY), None);
    }
}
