//! [`Hardware`] – the bundle of drivers owned by the control loop.
//!
//! Every method maps one control-core request onto one driver call and
//! returns the driver's result untouched.  There is no retry here: a failed
//! write is reported once and the next tick's fresh command supersedes it.
//!
//! Optional peripherals (range sensor, LED bar) report
//! [`TrackError::SensorUnavailable`] / [`TrackError::HardwareFault`] when
//! they are not fitted, so callers can treat "absent" and "broken" alike.

use tracing::instrument;
use trackbot_types::{RobotCommand, ServoState, TrackError};

use crate::distance::{self, DistanceSensor};
use crate::drive::DriveDriver;
use crate::light::{LightBar, LightColor};
use crate::servo::ServoDriver;

/// Drivers for one robot.
///
/// Construct with [`Hardware::new`] and attach optional peripherals with the
/// `with_*` builders.
pub struct Hardware {
    servo: Box<dyn ServoDriver>,
    drive: Box<dyn DriveDriver>,
    distance: Option<Box<dyn DistanceSensor>>,
    lights: Option<Box<dyn LightBar>>,
}

impl Hardware {
    pub fn new(servo: Box<dyn ServoDriver>, drive: Box<dyn DriveDriver>) -> Self {
        Self {
            servo,
            drive,
            distance: None,
            lights: None,
        }
    }

    pub fn with_distance_sensor(mut self, sensor: Box<dyn DistanceSensor>) -> Self {
        self.distance = Some(sensor);
        self
    }

    pub fn with_lights(mut self, lights: Box<dyn LightBar>) -> Self {
        self.lights = Some(lights);
        self
    }

    pub fn has_distance_sensor(&self) -> bool {
        self.distance.is_some()
    }

    /// Send `state` to the pan/tilt servos.
    #[instrument(level = "trace", skip(self))]
    pub fn set_servo(&mut self, state: &ServoState) -> Result<(), TrackError> {
        self.servo.set_angles(state.pan, state.tilt)
    }

    /// Send `command` to the drive base.
    #[instrument(level = "trace", skip(self))]
    pub fn drive(&mut self, command: &RobotCommand) -> Result<(), TrackError> {
        self.drive.apply(command)
    }

    /// Take one fresh distance reading in centimetres.
    ///
    /// # Errors
    ///
    /// [`TrackError::SensorUnavailable`] when no sensor is fitted, the read
    /// fails, or the value is implausible (zero, negative, non-finite).
    pub fn read_distance(&mut self) -> Result<f32, TrackError> {
        let sensor = self
            .distance
            .as_mut()
            .ok_or_else(|| TrackError::SensorUnavailable("no distance sensor fitted".into()))?;
        let raw = sensor.read_cm()?;
        distance::plausible(raw).ok_or_else(|| {
            TrackError::SensorUnavailable(format!("implausible distance reading {raw}"))
        })
    }

    /// Power the distance sensor up or down.
    pub fn enable_distance_sensor(&mut self, enabled: bool) -> Result<(), TrackError> {
        match self.distance.as_mut() {
            Some(sensor) => sensor.set_enabled(enabled),
            None => Err(TrackError::SensorUnavailable(
                "no distance sensor fitted".into(),
            )),
        }
    }

    /// Show `color` on the LED bar (`None` = off).
    pub fn set_lights(&mut self, color: Option<LightColor>) -> Result<(), TrackError> {
        match self.lights.as_mut() {
            Some(lights) => lights.set_color(color),
            None => Err(TrackError::hardware("lights", "no LED bar fitted")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    struct MockServo {
        fail: bool,
    }
    impl ServoDriver for MockServo {
        fn set_angles(&mut self, _pan: f32, _tilt: f32) -> Result<(), TrackError> {
            if self.fail {
                Err(TrackError::hardware("pan_tilt", "bus timeout"))
            } else {
                Ok(())
            }
        }
    }

    struct MockDrive;
    impl DriveDriver for MockDrive {
        fn apply(&mut self, _command: &RobotCommand) -> Result<(), TrackError> {
            Ok(())
        }
    }

    struct ScriptedSensor {
        readings: VecDeque<Result<f32, TrackError>>,
    }
    impl DistanceSensor for ScriptedSensor {
        fn read_cm(&mut self) -> Result<f32, TrackError> {
            self.readings
                .pop_front()
                .unwrap_or_else(|| Err(TrackError::SensorUnavailable("empty".into())))
        }
    }

    fn hardware(servo_fails: bool) -> Hardware {
        Hardware::new(Box::new(MockServo { fail: servo_fails }), Box::new(MockDrive))
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[test]
    fn servo_fault_is_reported_not_swallowed() {
        let mut hw = hardware(true);
        let result = hw.set_servo(&ServoState::new(90.0, 55.0));
        assert!(matches!(result, Err(TrackError::HardwareFault { .. })));
    }

    #[test]
    fn drive_passes_through() {
        let mut hw = hardware(false);
        assert!(hw.drive(&RobotCommand::STOP).is_ok());
    }

    #[test]
    fn missing_distance_sensor_is_unavailable() {
        let mut hw = hardware(false);
        assert!(!hw.has_distance_sensor());
        assert!(matches!(
            hw.read_distance(),
            Err(TrackError::SensorUnavailable(_))
        ));
        assert!(hw.enable_distance_sensor(true).is_err());
    }

    #[test]
    fn implausible_readings_are_unavailable() {
        let sensor = ScriptedSensor {
            readings: VecDeque::from(vec![
                Ok(35.0),
                Ok(0.0),
                Err(TrackError::SensorUnavailable("nack".into())),
            ]),
        };
        let mut hw = hardware(false).with_distance_sensor(Box::new(sensor));
        assert!(hw.has_distance_sensor());
        assert_eq!(hw.read_distance(), Ok(35.0));
        assert!(hw.read_distance().is_err());
        assert!(hw.read_distance().is_err());
    }

    #[test]
    fn lights_without_bar_report_fault() {
        let mut hw = hardware(false);
        assert!(matches!(
            hw.set_lights(Some(LightColor::Red)),
            Err(TrackError::HardwareFault { component, .. }) if component == "lights"
        ));
    }
}
