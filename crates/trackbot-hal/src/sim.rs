//! In-process simulated drivers for headless runs and CI.
//!
//! [`SimHardware`] builds a [`Hardware`] bundle whose drivers record their
//! commands into shared state, and returns a [`SimProbe`] that tests (and the
//! CLI console) use to inspect that state, script distance readings and
//! inject faults.
//!
//! Command history is a ring of the most recent
//! [`DEFAULT_HISTORY_LIMIT`] entries per actuator, so a long-running sim
//! holds bounded memory.
//!
//! # Example
//!
//! ```rust
//! use trackbot_hal::sim::SimHardware;
//! use trackbot_types::RobotCommand;
//!
//! let (mut hardware, probe) = SimHardware::new().with_distance_sensor().build();
//!
//! probe.set_distance(35.0);
//! assert_eq!(hardware.read_distance(), Ok(35.0));
//!
//! hardware.drive(&RobotCommand::linear(1.0, 100.0)).unwrap();
//! assert_eq!(probe.last_drive(), Some(RobotCommand::linear(1.0, 100.0)));
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use trackbot_types::{Frame, RobotCommand, ServoState, TrackError};

use crate::camera::Camera;
use crate::distance::DistanceSensor;
use crate::drive::{DriveDriver, MecanumMixer, WheelDuties};
use crate::hardware::Hardware;
use crate::light::{LightBar, LightColor};
use crate::servo::ServoDriver;

// ────────────────────────────────────────────────────────────────────────────
// Shared state + probe
// ────────────────────────────────────────────────────────────────────────────

/// Servo writes and drive commands kept per actuator unless overridden with
/// [`SimHardware::with_history_limit`].
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

#[derive(Debug)]
struct SimState {
    history_limit: usize,
    servo_writes: VecDeque<ServoState>,
    last_servo: Option<ServoState>,
    drive_commands: VecDeque<RobotCommand>,
    last_drive: Option<RobotCommand>,
    wheels: WheelDuties,
    distance_script: VecDeque<f32>,
    distance_hold: Option<f32>,
    distance_enabled: bool,
    light: Option<LightColor>,
    servo_fault: bool,
    drive_fault: bool,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            servo_writes: VecDeque::new(),
            last_servo: None,
            drive_commands: VecDeque::new(),
            last_drive: None,
            wheels: WheelDuties::default(),
            distance_script: VecDeque::new(),
            distance_hold: None,
            distance_enabled: false,
            light: None,
            servo_fault: false,
            drive_fault: false,
        }
    }
}

fn record<T>(history: &mut VecDeque<T>, item: T, limit: usize) {
    if limit == 0 {
        return;
    }
    while history.len() >= limit {
        history.pop_front();
    }
    history.push_back(item);
}

/// Handle onto the simulated drivers' shared state.  Clone freely.
#[derive(Clone, Default)]
pub struct SimProbe {
    state: Arc<Mutex<SimState>>,
}

impl SimProbe {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Recent servo writes, oldest first.
    pub fn servo_writes(&self) -> Vec<ServoState> {
        self.lock().servo_writes.iter().copied().collect()
    }

    /// The most recent servo write, kept even when history is capped.
    pub fn last_servo(&self) -> Option<ServoState> {
        self.lock().last_servo
    }

    /// Recent drive commands, oldest first.
    pub fn drive_commands(&self) -> Vec<RobotCommand> {
        self.lock().drive_commands.iter().copied().collect()
    }

    /// The most recent drive command, kept even when history is capped.
    pub fn last_drive(&self) -> Option<RobotCommand> {
        self.lock().last_drive
    }

    /// Wheel duties produced by the most recent drive command.
    pub fn wheels(&self) -> WheelDuties {
        self.lock().wheels
    }

    /// Forget recorded servo and drive traffic.
    pub fn clear_history(&self) {
        let mut state = self.lock();
        state.servo_writes.clear();
        state.last_servo = None;
        state.drive_commands.clear();
        state.last_drive = None;
    }

    /// Queue a one-shot distance reading.  Once the queue drains the last
    /// reading is repeated.
    pub fn push_distance(&self, cm: f32) {
        self.lock().distance_script.push_back(cm);
    }

    /// Replace any queued readings with a steady `cm`.
    pub fn set_distance(&self, cm: f32) {
        let mut state = self.lock();
        state.distance_script.clear();
        state.distance_hold = Some(cm);
    }

    pub fn distance_enabled(&self) -> bool {
        self.lock().distance_enabled
    }

    pub fn light(&self) -> Option<LightColor> {
        self.lock().light
    }

    /// Make every subsequent servo write fail.
    pub fn set_servo_fault(&self, faulted: bool) {
        self.lock().servo_fault = faulted;
    }

    /// Make every subsequent drive write fail.
    pub fn set_drive_fault(&self, faulted: bool) {
        self.lock().drive_fault = faulted;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stub drivers
// ────────────────────────────────────────────────────────────────────────────

/// Simulated pan/tilt mount.
pub struct SimServo {
    probe: SimProbe,
}

impl ServoDriver for SimServo {
    fn set_angles(&mut self, pan: f32, tilt: f32) -> Result<(), TrackError> {
        let mut state = self.probe.lock();
        if state.servo_fault {
            return Err(TrackError::hardware("sim_servo", "injected fault"));
        }
        let written = ServoState::new(pan, tilt);
        let limit = state.history_limit;
        record(&mut state.servo_writes, written, limit);
        state.last_servo = Some(written);
        Ok(())
    }
}

/// Simulated drive base.  Commands are mixed into wheel duties exactly as
/// the motor board would receive them.
pub struct SimDrive {
    probe: SimProbe,
    mixer: MecanumMixer,
}

impl DriveDriver for SimDrive {
    fn apply(&mut self, command: &RobotCommand) -> Result<(), TrackError> {
        let mut state = self.probe.lock();
        if state.drive_fault {
            return Err(TrackError::hardware("sim_drive", "injected fault"));
        }
        let limit = state.history_limit;
        record(&mut state.drive_commands, *command, limit);
        state.last_drive = Some(*command);
        state.wheels = self.mixer.mix(command);
        Ok(())
    }
}

/// Simulated ultrasonic sensor replaying scripted readings.
pub struct SimDistanceSensor {
    probe: SimProbe,
}

impl DistanceSensor for SimDistanceSensor {
    fn read_cm(&mut self) -> Result<f32, TrackError> {
        let mut state = self.probe.lock();
        if let Some(next) = state.distance_script.pop_front() {
            state.distance_hold = Some(next);
        }
        state
            .distance_hold
            .ok_or_else(|| TrackError::SensorUnavailable("no simulated reading".into()))
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), TrackError> {
        self.probe.lock().distance_enabled = enabled;
        Ok(())
    }
}

/// Simulated LED bar.
pub struct SimLightBar {
    probe: SimProbe,
}

impl LightBar for SimLightBar {
    fn set_color(&mut self, color: Option<LightColor>) -> Result<(), TrackError> {
        self.probe.lock().light = color;
        Ok(())
    }
}

/// A simulated camera producing blank greyscale frames.
///
/// [`SimCamera::with_dropouts`] makes the first `n` captures fail so the
/// capture worker's reconnect path can be exercised.
pub struct SimCamera {
    id: String,
    width: u32,
    height: u32,
    sequence: u64,
    failures_left: u32,
    reconnects: Arc<AtomicU32>,
}

impl SimCamera {
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            sequence: 0,
            failures_left: 0,
            reconnects: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn with_dropouts(mut self, failures: u32) -> Self {
        self.failures_left = failures;
        self
    }

    /// Shared counter of [`Camera::reconnect`] calls.
    pub fn reconnect_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.reconnects)
    }
}

impl Camera for SimCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn capture(&mut self) -> Result<Frame, TrackError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(TrackError::Capture(format!("{}: simulated dropout", self.id)));
        }
        self.sequence += 1;
        let len = (self.width * self.height) as usize;
        Ok(Frame::new(self.width, self.height, vec![0u8; len], self.sequence))
    }

    fn reconnect(&mut self) -> Result<(), TrackError> {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimHardware builder
// ────────────────────────────────────────────────────────────────────────────

/// Builder for a fully simulated [`Hardware`] bundle.
///
/// The servo and drive stubs are always present; the distance sensor and LED
/// bar are opt-in.
pub struct SimHardware {
    distance_sensor: bool,
    lights: bool,
    history_limit: usize,
}

impl Default for SimHardware {
    fn default() -> Self {
        Self {
            distance_sensor: false,
            lights: false,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl SimHardware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` recent servo writes and drive commands.  `0`
    /// disables history; the latest command stays observable either way.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_distance_sensor(mut self) -> Self {
        self.distance_sensor = true;
        self
    }

    pub fn with_lights(mut self) -> Self {
        self.lights = true;
        self
    }

    /// Consume the builder, returning the hardware and its probe.
    pub fn build(self) -> (Hardware, SimProbe) {
        let probe = SimProbe::default();
        probe.lock().history_limit = self.history_limit;
        let mut hardware = Hardware::new(
            Box::new(SimServo {
                probe: probe.clone(),
            }),
            Box::new(SimDrive {
                probe: probe.clone(),
                mixer: MecanumMixer::default(),
            }),
        );
        if self.distance_sensor {
            hardware = hardware.with_distance_sensor(Box::new(SimDistanceSensor {
                probe: probe.clone(),
            }));
        }
        if self.lights {
            hardware = hardware.with_lights(Box::new(SimLightBar {
                probe: probe.clone(),
            }));
        }
        (hardware, probe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn servo_and_drive_writes_are_recorded() {
        let (mut hw, probe) = SimHardware::new().build();
        hw.set_servo(&ServoState::new(80.0, 50.0)).unwrap();
        hw.drive(&RobotCommand::angular(1.0, 40.0)).unwrap();

        assert_eq!(probe.servo_writes(), vec![ServoState::new(80.0, 50.0)]);
        assert_eq!(probe.drive_commands(), vec![RobotCommand::angular(1.0, 40.0)]);
        let wheels = probe.wheels();
        assert_eq!((wheels.front_left, wheels.front_right), (40, -40));

        probe.clear_history();
        assert!(probe.drive_commands().is_empty());
        assert_eq!(probe.last_servo(), None);
    }

    #[test]
    fn history_is_capped_but_latest_survives() {
        let (mut hw, probe) = SimHardware::new().with_history_limit(3).build();
        for level in 1..=10 {
            hw.drive(&RobotCommand::linear(1.0, level as f32)).unwrap();
        }
        let kept: Vec<f32> = probe
            .drive_commands()
            .iter()
            .map(|c| c.speed_level)
            .collect();
        assert_eq!(kept, vec![8.0, 9.0, 10.0]);
        assert_eq!(probe.last_drive(), Some(RobotCommand::linear(1.0, 10.0)));

        let (mut quiet, probe) = SimHardware::new().with_history_limit(0).build();
        quiet.set_servo(&ServoState::new(70.0, 40.0)).unwrap();
        assert!(probe.servo_writes().is_empty());
        assert_eq!(probe.last_servo(), Some(ServoState::new(70.0, 40.0)));
    }

    #[test]
    fn default_history_is_bounded() {
        let (mut hw, probe) = SimHardware::new().build();
        for _ in 0..(DEFAULT_HISTORY_LIMIT * 4) {
            hw.drive(&RobotCommand::STOP).unwrap();
        }
        assert_eq!(probe.drive_commands().len(), DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn injected_faults_surface_as_hardware_faults() {
        let (mut hw, probe) = SimHardware::new().build();
        probe.set_drive_fault(true);
        probe.set_servo_fault(true);
        assert!(matches!(
            hw.drive(&RobotCommand::STOP),
            Err(TrackError::HardwareFault { .. })
        ));
        assert!(hw.set_servo(&ServoState::new(0.0, 0.0)).is_err());
        assert!(probe.drive_commands().is_empty());

        probe.set_drive_fault(false);
        assert!(hw.drive(&RobotCommand::STOP).is_ok());
    }

    #[test]
    fn scripted_distances_replay_then_hold() {
        let (mut hw, probe) = SimHardware::new().with_distance_sensor().build();
        assert!(hw.read_distance().is_err());

        probe.push_distance(50.0);
        probe.push_distance(30.0);
        assert_eq!(hw.read_distance(), Ok(50.0));
        assert_eq!(hw.read_distance(), Ok(30.0));
        assert_eq!(hw.read_distance(), Ok(30.0));

        probe.set_distance(12.0);
        assert_eq!(hw.read_distance(), Ok(12.0));
    }

    #[test]
    fn distance_sensor_power_is_observable() {
        let (mut hw, probe) = SimHardware::new().with_distance_sensor().build();
        assert!(!probe.distance_enabled());
        hw.enable_distance_sensor(true).unwrap();
        assert!(probe.distance_enabled());
    }

    #[test]
    fn lights_are_opt_in() {
        let (mut bare, _) = SimHardware::new().build();
        assert!(bare.set_lights(Some(LightColor::Blue)).is_err());

        let (mut hw, probe) = SimHardware::new().with_lights().build();
        hw.set_lights(Some(LightColor::Blue)).unwrap();
        assert_eq!(probe.light(), Some(LightColor::Blue));
    }

    #[test]
    fn sim_camera_drops_then_recovers() {
        let mut cam = SimCamera::new("usb0", 4, 4).with_dropouts(2);
        let reconnects = cam.reconnect_counter();
        assert!(cam.capture().is_err());
        assert!(cam.capture().is_err());
        cam.reconnect().unwrap();
        let frame = cam.capture().unwrap();
        assert_eq!(frame.sequence, 1);
        assert_eq!(frame.data.len(), 16);
        assert_eq!(reconnects.load(Ordering::Relaxed), 1);
    }
}
