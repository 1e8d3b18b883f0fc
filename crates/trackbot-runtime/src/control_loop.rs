//! [`ControlLoop`] – the fixed-tick orchestrator.
//!
//! Each tick:
//!
//! 1. **Arbitrate** – feed this tick's input event (at most one) to the
//!    [`ModeArbiter`].  A mode change applies the all-zero command, runs the
//!    old handler's `exit` and the new handler's `enter` before anything
//!    else happens, so no command from the old mode survives the switch.
//!    `Power` additionally recenters the servos.
//! 2. **Ambient keys** – `Plus`/`Minus` step the speed level and `Light`
//!    cycles the LED bar, whatever the mode.
//! 3. **Sense** – take the latest fresh frame from the [`FrameBus`] and, if
//!    the active mode needs one, run its detector on it.  A failing, missing
//!    or slow detector counts as "no detection".  Read the distance sensor
//!    if the mode wants it.  A detection mode with no fresh frame is a no-op
//!    for the tick.
//! 4. **Decide** – step the active [`ModeHandler`].
//! 5. **Act** – write the servo state (when it changed) and the drive
//!    command.  Faults are logged and counted; the next tick's fresh
//!    command is the retry.
//! 6. **Record** – latency, detection presence and overruns go into
//!    [`LoopMetrics`].
//!
//! [`ControlLoop::run`] paces ticks at the configured period.  An overrun
//! tick is logged and the next one starts immediately; missed ticks are
//! never replayed.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use trackbot_hal::{Hardware, LightCycle};
use trackbot_kernel::{Mapped, ModeArbiter, MotionCommandMapper, SpeedSelector};
use trackbot_perception::{Detector, DetectorFamily, FrameBus, select_target};
use trackbot_types::{
    ControlConfig, DetectionResult, Frame, InputEvent, Mode, RemoteKey, RobotCommand, ServoState,
    TrackError,
};

use crate::handlers::{ModeHandler, StepContext, default_handlers};
use crate::metrics::{LoopMetrics, MetricsSnapshot};

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub mode: Mode,
    /// `(from, to)` when the mode changed this tick.
    pub transition: Option<(Mode, Mode)>,
    pub command: RobotCommand,
    pub servo: ServoState,
    pub target: Option<DetectionResult>,
    pub had_frame: bool,
    pub latency: Duration,
    pub overran: bool,
}

pub struct ControlLoop {
    config: ControlConfig,
    frames: Arc<FrameBus>,
    hardware: Hardware,
    detectors: HashMap<DetectorFamily, Box<dyn Detector>>,
    handlers: HashMap<Mode, Box<dyn ModeHandler>>,
    arbiter: ModeArbiter,
    mapper: MotionCommandMapper,
    speed: SpeedSelector,
    servo: ServoState,
    applied_servo: Option<ServoState>,
    last_command: RobotCommand,
    lights: LightCycle,
    metrics: LoopMetrics,
}

impl ControlLoop {
    /// Build a loop with the default handler for every mode and no
    /// detectors.
    ///
    /// # Errors
    ///
    /// [`TrackError::InvalidConfig`] if `config` fails validation.
    pub fn new(
        config: ControlConfig,
        frames: Arc<FrameBus>,
        hardware: Hardware,
    ) -> Result<Self, TrackError> {
        config.validate()?;
        let handlers = default_handlers(&config)
            .into_iter()
            .map(|h| (h.mode(), h))
            .collect();
        Ok(Self {
            mapper: MotionCommandMapper::from_config(&config.drive),
            speed: SpeedSelector::from_config(&config.drive),
            servo: ServoState::centered(&config.tracking),
            config,
            frames,
            hardware,
            detectors: HashMap::new(),
            handlers,
            arbiter: ModeArbiter::new(),
            applied_servo: None,
            last_command: RobotCommand::STOP,
            lights: LightCycle::default(),
            metrics: LoopMetrics::default(),
        })
    }

    /// Install `detector` for its family, replacing any previous one.
    pub fn register_detector(&mut self, detector: Box<dyn Detector>) {
        self.detectors.insert(detector.family(), detector);
    }

    /// Replace the handler for `handler.mode()`.
    pub fn register_handler(&mut self, handler: Box<dyn ModeHandler>) {
        self.handlers.insert(handler.mode(), handler);
    }

    pub fn mode(&self) -> Mode {
        self.arbiter.mode()
    }

    pub fn servo(&self) -> ServoState {
        self.servo
    }

    pub fn speed_level(&self) -> f32 {
        self.speed.level()
    }

    pub fn last_command(&self) -> RobotCommand {
        self.last_command
    }

    pub fn metrics(&self) -> &LoopMetrics {
        &self.metrics
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.mode(), self.speed.level())
    }

    // ── Tick ────────────────────────────────────────────────────────────────

    /// Run one tick with at most one input event.
    pub fn tick(&mut self, event: Option<InputEvent>) -> TickReport {
        let started = Instant::now();

        // 1. Arbitrate.
        let arbitration = self.arbiter.handle(event.as_ref());
        if arbitration.power_stop {
            info!(from = %arbitration.from, "power stop");
            self.servo = ServoState::centered(&self.config.tracking);
        }
        let transition = arbitration.changed().then_some((arbitration.from, arbitration.to));
        if arbitration.changed() || arbitration.power_stop {
            self.switch_mode(arbitration.from, arbitration.to);
        }

        // 2. Ambient keys.
        let event = arbitration.forward.and_then(|e| self.handle_ambient(e));

        // 3. Sense.
        let mode = self.arbiter.mode();
        let (family, wants_distance) = match self.handlers.get(&mode) {
            Some(h) => (h.detector_family(), h.wants_distance()),
            None => (None, false),
        };
        let frame = self.frames.latest_fresh(self.config.timing.frame_max_age());
        let had_frame = frame.is_some();
        let frameless = family.is_some() && frame.is_none();
        let target = match (family, frame.as_deref()) {
            (Some(family), Some(frame)) => self.detect(family, frame),
            _ => None,
        };
        let distance_cm = if wants_distance {
            self.read_distance()
        } else {
            None
        };

        // 4. Decide.
        let command = if frameless {
            self.metrics.frameless_ticks += 1;
            RobotCommand::STOP
        } else {
            let speed_level = self.speed.level();
            match self.handlers.get_mut(&mode) {
                Some(handler) => handler.step(&mut StepContext {
                    now: started,
                    target,
                    event,
                    distance_cm,
                    speed_level,
                    servo: &mut self.servo,
                }),
                None => {
                    warn!(%mode, "no handler registered; holding still");
                    RobotCommand::STOP
                }
            }
        };

        // 5. Act.
        self.apply_servo();
        self.apply_drive(command);

        // 6. Record.
        let latency = started.elapsed();
        let overran = self.metrics.record_tick(
            Instant::now(),
            latency,
            self.config.timing.tick_period(),
            target.is_some(),
        );

        let report = TickReport {
            mode,
            transition,
            command,
            servo: self.servo,
            target,
            had_frame,
            latency,
            overran,
        };
        debug!(?report, "tick");
        report
    }

    /// Tick at the configured period until `shutdown` is set, taking at most
    /// one event from `events` per tick.  Applies the all-zero command and
    /// turns the lights off on the way out.
    pub fn run(&mut self, events: &Receiver<InputEvent>, shutdown: &AtomicBool) {
        let period = self.config.timing.tick_period();
        info!(period_ms = period.as_millis() as u64, "control loop started");
        let mut inputs_open = true;

        while !shutdown.load(Ordering::Relaxed) {
            let started = Instant::now();
            let event = if inputs_open {
                match events.try_recv() {
                    Ok(event) => Some(event),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => {
                        info!("input stream closed");
                        inputs_open = false;
                        None
                    }
                }
            } else {
                None
            };

            let report = self.tick(event);
            if report.overran {
                warn!(
                    latency_ms = report.latency.as_millis() as u64,
                    period_ms = period.as_millis() as u64,
                    "tick overran its period"
                );
                continue;
            }
            if let Some(remaining) = period.checked_sub(started.elapsed()) {
                thread::sleep(remaining);
            }
        }

        self.halt();
        info!(ticks = self.metrics.ticks, "control loop stopped");
    }

    /// Stop the base, release the active mode's peripherals and turn the
    /// lights off.
    pub fn halt(&mut self) {
        self.apply_drive(RobotCommand::STOP);
        let mode = self.arbiter.mode();
        if let Some(handler) = self.handlers.get_mut(&mode)
            && let Err(e) = handler.exit(&mut self.hardware)
        {
            debug!(%mode, error = %e, "mode exit on halt");
        }
        self.lights.reset();
        if let Err(e) = self.hardware.set_lights(None) {
            debug!(error = %e, "lights off on halt");
        }
    }

    // ── Internals ───────────────────────────────────────────────────────────

    fn switch_mode(&mut self, from: Mode, to: Mode) {
        self.apply_drive(RobotCommand::STOP);
        if let Some(old) = self.handlers.get_mut(&from)
            && let Err(e) = old.exit(&mut self.hardware)
        {
            warn!(mode = %from, error = %e, "mode exit failed");
        }
        if let Some(new) = self.handlers.get_mut(&to)
            && let Err(e) = new.enter(&mut self.hardware)
        {
            warn!(mode = %to, error = %e, "mode enter failed");
        }
        if from != to {
            self.metrics.transitions += 1;
            info!(%from, %to, "mode transition");
        }
    }

    /// Consume speed and light keys.  Returns the event if it is not one.
    fn handle_ambient(&mut self, event: InputEvent) -> Option<InputEvent> {
        match event.remote_key() {
            Some(key) if key.is_speed_key() => {
                if let Mapped::SpeedChanged { level } = self.mapper.map(&event, &mut self.speed) {
                    info!(level, "speed level changed");
                }
                None
            }
            Some(RemoteKey::Light) => {
                let color = self.lights.advance();
                if let Err(e) = self.hardware.set_lights(color) {
                    warn!(error = %e, "light change failed");
                }
                None
            }
            _ => Some(event),
        }
    }

    fn detect(&mut self, family: DetectorFamily, frame: &Frame) -> Option<DetectionResult> {
        let Some(detector) = self.detectors.get_mut(&family) else {
            debug!(?family, "no detector registered");
            return None;
        };
        let started = Instant::now();
        let result = detector.detect(frame);
        let elapsed = started.elapsed();

        let detections = match result {
            Ok(_) if elapsed > self.config.timing.detection_timeout() => {
                self.metrics.detector_timeouts += 1;
                warn!(?family, elapsed_ms = elapsed.as_millis() as u64, "detector timed out");
                return None;
            }
            Ok(detections) => detections,
            Err(e) => {
                self.metrics.detector_faults += 1;
                warn!(?family, error = %e, "detector failed");
                return None;
            }
        };
        select_target(&detections, self.config.tracking.min_confidence, |label| {
            family.accepts(label)
        })
    }

    fn read_distance(&mut self) -> Option<f32> {
        match self.hardware.read_distance() {
            Ok(cm) => Some(cm),
            Err(e) => {
                debug!(error = %e, "distance unavailable");
                None
            }
        }
    }

    fn apply_servo(&mut self) {
        if self.applied_servo == Some(self.servo) {
            return;
        }
        match self.hardware.set_servo(&self.servo) {
            Ok(()) => self.applied_servo = Some(self.servo),
            Err(e) => {
                self.metrics.actuator_faults += 1;
                warn!(error = %e, "servo write failed");
            }
        }
    }

    fn apply_drive(&mut self, command: RobotCommand) {
        self.last_command = command;
        if let Err(e) = self.hardware.drive(&command) {
            self.metrics.actuator_faults += 1;
            warn!(error = %e, "drive write failed");
        }
    }
}
