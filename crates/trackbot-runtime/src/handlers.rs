//! One [`ModeHandler`] per [`Mode`].
//!
//! The control loop owns a handler for every mode and dispatches to exactly
//! one per tick.  Handlers never touch the drive directly: they return the
//! [`RobotCommand`] for the tick and, for tracking, update the servo state
//! they are handed.  Only `enter`/`exit` get hardware access, for
//! mode-scoped peripherals such as the range sensor.

use std::time::{Duration, Instant};

use trackbot_hal::Hardware;
use trackbot_kernel::{FaceFollower, MotionCommandMapper, ObstacleAvoidanceController};
use trackbot_perception::{DetectorFamily, ServoTracker};
use trackbot_types::{
    ControlConfig, DetectionLabel, DetectionResult, InputEvent, Mode, RobotCommand, ServoState,
    TrackError,
};

/// Per-tick inputs for the active handler.
pub struct StepContext<'a> {
    pub now: Instant,
    /// Selected target from this tick's detector run, if any.
    pub target: Option<DetectionResult>,
    /// Operator input not already consumed by the arbiter or loop.
    pub event: Option<InputEvent>,
    /// Fresh distance reading; `None` when unavailable or not requested.
    pub distance_cm: Option<f32>,
    pub speed_level: f32,
    pub servo: &'a mut ServoState,
}

/// Strategy for one operating mode.
pub trait ModeHandler: Send {
    fn mode(&self) -> Mode;

    /// Detector family this mode consumes.  `None` means the mode runs
    /// without frames.
    fn detector_family(&self) -> Option<DetectorFamily> {
        None
    }

    /// Whether the loop should read the distance sensor each tick.
    fn wants_distance(&self) -> bool {
        false
    }

    fn enter(&mut self, _hardware: &mut Hardware) -> Result<(), TrackError> {
        Ok(())
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> RobotCommand;

    /// Called after the all-zero command has been applied on the way out.
    fn exit(&mut self, _hardware: &mut Hardware) -> Result<(), TrackError> {
        Ok(())
    }
}

/// Handlers for every mode, built from `config`.
pub fn default_handlers(config: &ControlConfig) -> Vec<Box<dyn ModeHandler>> {
    let mapper = MotionCommandMapper::from_config(&config.drive);
    vec![
        Box::new(IdleHandler),
        Box::new(ManualHandler::new(mapper.clone())),
        Box::new(GestureHandler::new(mapper, config.timing.gesture_hold())),
        Box::new(FaceTrackingHandler::new(
            ServoTracker::new(&config.tracking),
            FaceFollower::from_config(&config.tracking),
        )),
        Box::new(AvoidanceHandler::new(ObstacleAvoidanceController::new(
            &config.avoidance,
        ))),
    ]
}

// ────────────────────────────────────────────────────────────────────────────
// Idle
// ────────────────────────────────────────────────────────────────────────────

/// Startup state: holds everything still.
pub struct IdleHandler;

impl ModeHandler for IdleHandler {
    fn mode(&self) -> Mode {
        Mode::Idle
    }

    fn step(&mut self, _ctx: &mut StepContext<'_>) -> RobotCommand {
        RobotCommand::STOP
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Manual
// ────────────────────────────────────────────────────────────────────────────

/// Remote control.  Each key press replaces the held command; with no input
/// the robot keeps doing what it was last told.
pub struct ManualHandler {
    mapper: MotionCommandMapper,
    current: RobotCommand,
}

impl ManualHandler {
    pub fn new(mapper: MotionCommandMapper) -> Self {
        Self {
            mapper,
            current: RobotCommand::STOP,
        }
    }
}

impl ModeHandler for ManualHandler {
    fn mode(&self) -> Mode {
        Mode::Manual
    }

    fn enter(&mut self, _hardware: &mut Hardware) -> Result<(), TrackError> {
        self.current = RobotCommand::STOP;
        Ok(())
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> RobotCommand {
        if let Some(event) = ctx.event.as_ref() {
            self.current = self.mapper.command_for(event, ctx.speed_level);
        }
        self.current
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gesture control
// ────────────────────────────────────────────────────────────────────────────

/// Drives from the hand gesture in view.
///
/// A gesture arriving as an input event wins over the detector for that
/// tick.  When the hand disappears the last gesture command is held for
/// `hold`, then replaced by the all-zero command.
pub struct GestureHandler {
    mapper: MotionCommandMapper,
    hold: Duration,
    last: Option<(RobotCommand, Instant)>,
}

impl GestureHandler {
    pub fn new(mapper: MotionCommandMapper, hold: Duration) -> Self {
        Self {
            mapper,
            hold,
            last: None,
        }
    }
}

impl ModeHandler for GestureHandler {
    fn mode(&self) -> Mode {
        Mode::GestureControl
    }

    fn detector_family(&self) -> Option<DetectorFamily> {
        Some(DetectorFamily::Gesture)
    }

    fn enter(&mut self, _hardware: &mut Hardware) -> Result<(), TrackError> {
        self.last = None;
        Ok(())
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> RobotCommand {
        let gesture = match (ctx.event, ctx.target) {
            (Some(event @ InputEvent::Gesture { .. }), _) => Some(event),
            (
                _,
                Some(DetectionResult {
                    label: DetectionLabel::Hand(gesture),
                    center_x,
                    ..
                }),
            ) => Some(InputEvent::gesture(gesture, center_x)),
            _ => None,
        };
        if let Some(event) = gesture {
            let command = self.mapper.command_for(&event, ctx.speed_level);
            self.last = Some((command, ctx.now));
            return command;
        }

        match self.last {
            Some((command, seen)) if ctx.now.saturating_duration_since(seen) <= self.hold => {
                command
            }
            _ => {
                self.last = None;
                RobotCommand::STOP
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Face tracking
// ────────────────────────────────────────────────────────────────────────────

/// Keeps the face in view with the pan/tilt mount.  The base stays still
/// unless a [`FaceFollower`] is fitted, in which case it turns toward the
/// face and keeps its distance.
pub struct FaceTrackingHandler {
    tracker: ServoTracker,
    follower: Option<FaceFollower>,
}

impl FaceTrackingHandler {
    pub fn new(tracker: ServoTracker, follower: Option<FaceFollower>) -> Self {
        Self { tracker, follower }
    }
}

impl ModeHandler for FaceTrackingHandler {
    fn mode(&self) -> Mode {
        Mode::FaceTracking
    }

    fn detector_family(&self) -> Option<DetectorFamily> {
        Some(DetectorFamily::Face)
    }

    fn enter(&mut self, _hardware: &mut Hardware) -> Result<(), TrackError> {
        if let Some(follower) = self.follower.as_mut() {
            follower.reset();
        }
        Ok(())
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> RobotCommand {
        if let Some(target) = ctx.target.as_ref() {
            *ctx.servo = self.tracker.track(ctx.servo, target);
        }
        match self.follower.as_mut() {
            Some(follower) => follower.step(ctx.target.as_ref(), ctx.speed_level),
            None => RobotCommand::STOP,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Obstacle avoidance
// ────────────────────────────────────────────────────────────────────────────

/// Autonomous roaming.  Powers the range sensor for as long as it is
/// active.
pub struct AvoidanceHandler {
    controller: ObstacleAvoidanceController,
}

impl AvoidanceHandler {
    pub fn new(controller: ObstacleAvoidanceController) -> Self {
        Self { controller }
    }
}

impl ModeHandler for AvoidanceHandler {
    fn mode(&self) -> Mode {
        Mode::ObstacleAvoidance
    }

    fn wants_distance(&self) -> bool {
        true
    }

    fn enter(&mut self, hardware: &mut Hardware) -> Result<(), TrackError> {
        hardware.enable_distance_sensor(true)
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> RobotCommand {
        self.controller.step(ctx.distance_cm, ctx.speed_level)
    }

    fn exit(&mut self, hardware: &mut Hardware) -> Result<(), TrackError> {
        self.controller.release();
        hardware.enable_distance_sensor(false)
    }
}
