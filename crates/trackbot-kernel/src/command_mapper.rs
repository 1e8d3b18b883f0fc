//! [`MotionCommandMapper`] – remote keys and gestures to drive commands.
//!
//! | Event | Command |
//! |---|---|
//! | `Up` / thumbs-up | linear `+speed` |
//! | `Down` / thumbs-down | linear `-speed` |
//! | `Left` / `Right` | lateral `-speed` / `+speed` |
//! | `TurnLeft` / `TurnRight` | angular `-speed` / `+speed` |
//! | peace | angular `+spin_rate` |
//! | pointing | angular `∓speed`, toward the side the hand is on |
//! | `Plus` / `Minus` | speed level up / down, no motion change |
//! | open palm, fist, `Zero`, `Five`, `Power` | stop |
//! | anything else | stop |
//!
//! Unknown input always stops the robot; it never repeats the last command.

use trackbot_types::{DriveConfig, Gesture, InputEvent, RemoteKey, RobotCommand};

// ────────────────────────────────────────────────────────────────────────────
// SpeedSelector
// ────────────────────────────────────────────────────────────────────────────

/// The current speed level, stepped through a fixed ascending set.
///
/// Owned by the control loop; this is the only runtime-mutable tunable.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedSelector {
    levels: Vec<f32>,
    index: usize,
}

impl SpeedSelector {
    /// `index` is clamped into range.  An empty `levels` list behaves as a
    /// single level of zero.
    pub fn new(levels: Vec<f32>, index: usize) -> Self {
        let levels = if levels.is_empty() { vec![0.0] } else { levels };
        let index = index.min(levels.len() - 1);
        Self { levels, index }
    }

    pub fn from_config(drive: &DriveConfig) -> Self {
        Self::new(drive.speed_levels.clone(), drive.default_speed_index)
    }

    pub fn level(&self) -> f32 {
        self.levels[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Step up one level, saturating at the top.  Returns the new level.
    pub fn increase(&mut self) -> f32 {
        self.index = (self.index + 1).min(self.levels.len() - 1);
        self.level()
    }

    /// Step down one level, saturating at the bottom.  Returns the new level.
    pub fn decrease(&mut self) -> f32 {
        self.index = self.index.saturating_sub(1);
        self.level()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Mapper
// ────────────────────────────────────────────────────────────────────────────

/// What an input event resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mapped {
    /// A new drive command replacing the previous one.
    Drive(RobotCommand),
    /// The speed level changed; the current motion is left as is.
    SpeedChanged { level: f32 },
}

#[derive(Debug, Clone)]
pub struct MotionCommandMapper {
    spin_rate: f32,
}

impl MotionCommandMapper {
    pub fn new(spin_rate: f32) -> Self {
        Self { spin_rate }
    }

    pub fn from_config(drive: &DriveConfig) -> Self {
        Self::new(drive.spin_rate)
    }

    /// Resolve `event`, applying speed keys to `speed`.
    pub fn map(&self, event: &InputEvent, speed: &mut SpeedSelector) -> Mapped {
        match event.remote_key() {
            Some(RemoteKey::Plus) => Mapped::SpeedChanged {
                level: speed.increase(),
            },
            Some(RemoteKey::Minus) => Mapped::SpeedChanged {
                level: speed.decrease(),
            },
            _ => Mapped::Drive(self.command_for(event, speed.level())),
        }
    }

    /// The drive command for `event` at `speed_level`.  Speed keys and
    /// unrecognised events yield [`RobotCommand::STOP`].
    pub fn command_for(&self, event: &InputEvent, speed_level: f32) -> RobotCommand {
        match *event {
            InputEvent::Remote { key } => match key {
                RemoteKey::Up => RobotCommand::linear(1.0, speed_level),
                RemoteKey::Down => RobotCommand::linear(-1.0, speed_level),
                RemoteKey::Left => RobotCommand::lateral(-1.0, speed_level),
                RemoteKey::Right => RobotCommand::lateral(1.0, speed_level),
                RemoteKey::TurnLeft => RobotCommand::angular(-1.0, speed_level),
                RemoteKey::TurnRight => RobotCommand::angular(1.0, speed_level),
                _ => RobotCommand::STOP,
            },
            InputEvent::Gesture { gesture, center_x } => match gesture {
                Gesture::ThumbsUp => RobotCommand::linear(1.0, speed_level),
                Gesture::ThumbsDown => RobotCommand::linear(-1.0, speed_level),
                Gesture::Peace => RobotCommand {
                    angular_velocity: self.spin_rate,
                    speed_level,
                    ..RobotCommand::STOP
                },
                Gesture::Pointing if center_x.is_finite() && center_x != 0.0 => {
                    RobotCommand::angular(center_x.signum(), speed_level)
                }
                _ => RobotCommand::STOP,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speed() -> SpeedSelector {
        SpeedSelector::from_config(&DriveConfig::default())
    }

    fn mapper() -> MotionCommandMapper {
        MotionCommandMapper::from_config(&DriveConfig::default())
    }

    fn drive(m: Mapped) -> RobotCommand {
        match m {
            Mapped::Drive(cmd) => cmd,
            other => panic!("expected a drive command, got {other:?}"),
        }
    }

    #[test]
    fn thumbs_up_drives_forward_at_speed_level() {
        let cmd = mapper().command_for(&InputEvent::gesture(Gesture::ThumbsUp, 0.0), 2.0);
        // Velocities other than linear are zero; speed_level records the scale.
        assert_eq!(
            cmd,
            RobotCommand {
                linear_velocity: 2.0,
                lateral_velocity: 0.0,
                angular_velocity: 0.0,
                speed_level: 2.0,
            }
        );
    }

    #[test]
    fn remote_motion_keys() {
        let m = mapper();
        let at = |k| m.command_for(&InputEvent::remote(k), 60.0);
        assert_eq!(at(RemoteKey::Up).linear_velocity, 60.0);
        assert_eq!(at(RemoteKey::Down).linear_velocity, -60.0);
        assert_eq!(at(RemoteKey::Left).lateral_velocity, -60.0);
        assert_eq!(at(RemoteKey::Right).lateral_velocity, 60.0);
        assert_eq!(at(RemoteKey::TurnLeft).angular_velocity, -60.0);
        assert_eq!(at(RemoteKey::TurnRight).angular_velocity, 60.0);
    }

    #[test]
    fn stop_inputs_yield_all_zero() {
        let m = mapper();
        for event in [
            InputEvent::remote(RemoteKey::Zero),
            InputEvent::remote(RemoteKey::Five),
            InputEvent::remote(RemoteKey::Power),
            InputEvent::gesture(Gesture::OpenPalm, 0.3),
            InputEvent::gesture(Gesture::Fist, -0.3),
        ] {
            assert_eq!(m.command_for(&event, 100.0), RobotCommand::STOP, "{event:?}");
        }
    }

    #[test]
    fn unknown_events_stop_regardless_of_history() {
        let m = mapper();
        let mut s = speed();
        let moving = drive(m.map(&InputEvent::remote(RemoteKey::Up), &mut s));
        assert!(!moving.is_stopped());

        for event in [
            InputEvent::remote(RemoteKey::Sound),
            InputEvent::remote(RemoteKey::Nine),
            InputEvent::gesture(Gesture::Unknown, 0.0),
            InputEvent::gesture(Gesture::OkSign, 0.0),
        ] {
            assert_eq!(drive(m.map(&event, &mut s)), RobotCommand::STOP);
        }
    }

    #[test]
    fn peace_spins_at_fixed_rate() {
        let cmd = mapper().command_for(&InputEvent::gesture(Gesture::Peace, 0.0), 20.0);
        assert_eq!(cmd.angular_velocity, 100.0);
        assert_eq!(cmd.linear_velocity, 0.0);
    }

    #[test]
    fn pointing_turns_toward_the_hand() {
        let m = mapper();
        let left = m.command_for(&InputEvent::gesture(Gesture::Pointing, -0.4), 80.0);
        let right = m.command_for(&InputEvent::gesture(Gesture::Pointing, 0.4), 80.0);
        assert_eq!(left.angular_velocity, -80.0);
        assert_eq!(right.angular_velocity, 80.0);
        let centered = m.command_for(&InputEvent::gesture(Gesture::Pointing, 0.0), 80.0);
        assert!(centered.is_stopped());
    }

    #[test]
    fn speed_keys_change_level_without_motion() {
        let m = mapper();
        let mut s = speed();
        assert_eq!(s.level(), 100.0);
        assert_eq!(
            m.map(&InputEvent::remote(RemoteKey::Plus), &mut s),
            Mapped::SpeedChanged { level: 120.0 }
        );
        assert_eq!(
            m.map(&InputEvent::remote(RemoteKey::Minus), &mut s),
            Mapped::SpeedChanged { level: 100.0 }
        );
    }

    #[test]
    fn speed_level_saturates_at_both_ends() {
        let mut s = SpeedSelector::new(vec![10.0, 20.0, 30.0], 1);
        assert_eq!(s.increase(), 30.0);
        assert_eq!(s.increase(), 30.0);
        assert_eq!(s.decrease(), 20.0);
        assert_eq!(s.decrease(), 10.0);
        assert_eq!(s.decrease(), 10.0);
        assert_eq!(s.index(), 0);
    }

    #[test]
    fn out_of_range_start_index_is_clamped() {
        let s = SpeedSelector::new(vec![10.0, 20.0], 9);
        assert_eq!(s.level(), 20.0);
        assert_eq!(SpeedSelector::new(Vec::new(), 0).level(), 0.0);
    }
}
