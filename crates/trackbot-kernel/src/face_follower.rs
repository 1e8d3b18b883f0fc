//! [`FaceFollower`] – drives the base so a tracked face stays centered and
//! at a comfortable distance.
//!
//! | Face | Action | Command |
//! |---|---|---|
//! | `|center_x| >= dead_zone`, left of center | [`FollowAction::TurnLeft`] | rotate left at speed |
//! | `|center_x| >= dead_zone`, right of center | [`FollowAction::TurnRight`] | rotate right at speed |
//! | centered, width `< target * (1 - tolerance)` | [`FollowAction::Approach`] | forward at speed |
//! | centered, width `> target * (1 + tolerance)` | [`FollowAction::Retreat`] | reverse at speed |
//! | centered, width in band or unknown | [`FollowAction::Hold`] | all zero |
//!
//! Turning takes priority over distance keeping.  Only the latest detection
//! is considered; there is no smoothing.

use tracing::debug;
use trackbot_types::{DetectionResult, FollowConfig, RobotCommand, TrackingConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowAction {
    TurnLeft,
    TurnRight,
    Approach,
    Retreat,
    Hold,
}

#[derive(Debug, Clone)]
pub struct FaceFollower {
    dead_zone: f32,
    target_width: f32,
    tolerance: f32,
    last: FollowAction,
}

impl FaceFollower {
    /// Uses the tracking dead zone for the turn decision.
    pub fn new(tracking: &TrackingConfig) -> Self {
        let FollowConfig {
            target_width,
            tolerance,
            ..
        } = tracking.follow;
        Self {
            dead_zone: tracking.dead_zone,
            target_width,
            tolerance,
            last: FollowAction::Hold,
        }
    }

    /// `Some` only when base following is switched on in `tracking`.
    pub fn from_config(tracking: &TrackingConfig) -> Option<Self> {
        tracking.follow.enabled.then(|| Self::new(tracking))
    }

    pub fn last_action(&self) -> FollowAction {
        self.last
    }

    /// What the base should do about `face`.
    pub fn classify(&self, face: &DetectionResult) -> FollowAction {
        let x = face.center_x;
        if !x.is_finite() {
            return FollowAction::Hold;
        }
        if x.abs() >= self.dead_zone && x != 0.0 {
            return if x < 0.0 {
                FollowAction::TurnLeft
            } else {
                FollowAction::TurnRight
            };
        }
        match face.width.filter(|w| w.is_finite()) {
            Some(w) if w < self.target_width * (1.0 - self.tolerance) => FollowAction::Approach,
            Some(w) if w > self.target_width * (1.0 + self.tolerance) => FollowAction::Retreat,
            _ => FollowAction::Hold,
        }
    }

    /// Drive command for one tick.  No face means hold still.
    ///
    /// # Example
    ///
    /// ```
    /// use trackbot_kernel::{FaceFollower, FollowAction};
    /// use trackbot_types::{DetectionLabel, DetectionResult, TrackingConfig};
    ///
    /// let mut follower = FaceFollower::new(&TrackingConfig::default());
    /// let far_face = DetectionResult::new(DetectionLabel::Face, 0.0, 0.0, 0.9).with_width(0.1);
    /// let cmd = follower.step(Some(&far_face), 80.0);
    /// assert_eq!(follower.last_action(), FollowAction::Approach);
    /// assert_eq!(cmd.linear_velocity, 80.0);
    /// ```
    pub fn step(&mut self, face: Option<&DetectionResult>, speed_level: f32) -> RobotCommand {
        let action = face.map_or(FollowAction::Hold, |f| self.classify(f));
        if action != self.last {
            debug!(from = ?self.last, to = ?action, "follow action changed");
            self.last = action;
        }
        match action {
            FollowAction::TurnLeft => RobotCommand::angular(-1.0, speed_level),
            FollowAction::TurnRight => RobotCommand::angular(1.0, speed_level),
            FollowAction::Approach => RobotCommand::linear(1.0, speed_level),
            FollowAction::Retreat => RobotCommand::linear(-1.0, speed_level),
            FollowAction::Hold => RobotCommand::STOP,
        }
    }

    pub fn reset(&mut self) {
        self.last = FollowAction::Hold;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use trackbot_types::DetectionLabel;

    fn follower() -> FaceFollower {
        FaceFollower::new(&TrackingConfig::default())
    }

    fn face(x: f32, width: f32) -> DetectionResult {
        DetectionResult::new(DetectionLabel::Face, x, 0.0, 0.9).with_width(width)
    }

    #[test]
    fn disabled_by_default() {
        assert!(FaceFollower::from_config(&TrackingConfig::default()).is_none());

        let mut cfg = TrackingConfig::default();
        cfg.follow.enabled = true;
        assert!(FaceFollower::from_config(&cfg).is_some());
    }

    #[test]
    fn off_center_face_turns_toward_it() {
        let f = follower();
        assert_eq!(f.classify(&face(-0.5, 0.3)), FollowAction::TurnLeft);
        assert_eq!(f.classify(&face(0.5, 0.3)), FollowAction::TurnRight);
        assert_eq!(f.classify(&face(0.15, 0.05)), FollowAction::TurnRight);
    }

    #[test]
    fn centered_face_keeps_distance() {
        let f = follower();
        assert_eq!(f.classify(&face(0.0, 0.1)), FollowAction::Approach);
        assert_eq!(f.classify(&face(0.1, 0.5)), FollowAction::Retreat);
        assert_eq!(f.classify(&face(-0.1, 0.3)), FollowAction::Hold);
        assert_eq!(f.classify(&face(0.0, 0.25)), FollowAction::Hold);
        assert_eq!(f.classify(&face(0.0, 0.35)), FollowAction::Hold);
    }

    #[test]
    fn unknown_width_holds() {
        let f = follower();
        let bare = DetectionResult::new(DetectionLabel::Face, 0.0, 0.0, 0.9);
        assert_eq!(f.classify(&bare), FollowAction::Hold);
        assert_eq!(f.classify(&face(f32::NAN, 0.1)), FollowAction::Hold);
    }

    #[test]
    fn step_commands_match_actions() {
        let mut f = follower();
        assert_eq!(f.step(Some(&face(-0.6, 0.3)), 50.0).angular_velocity, -50.0);
        assert_eq!(f.step(Some(&face(0.0, 0.6)), 50.0).linear_velocity, -50.0);
        assert_eq!(f.last_action(), FollowAction::Retreat);
        assert!(f.step(None, 50.0).is_stopped());
        assert_eq!(f.last_action(), FollowAction::Hold);
    }

    proptest! {
        #[test]
        fn turning_never_drives_forward(x in -1.0f32..1.0, w in 0.0f32..1.0) {
            let mut f = follower();
            let cmd = f.step(Some(&face(x, w)), 100.0);
            match f.last_action() {
                FollowAction::TurnLeft | FollowAction::TurnRight => {
                    prop_assert_eq!(cmd.linear_velocity, 0.0);
                    prop_assert_eq!(cmd.angular_velocity.signum(), x.signum());
                }
                _ => prop_assert_eq!(cmd.angular_velocity, 0.0),
            }
        }
    }
}
