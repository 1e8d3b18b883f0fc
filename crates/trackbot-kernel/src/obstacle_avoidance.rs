//! [`ObstacleAvoidanceController`] – three distance bands, re-evaluated from
//! the raw reading every tick.
//!
//! | Reading | State | Command |
//! |---|---|---|
//! | `>= far` or unavailable | [`AvoidanceState::Cruising`] | forward at speed |
//! | `[near, far)` | [`AvoidanceState::Avoiding`] | rotate left in place |
//! | `< near` | [`AvoidanceState::Backing`] | reverse at speed |
//!
//! There is no smoothing: one noisy sample can flip the band.  An
//! unavailable reading falls back to cruising.

use tracing::info;
use trackbot_types::{AvoidanceConfig, RobotCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvoidanceState {
    Cruising,
    Avoiding,
    Backing,
}

#[derive(Debug, Clone)]
pub struct ObstacleAvoidanceController {
    near_cm: f32,
    far_cm: f32,
    state: AvoidanceState,
}

impl ObstacleAvoidanceController {
    pub fn new(config: &AvoidanceConfig) -> Self {
        Self {
            near_cm: config.near_cm,
            far_cm: config.far_cm,
            state: AvoidanceState::Cruising,
        }
    }

    pub fn state(&self) -> AvoidanceState {
        self.state
    }

    /// The band `distance_cm` falls in.  `None` means the sensor was
    /// unavailable this tick.
    pub fn classify(&self, distance_cm: Option<f32>) -> AvoidanceState {
        match distance_cm {
            Some(d) if d < self.near_cm => AvoidanceState::Backing,
            Some(d) if d < self.far_cm => AvoidanceState::Avoiding,
            _ => AvoidanceState::Cruising,
        }
    }

    /// Advance one tick and return the drive command for it.
    ///
    /// # Example
    ///
    /// ```
    /// use trackbot_kernel::{AvoidanceState, ObstacleAvoidanceController};
    /// use trackbot_types::AvoidanceConfig;
    ///
    /// let mut ctl = ObstacleAvoidanceController::new(&AvoidanceConfig::default());
    /// let cmd = ctl.step(Some(15.0), 100.0);
    /// assert_eq!(ctl.state(), AvoidanceState::Backing);
    /// assert_eq!(cmd.linear_velocity, -100.0);
    /// ```
    pub fn step(&mut self, distance_cm: Option<f32>, speed_level: f32) -> RobotCommand {
        let next = self.classify(distance_cm);
        if next != self.state {
            info!(from = ?self.state, to = ?next, distance_cm = ?distance_cm, "avoidance band changed");
            self.state = next;
        }
        match next {
            AvoidanceState::Cruising => RobotCommand::linear(1.0, speed_level),
            AvoidanceState::Avoiding => RobotCommand::angular(-1.0, speed_level),
            AvoidanceState::Backing => RobotCommand::linear(-1.0, speed_level),
        }
    }

    /// Give up control: reset to cruising and return the all-zero command
    /// that must be applied before another mode takes over.
    pub fn release(&mut self) -> RobotCommand {
        self.state = AvoidanceState::Cruising;
        RobotCommand::STOP
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn controller() -> ObstacleAvoidanceController {
        ObstacleAvoidanceController::new(&AvoidanceConfig {
            near_cm: 20.0,
            far_cm: 40.0,
        })
    }

    #[test]
    fn band_sequence_follows_readings() {
        let mut ctl = controller();
        let states: Vec<_> = [50.0, 30.0, 15.0, 30.0, 50.0]
            .into_iter()
            .map(|d| {
                ctl.step(Some(d), 100.0);
                ctl.state()
            })
            .collect();
        assert_eq!(
            states,
            vec![
                AvoidanceState::Cruising,
                AvoidanceState::Avoiding,
                AvoidanceState::Backing,
                AvoidanceState::Avoiding,
                AvoidanceState::Cruising,
            ]
        );
    }

    #[test]
    fn band_edges_are_inclusive_below() {
        let ctl = controller();
        assert_eq!(ctl.classify(Some(20.0)), AvoidanceState::Avoiding);
        assert_eq!(ctl.classify(Some(40.0)), AvoidanceState::Cruising);
        assert_eq!(ctl.classify(Some(19.9)), AvoidanceState::Backing);
    }

    #[test]
    fn unavailable_reading_cruises() {
        let mut ctl = controller();
        ctl.step(Some(10.0), 100.0);
        let cmd = ctl.step(None, 100.0);
        assert_eq!(ctl.state(), AvoidanceState::Cruising);
        assert_eq!(cmd.linear_velocity, 100.0);
    }

    #[test]
    fn avoiding_rotates_left_without_forward_motion() {
        let mut ctl = controller();
        let cmd = ctl.step(Some(30.0), 60.0);
        assert_eq!(cmd.linear_velocity, 0.0);
        assert_eq!(cmd.angular_velocity, -60.0);
    }

    #[test]
    fn release_stops_and_resets() {
        let mut ctl = controller();
        ctl.step(Some(10.0), 100.0);
        assert_eq!(ctl.release(), RobotCommand::STOP);
        assert_eq!(ctl.state(), AvoidanceState::Cruising);
    }

    proptest! {
        #[test]
        fn state_depends_only_on_current_reading(history in proptest::collection::vec(0.0f32..100.0, 0..8),
                                                 reading in 0.0f32..100.0) {
            let mut ctl = controller();
            for d in history {
                ctl.step(Some(d), 50.0);
            }
            ctl.step(Some(reading), 50.0);
            prop_assert_eq!(ctl.state(), controller().classify(Some(reading)));
        }
    }
}
