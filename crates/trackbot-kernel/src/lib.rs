//! `trackbot-kernel` – the control core's rule engines.
//!
//! Nothing in this crate touches hardware or threads.  Each type is a small
//! state machine or pure mapping that the runtime drives once per tick.
//!
//! # Modules
//!
//! - [`mode_arbiter`] – [`ModeArbiter`][mode_arbiter::ModeArbiter]: decides
//!   which [`Mode`][trackbot_types::Mode] owns actuator output, handling
//!   toggle keys and the mode-independent power stop.
//! - [`command_mapper`] – [`MotionCommandMapper`][command_mapper::MotionCommandMapper]
//!   and [`SpeedSelector`][command_mapper::SpeedSelector]: remote keys and
//!   gestures to [`RobotCommand`][trackbot_types::RobotCommand]s.
//! - [`obstacle_avoidance`] – [`ObstacleAvoidanceController`][obstacle_avoidance::ObstacleAvoidanceController]:
//!   cruise / avoid / back-up bands over the latest distance reading.
//! - [`face_follower`] – [`FaceFollower`][face_follower::FaceFollower]:
//!   optional base turning and distance keeping behind a tracked face.

pub mod command_mapper;
pub mod face_follower;
pub mod mode_arbiter;
pub mod obstacle_avoidance;

pub use command_mapper::{Mapped, MotionCommandMapper, SpeedSelector};
pub use face_follower::{FaceFollower, FollowAction};
pub use mode_arbiter::{Arbitration, ModeArbiter};
pub use obstacle_avoidance::{AvoidanceState, ObstacleAvoidanceController};
