//! `trackbot-hal` – Hardware Abstraction Layer.
//!
//! The control core never talks to I²C registers or GPIO pins.  It talks to
//! the traits in this crate, and board-specific drivers implement them.
//!
//! # Modules
//!
//! - [`servo`] – [`ServoDriver`][servo::ServoDriver]: pan/tilt camera mount.
//! - [`drive`] – [`DriveDriver`][drive::DriveDriver] plus the
//!   [`MecanumMixer`][drive::MecanumMixer] that turns a
//!   [`RobotCommand`][trackbot_types::RobotCommand] into four wheel duties.
//! - [`distance`] – [`DistanceSensor`][distance::DistanceSensor]: the
//!   ultrasonic range finder.
//! - [`light`] – [`LightBar`][light::LightBar] and the colour cycle driven by
//!   the remote's `Light` key.
//! - [`camera`] – [`Camera`][camera::Camera]: frame source for the capture
//!   thread.
//! - [`hardware`] – [`Hardware`][hardware::Hardware]: the bundle of drivers
//!   the control loop owns; applies commands and reports faults without ever
//!   retrying inside a tick.
//! - [`sim`] – in-process simulated drivers with observation probes, for
//!   headless runs and tests.

pub mod camera;
pub mod distance;
pub mod drive;
pub mod hardware;
pub mod light;
pub mod servo;
pub mod sim;

pub use camera::Camera;
pub use distance::DistanceSensor;
pub use drive::{DriveDriver, MecanumMixer, WheelDuties};
pub use hardware::Hardware;
pub use light::{LightBar, LightColor, LightCycle};
pub use servo::ServoDriver;
