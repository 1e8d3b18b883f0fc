//! `trackbot-perception` – from camera frames to servo corrections.
//!
//! The detectors themselves (face encoders, hand-landmark classifiers, 3-D
//! box estimators) live outside this workspace.  This crate owns everything
//! around them: how frames reach them, how their output is filtered, and how
//! a chosen target turns into pan/tilt motion.
//!
//! # Modules
//!
//! - [`frame_bus`] – [`FrameBus`][frame_bus::FrameBus]: single-slot,
//!   latest-wins frame exchange between the capture thread and the control
//!   loop.
//! - [`detector`] – the [`Detector`][detector::Detector] capability trait,
//!   deterministic target selection, and a scripted detector for simulation.
//! - [`servo_tracker`] – [`ServoTracker`][servo_tracker::ServoTracker]:
//!   dead-zoned, step-limited, bounds-clamped pan/tilt correction.
//! - [`geometry`] – pixel bounding boxes to normalized detections.

pub mod detector;
pub mod frame_bus;
pub mod geometry;
pub mod servo_tracker;

pub use detector::{DetectionFeed, Detector, DetectorFamily, ScriptedDetector, select_target};
pub use frame_bus::FrameBus;
pub use geometry::PixelBox;
pub use servo_tracker::ServoTracker;
