//! `trackbot-runtime` – the tracking-and-arbitration loop.
//!
//! Two threads run at any time: the capture producer and the control
//! consumer.  They share exactly one thing, the
//! [`FrameBus`][trackbot_perception::FrameBus].
//!
//! # Modules
//!
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]: fixed-tick
//!   orchestrator that arbitrates modes, runs detectors, dispatches to the
//!   active handler and applies the result to the hardware.
//! - [`handlers`] – [`ModeHandler`][handlers::ModeHandler] and one
//!   implementation per [`Mode`][trackbot_types::Mode].
//! - [`capture`] – [`CaptureWorker`][capture::CaptureWorker]: camera thread
//!   with drop counting and reconnect.
//! - [`metrics`] – [`LoopMetrics`][metrics::LoopMetrics] and a tick-rate
//!   meter.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing].

pub mod capture;
pub mod control_loop;
pub mod handlers;
pub mod metrics;
pub mod telemetry;

pub use capture::{CaptureHandle, CaptureSettings, CaptureStats, CaptureWorker};
pub use control_loop::{ControlLoop, TickReport};
pub use handlers::{ModeHandler, StepContext};
pub use metrics::{LoopMetrics, MetricsSnapshot, RateMeter};
pub use telemetry::init_tracing;
