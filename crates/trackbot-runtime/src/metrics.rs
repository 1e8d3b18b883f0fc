//! Loop health counters.
//!
//! [`LoopMetrics`] is updated by the control loop once per tick and can be
//! snapshotted at any time for logs or an external dashboard.  The
//! [`RateMeter`] reports ticks per second over a one-second window.

use std::time::{Duration, Instant};

use serde::Serialize;
use trackbot_types::Mode;

/// Counts events over a fixed window and reports the last full window's
/// rate.
#[derive(Debug, Clone)]
pub struct RateMeter {
    window: Duration,
    window_start: Option<Instant>,
    count: u32,
    rate: f32,
}

impl Default for RateMeter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl RateMeter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            window_start: None,
            count: 0,
            rate: 0.0,
        }
    }

    /// Count one event at `now`.
    pub fn record(&mut self, now: Instant) {
        let start = *self.window_start.get_or_insert(now);
        self.count += 1;
        let elapsed = now.saturating_duration_since(start);
        if elapsed >= self.window {
            self.rate = self.count as f32 / elapsed.as_secs_f32();
            self.count = 0;
            self.window_start = Some(now);
        }
    }

    /// Events per second over the last completed window (0 before the first
    /// window completes).
    pub fn rate(&self) -> f32 {
        self.rate
    }
}

/// Cumulative control-loop counters.
#[derive(Debug, Clone, Default)]
pub struct LoopMetrics {
    pub ticks: u64,
    pub overruns: u64,
    pub last_tick_latency: Duration,
    pub last_detection_present: bool,
    pub ticks_with_detection: u64,
    /// Detection-mode ticks skipped because no fresh frame was available.
    pub frameless_ticks: u64,
    pub detector_faults: u64,
    pub detector_timeouts: u64,
    pub actuator_faults: u64,
    pub transitions: u64,
    pub tick_rate: RateMeter,
}

impl LoopMetrics {
    /// Record a finished tick.  Returns `true` if it overran `period`.
    pub fn record_tick(
        &mut self,
        finished_at: Instant,
        latency: Duration,
        period: Duration,
        detection_present: bool,
    ) -> bool {
        self.ticks += 1;
        self.last_tick_latency = latency;
        self.last_detection_present = detection_present;
        if detection_present {
            self.ticks_with_detection += 1;
        }
        self.tick_rate.record(finished_at);
        let overran = latency > period;
        if overran {
            self.overruns += 1;
        }
        overran
    }

    pub fn snapshot(&self, mode: Mode, speed_level: f32) -> MetricsSnapshot {
        MetricsSnapshot {
            mode,
            speed_level,
            ticks: self.ticks,
            overruns: self.overruns,
            last_tick_latency_us: self.last_tick_latency.as_micros() as u64,
            last_detection_present: self.last_detection_present,
            ticks_with_detection: self.ticks_with_detection,
            frameless_ticks: self.frameless_ticks,
            detector_faults: self.detector_faults,
            detector_timeouts: self.detector_timeouts,
            actuator_faults: self.actuator_faults,
            transitions: self.transitions,
            tick_rate_hz: self.tick_rate.rate(),
        }
    }
}

/// Serializable point-in-time view of [`LoopMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub mode: Mode,
    pub speed_level: f32,
    pub ticks: u64,
    pub overruns: u64,
    pub last_tick_latency_us: u64,
    pub last_detection_present: bool,
    pub ticks_with_detection: u64,
    pub frameless_ticks: u64,
    pub detector_faults: u64,
    pub detector_timeouts: u64,
    pub actuator_faults: u64,
    pub transitions: u64,
    pub tick_rate_hz: f32,
}
