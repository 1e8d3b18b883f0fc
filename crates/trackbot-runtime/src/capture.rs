//! [`CaptureWorker`] – the frame producer thread.
//!
//! Grabs frames from a [`Camera`] as fast as the configured frame interval
//! allows and publishes each one to the [`FrameBus`].  Failed grabs are
//! counted as drops; after more than `reconnect_after` consecutive drops the
//! worker backs off and asks the camera to reconnect.
//!
//! The worker never blocks on the consumer: publishing is a pointer swap.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, warn};
use trackbot_hal::Camera;
use trackbot_perception::FrameBus;
use trackbot_types::TrackError;

/// Tunables for the capture thread.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Consecutive drops tolerated before a reconnect.
    pub reconnect_after: u32,
    /// Pause before reconnecting.
    pub reconnect_backoff: Duration,
    /// Pause between grabs.
    pub frame_interval: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            reconnect_after: 10,
            reconnect_backoff: Duration::from_secs(1),
            frame_interval: Duration::from_millis(33),
        }
    }
}

impl CaptureSettings {
    /// Settings pacing grabs at `fps` frames per second.
    pub fn for_fps(fps: u32) -> Self {
        Self {
            frame_interval: Duration::from_secs(1) / fps.max(1),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
struct CaptureCounters {
    frames: AtomicU64,
    dropped: AtomicU64,
    reconnects: AtomicU64,
}

/// Point-in-time capture counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureStats {
    pub frames: u64,
    pub dropped: u64,
    pub reconnects: u64,
}

/// Owner handle for a running capture thread.  Dropping it stops the thread.
pub struct CaptureHandle {
    stop: Arc<AtomicBool>,
    counters: Arc<CaptureCounters>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames: self.counters.frames.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            reconnects: self.counters.reconnects.load(Ordering::Relaxed),
        }
    }

    /// Signal the thread to stop and wait for it.
    pub fn stop(mut self) -> CaptureStats {
        self.shutdown();
        self.stats()
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!("capture thread panicked");
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub struct CaptureWorker;

impl CaptureWorker {
    /// Start capturing from `camera` into `bus` on a dedicated thread.
    ///
    /// # Errors
    ///
    /// [`TrackError::Capture`] if the thread cannot be spawned.
    pub fn spawn(
        mut camera: Box<dyn Camera>,
        bus: Arc<FrameBus>,
        settings: CaptureSettings,
    ) -> Result<CaptureHandle, TrackError> {
        let stop = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(CaptureCounters::default());

        let thread = {
            let stop = Arc::clone(&stop);
            let counters = Arc::clone(&counters);
            thread::Builder::new()
                .name("capture".to_string())
                .spawn(move || capture_loop(camera.as_mut(), &bus, &settings, &stop, &counters))
                .map_err(|e| TrackError::Capture(format!("failed to spawn capture thread: {e}")))?
        };

        Ok(CaptureHandle {
            stop,
            counters,
            thread: Some(thread),
        })
    }
}

fn capture_loop(
    camera: &mut dyn Camera,
    bus: &FrameBus,
    settings: &CaptureSettings,
    stop: &AtomicBool,
    counters: &CaptureCounters,
) {
    info!(camera = camera.id(), "capture started");
    let mut consecutive_drops = 0u32;

    while !stop.load(Ordering::Relaxed) {
        match camera.capture() {
            Ok(frame) => {
                consecutive_drops = 0;
                bus.publish(frame);
                counters.frames.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                consecutive_drops += 1;
                counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(camera = camera.id(), drops = consecutive_drops, error = %e, "frame dropped");

                if consecutive_drops > settings.reconnect_after {
                    info!(camera = camera.id(), "reconnecting camera");
                    sleep_unless_stopped(settings.reconnect_backoff, stop);
                    if let Err(e) = camera.reconnect() {
                        warn!(camera = camera.id(), error = %e, "camera reconnect failed");
                    }
                    counters.reconnects.fetch_add(1, Ordering::Relaxed);
                    consecutive_drops = 0;
                }
            }
        }
        thread::sleep(settings.frame_interval);
    }
    info!(camera = camera.id(), "capture stopped");
}

fn sleep_unless_stopped(duration: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + duration;
    while !stop.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(Duration::from_millis(20)));
    }
}
