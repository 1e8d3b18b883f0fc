//! [`FrameBus`] – latest-wins frame exchange.
//!
//! The capture thread calls [`FrameBus::publish`] for every frame it grabs;
//! the control loop calls [`FrameBus::latest`] once per tick.  The slot holds
//! an `Arc<Frame>`, so the lock is only held for a pointer swap or clone and
//! never across a detector call.  Unread frames are overwritten, never
//! queued.
//!
//! # Example
//!
//! ```rust
//! use trackbot_perception::FrameBus;
//! use trackbot_types::Frame;
//!
//! let bus = FrameBus::new();
//! assert!(bus.latest().is_none());
//!
//! bus.publish(Frame::new(2, 2, vec![0; 4], 1));
//! bus.publish(Frame::new(2, 2, vec![0; 4], 2));
//! assert_eq!(bus.latest().unwrap().sequence, 2);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use trackbot_types::Frame;

/// Single-slot frame cache shared by one producer and one consumer.
#[derive(Default)]
pub struct FrameBus {
    slot: Mutex<Option<Arc<Frame>>>,
    published: AtomicU64,
}

impl FrameBus {
    pub fn new() -> Self {
        Self::default()
    }

    // The slot only ever holds a complete `Arc<Frame>`, so a panic in another
    // holder cannot leave it half-written and the poison flag can be ignored.
    fn slot(&self) -> MutexGuard<'_, Option<Arc<Frame>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the held frame with `frame`.
    pub fn publish(&self, frame: Frame) {
        let frame = Arc::new(frame);
        let previous = self.slot().replace(frame);
        self.published.fetch_add(1, Ordering::Relaxed);
        // Dropped outside the lock.
        drop(previous);
    }

    /// The most recent frame, or `None` if nothing has been published yet.
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.slot().clone()
    }

    /// Like [`latest`](Self::latest), but treats a frame older than
    /// `max_age` as absent.
    pub fn latest_fresh(&self, max_age: Duration) -> Option<Arc<Frame>> {
        self.latest().filter(|frame| frame.age() <= max_age)
    }

    /// Total number of frames ever published.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
