//! The [`Detector`] capability and deterministic target selection.
//!
//! Real detectors wrap third-party models and live outside this workspace.
//! The control loop only needs two things from them: which
//! [`DetectorFamily`] they serve, and a list of [`DetectionResult`]s per
//! frame.  A detector that errors is treated exactly like one that found
//! nothing.
//!
//! When several detections are returned for one frame,
//! [`select_target`] picks a single target:
//!
//! 1. drop ill-formed results and those below `min_confidence`;
//! 2. highest confidence wins;
//! 3. equal confidence: larger area wins when both report one;
//! 4. otherwise the first one seen is kept.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use trackbot_types::{DetectionLabel, DetectionResult, Frame, TrackError};

/// Which kind of model a [`Detector`] wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorFamily {
    Face,
    Gesture,
    Object,
}

impl DetectorFamily {
    /// `true` if `label` is something this family produces.
    pub fn accepts(self, label: &DetectionLabel) -> bool {
        matches!(
            (self, label),
            (DetectorFamily::Face, DetectionLabel::Face)
                | (DetectorFamily::Gesture, DetectionLabel::Hand(_))
                | (DetectorFamily::Object, DetectionLabel::Object(_))
        )
    }
}

/// A perception model that finds targets in a frame.
///
/// `detect` may block for the duration of model inference.  It is never
/// called while the frame bus lock is held.
pub trait Detector: Send {
    fn family(&self) -> DetectorFamily;

    /// # Errors
    ///
    /// [`TrackError::DetectorFailed`] for a transient inference failure,
    /// [`TrackError::DetectorUnavailable`] when the model is not loaded.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionResult>, TrackError>;
}

/// Pick the single detection to act on.  See the module docs for the rules.
pub fn select_target<F>(
    detections: &[DetectionResult],
    min_confidence: f32,
    accept: F,
) -> Option<DetectionResult>
where
    F: Fn(&DetectionLabel) -> bool,
{
    detections
        .iter()
        .filter(|d| d.is_well_formed() && d.confidence >= min_confidence && accept(&d.label))
        .fold(None, |best: Option<&DetectionResult>, candidate| match best {
            None => Some(candidate),
            Some(current) if outranks(candidate, current) => Some(candidate),
            keep => keep,
        })
        .copied()
}

fn outranks(candidate: &DetectionResult, current: &DetectionResult) -> bool {
    if candidate.confidence != current.confidence {
        return candidate.confidence > current.confidence;
    }
    match (candidate.area, current.area) {
        (Some(a), Some(b)) => a > b,
        _ => false,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scripted detector
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Script {
    queue: VecDeque<Result<Vec<DetectionResult>, TrackError>>,
    held: Option<Vec<DetectionResult>>,
    latency: Duration,
    calls: u64,
}

/// Feed handle for a [`ScriptedDetector`].  Clone freely.
#[derive(Clone, Default)]
pub struct DetectionFeed {
    script: Arc<Mutex<Script>>,
}

impl DetectionFeed {
    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the result of one future `detect` call.
    pub fn push(&self, detections: Vec<DetectionResult>) {
        self.lock().queue.push_back(Ok(detections));
    }

    /// Queue a failing `detect` call.
    pub fn push_failure(&self, error: TrackError) {
        self.lock().queue.push_back(Err(error));
    }

    /// Return `detections` on every call once the queue is drained.
    pub fn hold(&self, detections: Vec<DetectionResult>) {
        self.lock().held = Some(detections);
    }

    pub fn clear(&self) {
        let mut script = self.lock();
        script.queue.clear();
        script.held = None;
    }

    /// Make every `detect` call block for `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Number of `detect` calls so far.
    pub fn calls(&self) -> u64 {
        self.lock().calls
    }
}

/// A [`Detector`] that replays results pushed through its [`DetectionFeed`].
///
/// Stands in for real models in the simulator and in tests.
///
/// ```rust
/// use trackbot_perception::{Detector, DetectorFamily, ScriptedDetector};
/// use trackbot_types::{DetectionLabel, DetectionResult, Frame};
///
/// let (mut det, feed) = ScriptedDetector::new(DetectorFamily::Face);
/// feed.push(vec![DetectionResult::new(DetectionLabel::Face, 0.3, 0.0, 0.9)]);
///
/// let frame = Frame::new(1, 1, vec![0], 1);
/// assert_eq!(det.detect(&frame).unwrap().len(), 1);
/// assert!(det.detect(&frame).unwrap().is_empty());
/// ```
pub struct ScriptedDetector {
    family: DetectorFamily,
    feed: DetectionFeed,
}

impl ScriptedDetector {
    pub fn new(family: DetectorFamily) -> (Self, DetectionFeed) {
        let feed = DetectionFeed::default();
        (
            Self {
                family,
                feed: feed.clone(),
            },
            feed,
        )
    }
}

impl Detector for ScriptedDetector {
    fn family(&self) -> DetectorFamily {
        self.family
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<DetectionResult>, TrackError> {
        let (next, latency) = {
            let mut script = self.feed.lock();
            script.calls += 1;
            let next = match script.queue.pop_front() {
                Some(next) => next,
                None => Ok(script.held.clone().unwrap_or_default()),
            };
            (next, script.latency)
        };
        if !latency.is_zero() {
            thread::sleep(latency);
        }
        next
    }
}
