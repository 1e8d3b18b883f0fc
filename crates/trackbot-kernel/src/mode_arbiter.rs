//! [`ModeArbiter`] – which mode owns the actuators.
//!
//! Transition table (one event per tick):
//!
//! | Event | From | To |
//! |---|---|---|
//! | `Power` | any | `Manual` (with stop + servo recenter) |
//! | `One` | any but `GestureControl` | `GestureControl` |
//! | `Two` | any but `FaceTracking` | `FaceTracking` |
//! | `Three` | any but `ObstacleAvoidance` | `ObstacleAvoidance` |
//! | toggle key of the active mode | that mode | `Manual` |
//! | any other event | `Idle` | `Manual`, event forwarded |
//! | any other event | other | unchanged, event forwarded |
//!
//! `Idle` is the startup state only.  Once any input arrives it is never
//! re-entered.

use trackbot_types::{InputEvent, Mode, RemoteKey};

/// Outcome of one [`ModeArbiter::handle`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arbitration {
    pub from: Mode,
    pub to: Mode,
    /// A `Power` press: the caller must stop the drive and recenter the
    /// servos this tick.
    pub power_stop: bool,
    /// The event for the active handler, if it was not consumed here.
    pub forward: Option<InputEvent>,
}

impl Arbitration {
    /// `true` when ownership moved to a different mode.
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// The mode a toggle key selects, if `key` is one.
pub fn toggle_target(key: RemoteKey) -> Option<Mode> {
    match key {
        RemoteKey::One => Some(Mode::GestureControl),
        RemoteKey::Two => Some(Mode::FaceTracking),
        RemoteKey::Three => Some(Mode::ObstacleAvoidance),
        _ => None,
    }
}

/// Finite-state machine over [`Mode`].
///
/// # Example
///
/// ```
/// use trackbot_kernel::ModeArbiter;
/// use trackbot_types::{InputEvent, Mode, RemoteKey};
///
/// let mut arbiter = ModeArbiter::new();
/// assert_eq!(arbiter.mode(), Mode::Idle);
///
/// let out = arbiter.handle(Some(&InputEvent::remote(RemoteKey::Three)));
/// assert!(out.changed());
/// assert_eq!(arbiter.mode(), Mode::ObstacleAvoidance);
///
/// let out = arbiter.handle(Some(&InputEvent::remote(RemoteKey::Power)));
/// assert!(out.power_stop);
/// assert_eq!(arbiter.mode(), Mode::Manual);
/// ```
#[derive(Debug, Clone)]
pub struct ModeArbiter {
    mode: Mode,
}

impl Default for ModeArbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeArbiter {
    pub fn new() -> Self {
        Self { mode: Mode::Idle }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Consume this tick's event (if any) and update the active mode.
    pub fn handle(&mut self, event: Option<&InputEvent>) -> Arbitration {
        let from = self.mode;
        let mut power_stop = false;
        let mut forward = None;

        let to = match event {
            None => from,
            Some(event) if event.remote_key() == Some(RemoteKey::Power) => {
                power_stop = true;
                Mode::Manual
            }
            Some(event) => match event.remote_key().and_then(toggle_target) {
                Some(target) if target == from => Mode::Manual,
                Some(target) => target,
                None => {
                    forward = Some(*event);
                    if from == Mode::Idle { Mode::Manual } else { from }
                }
            },
        };

        self.mode = to;
        Arbitration {
            from,
            to,
            power_stop,
            forward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackbot_types::Gesture;

    fn key(k: RemoteKey) -> InputEvent {
        InputEvent::remote(k)
    }

    fn arbiter_in(mode: Mode) -> ModeArbiter {
        let mut arbiter = ModeArbiter::new();
        let toggle = match mode {
            Mode::Idle => return arbiter,
            Mode::Manual => RemoteKey::Power,
            Mode::GestureControl => RemoteKey::One,
            Mode::FaceTracking => RemoteKey::Two,
            Mode::ObstacleAvoidance => RemoteKey::Three,
        };
        arbiter.handle(Some(&key(toggle)));
        assert_eq!(arbiter.mode(), mode);
        arbiter
    }

    #[test]
    fn starts_idle_and_stays_without_input() {
        let mut arbiter = ModeArbiter::new();
        let out = arbiter.handle(None);
        assert_eq!(out.to, Mode::Idle);
        assert!(!out.changed());
        assert!(out.forward.is_none());
    }

    #[test]
    fn power_from_any_mode_stops_into_manual() {
        for mode in Mode::ALL {
            let mut arbiter = arbiter_in(mode);
            let out = arbiter.handle(Some(&key(RemoteKey::Power)));
            assert!(out.power_stop, "from {mode}");
            assert_eq!(out.to, Mode::Manual);
            assert!(out.forward.is_none());
        }
    }

    #[test]
    fn toggle_enters_then_leaves_mode() {
        let mut arbiter = arbiter_in(Mode::Manual);
        let out = arbiter.handle(Some(&key(RemoteKey::Two)));
        assert_eq!((out.from, out.to), (Mode::Manual, Mode::FaceTracking));

        let out = arbiter.handle(Some(&key(RemoteKey::Two)));
        assert_eq!((out.from, out.to), (Mode::FaceTracking, Mode::Manual));
        assert!(!out.power_stop);
    }

    #[test]
    fn toggle_switches_directly_between_autonomous_modes() {
        let mut arbiter = arbiter_in(Mode::GestureControl);
        let out = arbiter.handle(Some(&key(RemoteKey::Three)));
        assert_eq!((out.from, out.to), (Mode::GestureControl, Mode::ObstacleAvoidance));
        assert!(out.forward.is_none());
    }

    #[test]
    fn first_motion_key_leaves_idle_and_is_forwarded() {
        let mut arbiter = ModeArbiter::new();
        let up = key(RemoteKey::Up);
        let out = arbiter.handle(Some(&up));
        assert_eq!((out.from, out.to), (Mode::Idle, Mode::Manual));
        assert_eq!(out.forward, Some(up));
    }

    #[test]
    fn idle_is_unreachable_after_first_input() {
        let mut arbiter = ModeArbiter::new();
        arbiter.handle(Some(&InputEvent::gesture(Gesture::Fist, 0.0)));
        let keys = [
            RemoteKey::Power,
            RemoteKey::One,
            RemoteKey::One,
            RemoteKey::Three,
            RemoteKey::Sound,
            RemoteKey::Three,
        ];
        for k in keys {
            arbiter.handle(Some(&key(k)));
            assert_ne!(arbiter.mode(), Mode::Idle);
        }
    }

    #[test]
    fn non_toggle_events_are_forwarded_unchanged() {
        let mut arbiter = arbiter_in(Mode::ObstacleAvoidance);
        let plus = key(RemoteKey::Plus);
        let out = arbiter.handle(Some(&plus));
        assert!(!out.changed());
        assert_eq!(out.forward, Some(plus));
    }
}
