//! Single-slot armed-deadline state machine.
//!
//! # Responsibilities
//! - Hold at most one armed deadline per connection
//! - Advance on heartbeat ticks; fire the handler exactly once on expiry
//! - Linearize arm/cancel from I/O contexts against ticks from the heartbeat
//!
//! # Design Decisions
//! - One `std::sync::Mutex` around all tracker state is the single
//!   synchronization point; cancel-before-tick and tick-before-cancel are
//!   totally ordered through it
//! - The handler runs after the lock is released: re-arming from inside a
//!   handler is legal, and a panicking handler cannot poison tracker state

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::observability::metrics;
use crate::time::Tick;

use super::handler::TimeoutHandler;
use super::reason::TimeoutReason;

/// Global atomic counter for tracker IDs.
/// Relaxed ordering is sufficient since we only need uniqueness.
static TRACKER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a tracker, used as the heartbeat registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackerId(u64);

impl TrackerId {
    fn next() -> Self {
        Self(TRACKER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for TrackerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tracker-{}", self.0)
    }
}

/// Caller-contract violations on tracker operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TrackerError {
    /// `set_timeout` requires a duration of at least one tick; callers that
    /// want immediate expiry arm with one tick, never zero.
    #[error("timeout duration must be at least one tick")]
    ZeroDuration,

    /// `initialize` must run before any arm.
    #[error("tracker used before initialize")]
    NotInitialized,

    /// `initialize` may only run once per tracker.
    #[error("tracker initialized twice")]
    AlreadyInitialized,
}

#[derive(Debug)]
struct TrackerState {
    /// Latest tick observed, monotonically clamped.
    current: Tick,
    /// Armed deadline. `Some` iff `reason` is `Some`.
    deadline: Option<Tick>,
    /// Which phase armed the current deadline.
    reason: Option<TimeoutReason>,
    initialized: bool,
}

/// Per-connection timeout tracker.
///
/// Created with its connection, registered with the heartbeat for its whole
/// life, unregistered and discarded at connection teardown. Armed from the
/// connection's I/O context, ticked from the heartbeat task.
pub struct TimeoutTracker {
    id: TrackerId,
    handler: Arc<dyn TimeoutHandler>,
    state: Mutex<TrackerState>,
}

impl TimeoutTracker {
    /// Create an uninitialized tracker firing into `handler`.
    pub fn new(handler: Arc<dyn TimeoutHandler>) -> Self {
        Self {
            id: TrackerId::next(),
            handler,
            state: Mutex::new(TrackerState {
                current: Tick::ZERO,
                deadline: None,
                reason: None,
                initialized: false,
            }),
        }
    }

    /// This tracker's registry key.
    pub fn id(&self) -> TrackerId {
        self.id
    }

    /// Set the starting reference tick. Must be called once before any arm.
    pub fn initialize(&self, baseline: Tick) -> Result<(), TrackerError> {
        let mut state = self.state.lock().expect("tracker mutex poisoned");
        if state.initialized {
            return Err(TrackerError::AlreadyInitialized);
        }
        state.current = baseline;
        state.initialized = true;
        Ok(())
    }

    /// Arm a deadline `duration_ticks` from the current tick.
    ///
    /// Unconditionally overwrites any previously armed deadline and reason
    /// (last writer wins); arming with the same reason still resets the
    /// deadline.
    pub fn set_timeout(
        &self,
        duration_ticks: u64,
        reason: TimeoutReason,
    ) -> Result<(), TrackerError> {
        if duration_ticks == 0 {
            return Err(TrackerError::ZeroDuration);
        }
        let mut state = self.state.lock().expect("tracker mutex poisoned");
        if !state.initialized {
            return Err(TrackerError::NotInitialized);
        }
        let deadline = state.current.advanced_by(duration_ticks);
        state.deadline = Some(deadline);
        state.reason = Some(reason);
        tracing::trace!(
            tracker = %self.id,
            %reason,
            %deadline,
            "Timeout armed"
        );
        Ok(())
    }

    /// Disarm. No-op when nothing is armed.
    ///
    /// Once this returns, the just-canceled arm can no longer fire: a tick
    /// racing this call is ordered through the state mutex, and a tick that
    /// already disarmed-and-decided fires the *previous* arm, not a canceled
    /// one.
    pub fn cancel_timeout(&self) {
        let mut state = self.state.lock().expect("tracker mutex poisoned");
        if state.reason.is_some() {
            tracing::trace!(tracker = %self.id, "Timeout canceled");
        }
        state.deadline = None;
        state.reason = None;
    }

    /// The reason currently armed, if any.
    pub fn armed_reason(&self) -> Option<TimeoutReason> {
        self.state.lock().expect("tracker mutex poisoned").reason
    }

    /// Advance the tracker to `now` and fire the handler if the armed
    /// deadline has been reached.
    ///
    /// Disarms before invoking the handler, so repeated ticks past the same
    /// deadline fire exactly once; further ticks on an unarmed tracker are
    /// no-ops.
    pub fn tick(&self, now: Tick) {
        let fired = {
            let mut state = self.state.lock().expect("tracker mutex poisoned");
            if !state.initialized {
                tracing::debug!(tracker = %self.id, "Tick before initialize; ignoring");
                return;
            }
            if now > state.current {
                state.current = now;
            }
            match (state.deadline, state.reason) {
                (Some(deadline), Some(reason)) if now >= deadline => {
                    state.deadline = None;
                    state.reason = None;
                    Some(reason)
                }
                _ => None,
            }
        };

        if let Some(reason) = fired {
            tracing::debug!(tracker = %self.id, %reason, %now, "Timeout expired, firing handler");
            metrics::record_timeout_fired(reason);
            self.handler.on_timeout(reason);
        }
    }
}

impl std::fmt::Debug for TimeoutTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutTracker")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        fired: Mutex<Vec<TimeoutReason>>,
    }

    impl Recorder {
        fn fired(&self) -> Vec<TimeoutReason> {
            self.fired.lock().unwrap().clone()
        }
    }

    impl TimeoutHandler for Recorder {
        fn on_timeout(&self, reason: TimeoutReason) {
            self.fired.lock().unwrap().push(reason);
        }
    }

    fn tracker_at_zero() -> (TimeoutTracker, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let tracker = TimeoutTracker::new(recorder.clone());
        tracker.initialize(Tick::ZERO).unwrap();
        (tracker, recorder)
    }

    #[test]
    fn no_premature_fire() {
        let (tracker, recorder) = tracker_at_zero();
        tracker
            .set_timeout(1_000, TimeoutReason::RequestHeaders)
            .unwrap();

        tracker.tick(Tick::new(1));
        tracker.tick(Tick::new(500));
        tracker.tick(Tick::new(999));

        assert!(recorder.fired().is_empty());
        assert_eq!(tracker.armed_reason(), Some(TimeoutReason::RequestHeaders));
    }

    #[test]
    fn fires_exactly_once_at_deadline() {
        let (tracker, recorder) = tracker_at_zero();
        tracker
            .set_timeout(1_000, TimeoutReason::RequestHeaders)
            .unwrap();

        tracker.tick(Tick::new(1_000));
        tracker.tick(Tick::new(1_000));
        tracker.tick(Tick::new(5_000));

        assert_eq!(recorder.fired(), vec![TimeoutReason::RequestHeaders]);
        assert_eq!(tracker.armed_reason(), None);
    }

    #[test]
    fn fires_past_deadline_when_beats_were_missed() {
        let (tracker, recorder) = tracker_at_zero();
        tracker.set_timeout(100, TimeoutReason::KeepAlive).unwrap();

        // deadlines are absolute, so a late first tick still fires
        tracker.tick(Tick::new(10_000));

        assert_eq!(recorder.fired(), vec![TimeoutReason::KeepAlive]);
    }

    #[test]
    fn cancel_before_tick_never_fires() {
        let (tracker, recorder) = tracker_at_zero();
        tracker
            .set_timeout(1_000, TimeoutReason::RequestHeaders)
            .unwrap();
        tracker.cancel_timeout();

        tracker.tick(Tick::new(1_000));
        tracker.tick(Tick::new(2_000));

        assert!(recorder.fired().is_empty());
    }

    #[test]
    fn rearm_resets_deadline_and_reason() {
        let (tracker, recorder) = tracker_at_zero();
        tracker
            .set_timeout(100, TimeoutReason::RequestHeaders)
            .unwrap();
        tracker
            .set_timeout(200, TimeoutReason::RequestBody)
            .unwrap();

        tracker.tick(Tick::new(150));
        assert!(recorder.fired().is_empty());

        tracker.tick(Tick::new(200));
        assert_eq!(recorder.fired(), vec![TimeoutReason::RequestBody]);
    }

    #[test]
    fn rearm_with_same_reason_resets_deadline() {
        let (tracker, recorder) = tracker_at_zero();
        tracker
            .set_timeout(100, TimeoutReason::KeepAlive)
            .unwrap();

        tracker.tick(Tick::new(50));
        tracker
            .set_timeout(100, TimeoutReason::KeepAlive)
            .unwrap();

        // deadline moved to 50 + 100
        tracker.tick(Tick::new(100));
        assert!(recorder.fired().is_empty());

        tracker.tick(Tick::new(150));
        assert_eq!(recorder.fired(), vec![TimeoutReason::KeepAlive]);
    }

    #[test]
    fn rearm_after_fire_runs_a_fresh_cycle() {
        let (tracker, recorder) = tracker_at_zero();
        tracker.set_timeout(100, TimeoutReason::KeepAlive).unwrap();
        tracker.tick(Tick::new(100));

        tracker
            .set_timeout(100, TimeoutReason::RequestBody)
            .unwrap();
        tracker.tick(Tick::new(200));

        assert_eq!(
            recorder.fired(),
            vec![TimeoutReason::KeepAlive, TimeoutReason::RequestBody]
        );
    }

    #[test]
    fn zero_duration_is_rejected() {
        let (tracker, recorder) = tracker_at_zero();
        assert_eq!(
            tracker.set_timeout(0, TimeoutReason::RequestHeaders),
            Err(TrackerError::ZeroDuration)
        );

        tracker.tick(Tick::new(1_000));
        assert!(recorder.fired().is_empty());
    }

    #[test]
    fn arm_before_initialize_is_rejected() {
        let tracker = TimeoutTracker::new(Arc::new(Recorder::default()));
        assert_eq!(
            tracker.set_timeout(100, TimeoutReason::RequestHeaders),
            Err(TrackerError::NotInitialized)
        );
    }

    #[test]
    fn double_initialize_is_rejected() {
        let (tracker, _) = tracker_at_zero();
        assert_eq!(
            tracker.initialize(Tick::new(5)),
            Err(TrackerError::AlreadyInitialized)
        );
    }

    #[test]
    fn ticks_clamp_monotonically() {
        let (tracker, recorder) = tracker_at_zero();
        tracker.tick(Tick::new(500));
        // an out-of-order older tick must not rewind the baseline
        tracker.tick(Tick::new(100));
        tracker.set_timeout(100, TimeoutReason::KeepAlive).unwrap();

        // armed at current=500, so the deadline is 600
        tracker.tick(Tick::new(599));
        assert!(recorder.fired().is_empty());
        tracker.tick(Tick::new(600));
        assert_eq!(recorder.fired(), vec![TimeoutReason::KeepAlive]);
    }

    #[test]
    fn rearm_from_inside_handler_is_legal() {
        struct Rearming {
            tracker: Mutex<Option<Arc<TimeoutTracker>>>,
            fired: Mutex<Vec<TimeoutReason>>,
        }

        impl TimeoutHandler for Rearming {
            fn on_timeout(&self, reason: TimeoutReason) {
                self.fired.lock().unwrap().push(reason);
                if let Some(tracker) = self.tracker.lock().unwrap().as_ref() {
                    tracker
                        .set_timeout(100, TimeoutReason::KeepAlive)
                        .unwrap();
                }
            }
        }

        let handler = Arc::new(Rearming {
            tracker: Mutex::new(None),
            fired: Mutex::new(Vec::new()),
        });
        let tracker = Arc::new(TimeoutTracker::new(handler.clone()));
        tracker.initialize(Tick::ZERO).unwrap();
        *handler.tracker.lock().unwrap() = Some(tracker.clone());

        tracker
            .set_timeout(100, TimeoutReason::RequestHeaders)
            .unwrap();
        tracker.tick(Tick::new(100));

        // the handler re-armed KeepAlive during the fire
        assert_eq!(tracker.armed_reason(), Some(TimeoutReason::KeepAlive));
        assert_eq!(
            handler.fired.lock().unwrap().clone(),
            vec![TimeoutReason::RequestHeaders]
        );
    }
}
