//! The heartbeat: one cooperative driver ticking every timeout tracker.
//!
//! # Responsibilities
//! - Own the tracker registration set and its lifecycle
//! - Periodically read the clock and push the current tick to every tracker
//! - Isolate per-tracker faults so one bad handler cannot starve siblings
//!
//! # Data Flow
//! ```text
//! Clock.now() ──▶ run_once(now) ──▶ tracker.tick(now)   (for each registered)
//!      ▲                │
//!      └── one tokio task, fixed interval, overruns skip (never queue)
//! ```
//!
//! # Design Decisions
//! - An explicit constructed object with an explicit start/stop lifecycle,
//!   passed by reference to connections; never a hidden singleton
//! - The registry is guarded independently of individual trackers; the
//!   heartbeat holds non-owning (shared) references for ticking only
//! - Skipped beats need no catch-up: trackers compare absolute deadlines

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::observability::metrics;
use crate::time::{Clock, Tick};
use crate::timeout::{TimeoutTracker, TrackerId};

/// Interval between beats unless configured otherwise.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Periodic driver pushing ticks to all registered trackers.
pub struct Heartbeat {
    registry: DashMap<TrackerId, Arc<TimeoutTracker>>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl Heartbeat {
    /// Create a heartbeat reading `clock` every `interval`.
    pub fn new(clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            registry: DashMap::new(),
            clock,
            interval,
        }
    }

    /// Add a tracker to the active set. No-op if already registered.
    pub fn register(&self, tracker: &Arc<TimeoutTracker>) {
        self.registry
            .entry(tracker.id())
            .or_insert_with(|| Arc::clone(tracker));
        metrics::record_registered_trackers(self.registry.len());
    }

    /// Remove a tracker from the active set.
    ///
    /// After this returns no further tick reaches the tracker: removal takes
    /// the registry shard's write lock, which orders it against any beat
    /// currently iterating that shard.
    pub fn unregister(&self, tracker: &TimeoutTracker) {
        if self.registry.remove(&tracker.id()).is_some() {
            tracing::trace!(tracker = %tracker.id(), "Tracker unregistered from heartbeat");
        }
        metrics::record_registered_trackers(self.registry.len());
    }

    /// Number of trackers currently registered.
    pub fn registered(&self) -> usize {
        self.registry.len()
    }

    /// Run one beat: push `now` to every registered tracker.
    ///
    /// A tracker whose handler panics is isolated; the remaining trackers
    /// still tick this beat.
    pub fn run_once(&self, now: Tick) {
        for entry in self.registry.iter() {
            let tracker = entry.value();
            if catch_unwind(AssertUnwindSafe(|| tracker.tick(now))).is_err() {
                tracing::error!(
                    tracker = %tracker.id(),
                    %now,
                    "Timeout handler panicked during tick; continuing with remaining trackers"
                );
            }
        }
    }

    /// Spawn the background beat loop.
    ///
    /// The returned driver stops the loop; dropping it without calling
    /// [`HeartbeatDriver::stop`] detaches the task for the life of the
    /// runtime.
    pub fn start(self: &Arc<Self>) -> HeartbeatDriver {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let heartbeat = Arc::clone(self);

        let handle = tokio::spawn(async move {
            tracing::info!(
                interval_ms = heartbeat.interval.as_millis() as u64,
                "Heartbeat starting"
            );

            let mut ticker = time::interval(heartbeat.interval);
            // An overrunning beat skips the next one instead of queueing it;
            // ticks are snapshots of now, not an event queue.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        heartbeat.run_once(heartbeat.clock.now());
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Heartbeat received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        });

        HeartbeatDriver {
            shutdown_tx,
            handle,
        }
    }
}

impl std::fmt::Debug for Heartbeat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heartbeat")
            .field("registered", &self.registry.len())
            .field("interval", &self.interval)
            .finish()
    }
}

/// Handle to a running heartbeat loop.
pub struct HeartbeatDriver {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl HeartbeatDriver {
    /// Signal the loop to exit and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }
}
