//! Clock sources feeding the heartbeat.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::tick::Tick;

/// A monotonic time source.
///
/// `now` is side-effect-free to callers and never goes backwards. The clock
/// advances externally; a stalled clock is an external fault, not this
/// subsystem's responsibility.
pub trait Clock: Send + Sync {
    /// Current position on the monotonic timeline.
    fn now(&self) -> Tick;
}

/// Wall-runtime clock backed by `std::time::Instant`.
///
/// The epoch is captured at construction, so ticks count milliseconds of
/// process uptime since the clock was created.
#[derive(Debug)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    /// Create a clock whose epoch is now.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Tick {
        Tick::new(self.epoch.elapsed().as_millis() as u64)
    }
}

/// Hand-driven clock for deterministic tests and simulations.
///
/// `advance`/`set` only move forward; an attempt to set an earlier tick is
/// ignored so the monotonicity contract of [`Clock`] holds.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock positioned at `start`.
    pub fn new(start: Tick) -> Self {
        Self {
            now: AtomicU64::new(start.as_u64()),
        }
    }

    /// Move the clock forward by `ticks`.
    pub fn advance(&self, ticks: u64) {
        self.now.fetch_add(ticks, Ordering::SeqCst);
    }

    /// Move the clock to `tick`, if `tick` is not in the past.
    pub fn set(&self, tick: Tick) {
        self.now.fetch_max(tick.as_u64(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Tick {
        Tick::new(self.now.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(Tick::ZERO);
        assert_eq!(clock.now(), Tick::ZERO);

        clock.advance(100);
        assert_eq!(clock.now(), Tick::new(100));

        clock.set(Tick::new(500));
        assert_eq!(clock.now(), Tick::new(500));
    }

    #[test]
    fn manual_clock_never_goes_backwards() {
        let clock = ManualClock::new(Tick::new(1_000));
        clock.set(Tick::new(10));
        assert_eq!(clock.now(), Tick::new(1_000));
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
