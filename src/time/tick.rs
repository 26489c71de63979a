//! The tick: a monotonic count of elapsed milliseconds.

use std::fmt;

/// A point on the process-wide monotonic timeline.
///
/// Ticks count elapsed milliseconds since an arbitrary epoch. They are totally
/// ordered and the difference of two ticks is a meaningful duration; the
/// absolute value is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick(u64);

impl Tick {
    /// The epoch tick.
    pub const ZERO: Tick = Tick(0);

    /// Wrap a raw tick count.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw tick count.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The tick `duration_ticks` later than this one, saturating at the top
    /// of the timeline.
    pub const fn advanced_by(&self, duration_ticks: u64) -> Tick {
        Tick(self.0.saturating_add(duration_ticks))
    }

    /// Elapsed ticks since `earlier`, or zero if `earlier` is in the future.
    pub const fn ticks_since(&self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl From<u64> for Tick {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
