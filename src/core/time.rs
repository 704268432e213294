//! Simulated time with picosecond resolution.
//!
//! FTM timestamps are picosecond counters, finer than [`Duration`] can
//! carry, so the simulation clock is its own type. Delays between events
//! stay plain [`Duration`]s.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::time::Duration;

use super::constants::TIMESTAMP_MASK;

/// Point in simulated time, in picoseconds since the simulation started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(u64);

impl SimTime {
    /// Start of the simulation.
    pub const ZERO: Self = Self(0);

    /// Create from picoseconds.
    pub const fn from_picos(ps: u64) -> Self {
        Self(ps)
    }

    /// Create from nanoseconds.
    pub const fn from_nanos(ns: u64) -> Self {
        Self(ns * 1_000)
    }

    /// Create from microseconds.
    pub const fn from_micros(us: u64) -> Self {
        Self(us * 1_000_000)
    }

    /// Create from milliseconds.
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms * 1_000_000_000)
    }

    /// Picoseconds since the start.
    pub const fn as_picos(self) -> u64 {
        self.0
    }

    /// 48-bit protocol timestamp of this instant.
    pub const fn timestamp(self) -> u64 {
        self.0 & TIMESTAMP_MASK
    }

    /// Time elapsed since `earlier`, zero if `earlier` is later.
    pub fn saturating_since(self, earlier: SimTime) -> Duration {
        picos_to_duration(self.0.saturating_sub(earlier.0))
    }
}

/// Convert a duration to whole picoseconds, saturating at `u64::MAX`.
pub fn duration_to_picos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos().saturating_mul(1_000)).unwrap_or(u64::MAX)
}

/// Convert picoseconds to a duration, truncating below one nanosecond.
pub fn picos_to_duration(ps: u64) -> Duration {
    Duration::from_nanos(ps / 1_000)
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> SimTime {
        SimTime(self.0.saturating_add(duration_to_picos(rhs)))
    }
}

impl AddAssign<Duration> for SimTime {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl Sub for SimTime {
    type Output = Duration;

    fn sub(self, rhs: SimTime) -> Duration {
        self.saturating_since(rhs)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ps", self.0)
    }
}
