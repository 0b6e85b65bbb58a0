//! Simulation time management

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

/// A point in simulation time, stored as nanoseconds since simulation start.
///
/// `SimTime` is policy-agnostic: under a real clock it tracks wall time since
/// the run began, under a virtual clock it tracks the virtual counter. All
/// arithmetic in the engine goes through `SimTime` and `Duration` so no
/// component needs to know which policy is active.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SimTime(u64);

impl SimTime {
    /// Simulation start (time zero).
    pub const fn zero() -> Self {
        SimTime(0)
    }

    pub const fn from_nanos(nanos: u64) -> Self {
        SimTime(nanos)
    }

    pub const fn from_millis(millis: u64) -> Self {
        SimTime(millis * 1_000_000)
    }

    pub const fn from_secs(secs: u64) -> Self {
        SimTime(secs * 1_000_000_000)
    }

    pub fn from_duration(duration: Duration) -> Self {
        SimTime(duration.as_nanos() as u64)
    }

    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_nanos(self.0)
    }

    /// Elapsed time since `earlier`, saturating at zero.
    pub fn duration_since(&self, earlier: SimTime) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

    /// Elapsed time since `earlier`, or `None` if `earlier` is later.
    pub fn checked_duration_since(&self, earlier: SimTime) -> Option<Duration> {
        self.0.checked_sub(earlier.0).map(Duration::from_nanos)
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> SimTime {
        SimTime(self.0 + rhs.as_nanos() as u64)
    }
}

impl Sub<SimTime> for SimTime {
    type Output = Duration;

    fn sub(self, rhs: SimTime) -> Duration {
        self.duration_since(rhs)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.0 as f64 / 1e9)
    }
}
