//! Monotonic time source and cooperative suspension.
//!
//! The engine never calls `tokio::time` directly; everything goes through
//! [`Clock`] so that timing behavior is decided in exactly one place. Both
//! policies share one code path: `suspend` is a tokio sleep and `now` reads a
//! tokio `Instant` relative to the clock's origin. Under
//! [`ClockPolicy::Virtual`] the owning runtime is built with paused time, so
//! sleeps auto-advance a virtual counter to the earliest pending deadline.
//! Relative event ordering is preserved while total program runtime is
//! decoupled from simulated duration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::SimTime;

/// How simulated time relates to wall-clock time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockPolicy {
    /// `suspend` actually delays the caller by the requested duration.
    Real,
    /// `suspend` advances a virtual counter without delaying execution.
    /// Requires a current-thread runtime started with paused time; see
    /// [`ClockPolicy::build_runtime`].
    #[default]
    Virtual,
}

impl ClockPolicy {
    /// Build the tokio runtime matching this policy.
    ///
    /// All simulation tasks are cooperatively scheduled on a single thread,
    /// which keeps interleaving deterministic under the virtual policy.
    pub fn build_runtime(self) -> std::io::Result<tokio::runtime::Runtime> {
        let mut builder = tokio::runtime::Builder::new_current_thread();
        builder.enable_time();
        if self == ClockPolicy::Virtual {
            builder.start_paused(true);
        }
        builder.build()
    }
}

/// Clock handle shared by every task in a run.
///
/// Cheap to clone; all clones observe the same origin.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    /// Start a clock at the current instant. Must be called from within the
    /// runtime the simulation executes on.
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Current simulation time.
    pub fn now(&self) -> SimTime {
        SimTime::from_duration(self.origin.elapsed())
    }

    /// Cooperatively yield for `duration` of simulated time.
    pub async fn suspend(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn virtual_clock_advances_without_delay() {
        let clock = Clock::start();
        assert_eq!(clock.now(), SimTime::zero());

        clock.suspend(Duration::from_secs(3600)).await;
        assert_eq!(clock.now(), SimTime::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_suspensions_overlap() {
        // Two tasks sleeping in parallel advance the clock by the longest
        // sleep, not the sum.
        let clock = Clock::start();
        let a = tokio::spawn({
            let clock = clock;
            async move { clock.suspend(Duration::from_secs(5)).await }
        });
        let b = tokio::spawn({
            let clock = clock;
            async move { clock.suspend(Duration::from_secs(3)).await }
        });
        a.await.unwrap();
        b.await.unwrap();
        assert_eq!(clock.now(), SimTime::from_secs(5));
    }

    #[test]
    fn policy_builds_matching_runtime() {
        let rt = ClockPolicy::Virtual.build_runtime().unwrap();
        rt.block_on(async {
            let clock = Clock::start();
            clock.suspend(Duration::from_secs(1)).await;
            assert_eq!(clock.now(), SimTime::from_secs(1));
        });
    }
}
