//! Engine primitives for the bodyshop repair-network simulation.
//!
//! This crate knows nothing about repair shops. It provides the building
//! blocks the domain layer is assembled from:
//!
//! - [`SimTime`]: simulation timestamps with nanosecond precision.
//! - [`Clock`]: a monotonic time source plus a cooperative suspension
//!   primitive, pluggable between real and virtual pacing via [`ClockPolicy`].
//! - [`PriorityQueue`]: an unbounded, thread-safe queue ordered by a priority
//!   key, FIFO among equal keys.
//! - [`dists`]: arrival patterns and duration distributions.
//! - [`trials`]: a swappable Bernoulli trial source for routing decisions.
//!
//! All timing uses [`SimTime`]. Under [`ClockPolicy::Virtual`] the whole
//! engine runs on tokio's paused clock, so simulated hours pass in
//! microseconds of wall time while relative event ordering is preserved.

pub mod clock;
pub mod dists;
pub mod error;
pub mod logging;
pub mod queue;
pub mod time;
pub mod trials;

pub use clock::{Clock, ClockPolicy};
pub use dists::{
    ArrivalPattern, ConstantArrivals, ConstantDuration, DurationDistribution,
    ExponentialArrivals, ExponentialDuration, UniformDuration,
};
pub use error::CoreError;
pub use queue::PriorityQueue;
pub use time::SimTime;
pub use trials::{stream_seed, ForcedTrials, SeededTrials, TrialSource};
