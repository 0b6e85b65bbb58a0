//! Distribution traits and implementations for arrival patterns and repair times
//!
//! Every distribution owns a seeded ChaCha stream, so a fixed master seed
//! reproduces the exact same draw sequence across runs.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

use crate::error::CoreError;

/// Trait for generating inter-arrival intervals.
pub trait ArrivalPattern: Send {
    /// Time to wait before the next arrival.
    fn next_arrival(&mut self) -> Duration;
}

/// Trait for sampling non-negative work durations.
pub trait DurationDistribution: Send {
    fn sample(&mut self) -> Duration;
}

/// Fixed inter-arrival time.
#[derive(Debug, Clone)]
pub struct ConstantArrivals {
    interval: Duration,
}

impl ConstantArrivals {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl ArrivalPattern for ConstantArrivals {
    fn next_arrival(&mut self) -> Duration {
        self.interval
    }
}

/// Poisson process: exponentially distributed inter-arrival times.
pub struct ExponentialArrivals {
    rng: ChaCha8Rng,
    dist: rand_distr::Exp<f64>,
}

impl ExponentialArrivals {
    /// `mean` is the average inter-arrival interval.
    pub fn new(mean: Duration, seed: u64) -> Result<Self, CoreError> {
        let mean_secs = mean.as_secs_f64();
        if mean_secs <= 0.0 {
            return Err(CoreError::InvalidDistribution(format!(
                "exponential arrival mean must be positive, got {mean_secs}s"
            )));
        }
        let dist = rand_distr::Exp::new(1.0 / mean_secs)
            .map_err(|e| CoreError::InvalidDistribution(e.to_string()))?;
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            dist,
        })
    }
}

impl ArrivalPattern for ExponentialArrivals {
    fn next_arrival(&mut self) -> Duration {
        Duration::from_secs_f64(self.rng.sample(self.dist))
    }
}

/// Always the same duration.
#[derive(Debug, Clone)]
pub struct ConstantDuration {
    value: Duration,
}

impl ConstantDuration {
    pub fn new(value: Duration) -> Self {
        Self { value }
    }
}

impl DurationDistribution for ConstantDuration {
    fn sample(&mut self) -> Duration {
        self.value
    }
}

/// Uniform draw from `[low, high)`.
pub struct UniformDuration {
    low: Duration,
    high: Duration,
    rng: ChaCha8Rng,
}

impl UniformDuration {
    pub fn new(low: Duration, high: Duration, seed: u64) -> Result<Self, CoreError> {
        if low >= high {
            return Err(CoreError::InvalidDistribution(format!(
                "uniform bounds must satisfy low < high, got {low:?} >= {high:?}"
            )));
        }
        Ok(Self {
            low,
            high,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }
}

impl DurationDistribution for UniformDuration {
    fn sample(&mut self) -> Duration {
        self.rng.gen_range(self.low..self.high)
    }
}

/// Exponentially distributed duration with the given mean.
pub struct ExponentialDuration {
    rng: ChaCha8Rng,
    dist: rand_distr::Exp<f64>,
}

impl ExponentialDuration {
    pub fn new(mean: Duration, seed: u64) -> Result<Self, CoreError> {
        let mean_secs = mean.as_secs_f64();
        if mean_secs <= 0.0 {
            return Err(CoreError::InvalidDistribution(format!(
                "exponential duration mean must be positive, got {mean_secs}s"
            )));
        }
        let dist = rand_distr::Exp::new(1.0 / mean_secs)
            .map_err(|e| CoreError::InvalidDistribution(e.to_string()))?;
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            dist,
        })
    }
}

impl DurationDistribution for ExponentialDuration {
    fn sample(&mut self) -> Duration {
        Duration::from_secs_f64(self.rng.sample(self.dist))
    }
}
