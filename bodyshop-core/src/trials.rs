//! Bernoulli trial facade for routing decisions.
//!
//! Routing and destruction checks never touch an RNG directly; they go
//! through [`TrialSource`] so tests can force outcomes and a fixed seed
//! reproduces the exact trial sequence. Each call carries a static site tag
//! used purely for tracing.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;
use tracing::trace;

/// Sampling interface for independent Bernoulli trials.
pub trait TrialSource: Send {
    /// Run one trial that succeeds with `probability` (clamped to [0, 1]).
    fn bernoulli(&mut self, site: &'static str, probability: f64) -> bool;
}

/// Seeded trial source backed by a ChaCha stream.
pub struct SeededTrials {
    rng: ChaCha8Rng,
}

impl SeededTrials {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl TrialSource for SeededTrials {
    fn bernoulli(&mut self, site: &'static str, probability: f64) -> bool {
        let outcome = self.rng.gen_bool(probability.clamp(0.0, 1.0));
        trace!(site, probability, outcome, "bernoulli trial");
        outcome
    }
}

/// Trial source with a scripted outcome sequence, for tests.
///
/// Pops scripted outcomes in order; once the script is exhausted every trial
/// returns `fallback`.
pub struct ForcedTrials {
    script: VecDeque<bool>,
    fallback: bool,
}

impl ForcedTrials {
    pub fn new(script: impl IntoIterator<Item = bool>, fallback: bool) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback,
        }
    }

    /// Every trial succeeds.
    pub fn always() -> Self {
        Self::new([], true)
    }

    /// Every trial fails.
    pub fn never() -> Self {
        Self::new([], false)
    }
}

impl TrialSource for ForcedTrials {
    fn bernoulli(&mut self, site: &'static str, _probability: f64) -> bool {
        let outcome = self.script.pop_front().unwrap_or(self.fallback);
        trace!(site, outcome, "forced trial");
        outcome
    }
}

/// Derive an independent stream seed from a master seed and a stream index.
///
/// splitmix64 mixing keeps per-component streams decorrelated while the whole
/// run stays reproducible from one master seed.
pub fn stream_seed(master: u64, stream: u64) -> u64 {
    let mut x = master ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
