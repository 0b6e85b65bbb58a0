//! Arrival generation: the source task feeding the intake queue.

use bodyshop_core::{ArrivalPattern, Clock, DurationDistribution};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::info;

use crate::item::{DamageClass, ItemId, Stage, WorkItem, MAX_URGENCY};
use crate::network::StageQueues;

/// Produces a fixed number of arrivals, one at a time, each after a sampled
/// inter-arrival delay.
///
/// The generator only ever pushes: it never waits on any downstream queue, so
/// arrival timing is independent of repair progress.
pub struct ArrivalGenerator {
    total: u64,
    pattern: Box<dyn ArrivalPattern>,
    durations: Box<dyn DurationDistribution>,
    rng: ChaCha8Rng,
    queues: Arc<StageQueues>,
    clock: Clock,
}

impl ArrivalGenerator {
    pub fn new(
        total: u64,
        pattern: Box<dyn ArrivalPattern>,
        durations: Box<dyn DurationDistribution>,
        seed: u64,
        queues: Arc<StageQueues>,
        clock: Clock,
    ) -> Self {
        Self {
            total,
            pattern,
            durations,
            rng: ChaCha8Rng::seed_from_u64(seed),
            queues,
            clock,
        }
    }

    /// Sample urgency, damage class, and the class's full duration stack for
    /// the next arrival.
    fn next_item(&mut self, id: ItemId) -> WorkItem {
        let urgency = self.rng.gen_range(0..=MAX_URGENCY);
        let class = DamageClass::ALL[self.rng.gen_range(0..DamageClass::ALL.len())];
        let durations = (0..class.visits())
            .map(|_| self.durations.sample())
            .collect();
        WorkItem::new(id, urgency, class, durations, self.clock.now())
    }

    /// Emit ids `1..=total` into the intake queue, then finish.
    pub async fn run(mut self) {
        for id in 1..=self.total {
            let delay = self.pattern.next_arrival();
            self.clock.suspend(delay).await;

            let item = self.next_item(id);
            info!(
                item = item.id,
                urgency = item.urgency,
                class = %item.damage_class,
                at = %self.clock.now(),
                "arrival"
            );
            self.queues.push(Stage::Intake, item, self.clock.now());
        }
        info!(total = self.total, "arrival stream exhausted");
    }
}
