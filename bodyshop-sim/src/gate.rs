//! Intake gate: classification, the destruction check, and first routing.
//!
//! The gate has no budget. It serves the intake queue until it has processed
//! the final arrival id, which is the run's natural shutdown signal: once the
//! last arrival has been admitted or retired, nothing new can enter the
//! network.

use bodyshop_core::{Clock, PriorityQueue, TrialSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::item::{DamageClass, ItemId, Stage, WorkItem};
use crate::metrics::{ItemOutcome, SharedSink};
use crate::network::StageQueues;
use crate::routing::{Outcome, RoutingTable};

pub struct IntakeGate {
    intake: Arc<PriorityQueue<WorkItem>>,
    queues: Arc<StageQueues>,
    routing: Arc<RoutingTable>,
    trials: Box<dyn TrialSource>,
    sink: SharedSink,
    clock: Clock,
    poll_interval: Duration,
    /// Destruction trial probability applied to severe arrivals.
    destruction_probability: f64,
    /// Highest arrival id; observing it ends the gate's shift.
    final_id: ItemId,
    admitted: u64,
}

impl IntakeGate {
    pub fn new(
        queues: Arc<StageQueues>,
        routing: Arc<RoutingTable>,
        trials: Box<dyn TrialSource>,
        sink: SharedSink,
        clock: Clock,
        poll_interval: Duration,
        destruction_probability: f64,
        final_id: ItemId,
    ) -> Self {
        let intake = queues.queue(Stage::Intake);
        Self {
            intake,
            queues,
            routing,
            trials,
            sink,
            clock,
            poll_interval,
            destruction_probability,
            final_id,
            admitted: 0,
        }
    }

    /// Process one arrival: destruction check, then first routing.
    fn admit(&mut self, mut item: WorkItem) {
        if item.damage_class == DamageClass::Severe
            && self
                .trials
                .bernoulli("intake-destruction", self.destruction_probability)
        {
            item.destroyed = true;
            warn!(item = item.id, "severe arrival written off at intake");
            self.sink.lock().expect("metrics sink poisoned").record_terminal(
                &item,
                ItemOutcome::Destroyed,
                self.clock.now(),
            );
            return;
        }

        match self.routing.resolve(Stage::Intake, item.damage_class) {
            Outcome::Route(candidates) => {
                let first = RoutingTable::select(candidates, self.trials.as_mut());
                item.route.push(first);
                self.admitted += 1;
                debug!(item = item.id, first = %first, "admitted");
                self.queues.push(first, item, self.clock.now());
            }
            Outcome::NoActionNeeded => {
                info!(item = item.id, "intact arrival, no repair needed");
                self.sink.lock().expect("metrics sink poisoned").record_terminal(
                    &item,
                    ItemOutcome::NoActionNeeded,
                    self.clock.now(),
                );
            }
            Outcome::Completed => {
                item.completion_time = Some(self.clock.now());
                self.sink.lock().expect("metrics sink poisoned").record_terminal(
                    &item,
                    ItemOutcome::Completed,
                    self.clock.now(),
                );
            }
            Outcome::Destroyed => {
                item.destroyed = true;
                self.sink.lock().expect("metrics sink poisoned").record_terminal(
                    &item,
                    ItemOutcome::Destroyed,
                    self.clock.now(),
                );
            }
        }
    }

    /// Serve intake until the final arrival id has been processed.
    pub async fn run(mut self) {
        loop {
            let Some(item) = self.intake.try_pop() else {
                self.clock.suspend(self.poll_interval).await;
                continue;
            };
            let id = item.id;
            self.admit(item);
            if id == self.final_id {
                break;
            }
            // Yield between arrivals so downstream tasks interleave.
            self.clock.suspend(self.poll_interval).await;
        }
        info!(
            admitted = self.admitted,
            at = %self.clock.now(),
            "intake gate closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::metrics::MetricsSink;
    use bodyshop_core::{ForcedTrials, SimTime};

    fn table() -> Arc<RoutingTable> {
        Arc::new(SimulationConfig::standard().routing_table().unwrap())
    }

    fn gate(
        queues: Arc<StageQueues>,
        trials: ForcedTrials,
        sink: SharedSink,
        clock: Clock,
        final_id: ItemId,
    ) -> IntakeGate {
        IntakeGate::new(
            queues,
            table(),
            Box::new(trials),
            sink,
            clock,
            Duration::from_secs(60),
            0.2,
            final_id,
        )
    }

    fn arrival(id: ItemId, class: DamageClass) -> WorkItem {
        let durations = vec![Duration::from_secs(600); class.visits()];
        WorkItem::new(id, 1, class, durations, SimTime::zero())
    }

    #[tokio::test(start_paused = true)]
    async fn severe_arrival_can_be_destroyed_at_the_gate() {
        let queues = Arc::new(StageQueues::new());
        let sink = MetricsSink::shared();
        let clock = Clock::start();

        queues.push(Stage::Intake, arrival(1, DamageClass::Severe), clock.now());
        gate(
            Arc::clone(&queues),
            ForcedTrials::always(),
            Arc::clone(&sink),
            clock,
            1,
        )
        .run()
        .await;

        // Destroyed at the gate: never queued downstream, empty route.
        assert_eq!(queues.live_count(), 0);
        let guard = sink.lock().unwrap();
        assert_eq!(guard.outcome_count(ItemOutcome::Destroyed), 1);
        let record = &guard.items()[0];
        assert!(record.destroyed);
        assert!(record.route.is_empty());
        assert!(record.stage_waits.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn surviving_severe_arrival_goes_to_bodywork() {
        let queues = Arc::new(StageQueues::new());
        let sink = MetricsSink::shared();
        let clock = Clock::start();

        queues.push(Stage::Intake, arrival(1, DamageClass::Severe), clock.now());
        gate(
            Arc::clone(&queues),
            // Destruction trial fails, routing fallback applies.
            ForcedTrials::never(),
            sink,
            clock,
            1,
        )
        .run()
        .await;

        let admitted = queues.queue(Stage::Bodywork).try_pop().unwrap();
        assert_eq!(admitted.id, 1);
        assert_eq!(admitted.route, vec![Stage::Bodywork]);
        assert!(!admitted.destroyed);
    }

    #[tokio::test(start_paused = true)]
    async fn intact_arrival_needs_no_action() {
        let queues = Arc::new(StageQueues::new());
        let sink = MetricsSink::shared();
        let clock = Clock::start();

        queues.push(Stage::Intake, arrival(1, DamageClass::Intact), clock.now());
        gate(
            Arc::clone(&queues),
            ForcedTrials::never(),
            Arc::clone(&sink),
            clock,
            1,
        )
        .run()
        .await;

        assert_eq!(queues.live_count(), 0);
        let guard = sink.lock().unwrap();
        assert_eq!(guard.outcome_count(ItemOutcome::NoActionNeeded), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn moderate_arrival_follows_the_first_successful_trial() {
        let queues = Arc::new(StageQueues::new());
        let sink = MetricsSink::shared();
        let clock = Clock::start();

        queues.push(Stage::Intake, arrival(1, DamageClass::Moderate), clock.now());
        gate(
            Arc::clone(&queues),
            // First candidate trial succeeds: Electrical.
            ForcedTrials::always(),
            sink,
            clock,
            1,
        )
        .run()
        .await;

        let admitted = queues.queue(Stage::Electrical).try_pop().unwrap();
        assert_eq!(admitted.route, vec![Stage::Electrical]);
    }

    #[tokio::test(start_paused = true)]
    async fn gate_terminates_only_on_the_final_id() {
        let queues = Arc::new(StageQueues::new());
        let sink = MetricsSink::shared();
        let clock = Clock::start();

        // Equal urgency keeps FIFO order, so the gate pops 3, 1, then 2.
        // With final_id = 2 it must process all three before stopping.
        for id in [3, 1, 2] {
            queues.push(Stage::Intake, arrival(id, DamageClass::Light), clock.now());
        }
        gate(Arc::clone(&queues), ForcedTrials::never(), sink, clock, 2)
            .run()
            .await;

        assert_eq!(queues.queue(Stage::Intake).len(), 0);
        // All three forwarded (routing fallback for Light is Paint).
        assert_eq!(queues.queue(Stage::Paint).len(), 3);
    }
}
