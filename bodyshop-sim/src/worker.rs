//! Budget-limited stage workers.
//!
//! A worker polls one stage queue, repairs what it pops, then routes the item
//! onward. Its budget is a time account: every loop iteration charges a fixed
//! overhead, and every repair additionally charges the efficiency-scaled
//! service time. The worker stops the moment the account hits zero, whether
//! or not items remain queued.

use bodyshop_core::{Clock, PriorityQueue, TrialSource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::item::{Stage, WorkItem};
use crate::metrics::{ItemOutcome, RepairEntry, SharedSink};
use crate::network::StageQueues;
use crate::routing::{Outcome, RoutingTable};

/// End-of-run summary for one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub id: u32,
    pub display_name: String,
    pub stage: Stage,
    pub total_repairs: u64,
    /// Budget left when the worker stopped; zero unless the intake gate's
    /// shutdown raced ahead of this worker's queue.
    pub remaining_budget: Duration,
}

/// What the worker decided about the item it just popped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Acceptance {
    Accept { overtime: bool },
    Decline,
}

pub struct Worker {
    id: u32,
    display_name: String,
    stage: Stage,
    efficiency: f64,
    remaining: Duration,
    overtime_ceiling: Duration,
    poll_interval: Duration,
    iteration_overhead: Duration,
    queue: Arc<PriorityQueue<WorkItem>>,
    queues: Arc<StageQueues>,
    routing: Arc<RoutingTable>,
    trials: Box<dyn TrialSource>,
    sink: SharedSink,
    clock: Clock,
    total_repairs: u64,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u32,
        display_name: String,
        stage: Stage,
        efficiency: f64,
        budget: Duration,
        overtime_ceiling: Duration,
        poll_interval: Duration,
        iteration_overhead: Duration,
        queues: Arc<StageQueues>,
        routing: Arc<RoutingTable>,
        trials: Box<dyn TrialSource>,
        sink: SharedSink,
        clock: Clock,
    ) -> Self {
        let queue = queues.queue(stage);
        Self {
            id,
            display_name,
            stage,
            efficiency,
            remaining: budget,
            overtime_ceiling,
            poll_interval,
            iteration_overhead,
            queue,
            queues,
            routing,
            trials,
            sink,
            clock,
            total_repairs: 0,
        }
    }

    /// Effective service time for `item` under this worker's efficiency.
    fn estimate(&self, item: &WorkItem) -> Duration {
        let base = item
            .next_duration()
            .expect("queued item has an empty duration stack");
        base.div_f64(self.efficiency)
    }

    /// Decline when even the overtime allowance cannot cover the repair;
    /// otherwise accept, flagging overtime when the estimate exceeds what is
    /// left of the regular budget.
    fn acceptance(&self, estimated: Duration) -> Acceptance {
        if estimated > self.remaining + self.overtime_ceiling {
            Acceptance::Decline
        } else {
            Acceptance::Accept {
                overtime: estimated > self.remaining,
            }
        }
    }

    fn charge(&mut self, cost: Duration) {
        self.remaining = self.remaining.saturating_sub(cost);
    }

    /// Route a repaired item onward, or retire it.
    fn dispatch(&mut self, mut item: WorkItem) {
        match self.routing.resolve(self.stage, item.damage_class) {
            Outcome::Route(candidates) => {
                let next = RoutingTable::select(candidates, self.trials.as_mut());
                item.route.push(next);
                debug!(
                    worker = %self.display_name,
                    item = item.id,
                    next = %next,
                    "routed onward"
                );
                self.queues.push(next, item, self.clock.now());
            }
            Outcome::Completed => {
                item.completion_time = Some(self.clock.now());
                info!(
                    worker = %self.display_name,
                    item = item.id,
                    at = %self.clock.now(),
                    "item completed"
                );
                self.sink.lock().expect("metrics sink poisoned").record_terminal(
                    &item,
                    ItemOutcome::Completed,
                    self.clock.now(),
                );
            }
            Outcome::Destroyed => {
                item.destroyed = true;
                warn!(worker = %self.display_name, item = item.id, "item written off");
                self.sink.lock().expect("metrics sink poisoned").record_terminal(
                    &item,
                    ItemOutcome::Destroyed,
                    self.clock.now(),
                );
            }
            Outcome::NoActionNeeded => {
                self.sink.lock().expect("metrics sink poisoned").record_terminal(
                    &item,
                    ItemOutcome::NoActionNeeded,
                    self.clock.now(),
                );
            }
        }
    }

    /// Serve the stage queue until the budget is exhausted.
    pub async fn run(mut self) -> WorkerReport {
        info!(
            worker = %self.display_name,
            stage = %self.stage,
            budget = ?self.remaining,
            "worker on shift"
        );

        while !self.remaining.is_zero() {
            let Some(mut item) = self.queue.try_pop() else {
                // Idle poll still consumes budget.
                self.charge(self.iteration_overhead);
                self.clock.suspend(self.poll_interval).await;
                continue;
            };

            let estimated = self.estimate(&item);
            match self.acceptance(estimated) {
                Acceptance::Decline => {
                    info!(
                        worker = %self.display_name,
                        item = item.id,
                        estimated = ?estimated,
                        remaining = ?self.remaining,
                        "declined, repair exceeds budget plus overtime"
                    );
                    self.sink.lock().expect("metrics sink poisoned").record_terminal(
                        &item,
                        ItemOutcome::Declined,
                        self.clock.now(),
                    );
                    self.charge(self.iteration_overhead);
                    continue;
                }
                Acceptance::Accept { overtime } => {
                    if overtime {
                        warn!(
                            worker = %self.display_name,
                            item = item.id,
                            estimated = ?estimated,
                            remaining = ?self.remaining,
                            "accepting into overtime"
                        );
                    }

                    let wait = item.begin_repair(self.stage, self.clock.now());
                    let entry_time = self.clock.now();
                    self.clock.suspend(estimated).await;
                    item.finish_repair(self.clock.now());

                    self.charge(estimated + self.iteration_overhead);
                    self.total_repairs += 1;

                    let entry = RepairEntry {
                        item_id: item.id,
                        wait,
                        urgency: item.urgency,
                        entry: entry_time,
                        exit: self.clock.now(),
                        class_at_repair: item.damage_class,
                        overtime,
                    };
                    self.sink
                        .lock()
                        .expect("metrics sink poisoned")
                        .record_repair(self.id, entry);
                    debug!(
                        worker = %self.display_name,
                        item = item.id,
                        took = ?estimated,
                        remaining = ?self.remaining,
                        "repair done"
                    );

                    item.advance_class();
                    self.dispatch(item);
                }
            }
        }

        info!(
            worker = %self.display_name,
            repairs = self.total_repairs,
            at = %self.clock.now(),
            "worker off shift"
        );
        WorkerReport {
            id: self.id,
            display_name: self.display_name,
            stage: self.stage,
            total_repairs: self.total_repairs,
            remaining_budget: self.remaining,
        }
    }
}
