//! The fixed set of stage queues shared by every task in a run.

use bodyshop_core::{PriorityQueue, SimTime};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::item::{Stage, WorkItem};

/// One priority queue per stage, intake included.
///
/// This is the only shared mutable state in the simulation: items move
/// between tasks exclusively by value through these queues.
#[derive(Debug)]
pub struct StageQueues {
    queues: HashMap<Stage, Arc<PriorityQueue<WorkItem>>>,
}

impl StageQueues {
    pub fn new() -> Self {
        let queues = Stage::ALL
            .into_iter()
            .map(|stage| (stage, Arc::new(PriorityQueue::new(stage.name()))))
            .collect();
        Self { queues }
    }

    pub fn queue(&self, stage: Stage) -> Arc<PriorityQueue<WorkItem>> {
        Arc::clone(&self.queues[&stage])
    }

    /// Hand `item` to `stage`, stamping its enqueue time.
    pub fn push(&self, stage: Stage, mut item: WorkItem, now: SimTime) {
        item.mark_queued(now);
        debug!(
            item = item.id,
            urgency = item.urgency,
            class = %item.damage_class,
            stage = %stage,
            "item queued"
        );
        self.queues[&stage].push(item.urgency, item);
    }

    /// Empty every queue, in stage declaration order, returning whatever was
    /// stranded at shutdown.
    pub fn drain_all(&self) -> Vec<WorkItem> {
        Stage::ALL
            .into_iter()
            .flat_map(|stage| self.queues[&stage].drain())
            .collect()
    }

    /// Total items currently queued anywhere.
    pub fn live_count(&self) -> usize {
        self.queues.values().map(|q| q.len()).sum()
    }
}

impl Default for StageQueues {
    fn default() -> Self {
        Self::new()
    }
}
