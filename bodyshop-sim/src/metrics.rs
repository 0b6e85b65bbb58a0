//! In-memory metrics sink consumed by the excluded reporting collaborator.
//!
//! The sink collects two things: a terminal record per item (completed,
//! destroyed, declined, no-action, or stranded at shutdown) and an ordered
//! per-worker repair log. Everything is serde-serializable so the reporting
//! layer can export it however it likes.

use bodyshop_core::SimTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::item::{DamageClass, ItemId, Stage, StageWait, WorkItem};

/// How an item left the live working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    Completed,
    Destroyed,
    /// Arrived intact; no repair performed.
    NoActionNeeded,
    /// Dropped by a worker whose remaining budget plus overtime ceiling could
    /// not cover the repair. Distinct from `Completed` and `Destroyed`.
    Declined,
    /// Still queued somewhere when the run shut down.
    Stranded,
}

/// Terminal record for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    pub urgency: u8,
    pub original_class: DamageClass,
    pub stage_waits: Vec<StageWait>,
    pub time_in_system: Duration,
    pub destroyed: bool,
    pub route: Vec<Stage>,
    pub outcome: ItemOutcome,
}

impl ItemRecord {
    fn from_item(item: &WorkItem, outcome: ItemOutcome, now: SimTime) -> Self {
        Self {
            id: item.id,
            urgency: item.urgency,
            original_class: item.original_class,
            stage_waits: item.stage_waits.clone(),
            time_in_system: item.time_in_system(now),
            destroyed: item.destroyed,
            route: item.route.clone(),
            outcome,
        }
    }
}

/// One completed repair in a worker's log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepairEntry {
    pub item_id: ItemId,
    pub wait: Duration,
    pub urgency: u8,
    pub entry: SimTime,
    pub exit: SimTime,
    pub class_at_repair: DamageClass,
    /// The repair pushed the worker's budget below zero.
    pub overtime: bool,
}

/// Collected terminal metrics, shared behind [`SharedSink`].
#[derive(Debug, Default)]
pub struct MetricsSink {
    items: Vec<ItemRecord>,
    repair_logs: HashMap<u32, Vec<RepairEntry>>,
}

/// Handle the gate, workers, and driver all write through.
pub type SharedSink = Arc<Mutex<MetricsSink>>;

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedSink {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Record an item leaving the live set.
    pub fn record_terminal(&mut self, item: &WorkItem, outcome: ItemOutcome, now: SimTime) {
        self.items.push(ItemRecord::from_item(item, outcome, now));
    }

    /// Append one repair to a worker's ordered log.
    pub fn record_repair(&mut self, worker_id: u32, entry: RepairEntry) {
        self.repair_logs.entry(worker_id).or_default().push(entry);
    }

    pub fn items(&self) -> &[ItemRecord] {
        &self.items
    }

    pub fn repair_log(&self, worker_id: u32) -> &[RepairEntry] {
        self.repair_logs
            .get(&worker_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Busy intervals for one worker, the data a schedule chart consumes.
    pub fn busy_intervals(&self, worker_id: u32) -> Vec<(SimTime, SimTime)> {
        self.repair_log(worker_id)
            .iter()
            .map(|e| (e.entry, e.exit))
            .collect()
    }

    pub fn outcome_count(&self, outcome: ItemOutcome) -> usize {
        self.items.iter().filter(|r| r.outcome == outcome).count()
    }

    /// Take ownership of the collected data at the end of a run.
    pub fn into_parts(self) -> (Vec<ItemRecord>, HashMap<u32, Vec<RepairEntry>>) {
        (self.items, self.repair_logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light_item(id: ItemId) -> WorkItem {
        WorkItem::new(
            id,
            2,
            DamageClass::Light,
            vec![Duration::from_secs(4)],
            SimTime::from_secs(1),
        )
    }

    #[test]
    fn terminal_record_captures_item_state() {
        let mut sink = MetricsSink::new();
        let mut item = light_item(7);
        item.route.push(Stage::Tires);
        sink.record_terminal(&item, ItemOutcome::Completed, SimTime::from_secs(11));

        let record = &sink.items()[0];
        assert_eq!(record.id, 7);
        assert_eq!(record.outcome, ItemOutcome::Completed);
        assert_eq!(record.time_in_system, Duration::from_secs(10));
        assert_eq!(record.route, vec![Stage::Tires]);
        assert!(!record.destroyed);
    }

    #[test]
    fn repair_logs_stay_ordered_per_worker() {
        let mut sink = MetricsSink::new();
        for i in 0..3u64 {
            sink.record_repair(
                1,
                RepairEntry {
                    item_id: i,
                    wait: Duration::ZERO,
                    urgency: 0,
                    entry: SimTime::from_secs(i),
                    exit: SimTime::from_secs(i + 1),
                    class_at_repair: DamageClass::Light,
                    overtime: false,
                },
            );
        }
        let ids: Vec<_> = sink.repair_log(1).iter().map(|e| e.item_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(sink.repair_log(2).is_empty());

        assert_eq!(
            sink.busy_intervals(1),
            vec![
                (SimTime::from_secs(0), SimTime::from_secs(1)),
                (SimTime::from_secs(1), SimTime::from_secs(2)),
                (SimTime::from_secs(2), SimTime::from_secs(3)),
            ]
        );
    }

    #[test]
    fn outcome_counts() {
        let mut sink = MetricsSink::new();
        sink.record_terminal(&light_item(1), ItemOutcome::Completed, SimTime::zero());
        sink.record_terminal(&light_item(2), ItemOutcome::Declined, SimTime::zero());
        sink.record_terminal(&light_item(3), ItemOutcome::Completed, SimTime::zero());
        assert_eq!(sink.outcome_count(ItemOutcome::Completed), 2);
        assert_eq!(sink.outcome_count(ItemOutcome::Declined), 1);
        assert_eq!(sink.outcome_count(ItemOutcome::Stranded), 0);
    }
}
