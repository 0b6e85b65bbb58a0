//! Work items flowing through the repair network.

use bodyshop_core::SimTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Unique item identity, assigned monotonically at arrival starting from 1.
pub type ItemId = u64;

/// Highest urgency level; urgency is drawn uniformly from `0..=MAX_URGENCY`.
pub const MAX_URGENCY: u8 = 2;

/// One specialized repair queue plus its worker pool.
///
/// `Intake` is the gate's queue where fresh arrivals land; the rest are the
/// repair stages of the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Intake,
    Bodywork,
    Paint,
    Electrical,
    Tires,
    Upholstery,
}

impl Stage {
    /// Every stage workers can be assigned to (everything but `Intake`).
    pub const REPAIR_STAGES: [Stage; 5] = [
        Stage::Bodywork,
        Stage::Paint,
        Stage::Electrical,
        Stage::Tires,
        Stage::Upholstery,
    ];

    /// All stages, intake included. Used to build the queue set.
    pub const ALL: [Stage; 6] = [
        Stage::Intake,
        Stage::Bodywork,
        Stage::Paint,
        Stage::Electrical,
        Stage::Tires,
        Stage::Upholstery,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Intake => "intake",
            Stage::Bodywork => "bodywork",
            Stage::Paint => "paint",
            Stage::Electrical => "electrical",
            Stage::Tires => "tires",
            Stage::Upholstery => "upholstery",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered damage severity, most-damaged first.
///
/// The classification determines how many distinct stage-visits remain:
/// `Severe` needs three repairs, `Moderate` two, `Light` one, `Intact` none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageClass {
    Severe,
    Moderate,
    Light,
    Intact,
}

impl DamageClass {
    pub const ALL: [DamageClass; 4] = [
        DamageClass::Severe,
        DamageClass::Moderate,
        DamageClass::Light,
        DamageClass::Intact,
    ];

    /// Stage-visits remaining for an item of this class.
    pub fn visits(self) -> usize {
        match self {
            DamageClass::Severe => 3,
            DamageClass::Moderate => 2,
            DamageClass::Light => 1,
            DamageClass::Intact => 0,
        }
    }

    /// One level closer to fully repaired. `Intact` stays `Intact`.
    pub fn advanced(self) -> Self {
        match self {
            DamageClass::Severe => DamageClass::Moderate,
            DamageClass::Moderate => DamageClass::Light,
            DamageClass::Light => DamageClass::Intact,
            DamageClass::Intact => DamageClass::Intact,
        }
    }
}

impl fmt::Display for DamageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DamageClass::Severe => "severe",
            DamageClass::Moderate => "moderate",
            DamageClass::Light => "light",
            DamageClass::Intact => "intact",
        };
        f.write_str(name)
    }
}

/// Waiting time accumulated at one visited stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageWait {
    pub stage: Stage,
    pub wait: Duration,
}

/// The entity flowing through the network.
///
/// An item is owned by exactly one task at a time: the arrival generator
/// until the first push, then whichever gate/worker holds it between a
/// dequeue and the next enqueue or terminal transition. There is no shared
/// mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: ItemId,
    /// Queue ordering key, `0..=MAX_URGENCY`; higher is served earlier.
    pub urgency: u8,
    pub damage_class: DamageClass,
    /// Classification at arrival, kept for the metrics record.
    pub original_class: DamageClass,
    /// Work durations, one per remaining stage-visit, consumed from the end.
    pub remaining_durations: Vec<Duration>,
    pub arrival_time: SimTime,
    /// When the item last entered a queue; basis for waiting-time records.
    pub queued_at: SimTime,
    pub stage_entry_time: Option<SimTime>,
    pub stage_exit_time: Option<SimTime>,
    pub completion_time: Option<SimTime>,
    /// Stage names visited, append-only.
    pub route: Vec<Stage>,
    pub stage_waits: Vec<StageWait>,
    /// Set once by the intake gate's destruction check; terminal.
    pub destroyed: bool,
}

impl WorkItem {
    /// Create a fresh arrival.
    ///
    /// # Panics
    ///
    /// Panics if the duration stack does not match the class's visit count.
    /// That is an internal defect in the arrival generator, not a runtime
    /// condition.
    pub fn new(
        id: ItemId,
        urgency: u8,
        damage_class: DamageClass,
        remaining_durations: Vec<Duration>,
        arrival_time: SimTime,
    ) -> Self {
        assert_eq!(
            remaining_durations.len(),
            damage_class.visits(),
            "duration stack must match damage class visit count"
        );
        Self {
            id,
            urgency,
            damage_class,
            original_class: damage_class,
            remaining_durations,
            arrival_time,
            queued_at: arrival_time,
            stage_entry_time: None,
            stage_exit_time: None,
            completion_time: None,
            route: Vec::new(),
            stage_waits: Vec::new(),
            destroyed: false,
        }
    }

    /// Top of the duration stack: the work the next repair will take.
    pub fn next_duration(&self) -> Option<Duration> {
        self.remaining_durations.last().copied()
    }

    /// Record entry into service at `stage` and return the time spent
    /// waiting in that stage's queue.
    pub fn begin_repair(&mut self, stage: Stage, now: SimTime) -> Duration {
        let wait = now.duration_since(self.queued_at);
        self.stage_entry_time = Some(now);
        self.stage_waits.push(StageWait { stage, wait });
        wait
    }

    /// Consume the completed visit's duration and record service exit.
    ///
    /// # Panics
    ///
    /// Panics if the duration stack is empty; a worker repairing an item
    /// with no remaining work is a fatal internal defect.
    pub fn finish_repair(&mut self, now: SimTime) {
        self.remaining_durations
            .pop()
            .expect("repaired an item with an empty duration stack");
        self.stage_exit_time = Some(now);
    }

    /// Advance the damage classification after a completed repair.
    pub fn advance_class(&mut self) {
        self.damage_class = self.damage_class.advanced();
    }

    /// Note the enqueue instant when the item is handed to a stage queue.
    pub fn mark_queued(&mut self, now: SimTime) {
        self.queued_at = now;
    }

    /// Total time from arrival to `now`.
    pub fn time_in_system(&self, now: SimTime) -> Duration {
        now.duration_since(self.arrival_time)
    }
}
