//! Configuration surface consumed at startup.
//!
//! Everything the excluded config/CLI layer controls lives here: arrival
//! volume and pacing, per-worker efficiency and budgets, routing rules,
//! thresholds, and the clock policy. `validate` fails fast: a simulation is
//! never constructed from an invalid configuration.

use bodyshop_core::{ClockPolicy, CoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::item::{DamageClass, Stage};
use crate::routing::{Candidate, Outcome, RoutingError, RoutingTable};

/// Inter-arrival interval distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalConfig {
    Exponential { mean: Duration },
    Constant { interval: Duration },
}

/// Per-stage-visit repair duration distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairTimeConfig {
    Uniform { low: Duration, high: Duration },
    Exponential { mean: Duration },
    Constant { value: Duration },
}

/// One worker bound to one stage queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSpec {
    pub display_name: String,
    pub stage: Stage,
    /// Divides every repair duration; must be positive and finite.
    pub efficiency: f64,
    /// Time budget before the worker stops accepting work.
    pub budget: Duration,
}

/// One routing table entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    pub stage: Stage,
    pub class: DamageClass,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Finite arrival count; the gate stops after observing the last id.
    pub total_arrivals: u64,
    /// Master seed; every component derives its own stream from it.
    pub seed: u64,
    pub clock: ClockPolicy,
    /// Idle re-check interval for workers and the gate.
    pub poll_interval: Duration,
    /// Fixed budget cost charged per loop iteration, idle polls included.
    pub iteration_overhead: Duration,
    /// How far past its budget a worker will still accept a repair.
    pub overtime_ceiling: Duration,
    /// Destruction trial probability for `Severe` arrivals at the gate.
    pub destruction_probability: f64,
    pub arrivals: ArrivalConfig,
    pub repair_times: RepairTimeConfig,
    pub workers: Vec<WorkerSpec>,
    pub routing: Vec<RoutingRule>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("total_arrivals must be at least 1")]
    NoArrivals,

    #[error("at least one worker is required")]
    NoWorkers,

    #[error("worker `{name}` has non-positive efficiency {efficiency}")]
    NonPositiveEfficiency { name: String, efficiency: f64 },

    #[error("worker `{name}` is assigned to the intake queue")]
    WorkerAtIntake { name: String },

    #[error("destruction probability {value} is outside [0, 1]")]
    InvalidDestructionProbability { value: f64 },

    #[error("poll_interval must be positive")]
    ZeroPollInterval,

    #[error("routing: {0}")]
    Routing(#[from] RoutingError),

    #[error("distribution: {0}")]
    Distribution(#[from] CoreError),
}

impl SimulationConfig {
    /// Validate every startup invariant. Also proves the routing table total
    /// by building it; [`SimulationConfig::routing_table`] cannot fail after
    /// this passes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_arrivals == 0 {
            return Err(ConfigError::NoArrivals);
        }
        if self.workers.is_empty() {
            return Err(ConfigError::NoWorkers);
        }
        for worker in &self.workers {
            if !(worker.efficiency > 0.0) || !worker.efficiency.is_finite() {
                return Err(ConfigError::NonPositiveEfficiency {
                    name: worker.display_name.clone(),
                    efficiency: worker.efficiency,
                });
            }
            if worker.stage == Stage::Intake {
                return Err(ConfigError::WorkerAtIntake {
                    name: worker.display_name.clone(),
                });
            }
        }
        if !(0.0..=1.0).contains(&self.destruction_probability)
            || self.destruction_probability.is_nan()
        {
            return Err(ConfigError::InvalidDestructionProbability {
                value: self.destruction_probability,
            });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        match self.arrivals {
            ArrivalConfig::Exponential { mean } if mean.is_zero() => {
                return Err(CoreError::InvalidDistribution(
                    "exponential arrival mean must be positive".into(),
                )
                .into());
            }
            _ => {}
        }
        if let RepairTimeConfig::Uniform { low, high } = self.repair_times {
            if low >= high {
                return Err(CoreError::InvalidDistribution(format!(
                    "uniform repair bounds must satisfy low < high, got {low:?} >= {high:?}"
                ))
                .into());
            }
        }
        if let RepairTimeConfig::Exponential { mean } = self.repair_times {
            if mean.is_zero() {
                return Err(CoreError::InvalidDistribution(
                    "exponential repair mean must be positive".into(),
                )
                .into());
            }
        }
        self.routing_table()?;
        Ok(())
    }

    /// Build the validated routing table from the declared rules.
    pub fn routing_table(&self) -> Result<RoutingTable, RoutingError> {
        let rules: HashMap<(Stage, DamageClass), Outcome> = self
            .routing
            .iter()
            .map(|rule| ((rule.stage, rule.class), rule.outcome.clone()))
            .collect();
        RoutingTable::new(rules)
    }

    /// The standard five-stage shop: one worker per repair stage, hour-scale
    /// budgets, a 20% destruction chance for severe arrivals, and repair
    /// visits of zero to three hours each.
    pub fn standard() -> Self {
        let workers = [
            ("bodywork-1", Stage::Bodywork),
            ("paint-1", Stage::Paint),
            ("electrical-1", Stage::Electrical),
            ("tires-1", Stage::Tires),
            ("upholstery-1", Stage::Upholstery),
        ]
        .into_iter()
        .map(|(name, stage)| WorkerSpec {
            display_name: name.to_string(),
            stage,
            efficiency: 2.0,
            budget: hours(8.0),
        })
        .collect();

        Self {
            total_arrivals: 40,
            seed: 0,
            clock: ClockPolicy::Virtual,
            poll_interval: hours(0.1),
            iteration_overhead: hours(0.1),
            overtime_ceiling: hours(1.0),
            destruction_probability: 0.2,
            arrivals: ArrivalConfig::Exponential { mean: hours(0.1) },
            repair_times: RepairTimeConfig::Uniform {
                low: Duration::ZERO,
                high: hours(3.0),
            },
            workers,
            routing: standard_routing(),
        }
    }
}

/// Simulated hours.
pub fn hours(h: f64) -> Duration {
    Duration::from_secs_f64(h * 3600.0)
}

/// The standard shop's routing graph.
///
/// Candidate lists are resolved by sequential trials in the declared order;
/// the last candidate in each list is the fallback.
fn standard_routing() -> Vec<RoutingRule> {
    let mut rules = vec![
        RoutingRule {
            stage: Stage::Intake,
            class: DamageClass::Severe,
            outcome: Outcome::Route(vec![Candidate::new(Stage::Bodywork, 1.0)]),
        },
        RoutingRule {
            stage: Stage::Intake,
            class: DamageClass::Moderate,
            outcome: Outcome::Route(vec![
                Candidate::new(Stage::Electrical, 0.5),
                Candidate::new(Stage::Bodywork, 1.0),
            ]),
        },
        RoutingRule {
            stage: Stage::Intake,
            class: DamageClass::Light,
            outcome: Outcome::Route(vec![
                Candidate::new(Stage::Tires, 0.4),
                Candidate::new(Stage::Upholstery, 0.4),
                Candidate::new(Stage::Paint, 1.0),
            ]),
        },
        RoutingRule {
            stage: Stage::Intake,
            class: DamageClass::Intact,
            outcome: Outcome::NoActionNeeded,
        },
    ];

    // Post-repair transitions: a moderate item goes to a mid-network stage, a
    // light item to a finishing stage, an intact item is done.
    for stage in Stage::REPAIR_STAGES {
        rules.push(RoutingRule {
            stage,
            class: DamageClass::Moderate,
            outcome: Outcome::Route(vec![
                Candidate::new(Stage::Electrical, 0.6),
                Candidate::new(Stage::Tires, 1.0),
            ]),
        });
        rules.push(RoutingRule {
            stage,
            class: DamageClass::Light,
            outcome: Outcome::Route(vec![
                Candidate::new(Stage::Paint, 0.7),
                Candidate::new(Stage::Upholstery, 1.0),
            ]),
        });
        rules.push(RoutingRule {
            stage,
            class: DamageClass::Intact,
            outcome: Outcome::Completed,
        });
    }
    rules
}
