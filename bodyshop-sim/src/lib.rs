//! Multi-stage repair network simulation.
//!
//! Items arrive at an intake gate, are probabilistically routed through a
//! graph of specialized repair stages, and exit once fully repaired or are
//! discarded as destroyed. Each stage owns one priority queue served by one
//! or more budgeted workers; stages communicate exclusively through those
//! queues.
//!
//! # Basic usage
//!
//! ```rust,no_run
//! use bodyshop_sim::{Simulation, SimulationConfig};
//!
//! let report = Simulation::new(SimulationConfig::standard())
//!     .expect("valid configuration")
//!     .run()
//!     .expect("simulation run");
//!
//! for record in &report.items {
//!     println!("item {} -> {:?} via {:?}", record.id, record.outcome, record.route);
//! }
//! ```
//!
//! # Termination model
//!
//! The run ends when every worker's budget is exhausted and the gate has
//! observed the final arrival, not when every item has reached a terminal
//! state. Items still queued at shutdown are drained into the report as
//! [`metrics::ItemOutcome::Stranded`].

pub mod arrivals;
pub mod config;
pub mod gate;
pub mod item;
pub mod metrics;
pub mod network;
pub mod routing;
pub mod simulation;
pub mod worker;

pub use config::{
    ArrivalConfig, ConfigError, RepairTimeConfig, RoutingRule, SimulationConfig, WorkerSpec,
};
pub use item::{DamageClass, Stage, WorkItem};
pub use metrics::{ItemOutcome, ItemRecord, MetricsSink, RepairEntry};
pub use routing::{Candidate, Outcome, RoutingTable};
pub use simulation::{SimError, Simulation, SimulationReport};
pub use worker::{Worker, WorkerReport};
