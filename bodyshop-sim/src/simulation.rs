//! Run assembly: build the network from a configuration, execute it on the
//! configured clock, and collect the final report.

use bodyshop_core::{
    stream_seed, ArrivalPattern, Clock, ConstantArrivals, ConstantDuration,
    DurationDistribution, ExponentialArrivals, ExponentialDuration, SeededTrials, SimTime,
    UniformDuration,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::arrivals::ArrivalGenerator;
use crate::config::{ArrivalConfig, ConfigError, RepairTimeConfig, SimulationConfig};
use crate::gate::IntakeGate;
use crate::metrics::{ItemOutcome, ItemRecord, MetricsSink, RepairEntry};
use crate::network::StageQueues;
use crate::routing::RoutingTable;
use crate::worker::{Worker, WorkerReport};

// Stream indices for per-component seed derivation. Workers use
// WORKER_STREAM_BASE + worker id.
const ARRIVAL_STREAM: u64 = 0;
const REPAIR_TIME_STREAM: u64 = 1;
const GATE_STREAM: u64 = 2;
const CLASSIFY_STREAM: u64 = 3;
const WORKER_STREAM_BASE: u64 = 16;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Everything a run produced, for the reporting layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// One terminal record per arrival.
    pub items: Vec<ItemRecord>,
    pub workers: Vec<WorkerReport>,
    /// Ordered repair log per worker id.
    pub repair_logs: HashMap<u32, Vec<RepairEntry>>,
    /// Simulation time when the last task finished.
    pub final_time: SimTime,
}

impl SimulationReport {
    pub fn outcome_count(&self, outcome: ItemOutcome) -> usize {
        self.items.iter().filter(|r| r.outcome == outcome).count()
    }
}

/// A validated, ready-to-run simulation.
pub struct Simulation {
    config: SimulationConfig,
    routing: Arc<RoutingTable>,
}

impl Simulation {
    /// Validate `config` and build the routing table.
    pub fn new(config: SimulationConfig) -> Result<Self, SimError> {
        config.validate()?;
        let routing = Arc::new(config.routing_table().map_err(ConfigError::from)?);
        Ok(Self { config, routing })
    }

    fn arrival_pattern(&self) -> Result<Box<dyn ArrivalPattern>, ConfigError> {
        let seed = stream_seed(self.config.seed, ARRIVAL_STREAM);
        Ok(match self.config.arrivals {
            ArrivalConfig::Exponential { mean } => {
                Box::new(ExponentialArrivals::new(mean, seed)?)
            }
            ArrivalConfig::Constant { interval } => Box::new(ConstantArrivals::new(interval)),
        })
    }

    fn repair_times(&self) -> Result<Box<dyn DurationDistribution>, ConfigError> {
        let seed = stream_seed(self.config.seed, REPAIR_TIME_STREAM);
        Ok(match self.config.repair_times {
            RepairTimeConfig::Uniform { low, high } => {
                Box::new(UniformDuration::new(low, high, seed)?)
            }
            RepairTimeConfig::Exponential { mean } => {
                Box::new(ExponentialDuration::new(mean, seed)?)
            }
            RepairTimeConfig::Constant { value } => Box::new(ConstantDuration::new(value)),
        })
    }

    /// Execute the run to completion on the configured clock.
    pub fn run(self) -> Result<SimulationReport, SimError> {
        let runtime = self.config.clock.build_runtime()?;
        runtime.block_on(self.run_inner())
    }

    async fn run_inner(self) -> Result<SimulationReport, SimError> {
        let clock = Clock::start();
        let queues = Arc::new(StageQueues::new());
        let sink = MetricsSink::shared();

        info!(
            arrivals = self.config.total_arrivals,
            seed = self.config.seed,
            workers = self.config.workers.len(),
            "simulation starting"
        );

        let generator = ArrivalGenerator::new(
            self.config.total_arrivals,
            self.arrival_pattern()?,
            self.repair_times()?,
            stream_seed(self.config.seed, CLASSIFY_STREAM),
            Arc::clone(&queues),
            clock,
        );
        let generator_handle = tokio::spawn(generator.run());

        let gate = IntakeGate::new(
            Arc::clone(&queues),
            Arc::clone(&self.routing),
            Box::new(SeededTrials::new(stream_seed(self.config.seed, GATE_STREAM))),
            Arc::clone(&sink),
            clock,
            self.config.poll_interval,
            self.config.destruction_probability,
            self.config.total_arrivals,
        );
        let gate_handle = tokio::spawn(gate.run());

        let mut worker_handles = Vec::with_capacity(self.config.workers.len());
        for (index, spec) in self.config.workers.iter().enumerate() {
            let id = index as u32 + 1;
            let worker = Worker::new(
                id,
                spec.display_name.clone(),
                spec.stage,
                spec.efficiency,
                spec.budget,
                self.config.overtime_ceiling,
                self.config.poll_interval,
                self.config.iteration_overhead,
                Arc::clone(&queues),
                Arc::clone(&self.routing),
                Box::new(SeededTrials::new(stream_seed(
                    self.config.seed,
                    WORKER_STREAM_BASE + u64::from(id),
                ))),
                Arc::clone(&sink),
                clock,
            );
            worker_handles.push(tokio::spawn(worker.run()));
        }

        generator_handle.await?;
        gate_handle.await?;
        let mut workers = Vec::with_capacity(worker_handles.len());
        for handle in worker_handles {
            workers.push(handle.await?);
        }

        // Whatever is still queued after every task stopped was stranded by
        // budget exhaustion or the gate's shutdown.
        let final_time = clock.now();
        for item in queues.drain_all() {
            info!(item = item.id, "stranded at shutdown");
            sink.lock()
                .expect("metrics sink poisoned")
                .record_terminal(&item, ItemOutcome::Stranded, final_time);
        }

        let sink = Arc::try_unwrap(sink)
            .expect("all sink handles released at shutdown")
            .into_inner()
            .expect("metrics sink poisoned");
        let (items, repair_logs) = sink.into_parts();

        info!(
            items = items.len(),
            at = %final_time,
            "simulation finished"
        );
        Ok(SimulationReport {
            items,
            workers,
            repair_logs,
            final_time,
        })
    }
}
