//! Run the standard five-stage repair shop and print a summary.
//!
//! Run with: cargo run --package bodyshop-sim --example bodyshop
//!
//! Set RUST_LOG=debug to watch individual items move through the network.

use bodyshop_core::logging::init_simulation_logging;
use bodyshop_sim::{ItemOutcome, Simulation, SimulationConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_simulation_logging();

    let config = SimulationConfig::standard();
    let total = config.total_arrivals;
    let report = Simulation::new(config)?.run()?;

    println!("=== Bodyshop Simulation ===");
    println!("arrivals:         {total}");
    println!("final sim time:   {}", report.final_time);
    println!();
    for outcome in [
        ItemOutcome::Completed,
        ItemOutcome::NoActionNeeded,
        ItemOutcome::Destroyed,
        ItemOutcome::Declined,
        ItemOutcome::Stranded,
    ] {
        println!("{outcome:?}: {}", report.outcome_count(outcome));
    }

    println!();
    println!("=== Workers ===");
    for worker in &report.workers {
        let log = report
            .repair_logs
            .get(&worker.id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        println!(
            "{} ({}): {} repairs, {} in overtime",
            worker.display_name,
            worker.stage,
            worker.total_repairs,
            log.iter().filter(|e| e.overtime).count(),
        );
        for entry in log {
            println!(
                "  item {} urgency {} waited {:?}, busy {} -> {}",
                entry.item_id, entry.urgency, entry.wait, entry.entry, entry.exit
            );
        }
    }

    Ok(())
}
