//! Structured logging setup for simulation runs.
//!
//! Progress events (arrivals, repairs, declines, end-of-day summaries) are
//! emitted as `tracing` events by the domain layer. These helpers install a
//! subscriber; `RUST_LOG` overrides the defaults:
//!
//! ```bash
//! RUST_LOG=bodyshop_sim=debug cargo run --example bodyshop
//! RUST_LOG=bodyshop_core::trials=trace cargo run --example bodyshop
//! ```

use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging at `info` level.
pub fn init_simulation_logging() {
    init_simulation_logging_with_level("info");
}

/// Initialize logging at a specific level ("trace" through "error").
///
/// Environment filtering via `RUST_LOG` takes precedence when set.
pub fn init_simulation_logging_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{level},bodyshop_core={level},bodyshop_sim={level}"))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true))
        .with(filter)
        .init();

    info!(level, "simulation logging initialized");
}
