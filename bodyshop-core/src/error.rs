//! Error types for the engine primitives

use thiserror::Error;

/// Errors raised while constructing engine primitives.
///
/// These all indicate invalid configuration: they are surfaced before any
/// task starts, never during a run.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid distribution parameter: {0}")]
    InvalidDistribution(String),
}
