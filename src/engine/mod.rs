pub mod evaluator;
pub mod external;
pub mod mutation;
pub mod operators;
pub mod orchestrator;

use thiserror::Error;

/// Fatal engine-level failures. Degraded-but-valid conditions (empty
/// mutation sets, failed scorings) never surface here; they become no-op
/// offspring or `+inf` costs instead.
#[derive(Debug, Error)]
pub enum GaError {
    #[error("all selection weights are zero; check beta against the cost scale")]
    DegenerateSelection,

    #[error("population seeding failed: {0}")]
    Seeding(String),

    #[error("evaluation worker pool failed: {0}")]
    WorkerPool(String),

    #[error("checkpoint failed: {0}")]
    Checkpoint(String),
}
