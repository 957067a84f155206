use std::path::PathBuf;

use crate::core::domain::Individual;

/// Per-batch settings injected by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct CostConfig {
    /// Scratch directory for this batch; present only when the cost
    /// function declares `wants_workdir`.
    pub workdir: Option<PathBuf>,
}

/// A black-box scoring function. Implementations must be thread-safe and
/// must absorb their own internal failures: a candidate that cannot be
/// scored comes back with `cost = f64::INFINITY`, never a panic or error.
pub trait CostFunction: Send + Sync {
    /// Returns the name of the backend (e.g. "AutoDock Vina").
    fn name(&self) -> &str;

    /// Declared once up front; when true the orchestrator provisions one
    /// scratch directory per batch and injects it into `CostConfig`.
    fn wants_workdir(&self) -> bool {
        false
    }

    /// Scores one individual, returning it annotated with its cost (and
    /// optionally a pose payload).
    fn evaluate(&self, individual: Individual, config: &CostConfig) -> Individual;
}
