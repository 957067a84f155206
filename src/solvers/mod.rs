use crate::core::domain::Individual;

/// Per-generation statistics for telemetry.
#[derive(Debug, Clone)]
pub struct GenStats {
    pub generation: u64,
    pub best_cost: f64,
    pub mean_cost: f64,
    pub worst_cost: f64,
    pub pop_size: usize,
    /// Offspring dispatched for scoring this generation.
    pub evaluated: usize,
    /// Offspring discarded before evaluation because their key was already
    /// in the seen-individuals registry.
    pub duplicates_skipped: usize,
    /// Total individuals ever registered.
    pub registry_size: usize,
}

/// Events emitted by the engine to its consumer thread.
#[derive(Debug, Clone)]
pub enum SolverEvent {
    /// Diagnostic log message.
    Log(String),

    /// A completed generation with full statistics.
    GenerationUpdate(GenStats),

    /// An individual that beats the current global best cost.
    NewBest(Individual),

    /// Engine has finished its invocation.
    Finished,
}

pub mod ga;
