use std::sync::Arc;

use rayon::prelude::*;

use crate::core::domain::Individual;
use crate::engine::evaluator::{CostConfig, CostFunction};
use crate::engine::GaError;

/// Evaluates a batch of not-yet-costed individuals against the cost
/// function on a worker pool bounded by `njobs`.
///
/// The parallel map preserves input order: result index `i` corresponds to
/// input index `i`, which downstream code relies on because idx labels are
/// assigned by position before dispatch.
///
/// If the cost function declares a working directory, one scratch
/// directory is provisioned for the whole batch and removed unconditionally
/// when the batch completes, whether or not individual tasks failed
/// internally. Per-task failures never reach this level (the cost function
/// absorbs them into `+inf` costs); only pool-level breakage is fatal.
pub fn evaluate_batch(
    individuals: Vec<Individual>,
    costfunc: &Arc<dyn CostFunction>,
    njobs: usize,
) -> Result<Vec<Individual>, GaError> {
    if individuals.is_empty() {
        return Ok(individuals);
    }

    let mut config = CostConfig::default();

    // Scratch dir lives exactly as long as the batch (RAII removal).
    let _scratch = if costfunc.wants_workdir() {
        let dir = tempfile::Builder::new()
            .prefix("costfunc")
            .tempdir()
            .map_err(|e| GaError::WorkerPool(format!("scratch dir: {e}")))?;
        config.workdir = Some(dir.path().to_path_buf());
        Some(dir)
    } else {
        None
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(njobs)
        .build()
        .map_err(|e| GaError::WorkerPool(e.to_string()))?;

    let results = pool.install(|| {
        individuals
            .into_par_iter()
            .map(|ind| costfunc.evaluate(ind, &config))
            .collect::<Vec<_>>()
    });

    Ok(results)
}
