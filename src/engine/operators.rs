use rand::Rng;

use crate::analysis::similarity;
use crate::core::domain::{Individual, Structure};
use crate::engine::mutation::{MutationGateway, MutationWindows};
use crate::engine::GaError;

// --- Selection ---

/// Boltzmann selection weights `w_i = exp(-beta * cost_i)`. An infinite
/// (unscored) cost naturally yields weight zero.
pub fn boltzmann_weights(costs: &[f64], beta: f64) -> Vec<f64> {
    costs.iter().map(|c| (-beta * c).exp()).collect()
}

/// Roulette wheel selection: draws `r = U(0,1) * sum(p)` and returns the
/// smallest index whose cumulative weight reaches `r`. Scaling by the
/// actual sum keeps the draw correct when `p` does not sum exactly to 1.
pub fn roulette_wheel_selection<R: Rng + ?Sized>(
    p: &[f64],
    rng: &mut R,
) -> Result<usize, GaError> {
    let total: f64 = p.iter().sum();
    if !(total > 0.0) {
        return Err(GaError::DegenerateSelection);
    }

    let r = rng.gen::<f64>() * total;
    let mut cum = 0.0;
    for (i, &w) in p.iter().enumerate() {
        cum += w;
        if cum >= r {
            return Ok(i);
        }
    }
    // Floating-point shortfall in the cumulative sum: the last index wins.
    Ok(p.len() - 1)
}

/// Number of offspring slots for one generation: `round(pc*popsize/2)*2`,
/// always even so offspring are produced in parent pairs.
///
/// Halves round away from zero (`f64::round`), not to even, so odd
/// `popsize` at `pc = 1` rounds up (popsize 5 gives 6 slots).
pub fn offspring_slots(pc: f64, popsize: usize) -> usize {
    ((pc * popsize as f64 / 2.0).round() as usize) * 2
}

// --- Variation ---

/// A variation operator over one individual, backed by the mutation
/// gateway. `hard` jumps broadly (the system's crossover substitute),
/// `soft` refines locally; both fall back to an observable no-op when the
/// gateway yields nothing.
pub struct Mutator<'a> {
    gateway: &'a dyn MutationGateway,
    windows: MutationWindows,
    /// When set, the candidate most similar to this reference structure is
    /// picked deterministically instead of uniformly at random.
    reference: Option<&'a Structure>,
    label: &'static str,
}

impl<'a> Mutator<'a> {
    /// Broad, exploratory mutation with the engine's configured windows.
    pub fn hard(
        gateway: &'a dyn MutationGateway,
        windows: MutationWindows,
        reference: Option<&'a Structure>,
    ) -> Self {
        Self {
            gateway,
            windows,
            reference,
            label: "hard",
        }
    }

    /// Conservative single-atom refinement step.
    pub fn soft(gateway: &'a dyn MutationGateway, reference: Option<&'a Structure>) -> Self {
        Self {
            gateway,
            windows: MutationWindows::local(),
            reference,
            label: "soft",
        }
    }

    /// Produces a new individual from `parent`; the input is never touched.
    /// The result always carries the unevaluated sentinel cost and a
    /// placeholder idx, assigned properly at dispatch time.
    pub fn apply<R: Rng + ?Sized>(&self, parent: &Individual, rng: &mut R) -> Individual {
        let mut candidates = match self.gateway.mutate(&parent.structure, &self.windows) {
            Ok(c) => c,
            Err(e) => {
                log::warn!(
                    "The {} mutation failed ({e:#}); keeping {} unchanged",
                    self.label,
                    parent.structure_key
                );
                return self.fallback(parent);
            }
        };

        if candidates.is_empty() {
            log::warn!(
                "The {} mutation produced no candidates; keeping {} unchanged",
                self.label,
                parent.structure_key
            );
            return self.fallback(parent);
        }

        let pick = match self.reference {
            Some(reference) => similarity::most_similar(&candidates, reference).unwrap_or(0),
            None => rng.gen_range(0..candidates.len()),
        };

        let (key, structure) = candidates.swap_remove(pick);
        Individual::new(key, structure, 0)
    }

    fn fallback(&self, parent: &Individual) -> Individual {
        Individual::new(parent.structure_key.clone(), parent.structure.clone(), 0)
    }
}
