use std::sync::Arc;

use crossbeam_channel::Sender;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::core::checkpoint;
use crate::core::domain::{GaParams, Individual};
use crate::core::registry::{InMemoryRegistry, SeenRegistry};
use crate::engine::evaluator::CostFunction;
use crate::engine::mutation::MutationGateway;
use crate::engine::operators::{boltzmann_weights, offspring_slots, roulette_wheel_selection, Mutator};
use crate::engine::{orchestrator, GaError};
use crate::solvers::{GenStats, SolverEvent};

/// The generational control loop: population lifecycle, parent selection,
/// two-tier variation, registry deduplication, parallel batched scoring,
/// elitist survivor selection and generation-boundary checkpointing.
///
/// `solve` is re-entrant: calling it again after a completed run extends
/// the run from the current population and registry instead of restarting.
pub struct GeneticAlgorithm {
    mutator: Arc<dyn MutationGateway>,
    costfunc: Arc<dyn CostFunction>,
    params: GaParams,

    pop: Vec<Individual>,
    seen: Box<dyn SeenRegistry>,
    /// The evaluated seed, kept for the end-of-run report.
    init_individual: Individual,

    num_gen: u64,
    num_calls: u64,
    bestcost: Vec<f64>,
    avg_cost: Vec<f64>,

    rng: ChaCha8Rng,
}

impl GeneticAlgorithm {
    pub fn new(
        seed: Individual,
        mutator: Arc<dyn MutationGateway>,
        costfunc: Arc<dyn CostFunction>,
        params: GaParams,
    ) -> Self {
        Self::with_registry(seed, mutator, costfunc, params, Box::new(InMemoryRegistry::new()))
    }

    /// Like `new`, with a caller-supplied seen-individuals backend.
    pub fn with_registry(
        seed: Individual,
        mutator: Arc<dyn MutationGateway>,
        costfunc: Arc<dyn CostFunction>,
        params: GaParams,
        registry: Box<dyn SeenRegistry>,
    ) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(params.seed);
        Self {
            mutator,
            costfunc,
            params,
            init_individual: seed.clone(),
            pop: vec![seed],
            seen: registry,
            num_gen: 0,
            num_calls: 0,
            bestcost: Vec::new(),
            avg_cost: Vec::new(),
            rng,
        }
    }

    // --- Accessors ---

    /// Live population, sorted by non-decreasing cost after each generation.
    pub fn population(&self) -> &[Individual] {
        &self.pop
    }

    pub fn best(&self) -> Option<&Individual> {
        self.pop.iter().min_by(|a, b| a.cost.total_cmp(&b.cost))
    }

    pub fn best_cost_history(&self) -> &[f64] {
        &self.bestcost
    }

    pub fn mean_cost_history(&self) -> &[f64] {
        &self.avg_cost
    }

    pub fn generations(&self) -> u64 {
        self.num_gen
    }

    pub fn calls(&self) -> u64 {
        self.num_calls
    }

    pub fn registry(&self) -> &dyn SeenRegistry {
        self.seen.as_ref()
    }

    // --- Run ---

    /// Runs `maxiter` generations with up to `njobs` concurrent scoring
    /// tasks. Non-fatal conditions degrade (no-op offspring, `+inf`
    /// costs); only pool-level and configuration failures return `Err`.
    pub fn solve(&mut self, njobs: usize, tx: Sender<SolverEvent>) -> Result<(), GaError> {
        self.num_calls += 1;

        // Seeding runs only when the population is still the lone seed.
        if self.pop.len() == 1 {
            self.seed_population(njobs, &tx)?;
        }

        // Register current members; on re-entry the caller may have swapped
        // in a population the registry has never seen.
        for ind in &self.pop {
            if !self.seen.contains(&ind.structure_key) {
                self.seen.add(ind.clone());
            }
        }

        if self.params.save_pop_every_gen > 0 {
            self.checkpoint()?;
        }

        let nc = offspring_slots(self.params.pc, self.params.popsize);
        let previous_generations = self.bestcost.len() as u64;
        let mut global_best = self.pop.iter().map(|i| i.cost).fold(f64::INFINITY, f64::min);

        for iter in 0..self.params.maxiter {
            self.num_gen += 1;

            // 1. Boltzmann selection weights.
            let costs: Vec<f64> = self.pop.iter().map(|i| i.cost).collect();
            let weights = boltzmann_weights(&costs, self.params.beta);

            // 2-4. Breed nc/2 parent pairs, drop already-seen offspring
            // before they consume any evaluation budget.
            let reference = self
                .params
                .bias_to_seed
                .then(|| self.init_individual.structure.clone());
            let hard = Mutator::hard(
                self.mutator.as_ref(),
                self.params.windows.clone(),
                reference.as_ref(),
            );
            let soft = Mutator::soft(self.mutator.as_ref(), reference.as_ref());

            let mut offspring = Vec::with_capacity(nc);
            let mut duplicates_skipped = 0;
            for _ in 0..nc / 2 {
                let i1 = roulette_wheel_selection(&weights, &mut self.rng)?;
                let i2 = roulette_wheel_selection(&weights, &mut self.rng)?;

                for parent_ix in [i1, i2] {
                    let parent = &self.pop[parent_ix];
                    let jumped = hard.apply(parent, &mut self.rng);
                    let child = soft.apply(&jumped, &mut self.rng);

                    if self.seen.contains(&child.structure_key) {
                        duplicates_skipped += 1;
                    } else {
                        offspring.push(child);
                    }
                }
            }

            // 5. Fresh idx labels, then one parallel scoring batch.
            let evaluated = offspring.len();
            if !offspring.is_empty() {
                let base = self.seen.len();
                for (i, child) in offspring.iter_mut().enumerate() {
                    child.idx = base + i;
                }
                let _ = tx.send(SolverEvent::Log(format!(
                    "Evaluating generation {} / {} ({} offspring)",
                    self.num_gen,
                    self.params.maxiter as u64 + previous_generations,
                    offspring.len()
                )));
                offspring = orchestrator::evaluate_batch(offspring, &self.costfunc, njobs)?;
            }

            // 6. Merge, sort, elitist truncation.
            self.pop.extend(offspring.iter().cloned());
            self.pop.sort_by(|a, b| a.cost.total_cmp(&b.cost));
            self.pop.truncate(self.params.popsize);
            for ind in &mut self.pop {
                ind.kept_gens.push(self.num_gen);
            }

            let best_cost = self.pop[0].cost;
            let mean_cost =
                self.pop.iter().map(|i| i.cost).sum::<f64>() / self.pop.len() as f64;
            self.bestcost.push(best_cost);
            self.avg_cost.push(mean_cost);

            // 7. Register newly evaluated offspring, then refresh the
            // retention records of everyone still in the population.
            for child in offspring {
                if !self.seen.contains(&child.structure_key) {
                    self.seen.add(child);
                }
            }
            for ind in &self.pop {
                self.seen.sync_retention(ind);
            }

            // 8. Checkpoint on cadence and on the final generation.
            if self.params.save_pop_every_gen > 0
                && (self.num_gen % self.params.save_pop_every_gen == 0
                    || iter + 1 == self.params.maxiter)
            {
                self.checkpoint()?;
            }

            if best_cost < global_best {
                global_best = best_cost;
                let _ = tx.send(SolverEvent::NewBest(self.pop[0].clone()));
            }

            let _ = tx.send(SolverEvent::GenerationUpdate(GenStats {
                generation: self.num_gen,
                best_cost,
                mean_cost,
                worst_cost: self.pop.last().map(|i| i.cost).unwrap_or(f64::INFINITY),
                pop_size: self.pop.len(),
                evaluated,
                duplicates_skipped,
                registry_size: self.seen.len(),
            }));

            let _ = tx.send(SolverEvent::Log(format!(
                "Generation {}: best {} with cost {:.4}",
                self.num_gen, self.pop[0].structure_key, best_cost
            )));
        }

        let _ = tx.send(SolverEvent::Log(format!(
            "Run finished after {} generations with a population of {} individuals.",
            self.params.maxiter, self.params.popsize
        )));
        let _ = tx.send(SolverEvent::Log(format!(
            "Initial structure: {} with cost {:.4}",
            self.init_individual.structure_key, self.init_individual.cost
        )));
        if let Some(best) = self.pop.first() {
            let _ = tx.send(SolverEvent::Log(format!(
                "Final structure: {} with cost {:.4}",
                best.structure_key, best.cost
            )));
        }
        let _ = tx.send(SolverEvent::Finished);
        Ok(())
    }

    // --- Seeding ---

    /// Expands the lone seed into a full evaluated population.
    fn seed_population(
        &mut self,
        njobs: usize,
        tx: &Sender<SolverEvent>,
    ) -> Result<(), GaError> {
        let seed = self.pop[0].clone();
        let target = self.params.popsize.saturating_sub(1);

        let mut candidates = if self.params.bias_to_seed {
            // Mode A: grow within a small atom-count window, keep the
            // candidates most similar to the seed.
            let grown = self
                .mutator
                .grow(&seed.structure, &self.params.grow_windows)
                .map_err(|e| GaError::Seeding(e.to_string()))?;
            let mut ranked =
                crate::analysis::similarity::rank_by_similarity(grown, &seed.structure);
            ranked.truncate(target);
            ranked
        } else {
            // Mode B: broad mutation with the configured windows.
            self.mutator
                .mutate(&seed.structure, &self.params.windows)
                .map_err(|e| GaError::Seeding(e.to_string()))?
        };

        // Reconcile to exactly `popsize - 1` candidates.
        if candidates.len() < target {
            if candidates.is_empty() {
                return Err(GaError::Seeding(
                    "mutation gateway produced no candidates for the seed".to_string(),
                ));
            }
            let msg = format!(
                "Initial mutation produced only {} unique candidates; padding by resampling (low diversity)",
                candidates.len()
            );
            log::warn!("{msg}");
            let _ = tx.send(SolverEvent::Log(msg));

            while candidates.len() < target {
                let pick = self.rng.gen_range(0..candidates.len());
                candidates.push(candidates[pick].clone());
            }
        } else if candidates.len() > target {
            let picks = rand::seq::index::sample(&mut self.rng, candidates.len(), target);
            candidates = picks.iter().map(|i| candidates[i].clone()).collect();
        }

        for (i, (key, structure)) in candidates.into_iter().enumerate() {
            // idx 0 stays with the seed.
            self.pop.push(Individual::new(key, structure, i + 1));
        }

        let _ = tx.send(SolverEvent::Log(format!(
            "Creating the first population with {} members",
            self.params.popsize
        )));
        self.pop = orchestrator::evaluate_batch(std::mem::take(&mut self.pop), &self.costfunc, njobs)?;
        for ind in &mut self.pop {
            ind.kept_gens.push(0);
        }

        // The evaluation batch preserves order, so the seed is still the
        // first member; record it with its true cost for the final report.
        self.init_individual = self.pop[0].clone();

        if let Some(best) = self.pop.iter().min_by(|a, b| a.cost.total_cmp(&b.cost)) {
            let _ = tx.send(SolverEvent::Log(format!(
                "Initial population: best individual {} with cost {:.4}",
                best.structure_key, best.cost
            )));
            let _ = tx.send(SolverEvent::NewBest(best.clone()));
        }
        Ok(())
    }

    fn checkpoint(&self) -> Result<(), GaError> {
        checkpoint::save(&self.params.pop_file_name, self.num_gen, &self.pop)
            .map_err(|e| GaError::Checkpoint(e.to_string()))
    }
}
