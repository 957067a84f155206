use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crossbeam_channel::unbounded;

use leadopt::core::checkpoint;
use leadopt::core::domain::{GaParams, Individual};
use leadopt::engine::evaluator::CostFunction;
use leadopt::engine::mutation::MutationGateway;
use leadopt::engine::orchestrator::evaluate_batch;
use leadopt::engine::GaError;
use leadopt::solvers::ga::GeneticAlgorithm;
use leadopt::solvers::SolverEvent;

mod common;
use common::{stub_cost, AlwaysFailingCost, CountingCost, StubGateway, WorkdirProbeCost};

fn drain(rx: crossbeam_channel::Receiver<SolverEvent>) -> (bool, Vec<String>, usize) {
    let mut finished = false;
    let mut logs = Vec::new();
    let mut updates = 0;
    for event in rx {
        match event {
            SolverEvent::Finished => finished = true,
            SolverEvent::Log(msg) => logs.push(msg),
            SolverEvent::GenerationUpdate(_) => updates += 1,
            _ => {}
        }
    }
    (finished, logs, updates)
}

#[test]
fn end_to_end_run_holds_population_invariants() {
    let gateway: Arc<dyn MutationGateway> =
        Arc::new(StubGateway::from_encodings(&["CCN", "CCC", "CCF", "CCBr", "CCI"]));
    let cost = Arc::new(CountingCost::default());
    let costfunc: Arc<dyn CostFunction> = cost.clone();

    let params = GaParams {
        popsize: 6,
        maxiter: 3,
        ..Default::default()
    };

    let seed = Individual::from_encoding("CCO", 0);
    let mut engine = GeneticAlgorithm::new(seed, gateway, costfunc, params);

    let (tx, rx) = unbounded();
    engine.solve(2, tx).unwrap();
    let (finished, _, updates) = drain(rx);

    assert!(finished);
    assert_eq!(updates, 3);

    // Exactly popsize members, sorted by non-decreasing cost.
    let pop = engine.population();
    assert_eq!(pop.len(), 6);
    for pair in pop.windows(2) {
        assert!(pair[0].cost <= pair[1].cost);
    }

    // Seeding evaluated the seed with its true cost; every later offspring
    // collided with the registry, so the evaluation budget stayed at the
    // six seeding calls.
    assert_eq!(cost.evaluations.load(Ordering::SeqCst), 6);
    let registered = engine.registry().individuals();
    assert_eq!(registered[0].structure_key, "CCO");
    assert_eq!(registered[0].cost, stub_cost("CCO"));

    // Recorded best-cost history is monotonically non-increasing.
    let history = engine.best_cost_history();
    assert_eq!(history.len(), 3);
    for pair in history.windows(2) {
        assert!(pair[1] <= pair[0]);
    }
    assert_eq!(engine.mean_cost_history().len(), 3);
}

#[test]
fn solve_is_reentrant_and_extends_the_run() {
    let gateway: Arc<dyn MutationGateway> =
        Arc::new(StubGateway::from_encodings(&["CCN", "CCC", "CCF", "CCBr", "CCI"]));
    let costfunc: Arc<dyn CostFunction> = Arc::new(CountingCost::default());

    let params = GaParams {
        popsize: 6,
        maxiter: 2,
        ..Default::default()
    };
    let seed = Individual::from_encoding("CCO", 0);
    let mut engine = GeneticAlgorithm::new(seed, gateway, costfunc, params);

    let (tx, rx) = unbounded();
    engine.solve(1, tx).unwrap();
    drop(rx);

    let (tx, rx) = unbounded();
    engine.solve(1, tx).unwrap();
    drop(rx);

    assert_eq!(engine.calls(), 2);
    assert_eq!(engine.generations(), 4);
    assert_eq!(engine.best_cost_history().len(), 4);
    assert_eq!(engine.population().len(), 6);
}

#[test]
fn all_sentinel_costs_degenerate_selection() {
    let gateway: Arc<dyn MutationGateway> =
        Arc::new(StubGateway::from_encodings(&["CCN", "CCC", "CCF"]));
    let costfunc: Arc<dyn CostFunction> = Arc::new(AlwaysFailingCost);

    let params = GaParams {
        popsize: 4,
        maxiter: 2,
        ..Default::default()
    };
    let seed = Individual::from_encoding("CCO", 0);
    let mut engine = GeneticAlgorithm::new(seed, gateway, costfunc, params);

    let (tx, rx) = unbounded();
    let err = engine.solve(1, tx).unwrap_err();
    drop(rx);
    assert!(matches!(err, GaError::DegenerateSelection));
}

#[test]
fn seeding_pads_a_small_candidate_set() {
    let gateway: Arc<dyn MutationGateway> =
        Arc::new(StubGateway::from_encodings(&["CCN", "CCC"]));
    let costfunc: Arc<dyn CostFunction> = Arc::new(CountingCost::default());

    // pc = 0 keeps the loop from breeding, leaving the seeded population
    // observable after the run.
    let params = GaParams {
        popsize: 6,
        maxiter: 1,
        pc: 0.0,
        ..Default::default()
    };
    let seed = Individual::from_encoding("CCO", 0);
    let mut engine = GeneticAlgorithm::new(seed, gateway, costfunc, params);

    let (tx, rx) = unbounded();
    engine.solve(1, tx).unwrap();
    let (finished, logs, _) = drain(rx);

    assert!(finished);
    assert_eq!(engine.population().len(), 6);
    assert!(
        logs.iter().any(|m| m.contains("padding")),
        "expected a low-diversity diagnostic, got {logs:?}"
    );

    // Only the seed plus the two produced candidates exist as keys.
    let keys: HashSet<&str> = engine
        .population()
        .iter()
        .map(|i| i.structure_key.as_str())
        .collect();
    assert!(keys.len() <= 3);
}

#[test]
fn seeding_samples_a_large_candidate_set_without_replacement() {
    let encodings = ["C1", "C2", "C3", "C4", "C5", "C6", "C7", "C8", "C9", "C10"];
    let gateway: Arc<dyn MutationGateway> = Arc::new(StubGateway::from_encodings(&encodings));
    let costfunc: Arc<dyn CostFunction> = Arc::new(CountingCost::default());

    let params = GaParams {
        popsize: 4,
        maxiter: 1,
        pc: 0.0,
        ..Default::default()
    };
    let seed = Individual::from_encoding("CCO", 0);
    let mut engine = GeneticAlgorithm::new(seed, gateway, costfunc, params);

    let (tx, rx) = unbounded();
    engine.solve(1, tx).unwrap();
    drop(rx);

    let pop = engine.population();
    assert_eq!(pop.len(), 4);

    // Exactly popsize - 1 distinct picks from the candidate set, plus the seed.
    let keys: HashSet<&str> = pop.iter().map(|i| i.structure_key.as_str()).collect();
    assert_eq!(keys.len(), 4);
    assert!(keys.contains("CCO"));
    for key in &keys {
        assert!(*key == "CCO" || encodings.contains(key));
    }
}

#[test]
fn identical_seeds_yield_identical_runs() {
    let run = || {
        let gateway: Arc<dyn MutationGateway> =
            Arc::new(StubGateway::from_encodings(&["CCN", "CCC", "CCF", "CCBr", "CCI"]));
        let costfunc: Arc<dyn CostFunction> = Arc::new(CountingCost::default());
        let params = GaParams {
            popsize: 4,
            maxiter: 2,
            seed: 42,
            ..Default::default()
        };
        let seed = Individual::from_encoding("CCO", 0);
        let mut engine = GeneticAlgorithm::new(seed, gateway, costfunc, params);
        let (tx, rx) = unbounded();
        engine.solve(1, tx).unwrap();
        drop(rx);
        engine
            .population()
            .iter()
            .map(|i| i.structure_key.clone())
            .collect::<Vec<_>>()
    };

    assert_eq!(run(), run());
}

#[test]
fn registry_retention_follows_the_live_population() {
    let gateway: Arc<dyn MutationGateway> =
        Arc::new(StubGateway::from_encodings(&["CCN", "CCC", "CCF", "CCBr", "CCI"]));
    let costfunc: Arc<dyn CostFunction> = Arc::new(CountingCost::default());

    let params = GaParams {
        popsize: 6,
        maxiter: 3,
        ..Default::default()
    };
    let seed = Individual::from_encoding("CCO", 0);
    let mut engine = GeneticAlgorithm::new(seed, gateway, costfunc, params);

    let (tx, rx) = unbounded();
    engine.solve(1, tx).unwrap();
    drop(rx);

    // Registry records mirror the live kept_gens instead of freezing at
    // whatever they held when the key was first registered.
    for member in engine.population() {
        let record = engine
            .registry()
            .individuals()
            .iter()
            .find(|i| i.structure_key == member.structure_key)
            .expect("live member missing from registry");
        assert_eq!(record.kept_gens, member.kept_gens);
    }

    // The whole seeded population survived every generation, so the seed's
    // record spans seeding plus all three generations.
    let seed_record = engine
        .registry()
        .individuals()
        .iter()
        .find(|i| i.structure_key == "CCO")
        .unwrap();
    assert_eq!(seed_record.kept_gens, vec![0, 1, 2, 3]);
}

#[test]
fn checkpoints_are_written_on_cadence_and_at_the_final_generation() {
    let dir = tempfile::tempdir().unwrap();
    let name = dir.path().join("pop").display().to_string();

    let gateway: Arc<dyn MutationGateway> =
        Arc::new(StubGateway::from_encodings(&["CCN", "CCC", "CCF", "CCBr", "CCI"]));
    let costfunc: Arc<dyn CostFunction> = Arc::new(CountingCost::default());

    let params = GaParams {
        popsize: 4,
        maxiter: 3,
        save_pop_every_gen: 2,
        pop_file_name: name.clone(),
        ..Default::default()
    };
    let seed = Individual::from_encoding("CCO", 0);
    let mut engine = GeneticAlgorithm::new(seed, gateway, costfunc, params);

    let (tx, rx) = unbounded();
    engine.solve(1, tx).unwrap();
    drop(rx);

    // The final-generation save overwrites the cadence saves, so the file
    // on disk reflects the end of the run.
    let snapshot = checkpoint::load(format!("{name}.json")).unwrap();
    assert_eq!(snapshot.generation, 3);
    assert_eq!(snapshot.population.len(), 4);
    for pair in snapshot.population.windows(2) {
        assert!(pair[0].cost <= pair[1].cost);
    }
}

// --- Orchestrator ---

#[test]
fn batch_evaluation_preserves_input_order() {
    let costfunc: Arc<dyn CostFunction> = Arc::new(WorkdirProbeCost::default());

    let batch: Vec<Individual> = (0..8)
        .map(|i| Individual::from_encoding(&format!("C{i}"), i))
        .collect();

    let results = evaluate_batch(batch, &costfunc, 4).unwrap();
    for (i, ind) in results.iter().enumerate() {
        assert_eq!(ind.idx, i);
        // The probe writes idx as the cost, so order mismatches would show.
        assert_eq!(ind.cost, i as f64);
    }
}

#[test]
fn batch_scratch_directory_is_scoped_to_the_batch() {
    let probe = Arc::new(WorkdirProbeCost::default());
    let costfunc: Arc<dyn CostFunction> = probe.clone();

    let batch = vec![Individual::from_encoding("CCO", 0)];
    evaluate_batch(batch, &costfunc, 1).unwrap();

    let dir = probe
        .seen_workdir
        .lock()
        .unwrap()
        .clone()
        .expect("workdir was never injected");
    assert!(!dir.exists(), "scratch directory survived the batch");
}

#[test]
fn empty_batch_is_a_no_op() {
    let costfunc: Arc<dyn CostFunction> = Arc::new(CountingCost::default());
    let results = evaluate_batch(Vec::new(), &costfunc, 4).unwrap();
    assert!(results.is_empty());
}
