#![allow(dead_code)] // Not every test binary uses every stub.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};

use leadopt::core::domain::{Individual, Structure};
use leadopt::engine::evaluator::{CostConfig, CostFunction};
use leadopt::engine::mutation::{GrowWindows, MutationGateway, MutationWindows};

/// Gateway returning a fixed candidate set for every call.
pub struct StubGateway {
    pub candidates: Vec<(String, Structure)>,
}

impl StubGateway {
    pub fn from_encodings(encodings: &[&str]) -> Self {
        Self {
            candidates: encodings
                .iter()
                .map(|e| (e.to_string(), Structure::new(*e)))
                .collect(),
        }
    }
}

impl MutationGateway for StubGateway {
    fn name(&self) -> &str {
        "Stub Gateway"
    }

    fn mutate(
        &self,
        _structure: &Structure,
        _windows: &MutationWindows,
    ) -> Result<Vec<(String, Structure)>> {
        Ok(self.candidates.clone())
    }

    fn grow(
        &self,
        _structure: &Structure,
        _windows: &GrowWindows,
    ) -> Result<Vec<(String, Structure)>> {
        Ok(self.candidates.clone())
    }
}

/// Gateway whose every call errors out.
pub struct FailingGateway;

impl MutationGateway for FailingGateway {
    fn name(&self) -> &str {
        "Failing Gateway"
    }

    fn mutate(
        &self,
        _structure: &Structure,
        _windows: &MutationWindows,
    ) -> Result<Vec<(String, Structure)>> {
        bail!("mutation service unavailable")
    }

    fn grow(
        &self,
        _structure: &Structure,
        _windows: &GrowWindows,
    ) -> Result<Vec<(String, Structure)>> {
        bail!("mutation service unavailable")
    }
}

/// Deterministic cost keyed by the structure encoding.
pub fn stub_cost(key: &str) -> f64 {
    (key.bytes().map(u64::from).sum::<u64>() % 97) as f64
}

/// Cost function assigning `stub_cost` and counting how many individuals
/// it was asked to score. Panics if handed an already-evaluated
/// individual, which the engine must never dispatch.
#[derive(Default)]
pub struct CountingCost {
    pub evaluations: AtomicUsize,
}

impl CostFunction for CountingCost {
    fn name(&self) -> &str {
        "Counting Cost"
    }

    fn evaluate(&self, mut individual: Individual, _config: &CostConfig) -> Individual {
        assert!(
            !individual.is_evaluated(),
            "dispatched an already-evaluated individual: {}",
            individual.structure_key
        );
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        individual.cost = stub_cost(&individual.structure_key);
        individual
    }
}

/// Cost function that always fails internally, reporting the sentinel.
pub struct AlwaysFailingCost;

impl CostFunction for AlwaysFailingCost {
    fn name(&self) -> &str {
        "Always Failing Cost"
    }

    fn evaluate(&self, mut individual: Individual, _config: &CostConfig) -> Individual {
        individual.cost = f64::INFINITY;
        individual
    }
}

/// Workdir-declaring cost function that records the scratch directory it
/// was handed, so tests can verify scoped provisioning and removal.
#[derive(Default)]
pub struct WorkdirProbeCost {
    pub seen_workdir: Mutex<Option<PathBuf>>,
}

impl CostFunction for WorkdirProbeCost {
    fn name(&self) -> &str {
        "Workdir Probe"
    }

    fn wants_workdir(&self) -> bool {
        true
    }

    fn evaluate(&self, mut individual: Individual, config: &CostConfig) -> Individual {
        let dir = config.workdir.clone().expect("batch workdir not injected");
        assert!(dir.exists(), "batch workdir missing during evaluation");
        *self.seen_workdir.lock().unwrap() = Some(dir);
        individual.cost = individual.idx as f64;
        individual
    }
}
