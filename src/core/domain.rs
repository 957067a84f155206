use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::mutation::{GrowWindows, MutationWindows};

// --- The Core Entities ---

/// An opaque molecular handle. The engine never inspects it beyond the
/// canonical encoding; gateways own its interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    /// Canonical string encoding of the molecule (e.g. canonical SMILES).
    /// Doubles as the deduplication key.
    pub encoding: String,
    /// Optional external 3-D payload (e.g. a ligand PDBQT) produced by the
    /// mutation service and consumed by the cost function.
    pub payload: Option<String>,
}

impl Structure {
    pub fn new(encoding: impl Into<String>) -> Self {
        Self {
            encoding: encoding.into(),
            payload: None,
        }
    }

    pub fn with_payload(encoding: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            encoding: encoding.into(),
            payload: Some(payload.into()),
        }
    }
}

/// One candidate solution of the genetic algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Individual {
    pub id: Uuid,
    /// Identity/equality key for deduplication. Immutable once set.
    pub structure_key: String,
    pub structure: Structure,
    /// Batch-local label assigned at dispatch time. Not a stable global id.
    pub idx: usize,
    /// Scalar cost; `f64::INFINITY` means "unevaluated" or "scoring failed".
    #[serde(with = "infinite_cost")]
    pub cost: f64,
    /// Best docking pose text attached by the cost function, carried opaquely.
    pub pose: Option<String>,
    /// Generations in which this exact individual was retained in the live
    /// population. Analysis only; the engine never reads it back.
    pub kept_gens: Vec<u64>,
}

impl Individual {
    pub fn new(key: impl Into<String>, structure: Structure, idx: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            structure_key: key.into(),
            structure,
            idx,
            cost: f64::INFINITY,
            pose: None,
            kept_gens: Vec::new(),
        }
    }

    /// Builds an individual whose key is the structure's own encoding.
    pub fn from_encoding(encoding: &str, idx: usize) -> Self {
        Self::new(encoding.to_string(), Structure::new(encoding), idx)
    }

    pub fn is_evaluated(&self) -> bool {
        self.cost.is_finite()
    }
}

/// JSON has no infinity; the sentinel cost is stored as `null`.
mod infinite_cost {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(cost: &f64, ser: S) -> Result<S::Ok, S::Error> {
        if cost.is_finite() {
            ser.serialize_some(cost)
        } else {
            ser.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
        let opt = Option::<f64>::deserialize(de)?;
        Ok(opt.unwrap_or(f64::INFINITY))
    }
}

// --- Configuration Types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaParams {
    /// Reproducible RNG seed for the whole run.
    pub seed: u64,

    /// Live population size outside init/evaluation transients.
    pub popsize: usize,
    /// Generations per `solve` invocation.
    pub maxiter: usize,
    /// Inverse temperature of the Boltzmann selection weights. Larger beta
    /// sharpens selection toward the best-cost individuals.
    pub beta: f64,
    /// Fraction of the population regenerated per generation.
    pub pc: f64,

    /// Bias candidate picks toward structures similar to the initial seed.
    pub bias_to_seed: bool,
    /// Exploration windows used by the hard (broad) mutation.
    pub windows: MutationWindows,
    /// Growth windows used when seeding in "similar" mode.
    pub grow_windows: GrowWindows,

    /// Checkpoint cadence in generations; 0 disables checkpointing.
    pub save_pop_every_gen: u64,
    /// Base name of the checkpoint file (`{name}.json`).
    pub pop_file_name: String,
}

impl Default for GaParams {
    fn default() -> Self {
        Self {
            seed: 0,
            popsize: 20,
            maxiter: 10,
            beta: 0.001,
            pc: 1.0,
            bias_to_seed: false,
            windows: MutationWindows::exploratory(),
            grow_windows: GrowWindows::default(),
            save_pop_every_gen: 0,
            pop_file_name: "pop".to_string(),
        }
    }
}
