use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::domain::Individual;

/// Snapshot written at generation boundaries. Always reflects a fully
/// merged, exactly-popsize population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub generation: u64,
    pub saved_at: DateTime<Utc>,
    pub population: Vec<Individual>,
}

/// Serializes `(generation, population)` to `{name}.json`.
pub fn save(name: &str, generation: u64, population: &[Individual]) -> Result<()> {
    let path = format!("{name}.json");
    let file = File::create(&path).with_context(|| format!("Failed to create checkpoint {path}"))?;

    let snapshot = Checkpoint {
        generation,
        saved_at: Utc::now(),
        population: population.to_vec(),
    };

    serde_json::to_writer_pretty(BufWriter::new(file), &snapshot)
        .with_context(|| format!("Failed to encode checkpoint {path}"))?;
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> Result<Checkpoint> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open checkpoint {}", path.display()))?;
    let snapshot = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to decode checkpoint {}", path.display()))?;
    Ok(snapshot)
}
