use std::collections::HashSet;
use std::io::Write;

use crate::core::domain::Individual;

/// Append-only store of every individual ever produced, first-seen order,
/// keyed by `structure_key`. Used as a membership filter before dispatching
/// offspring to evaluation; it is not a cost cache.
///
/// Injectable so long runs can swap in a persistent/compacting backend.
pub trait SeenRegistry: Send {
    fn contains(&self, key: &str) -> bool;

    /// Registers an individual. Keys already present are ignored, keeping
    /// first-seen order intact.
    fn add(&mut self, individual: Individual);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered individuals in first-seen order.
    fn individuals(&self) -> &[Individual];

    /// Refreshes the retention record for `member`'s key from the live
    /// population. Records are stored by value, so survivors must be
    /// re-synced after each generation or their `kept_gens` go stale.
    /// Unknown keys are ignored.
    fn sync_retention(&mut self, member: &Individual);
}

/// The default backend: an in-memory vector with a hash-set key index.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    order: Vec<Individual>,
    keys: HashSet<String>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SeenRegistry for InMemoryRegistry {
    fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    fn add(&mut self, individual: Individual) {
        if self.keys.insert(individual.structure_key.clone()) {
            self.order.push(individual);
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn individuals(&self) -> &[Individual] {
        &self.order
    }

    fn sync_retention(&mut self, member: &Individual) {
        if let Some(stored) = self
            .order
            .iter_mut()
            .find(|i| i.structure_key == member.structure_key)
        {
            stored.kept_gens.clone_from(&member.kept_gens);
        }
    }
}

/// Dumps the registry as CSV for downstream analysis (idx, key, cost,
/// generations retained). The pose payload is deliberately omitted.
pub fn export_csv<W: Write>(registry: &dyn SeenRegistry, writer: W) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(["idx", "structure_key", "cost", "kept_gens"])?;

    for ind in registry.individuals() {
        let gens = ind
            .kept_gens
            .iter()
            .map(|g| g.to_string())
            .collect::<Vec<_>>()
            .join(";");
        out.write_record([
            ind.idx.to_string(),
            ind.structure_key.clone(),
            ind.cost.to_string(),
            gens,
        ])?;
    }

    out.flush()?;
    Ok(())
}
