use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::domain::Structure;

/// Numeric perturbation windows handed to the mutation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationWindows {
    /// Context radius around the replaced fragment.
    pub radius: u32,
    /// Smallest replaced-fragment size, in atoms.
    pub min_size: u32,
    /// Largest replaced-fragment size, in atoms.
    pub max_size: u32,
    /// Lower bound on the atom-count delta of the result.
    pub min_inc: i32,
    /// Upper bound on the atom-count delta of the result.
    pub max_inc: i32,
}

impl MutationWindows {
    /// Broad exploration windows, the hard-mutation defaults.
    pub fn exploratory() -> Self {
        Self {
            radius: 3,
            min_size: 1,
            max_size: 8,
            min_inc: -5,
            max_inc: 3,
        }
    }

    /// Minimal local-perturbation windows: replace exactly one atom, let
    /// the result shrink or grow by at most one. The soft-mutation case.
    pub fn local() -> Self {
        Self {
            radius: 3,
            min_size: 1,
            max_size: 1,
            min_inc: -1,
            max_inc: 1,
        }
    }
}

impl Default for MutationWindows {
    fn default() -> Self {
        Self::exploratory()
    }
}

/// Windows for growing a seed within a small atom-count band, used by
/// similarity-biased population seeding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowWindows {
    pub radius: u32,
    pub min_atoms: u32,
    pub max_atoms: u32,
}

impl Default for GrowWindows {
    fn default() -> Self {
        Self {
            radius: 3,
            min_atoms: 1,
            max_atoms: 4,
        }
    }
}

/// External structure-mutation service. Given a molecule and windows it
/// enumerates candidate successors as `(key, structure)` pairs, in
/// unspecified order. An empty result is a normal value, not an error;
/// `Err` means the service itself misbehaved.
pub trait MutationGateway: Send + Sync {
    fn name(&self) -> &str;

    /// Perturbs the structure within the given windows.
    fn mutate(
        &self,
        structure: &Structure,
        windows: &MutationWindows,
    ) -> Result<Vec<(String, Structure)>>;

    /// Grows the structure within a small atom-count window.
    fn grow(
        &self,
        structure: &Structure,
        windows: &GrowWindows,
    ) -> Result<Vec<(String, Structure)>>;
}
