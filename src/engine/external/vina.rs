use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};

use crate::core::domain::Individual;
use crate::engine::evaluator::{CostConfig, CostFunction};
use crate::engine::external::pdbqt::VinaOutput;

/// Search-box geometry of the docking run.
#[derive(Debug, Clone)]
pub struct DockingBox {
    pub center: [f64; 3],
    pub size: [f64; 3],
}

/// Cost function wrapping an AutoDock-Vina-style docking binary.
///
/// Writes the ligand payload into the batch scratch directory, runs the
/// binary, and decodes the pose output. Internal failures are absorbed:
/// the individual comes back with `cost = +inf` and a logged diagnostic,
/// never an error.
pub struct VinaCost {
    executable: String,
    receptor: PathBuf,
    docking_box: DockingBox,
    exhaustiveness: u32,
    cpus: u32,
    num_modes: u32,
}

impl VinaCost {
    pub fn new(executable: &str, receptor: impl Into<PathBuf>, docking_box: DockingBox) -> Self {
        Self {
            executable: executable.to_string(),
            receptor: receptor.into(),
            docking_box,
            exhaustiveness: 8,
            cpus: 1,
            num_modes: 1,
        }
    }

    pub fn exhaustiveness(mut self, value: u32) -> Self {
        self.exhaustiveness = value;
        self
    }

    /// Internal worker count of the docking binary itself. Total compute is
    /// `njobs * cpus`; callers size both.
    pub fn cpus(mut self, value: u32) -> Self {
        self.cpus = value;
        self
    }

    pub fn num_modes(mut self, value: u32) -> Self {
        self.num_modes = value;
        self
    }

    /// One docking run. Returns the best-pose free energy and its verbatim
    /// block text.
    fn dock(&self, individual: &Individual, workdir: &Path) -> Result<(f64, String)> {
        let payload = individual
            .structure
            .payload
            .as_deref()
            .ok_or_else(|| anyhow!("no ligand payload for {}", individual.structure_key))?;

        let ligand = workdir.join(format!("{}.pdbqt", individual.idx));
        let out = workdir.join(format!("{}_out.pdbqt", individual.idx));
        fs::write(&ligand, payload)
            .with_context(|| format!("Failed to write ligand {}", ligand.display()))?;

        let b = &self.docking_box;
        let output = Command::new(&self.executable)
            .arg("--receptor")
            .arg(&self.receptor)
            .arg("--ligand")
            .arg(&ligand)
            .args(["--center_x", &b.center[0].to_string()])
            .args(["--center_y", &b.center[1].to_string()])
            .args(["--center_z", &b.center[2].to_string()])
            .args(["--size_x", &b.size[0].to_string()])
            .args(["--size_y", &b.size[1].to_string()])
            .args(["--size_z", &b.size[2].to_string()])
            .arg("--out")
            .arg(&out)
            .args(["--cpu", &self.cpus.to_string()])
            .args(["--exhaustiveness", &self.exhaustiveness.to_string()])
            .args(["--num_modes", &self.num_modes.to_string()])
            .output()
            .context("Failed to spawn docking executable")?;

        if !output.status.success() {
            let err_msg = String::from_utf8_lossy(&output.stderr);
            bail!("docking binary exited with error: {}", err_msg.trim());
        }

        let text = fs::read_to_string(&out)
            .with_context(|| format!("Failed to read pose output {}", out.display()))?;
        let poses = VinaOutput::parse(&text).context("Failed to decode pose output")?;
        let best = poses
            .best_energy()
            .ok_or_else(|| anyhow!("pose output holds no scored poses"))?;

        // best_energy never emits a block lacking the result line
        let energy = best
            .free_energy
            .ok_or_else(|| anyhow!("pose block lacks a free energy"))?;
        Ok((energy, best.raw.clone()))
    }
}

impl CostFunction for VinaCost {
    fn name(&self) -> &str {
        "AutoDock Vina"
    }

    fn wants_workdir(&self) -> bool {
        true
    }

    fn evaluate(&self, mut individual: Individual, config: &CostConfig) -> Individual {
        // Without a scratch directory the ligand files would land unscoped
        // and never be cleaned up, so refuse to dock at all.
        let result = config
            .workdir
            .as_deref()
            .ok_or_else(|| anyhow!("no scratch directory supplied for docking"))
            .and_then(|workdir| self.dock(&individual, workdir));

        match result {
            Ok((energy, pose)) => {
                individual.cost = energy;
                individual.pose = Some(pose);
            }
            Err(e) => {
                log::warn!(
                    "Docking failed for {} (idx {}): {e:#}; assigning +inf cost",
                    individual.structure_key,
                    individual.idx
                );
                individual.cost = f64::INFINITY;
                individual.pose = None;
            }
        }
        individual
    }
}
