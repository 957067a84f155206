use std::fs::File;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossbeam_channel::unbounded;

use leadopt::core::domain::{GaParams, Individual, Structure};
use leadopt::core::registry;
use leadopt::engine::evaluator::CostFunction;
use leadopt::engine::external::crem::CremService;
use leadopt::engine::external::vina::{DockingBox, VinaCost};
use leadopt::engine::mutation::MutationGateway;
use leadopt::solvers::ga::GeneticAlgorithm;
use leadopt::solvers::SolverEvent;

// --- CLI Definitions ---

#[derive(Parser, Debug)]
#[command(author, version, about = "leadopt: evolve ligands against a docking cost function", long_about = None)]
struct Args {
    /// Canonical encoding (SMILES) of the seed molecule
    #[arg(long)]
    seed: String,

    /// Optional PDBQT payload file for the seed ligand
    #[arg(long)]
    seed_pdbqt: Option<PathBuf>,

    /// Receptor PDBQT file
    #[arg(long)]
    receptor: PathBuf,

    /// Search box center, Angstroms (x y z)
    #[arg(long, num_args = 3, allow_negative_numbers = true)]
    center: Vec<f64>,

    /// Search box size, Angstroms (x y z)
    #[arg(long, num_args = 3, default_values_t = [20.0, 20.0, 20.0])]
    box_size: Vec<f64>,

    /// Docking executable
    #[arg(long, default_value = "vina")]
    vina_exe: String,

    /// Docking exhaustiveness
    #[arg(long, default_value_t = 8)]
    exhaustiveness: u32,

    /// Internal worker count of each docking run
    #[arg(long, default_value_t = 1)]
    vina_cpus: u32,

    /// Mutation service executable
    #[arg(long, default_value = "crem-service")]
    crem_exe: String,

    /// Fragment replacement database consumed by the mutation service
    #[arg(long)]
    crem_db: PathBuf,

    /// Population size
    #[arg(short, long, default_value_t = 20)]
    popsize: usize,

    /// Generations to run
    #[arg(short, long, default_value_t = 10)]
    maxiter: usize,

    /// Inverse temperature of the selection weights
    #[arg(long, default_value_t = 0.001)]
    beta: f64,

    /// Fraction of the population regenerated per generation
    #[arg(long, default_value_t = 1.0)]
    pc: f64,

    /// Bias candidate picks toward structures similar to the seed
    #[arg(long)]
    similar: bool,

    /// Concurrent scoring tasks
    #[arg(short, long, default_value_t = 4)]
    njobs: usize,

    /// RNG seed for a reproducible run
    #[arg(long, default_value_t = 0)]
    rng_seed: u64,

    /// Checkpoint every N generations (0 disables)
    #[arg(long, default_value_t = 0)]
    checkpoint_every: u64,

    /// Checkpoint base name ({name}.json)
    #[arg(long, default_value = "pop")]
    checkpoint_name: String,

    /// Write the seen-individuals registry to this CSV file at the end
    #[arg(long)]
    registry_csv: Option<PathBuf>,
}

// --- Initialization Helpers ---

fn check_dependencies(vina_exe: &str) -> Result<()> {
    // A bare --help run tells us the binary is reachable.
    match Command::new(vina_exe).arg("--help").output() {
        Ok(_) => Ok(()),
        Err(_) => Err(anyhow!(
            "Dependency check failed: '{vina_exe}' not found in PATH.\n\
             leadopt requires a docking executable to score candidates."
        )),
    }
}

fn triple(values: &[f64]) -> [f64; 3] {
    [values[0], values[1], values[2]]
}

// --- Main ---

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    check_dependencies(&args.vina_exe)?;

    // Seed individual (idx 0); the payload, when given, feeds the docking runs.
    let mut structure = Structure::new(args.seed.clone());
    if let Some(path) = &args.seed_pdbqt {
        let payload = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed payload {}", path.display()))?;
        structure.payload = Some(payload);
    }
    let seed = Individual::new(args.seed.clone(), structure, 0);

    let costfunc: Arc<dyn CostFunction> = Arc::new(
        VinaCost::new(
            &args.vina_exe,
            args.receptor.clone(),
            DockingBox {
                center: triple(&args.center),
                size: triple(&args.box_size),
            },
        )
        .exhaustiveness(args.exhaustiveness)
        .cpus(args.vina_cpus),
    );

    let mutator: Arc<dyn MutationGateway> =
        Arc::new(CremService::new(&args.crem_exe, &args.crem_db));

    let params = GaParams {
        seed: args.rng_seed,
        popsize: args.popsize,
        maxiter: args.maxiter,
        beta: args.beta,
        pc: args.pc,
        bias_to_seed: args.similar,
        save_pop_every_gen: args.checkpoint_every,
        pop_file_name: args.checkpoint_name.clone(),
        ..Default::default()
    };

    let mut engine = GeneticAlgorithm::new(seed, mutator, costfunc, params);
    let njobs = args.njobs;

    let (tx, rx) = unbounded();
    let handle = thread::Builder::new()
        .name("Solver-Worker".to_string())
        .spawn(move || {
            let result = engine.solve(njobs, tx);
            (engine, result)
        })?;

    // Drain engine events until the channel closes.
    for event in rx {
        match event {
            SolverEvent::Log(msg) => log::info!("{msg}"),
            SolverEvent::GenerationUpdate(stats) => log::info!(
                "Gen {:>4} | best {:>10.4} | mean {:>10.4} | evaluated {:>3} | dup skipped {:>3} | registry {}",
                stats.generation,
                stats.best_cost,
                stats.mean_cost,
                stats.evaluated,
                stats.duplicates_skipped,
                stats.registry_size
            ),
            SolverEvent::NewBest(ind) => {
                log::info!("New best: {} (cost {:.4})", ind.structure_key, ind.cost)
            }
            SolverEvent::Finished => {}
        }
    }

    let (engine, result) = handle
        .join()
        .map_err(|_| anyhow!("Solver thread panicked"))?;
    result.context("Engine run failed")?;

    if let Some(path) = &args.registry_csv {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        registry::export_csv(engine.registry(), file)
            .context("Failed to export the seen-individuals registry")?;
        log::info!(
            "Wrote {} registry entries to {}",
            engine.registry().len(),
            path.display()
        );
    }

    Ok(())
}
