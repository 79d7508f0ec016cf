mod logging;

use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};

use vmc_qmc::io::{read_run_config, EnergyMethod, RunConfig, UpdateMethod};
use vmc_qmc::sampling::{Hamiltonian, VmcSimulation};
use vmc_qmc::statistics::{blocking_analysis, bootstrap_analysis};
use vmc_qmc::systems::{FixedGaussianWfn, GaussianWfn, HarmonicPotential};
use vmc_qmc::types::{energies, LocalEnergySample, VarParams};
use vmc_qmc::wavefunction::AnalyticWfn;
use vmc_qmc::{Result, VmcError};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Variational Monte Carlo for the harmonic oscillator",
    long_about = None
)]
struct Args {
    /// YAML run configuration
    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all log output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Random seed, overrides the one in the configuration file
    #[arg(long)]
    seed: Option<u64>,

    /// Number of worker threads
    #[arg(short = 'j', long, value_name = "NUM")]
    threads: Option<usize>,
}

fn main() {
    let args = Args::parse();
    logging::setup_logging(args.verbose, args.quiet);

    if let Err(e) = run(&args) {
        error!("Run failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = read_run_config(&args.config)?;

    if let Some(num_threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| VmcError::InvalidConfig(e.to_string()))?;
    }

    let seed = args.seed.or(config.seed).unwrap_or_else(rand::random);
    info!(seed, config = %args.config.display(), "Starting VMC run.");
    let mut rng = StdRng::seed_from_u64(seed);

    match config.dimensions {
        1 => run_system::<1>(&config, &mut rng),
        2 => run_system::<2>(&config, &mut rng),
        3 => run_system::<3>(&config, &mut rng),
        d => Err(VmcError::InvalidConfig(format!("unsupported dimension {d}"))),
    }
}

fn run_system<const D: usize>(config: &RunConfig, rng: &mut StdRng) -> Result<()> {
    let hamiltonian = Hamiltonian::new(config.system, config.masses(), config.vmc.hbar)?;
    if config.param_bounds.is_empty() {
        let wfn = FixedGaussianWfn::ground_state(&config.system, config.vmc.hbar);
        optimize_and_report::<D, _>(&wfn, &hamiltonian, config, rng)
    } else {
        optimize_and_report::<D, _>(&GaussianWfn, &hamiltonian, config, rng)
    }
}

fn sample<const D: usize, W: AnalyticWfn<D> + Sync>(
    sim: &VmcSimulation<'_, D, W, HarmonicPotential>,
    config: &RunConfig,
    params: &VarParams,
    rng: &mut StdRng,
) -> Result<Vec<LocalEnergySample<D>>> {
    let n = config.num_samples;
    match (config.update, config.energy) {
        (UpdateMethod::Metropolis, EnergyMethod::Analytic) => sim.run_vmc(params, n, rng),
        (UpdateMethod::ImportanceSampling, EnergyMethod::Analytic) => {
            sim.run_vmc_importance(params, n, rng)
        }
        (update, EnergyMethod::Numeric { derivative_step }) => sim.run_vmc_numeric(
            params,
            update == UpdateMethod::ImportanceSampling,
            derivative_step,
            n,
            rng,
        ),
    }
}

fn optimize_and_report<const D: usize, W: AnalyticWfn<D> + Sync>(
    wfn: &W,
    hamiltonian: &Hamiltonian<HarmonicPotential>,
    config: &RunConfig,
    rng: &mut StdRng,
) -> Result<()> {
    let bounds = [config.coordinate_bound; D];
    let sim = VmcSimulation::new(wfn, hamiltonian, bounds, config.vmc.clone());
    let (bounds, n, descent) = (&config.param_bounds, config.num_samples, &config.descent);

    let result = match (config.update, config.energy) {
        (UpdateMethod::Metropolis, EnergyMethod::Analytic) => {
            sim.optimize(bounds, n, descent, rng)?
        }
        (UpdateMethod::ImportanceSampling, EnergyMethod::Analytic) => {
            sim.optimize_importance(bounds, n, descent, rng)?
        }
        (update, EnergyMethod::Numeric { derivative_step }) => sim.optimize_numeric(
            bounds,
            update == UpdateMethod::ImportanceSampling,
            derivative_step,
            n,
            descent,
            rng,
        )?,
    };

    info!("Sampling again at the best parameters for error analysis.");
    let samples = energies(&sample(&sim, config, &result.best_params, rng)?);
    let blocking = blocking_analysis(&samples)?;
    let bootstrap = bootstrap_analysis(&samples, config.bootstrap_resamples, rng)?;
    let exact = config
        .system
        .ground_state_energy(config.vmc.hbar, config.n_particles, D);

    println!("VMC results for {} particle(s) in a {}D harmonic oscillator", config.n_particles, D);
    println!("----------------------------------------");
    println!("Energy: {:.6} ± {:.6}", result.energy, result.std_dev);
    println!("Exact ground state energy: {:.6}", exact);
    println!("Best parameters: {:?}", result.best_params.as_slice());
    println!();
    println!("Blocking analysis ({} samples)", samples.len());
    println!("{:>10} {:>10} {:>14} {:>14}", "block", "blocks", "mean", "std error");
    for i in 0..blocking.len() {
        println!(
            "{:>10} {:>10} {:>14.6} {:>14.6}",
            blocking.sizes[i], blocking.n_blocks[i], blocking.means[i], blocking.std_devs[i]
        );
    }
    println!();
    println!(
        "Bootstrap ({} resamples): {:.6} ± {:.6}, 95% CI [{:.6}, {:.6}]",
        config.bootstrap_resamples,
        bootstrap.mean,
        bootstrap.std_dev,
        bootstrap.conf_interval.min,
        bootstrap.conf_interval.max
    );
    Ok(())
}
