//! Harmonic oscillator VMC with parameter optimization.
//!
//! Optimizes α of ψ = exp(−α Σ|x|²/2) for N particles in 3D and compares the
//! energy with the exact ground state N·3·ħω/2.
//!
//! Usage:
//!   cargo run --example harmonic_vmc --release -- [OPTIONS]
//!
//! Options:
//!   -p, --particles <N>  Number of particles [default: 2]
//!   -n, --samples <N>    Samples per VMC run [default: 1000]
//!   -w, --walkers <N>    Parallel gradient descents [default: 4]
//!   --importance         Use importance sampling instead of Metropolis

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use vmc_qmc::systems::{GaussianWfn, HarmonicPotential};
use vmc_qmc::{Bound, GradientDescent, Hamiltonian, Result, VmcParams, VmcSimulation};

/// Harmonic oscillator VMC
#[derive(Parser, Debug)]
#[command(version, about = "VMC optimization for the 3D isotropic harmonic oscillator")]
struct Args {
    /// Number of particles
    #[arg(short, long, default_value_t = 2)]
    particles: usize,

    /// Samples per VMC run
    #[arg(short = 'n', long, default_value_t = 1000)]
    samples: usize,

    /// Parallel gradient descents
    #[arg(short, long, default_value_t = 4)]
    walkers: usize,

    /// Oscillator angular frequency
    #[arg(long, default_value_t = 1.0)]
    omega: f64,

    /// Use importance sampling instead of Metropolis
    #[arg(long)]
    importance: bool,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let hbar = 1.0;
    let pot = HarmonicPotential::new(1.0, args.omega);
    let ham = Hamiltonian::new(pot, vec![1.0; args.particles], hbar)?;
    let bound = Bound::new(-5.0, 5.0)?;
    let sim = VmcSimulation::new(&GaussianWfn, &ham, [bound; 3], VmcParams::default());

    let param_bounds = [Bound::new(0.1, 2.0 * pot.exact_alpha(hbar))?];
    let descent = GradientDescent::default().with_n_walkers(args.walkers);
    let mut rng = StdRng::seed_from_u64(args.seed);

    println!("Harmonic Oscillator VMC");
    println!("=======================");
    println!("  Particles: {}", args.particles);
    println!("  Samples:   {}", args.samples);
    println!("  Walkers:   {}", args.walkers);
    println!("  Update:    {}", if args.importance { "importance sampling" } else { "Metropolis" });
    println!();

    let result = if args.importance {
        sim.optimize_importance(&param_bounds, args.samples, &descent, &mut rng)?
    } else {
        sim.optimize(&param_bounds, args.samples, &descent, &mut rng)?
    };

    println!("Optimized α:   {:.6} (exact {:.6})", result.best_params[0], pot.exact_alpha(hbar));
    println!("Energy:        {:.6} ± {:.6}", result.energy, result.std_dev);
    println!("Exact energy:  {:.6}", pot.ground_state_energy(hbar, args.particles, 3));
    Ok(())
}
