use approx::assert_relative_eq;
use nalgebra::dvector;
use rand::rngs::StdRng;
use rand::SeedableRng;

use vmc_qmc::sampling::no_params;
use vmc_qmc::statistics::{blocking_analysis, error_on_mean};
use vmc_qmc::systems::{FixedGaussianWfn, GaussianWfn, HarmonicPotential};
use vmc_qmc::types::energies;
use vmc_qmc::{Bound, ErrorMethod, GradientDescent, Hamiltonian, VmcParams, VmcSimulation};

fn config() -> VmcParams {
    VmcParams {
        step_denominator: 10.0,
        ..VmcParams::default()
    }
}

fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

#[test]
fn exact_alpha_reproduces_ground_state_energy() {
    let pot = HarmonicPotential::new(1.0, 1.0);
    let ham = Hamiltonian::new(pot, vec![1.0], 1.0).unwrap();
    let bounds = [Bound::new(-5.0, 5.0).unwrap()];
    let sim = VmcSimulation::new(&GaussianWfn, &ham, bounds, config());
    let params = dvector![pot.exact_alpha(1.0)];

    for seed in [1, 2, 3] {
        let mut rng = StdRng::seed_from_u64(seed);
        let runs = [
            sim.run_vmc(&params, 200, &mut rng).unwrap(),
            sim.run_vmc_importance(&params, 200, &mut rng).unwrap(),
            sim.run_vmc_numeric(&params, false, 1e-4, 200, &mut rng).unwrap(),
            sim.run_vmc_numeric(&params, true, 1e-4, 200, &mut rng).unwrap(),
        ];
        for samples in runs {
            let e = energies(&samples);
            let err = error_on_mean(&e, ErrorMethod::Blocking, &mut rng).unwrap();
            let tolerance = (3.0 * err).max(1e-5);
            assert!((mean(&e) - 0.5).abs() < tolerance, "seed {seed}: {}", mean(&e));
        }
    }
}

#[test]
fn off_optimum_energy_matches_variational_formula() {
    // E(α) = α/4 + 1/(4α) for m = ω = ħ = 1
    let pot = HarmonicPotential::new(1.0, 1.0);
    let ham = Hamiltonian::new(pot, vec![1.0], 1.0).unwrap();
    let sim = VmcSimulation::new(&GaussianWfn, &ham, [Bound::new(-5.0, 5.0).unwrap()], config());
    let alpha = 0.8;
    let expected = alpha / 4.0 + 1.0 / (4.0 * alpha);

    let mut rng = StdRng::seed_from_u64(11);
    for samples in [
        sim.run_vmc(&dvector![alpha], 2000, &mut rng).unwrap(),
        sim.run_vmc_importance(&dvector![alpha], 2000, &mut rng).unwrap(),
    ] {
        let e = energies(&samples);
        let blocking = blocking_analysis(&e).unwrap();
        let err = blocking.std_devs.iter().copied().fold(0.0, f64::max);
        assert!((mean(&e) - expected).abs() < 5.0 * err);
    }
}

#[test]
fn several_particles_in_three_dimensions() {
    let pot = HarmonicPotential::new(2.0, 0.5);
    let hbar = 1.0;
    let ham = Hamiltonian::new(pot, vec![2.0; 3], hbar).unwrap();
    let wfn = FixedGaussianWfn::ground_state(&pot, hbar);
    let bound = Bound::new(-4.0, 4.0).unwrap();
    let sim = VmcSimulation::new(&wfn, &ham, [bound; 3], config());

    let mut rng = StdRng::seed_from_u64(21);
    let e = energies(&sim.run_vmc(&no_params(), 100, &mut rng).unwrap());
    for x in e {
        assert_relative_eq!(x, pot.ground_state_energy(hbar, 3, 3), epsilon = 1e-10);
    }
}

#[test]
fn optimization_finds_the_exact_ground_state() {
    let pot = HarmonicPotential::new(1.0, 1.0);
    let ham = Hamiltonian::new(pot, vec![1.0], 1.0).unwrap();
    let vmc = VmcParams {
        burn_in_sweeps: 200,
        peak_search_points: 200,
        ..config()
    };
    let sim = VmcSimulation::new(&GaussianWfn, &ham, [Bound::new(-5.0, 5.0).unwrap()], vmc);
    let param_bounds = [Bound::new(0.1, 2.0).unwrap()];
    let descent = GradientDescent::default();

    let mut rng = StdRng::seed_from_u64(2024);
    let result = sim.optimize(&param_bounds, 500, &descent, &mut rng).unwrap();

    assert_relative_eq!(result.best_params[0], 1.0, epsilon = 0.05);
    let tolerance = (3.0 * result.std_dev).max(1e-3);
    assert!((result.energy - 0.5).abs() < tolerance, "energy {}", result.energy);
}

#[test]
fn optimization_without_parameters_is_a_single_run() {
    let pot = HarmonicPotential::new(1.0, 1.0);
    let ham = Hamiltonian::new(pot, vec![1.0, 1.0], 1.0).unwrap();
    let wfn = FixedGaussianWfn::ground_state(&pot, 1.0);
    let bound = Bound::new(-5.0, 5.0).unwrap();
    let sim = VmcSimulation::new(&wfn, &ham, [bound, bound], config());
    let descent =
        GradientDescent::default().with_error_method(ErrorMethod::Bootstrap { resamples: 100 });

    let mut rng = StdRng::seed_from_u64(5);
    let result = sim.optimize(&[], 100, &descent, &mut rng).unwrap();
    assert!(result.best_params.is_empty());
    assert_relative_eq!(result.energy, 2.0, epsilon = 1e-10);
}

#[test]
fn numeric_optimization_with_importance_sampling() {
    let pot = HarmonicPotential::new(1.0, 1.0);
    let ham = Hamiltonian::new(pot, vec![1.0], 1.0).unwrap();
    let vmc = VmcParams {
        burn_in_sweeps: 200,
        peak_search_points: 200,
        ..config()
    };
    let sim = VmcSimulation::new(&GaussianWfn, &ham, [Bound::new(-5.0, 5.0).unwrap()], vmc);
    let param_bounds = [Bound::new(0.5, 1.5).unwrap()];
    let descent = GradientDescent::default().with_n_walkers(2);

    let mut rng = StdRng::seed_from_u64(77);
    let result = sim
        .optimize_numeric(&param_bounds, true, 1e-4, 500, &descent, &mut rng)
        .unwrap();
    assert_relative_eq!(result.best_params[0], 1.0, epsilon = 0.05);
}
