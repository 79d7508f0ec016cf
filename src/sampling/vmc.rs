//! Variational Monte Carlo run: peak finding, burn-in and the sampling loop.
//!
//! A run starts from a configuration where the potential is large and ψ is safely
//! non-zero, forgets it during burn-in, then records one local energy every
//! `decorrelation_sweeps` sweeps while adapting the Metropolis step on the fly.

use std::sync::{Mutex, PoisonError};

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use super::energy::{AnalyticEnergy, Hamiltonian, NumericEnergy};
use super::optimize::GradientDescent;
use super::traits::{LocalEnergy, Sampler};
use super::update::{AnalyticDrift, ImportanceSampling, Metropolis, NumericDrift};
use crate::error::{Result, VmcError};
use crate::types::{Bound, Configuration, LocalEnergySample, Position, VarParams, VmcResult};
use crate::wavefunction::{AnalyticWfn, Potential, TrialWfn};

/// Constants of a VMC run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmcParams {
    pub hbar: f64,
    /// Δt of the importance-sampling update
    pub time_step: f64,
    pub target_acceptance: f64,
    pub step_increase: f64,
    pub step_decrease: f64,
    pub burn_in_sweeps: usize,
    pub decorrelation_sweeps: usize,
    pub peak_search_points: usize,
    /// ψ floor a starting configuration must exceed
    pub min_wavefunction: f64,
    /// Initial Metropolis step is the shortest coordinate bound divided by this.
    pub step_denominator: f64,
}

impl Default for VmcParams {
    fn default() -> Self {
        Self {
            hbar: 1.0,
            time_step: 0.05,
            target_acceptance: 0.5,
            step_increase: 1.1,
            step_decrease: 0.9,
            burn_in_sweeps: 1000,
            decorrelation_sweeps: 10,
            peak_search_points: 1000,
            min_wavefunction: 1e-3,
            step_denominator: 100.0,
        }
    }
}

impl VmcParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hbar(mut self, hbar: f64) -> Self {
        self.hbar = hbar;
        self
    }

    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    pub fn with_burn_in_sweeps(mut self, n: usize) -> Self {
        self.burn_in_sweeps = n;
        self
    }

    pub fn with_decorrelation_sweeps(mut self, n: usize) -> Self {
        self.decorrelation_sweeps = n;
        self
    }

    pub fn with_peak_search_points(mut self, n: usize) -> Self {
        self.peak_search_points = n;
        self
    }

    pub fn with_min_wavefunction(mut self, floor: f64) -> Self {
        self.min_wavefunction = floor;
        self
    }

    pub fn with_step_denominator(mut self, denominator: f64) -> Self {
        self.step_denominator = denominator;
        self
    }

    /// Reject constants that would leave a run frozen or produce NaN acceptance ratios.
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &'static str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(VmcError::InvalidParameter { name, value })
            }
        };
        positive("hbar", self.hbar)?;
        positive("time_step", self.time_step)?;
        positive("step_denominator", self.step_denominator)?;
        if !(self.target_acceptance > 0.0 && self.target_acceptance < 1.0) {
            return Err(VmcError::InvalidParameter {
                name: "target_acceptance",
                value: self.target_acceptance,
            });
        }
        if !(self.step_increase.is_finite() && self.step_increase > 1.0) {
            return Err(VmcError::InvalidParameter {
                name: "step_increase",
                value: self.step_increase,
            });
        }
        if !(self.step_decrease > 0.0 && self.step_decrease < 1.0) {
            return Err(VmcError::InvalidParameter {
                name: "step_decrease",
                value: self.step_decrease,
            });
        }
        if !(self.min_wavefunction.is_finite() && self.min_wavefunction >= 0.0) {
            return Err(VmcError::InvalidParameter {
                name: "min_wavefunction",
                value: self.min_wavefunction,
            });
        }
        Ok(())
    }
}

/// Every error method needs at least two samples.
fn check_sample_count(num_samples: usize) -> Result<()> {
    match num_samples {
        0 => Err(VmcError::InvalidSampleCount(num_samples)),
        1 => Err(VmcError::InsufficientSamples {
            required: 2,
            actual: num_samples,
        }),
        _ => Ok(()),
    }
}

/// VMC engine for one physical system: trial wavefunction, Hamiltonian and the
/// coordinate region every particle is initialized in.
pub struct VmcSimulation<'a, const D: usize, W, P> {
    wfn: &'a W,
    hamiltonian: &'a Hamiltonian<P>,
    bounds: [Bound; D],
    config: VmcParams,
}

impl<'a, const D: usize, W, P> VmcSimulation<'a, D, W, P>
where
    W: TrialWfn<D> + Sync,
    P: Potential<D> + Sync,
{
    pub fn new(
        wfn: &'a W,
        hamiltonian: &'a Hamiltonian<P>,
        bounds: [Bound; D],
        config: VmcParams,
    ) -> Self {
        Self {
            wfn,
            hamiltonian,
            bounds,
            config,
        }
    }

    pub fn config(&self) -> &VmcParams {
        &self.config
    }

    pub fn hamiltonian(&self) -> &Hamiltonian<P> {
        self.hamiltonian
    }

    pub fn n_particles(&self) -> usize {
        self.hamiltonian.n_particles()
    }

    /// Metropolis step the sampling loop starts from.
    pub fn initial_step(&self) -> f64 {
        let shortest = self
            .bounds
            .iter()
            .map(Bound::length)
            .fold(f64::INFINITY, f64::min);
        shortest / self.config.step_denominator
    }

    fn metropolis(&self) -> Result<Metropolis> {
        let step = self.initial_step();
        if !(step.is_finite() && step > 0.0) {
            return Err(VmcError::InvalidParameter {
                name: "initial Metropolis step",
                value: step,
            });
        }
        Ok(Metropolis::new(step))
    }

    fn random_configuration<R: Rng + ?Sized>(&self, rng: &mut R) -> Configuration<D> {
        (0..self.n_particles())
            .map(|_| Position::<D>::from_fn(|axis, _| self.bounds[axis].lerp(rng.gen())))
            .collect()
    }

    /// Search uniformly random configurations inside the bounds for the one with the
    /// largest potential among those where ψ exceeds `min_wavefunction`.
    pub fn find_peak<R: Rng + ?Sized>(
        &self,
        params: &VarParams,
        rng: &mut R,
    ) -> Result<Configuration<D>> {
        let floor = self.config.min_wavefunction;
        let base_seed: u64 = rng.gen();
        let best: Mutex<Option<(f64, Configuration<D>)>> = Mutex::new(None);

        (0..self.config.peak_search_points)
            .into_par_iter()
            .for_each(|i| {
                let mut local_rng = StdRng::seed_from_u64(base_seed.wrapping_add(i as u64));
                let r = self.random_configuration(&mut local_rng);
                let psi = self.wfn.evaluate(&r, params);
                if !(psi.is_finite() && psi > floor) {
                    return;
                }
                let v = self.hamiltonian.potential().potential(&r);
                let mut guard = best.lock().unwrap_or_else(PoisonError::into_inner);
                if guard.as_ref().map_or(true, |(best_v, _)| v > *best_v) {
                    *guard = Some((v, r));
                }
            });

        let best = best.into_inner().unwrap_or_else(PoisonError::into_inner);
        if let Some((v, r)) = best {
            trace!(potential = v, "Found starting configuration.");
            return Ok(r);
        }

        let center = Position::<D>::from_fn(|axis, _| self.bounds[axis].center());
        let center: Configuration<D> = vec![center; self.n_particles()];
        let psi = self.wfn.evaluate(&center, params);
        if psi.is_finite() && psi > floor {
            warn!(
                points = self.config.peak_search_points,
                "No configuration above the wavefunction floor, starting from the bound centre."
            );
            return Ok(center);
        }
        Err(VmcError::NoStartingPoint {
            floor,
            points: self.config.peak_search_points,
        })
    }

    /// Run the sampling loop with an arbitrary update policy and local energy estimator.
    pub fn run_vmc_with<S, E, R>(
        &self,
        params: &VarParams,
        sampler: &mut S,
        estimator: &E,
        num_samples: usize,
        rng: &mut R,
    ) -> Result<Vec<LocalEnergySample<D>>>
    where
        S: Sampler<D, W>,
        E: LocalEnergy<D, W, P>,
        R: Rng + ?Sized,
    {
        if num_samples == 0 {
            return Err(VmcError::InvalidSampleCount(num_samples));
        }
        self.config.validate()?;
        let mut r = self.find_peak(params, rng)?;

        for _ in 0..self.config.burn_in_sweeps {
            sampler.sweep(self.wfn, params, &mut r, rng);
        }

        let moves_per_sample = (self.config.decorrelation_sweeps * r.len()).max(1);
        let mut samples = Vec::with_capacity(num_samples);
        for _ in 0..num_samples {
            let mut accepted = 0;
            for _ in 0..self.config.decorrelation_sweeps {
                accepted += sampler.sweep(self.wfn, params, &mut r, rng);
            }
            let energy = estimator.local_energy(self.hamiltonian, self.wfn, params, &r);
            if !energy.is_finite() {
                return Err(VmcError::NonFinite("local energy"));
            }
            samples.push(LocalEnergySample {
                energy,
                positions: r.clone(),
            });

            let acceptance_rate = accepted as f64 / moves_per_sample as f64;
            sampler.adapt(acceptance_rate, &self.config);
        }
        Ok(samples)
    }

    /// Numeric local energy with either Metropolis or importance sampling with a
    /// finite-difference drift force.
    pub fn run_vmc_numeric<R: Rng + ?Sized>(
        &self,
        params: &VarParams,
        use_importance: bool,
        derivative_step: f64,
        num_samples: usize,
        rng: &mut R,
    ) -> Result<Vec<LocalEnergySample<D>>> {
        let estimator = NumericEnergy::new(derivative_step);
        if use_importance {
            let mut sampler = self.importance_sampler(NumericDrift::new(derivative_step));
            self.run_vmc_with(params, &mut sampler, &estimator, num_samples, rng)
        } else {
            let mut sampler = self.metropolis()?;
            self.run_vmc_with(params, &mut sampler, &estimator, num_samples, rng)
        }
    }

    fn check_optimization(&self, num_samples: usize, descent: &GradientDescent) -> Result<()> {
        check_sample_count(num_samples)?;
        self.config.validate()?;
        descent.validate()
    }

    fn importance_sampler<F>(&self, drift: F) -> ImportanceSampling<F> {
        let diffusion = self.hamiltonian.diffusion_constants();
        ImportanceSampling::new(drift, diffusion, self.config.time_step)
    }

    /// Optimize the variational parameters within `param_bounds`, sampling with
    /// [`run_vmc_numeric`](Self::run_vmc_numeric).
    pub fn optimize_numeric<R: Rng + Send + ?Sized>(
        &self,
        param_bounds: &[Bound],
        use_importance: bool,
        derivative_step: f64,
        num_samples: usize,
        descent: &GradientDescent,
        rng: &mut R,
    ) -> Result<VmcResult> {
        self.check_optimization(num_samples, descent)?;
        let sample_fn = |params: &VarParams, rng: &mut StdRng| {
            self.run_vmc_numeric(params, use_importance, derivative_step, num_samples, rng)
        };
        descent.optimize(param_bounds, self.wfn, &sample_fn, rng)
    }
}

impl<'a, const D: usize, W, P> VmcSimulation<'a, D, W, P>
where
    W: AnalyticWfn<D> + Sync,
    P: Potential<D> + Sync,
{
    /// Analytic local energy, Metropolis updates.
    pub fn run_vmc<R: Rng + ?Sized>(
        &self,
        params: &VarParams,
        num_samples: usize,
        rng: &mut R,
    ) -> Result<Vec<LocalEnergySample<D>>> {
        let mut sampler = self.metropolis()?;
        self.run_vmc_with(params, &mut sampler, &AnalyticEnergy, num_samples, rng)
    }

    /// Analytic local energy, importance sampling with the analytic drift force.
    pub fn run_vmc_importance<R: Rng + ?Sized>(
        &self,
        params: &VarParams,
        num_samples: usize,
        rng: &mut R,
    ) -> Result<Vec<LocalEnergySample<D>>> {
        let mut sampler = self.importance_sampler(AnalyticDrift);
        self.run_vmc_with(params, &mut sampler, &AnalyticEnergy, num_samples, rng)
    }

    pub fn optimize<R: Rng + Send + ?Sized>(
        &self,
        param_bounds: &[Bound],
        num_samples: usize,
        descent: &GradientDescent,
        rng: &mut R,
    ) -> Result<VmcResult> {
        self.check_optimization(num_samples, descent)?;
        let sample_fn =
            |params: &VarParams, rng: &mut StdRng| self.run_vmc(params, num_samples, rng);
        descent.optimize(param_bounds, self.wfn, &sample_fn, rng)
    }

    pub fn optimize_importance<R: Rng + Send + ?Sized>(
        &self,
        param_bounds: &[Bound],
        num_samples: usize,
        descent: &GradientDescent,
        rng: &mut R,
    ) -> Result<VmcResult> {
        self.check_optimization(num_samples, descent)?;
        let sample_fn = |params: &VarParams, rng: &mut StdRng| {
            self.run_vmc_importance(params, num_samples, rng)
        };
        descent.optimize(param_bounds, self.wfn, &sample_fn, rng)
    }
}

/// Parameter vector of a wavefunction without free parameters.
pub fn no_params() -> VarParams {
    DVector::zeros(0)
}
