//! Update algorithms that move the particles during a simulation.
//!
//! Both policies move one particle at a time and restore its old position when the
//! move is rejected, so a rejected proposal leaves the configuration bit-identical.

use rand::Rng;
use rand_distr::StandardNormal;
use tracing::trace;

use super::traits::{DriftForce, Sampler};
use super::vmc::VmcParams;
use crate::types::{Configuration, Position, VarParams};
use crate::wavefunction::{AnalyticWfn, TrialWfn};

/// Metropolis update with uniform box proposals of side `step`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Metropolis {
    pub step: f64,
}

impl Metropolis {
    pub fn new(step: f64) -> Self {
        Self { step }
    }
}

impl<const D: usize, W: TrialWfn<D>> Sampler<D, W> for Metropolis {
    fn sweep<R: Rng + ?Sized>(
        &mut self,
        wfn: &W,
        params: &VarParams,
        r: &mut Configuration<D>,
        rng: &mut R,
    ) -> usize {
        let mut accepted = 0;
        for n in 0..r.len() {
            let old_pos = r[n];
            let old_psi = wfn.evaluate(r, params);
            for axis in 0..D {
                r[n][axis] += (rng.gen::<f64>() - 0.5) * self.step;
            }
            let new_psi = wfn.evaluate(r, params);
            // NaN ratios compare false and are rejected
            if rng.gen::<f64>() < (new_psi / old_psi).powi(2) {
                accepted += 1;
            } else {
                r[n] = old_pos;
            }
        }
        accepted
    }

    fn adapt(&mut self, acceptance_rate: f64, config: &VmcParams) {
        if acceptance_rate > config.target_acceptance {
            self.step *= config.step_increase;
        } else {
            self.step *= config.step_decrease;
        }
        trace!(acceptance_rate, step = self.step, "Adapted Metropolis step.");
    }
}

/// Drift force from the wavefunction's analytic gradient.
#[derive(Copy, Clone, Debug, Default)]
pub struct AnalyticDrift;

impl<const D: usize, W: AnalyticWfn<D>> DriftForce<D, W> for AnalyticDrift {
    fn drift(
        &self,
        wfn: &W,
        params: &VarParams,
        r: &[Position<D>],
        particle: usize,
    ) -> Position<D> {
        let grad = wfn.derivative(r, params);
        grad[particle] * (2.0 / wfn.evaluate(r, params))
    }
}

/// Drift force from central differences of ψ with step `step`.
#[derive(Copy, Clone, Debug)]
pub struct NumericDrift {
    pub step: f64,
}

impl NumericDrift {
    pub fn new(step: f64) -> Self {
        Self { step }
    }
}

impl<const D: usize, W: TrialWfn<D>> DriftForce<D, W> for NumericDrift {
    fn drift(
        &self,
        wfn: &W,
        params: &VarParams,
        r: &[Position<D>],
        particle: usize,
    ) -> Position<D> {
        let psi = wfn.evaluate(r, params);
        wfn.numerical_particle_derivative(r, params, particle, self.step) * (2.0 / psi)
    }
}

/// Importance-sampling (Langevin) update.
///
/// Proposes x' = x + DΔt·F(x) + √(2DΔt)·ξ with D = ħ²/(2m) and accepts with
/// min(1, ψ(x')² G(x←x') / ψ(x)² G(x'←x)), where G is the Gaussian Green's function
/// of the Fokker–Planck equation.
#[derive(Clone, Debug)]
pub struct ImportanceSampling<F> {
    pub time_step: f64,
    diffusion: Vec<f64>,
    drift: F,
}

impl<F> ImportanceSampling<F> {
    /// `diffusion` holds ħ²/(2mₙ) for each particle.
    pub fn new(drift: F, diffusion: Vec<f64>, time_step: f64) -> Self {
        Self {
            time_step,
            diffusion,
            drift,
        }
    }
}

impl<const D: usize, W, F> Sampler<D, W> for ImportanceSampling<F>
where
    W: TrialWfn<D>,
    F: DriftForce<D, W>,
{
    fn sweep<R: Rng + ?Sized>(
        &mut self,
        wfn: &W,
        params: &VarParams,
        r: &mut Configuration<D>,
        rng: &mut R,
    ) -> usize {
        let mut accepted = 0;
        for n in 0..r.len() {
            let dd = self.diffusion[n] * self.time_step;
            let sigma = (2.0 * dd).sqrt();

            let old_pos = r[n];
            let old_psi = wfn.evaluate(r, params);
            let old_drift = self.drift.drift(wfn, params, r, n);
            for axis in 0..D {
                let xi: f64 = rng.sample(StandardNormal);
                r[n][axis] = old_pos[axis] + dd * old_drift[axis] + sigma * xi;
            }
            let new_pos = r[n];
            let new_psi = wfn.evaluate(r, params);
            let new_drift = self.drift.drift(wfn, params, r, n);

            let forward = (new_pos - old_pos - old_drift * dd).norm_squared();
            let backward = (old_pos - new_pos - new_drift * dd).norm_squared();
            let green_ratio = ((forward - backward) / (4.0 * dd)).exp();
            let acceptance = (new_psi / old_psi).powi(2) * green_ratio;

            if rng.gen::<f64>() < acceptance {
                accepted += 1;
            } else {
                r[n] = old_pos;
            }
        }
        accepted
    }
}
