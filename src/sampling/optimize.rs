//! Variational parameter optimization by stochastic gradient descent.
//!
//! The energy gradient is estimated by reweighting the samples of the current
//! parameters, so each iteration costs a single VMC run. Several descents from
//! random starting points run in parallel and the lowest energy wins.

use std::sync::{Mutex, PoisonError};

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, VmcError};
use crate::statistics::{error_on_mean, ErrorMethod};
use crate::types::{energies, Bound, LocalEnergySample, VarParams, VmcResult};
use crate::wavefunction::TrialWfn;

/// Weight of the new finite-difference gradient in the momentum.
const GRADIENT_WEIGHT: f64 = 0.75;
/// Weight of the previous iteration's momentum.
const MOMENTUM_WEIGHT: f64 = 0.25;

/// Gradient descent with momentum and a bounded step-halving line search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientDescent {
    /// Independent descents started from random parameters
    pub n_walkers: usize,
    pub max_iterations: usize,
    /// Converged once ‖momentum‖ / ‖params‖ drops below this.
    pub stopping_threshold: f64,
    /// Step multiplier tried first, halved until the step stays inside the bounds
    pub initial_multiplier: f64,
    /// First reweighting step is ‖params‖ divided by this.
    pub grad_step_denominator: f64,
    pub error_method: ErrorMethod,
}

impl Default for GradientDescent {
    fn default() -> Self {
        Self {
            n_walkers: 4,
            max_iterations: 10_000,
            stopping_threshold: 1e-3,
            initial_multiplier: 0.02,
            grad_step_denominator: 100.0,
            error_method: ErrorMethod::Blocking,
        }
    }
}

impl GradientDescent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_walkers(mut self, n: usize) -> Self {
        self.n_walkers = n;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_stopping_threshold(mut self, threshold: f64) -> Self {
        self.stopping_threshold = threshold;
        self
    }

    pub fn with_initial_multiplier(mut self, multiplier: f64) -> Self {
        self.initial_multiplier = multiplier;
        self
    }

    pub fn with_grad_step_denominator(mut self, denominator: f64) -> Self {
        self.grad_step_denominator = denominator;
        self
    }

    pub fn with_error_method(mut self, method: ErrorMethod) -> Self {
        self.error_method = method;
        self
    }

    /// Check the settings before any sampling is spent on them.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("initial_multiplier", self.initial_multiplier),
            ("stopping_threshold", self.stopping_threshold),
            ("grad_step_denominator", self.grad_step_denominator),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(VmcError::InvalidParameter { name, value });
            }
        }
        if let ErrorMethod::Bootstrap { resamples } = self.error_method {
            if resamples < 2 {
                return Err(VmcError::InvalidResampleCount(resamples));
            }
        }
        Ok(())
    }

    /// Run `n_walkers` descents in parallel from parameters drawn uniformly inside
    /// `bounds` and return the lowest-energy result.
    ///
    /// `sample_fn` produces the local energy samples for a parameter vector. Each
    /// walker owns a private random stream seeded from `rng`. Without free
    /// parameters this is a single sampling run.
    pub fn optimize<const D: usize, W, F, R>(
        &self,
        bounds: &[Bound],
        wfn: &W,
        sample_fn: &F,
        rng: &mut R,
    ) -> Result<VmcResult>
    where
        W: TrialWfn<D> + Sync,
        F: Fn(&VarParams, &mut StdRng) -> Result<Vec<LocalEnergySample<D>>> + Sync,
        R: Rng + Send + ?Sized,
    {
        self.validate()?;
        if bounds.is_empty() {
            let mut local_rng = StdRng::seed_from_u64(rng.gen());
            let params = DVector::zeros(0);
            let samples = energies(&sample_fn(&params, &mut local_rng)?);
            let energy = samples.iter().sum::<f64>() / samples.len() as f64;
            let std_dev = error_on_mean(&samples, self.error_method, &mut local_rng)?;
            return Ok(VmcResult {
                energy,
                std_dev,
                best_params: params,
            });
        }
        if self.n_walkers == 0 {
            return Err(VmcError::InvalidWalkerCount(self.n_walkers));
        }

        let shared_rng = Mutex::new(rng);
        let results = (0..self.n_walkers)
            .into_par_iter()
            .map(|walker| {
                let seed: u64 = {
                    let mut guard = shared_rng.lock().unwrap_or_else(PoisonError::into_inner);
                    guard.gen()
                };
                let mut local_rng = StdRng::seed_from_u64(seed);
                let initial = DVector::from_iterator(
                    bounds.len(),
                    bounds.iter().map(|b| b.lerp(local_rng.gen())),
                );
                debug!(walker, params = ?initial.as_slice(), "Starting descent.");
                self.descend(initial, bounds, wfn, sample_fn, &mut local_rng)
            })
            .collect::<Result<Vec<_>>>()?;

        let best = results
            .into_iter()
            .min_by(|a, b| a.energy.total_cmp(&b.energy))
            .ok_or(VmcError::InvalidWalkerCount(0))?;
        info!(
            energy = best.energy,
            std_dev = best.std_dev,
            params = ?best.best_params.as_slice(),
            "Selected best walker."
        );
        Ok(best)
    }

    /// A single descent from `initial`.
    pub fn descend<const D: usize, W, F>(
        &self,
        initial: VarParams,
        bounds: &[Bound],
        wfn: &W,
        sample_fn: &F,
        rng: &mut StdRng,
    ) -> Result<VmcResult>
    where
        W: TrialWfn<D> + Sync,
        F: Fn(&VarParams, &mut StdRng) -> Result<Vec<LocalEnergySample<D>>>,
    {
        if initial.len() != bounds.len() {
            return Err(VmcError::DimensionMismatch {
                what: "variational parameters",
                expected: bounds.len(),
                actual: initial.len(),
            });
        }
        if let Some((index, &value)) = initial
            .iter()
            .enumerate()
            .find(|(v, x)| !bounds[*v].contains(**x))
        {
            return Err(VmcError::ParameterOutOfBounds { index, value });
        }

        self.validate()?;
        let mut params = initial;
        let initial_norm = params.norm();
        let mut grad_step = if initial_norm > 0.0 {
            initial_norm / self.grad_step_denominator
        } else {
            1.0 / self.grad_step_denominator
        };
        let mut old_momentum = DVector::zeros(params.len());

        for iteration in 0..self.max_iterations {
            let samples = sample_fn(&params, rng)?;
            let local_energies = energies(&samples);
            let energy = local_energies.iter().sum::<f64>() / local_energies.len() as f64;

            let increased = reweighted_energies(wfn, &params, &samples, grad_step);
            let decreased = reweighted_energies(wfn, &params, &samples, -grad_step);
            let momentum = (increased - decreased) * (-GRADIENT_WEIGHT / (2.0 * grad_step))
                + &old_momentum * MOMENTUM_WEIGHT;
            if momentum.iter().any(|m| !m.is_finite()) {
                return Err(VmcError::NonFinite("gradient descent momentum"));
            }

            let momentum_norm = momentum.norm();
            if momentum_norm > 0.0 {
                grad_step = momentum_norm;
            }
            let ratio = momentum_norm / params.norm().max(f64::MIN_POSITIVE);
            debug!(
                iteration,
                energy,
                params = ?params.as_slice(),
                momentum = momentum_norm,
                "Gradient descent step."
            );
            if ratio < self.stopping_threshold {
                let std_dev = error_on_mean(&local_energies, self.error_method, rng)?;
                info!(iteration, energy, std_dev, "Gradient descent converged.");
                return Ok(VmcResult {
                    energy,
                    std_dev,
                    best_params: params,
                });
            }

            let step = DVector::from_fn(params.len(), |v, _| {
                let mut multiplier = self.initial_multiplier;
                while !bounds[v].contains(params[v] + multiplier * momentum[v]) {
                    multiplier /= 2.0;
                }
                multiplier * momentum[v]
            });
            params += &step;
            old_momentum = momentum;
        }

        Err(VmcError::NotConverged {
            iterations: self.max_iterations,
        })
    }
}

/// Energy at `params + step·e_v` for every parameter `v`, estimated from samples
/// drawn at `params` by weighting each with (ψ(params + step·e_v) / ψ(params))².
///
/// Weights are formed from log ratios shifted by their maximum, which leaves the
/// weighted mean unchanged but keeps large steps from overflowing.
pub fn reweighted_energies<const D: usize, W>(
    wfn: &W,
    params: &VarParams,
    samples: &[LocalEnergySample<D>],
    step: f64,
) -> DVector<f64>
where
    W: TrialWfn<D> + Sync,
{
    DVector::from_fn(params.len(), |v, _| {
        let mut shifted = params.clone();
        shifted[v] += step;
        let log_weights: Vec<f64> = samples
            .par_iter()
            .map(|s| {
                let new = wfn.evaluate(&s.positions, &shifted).abs().ln();
                let old = wfn.evaluate(&s.positions, params).abs().ln();
                2.0 * (new - old)
            })
            .collect();
        let largest = log_weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (weighted, total) = samples
            .par_iter()
            .zip(log_weights.par_iter())
            .map(|(s, lw)| {
                let w = (lw - largest).exp();
                (w * s.energy, w)
            })
            .reduce(|| (0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1));
        weighted / total
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;
    use approx::assert_relative_eq;
    use nalgebra::{dvector, Vector1};
    use rand_distr::{Distribution, Normal};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gaussian(r: &[Vector1<f64>], p: &VarParams) -> f64 {
        (-0.5 * p[0] * r[0].x * r[0].x).exp()
    }

    /// Stand-in for a VMC run at α: exact draws from |ψ|², a normal distribution of
    /// variance 1/(2α), with the exact local energy α/2 + x²(1 − α²)/2.
    fn exact_samples(params: &VarParams, rng: &mut StdRng) -> Result<Vec<LocalEnergySample<1>>> {
        let alpha = params[0];
        let normal = Normal::new(0.0, (0.5 / alpha).sqrt()).unwrap();
        Ok((0..200)
            .map(|_| {
                let x = normal.sample(rng);
                LocalEnergySample {
                    energy: alpha / 2.0 + x * x * (1.0 - alpha * alpha) / 2.0,
                    positions: vec![Position::<1>::new(x)],
                }
            })
            .collect())
    }

    #[test]
    fn test_reweighting_with_zero_step_is_plain_mean() {
        let mut rng = StdRng::seed_from_u64(0);
        let params = dvector![0.7];
        let samples = exact_samples(&params, &mut rng).unwrap();
        let mean = energies(&samples).iter().sum::<f64>() / samples.len() as f64;
        let reweighted = reweighted_energies(&gaussian, &params, &samples, 0.0);
        assert_relative_eq!(reweighted[0], mean, epsilon = 1e-12);
    }

    #[test]
    fn test_reweighted_gradient_points_to_minimum() {
        let mut rng = StdRng::seed_from_u64(1);
        for (alpha, sign) in [(0.5, -1.0), (1.6, 1.0)] {
            let params = dvector![alpha];
            let samples = exact_samples(&params, &mut rng).unwrap();
            let up = reweighted_energies(&gaussian, &params, &samples, 1e-3);
            let down = reweighted_energies(&gaussian, &params, &samples, -1e-3);
            let slope = (up[0] - down[0]) / 2e-3;
            assert_eq!(slope.signum(), sign);
        }
    }

    #[test]
    fn test_descend_converges_on_exact_energies() {
        let descent = GradientDescent::default().with_error_method(ErrorMethod::Regular);
        let bounds = [Bound::new(0.1, 2.0).unwrap()];
        let mut rng = StdRng::seed_from_u64(2);
        let result = descent
            .descend(dvector![0.3], &bounds, &gaussian, &exact_samples, &mut rng)
            .unwrap();
        assert_relative_eq!(result.best_params[0], 1.0, epsilon = 0.02);
        assert_relative_eq!(result.energy, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_descend_rejects_bad_initial_params() {
        let descent = GradientDescent::default();
        let bounds = [Bound::new(0.1, 2.0).unwrap()];
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            descent.descend(dvector![3.0], &bounds, &gaussian, &exact_samples, &mut rng),
            Err(VmcError::ParameterOutOfBounds { index: 0, .. })
        ));
        assert!(matches!(
            descent.descend(dvector![0.5, 0.5], &bounds, &gaussian, &exact_samples, &mut rng),
            Err(VmcError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_iteration_cap_is_fatal() {
        let descent = GradientDescent::default().with_max_iterations(3);
        let bounds = [Bound::new(0.1, 2.0).unwrap()];
        let mut rng = StdRng::seed_from_u64(4);
        assert!(matches!(
            descent.descend(dvector![0.2], &bounds, &gaussian, &exact_samples, &mut rng),
            Err(VmcError::NotConverged { iterations: 3 })
        ));
    }

    #[test]
    fn test_parallel_walkers_stay_in_bounds() {
        let descent = GradientDescent::default()
            .with_n_walkers(3)
            .with_error_method(ErrorMethod::Regular);
        let bounds = [Bound::new(0.4, 1.8).unwrap()];
        let mut rng = StdRng::seed_from_u64(5);
        let result = descent
            .optimize(&bounds, &gaussian, &exact_samples, &mut rng)
            .unwrap();
        assert!(bounds[0].contains(result.best_params[0]));
        assert_relative_eq!(result.best_params[0], 1.0, epsilon = 0.02);
    }

    #[test]
    fn test_no_free_parameters_is_single_run() {
        let descent = GradientDescent::default().with_error_method(ErrorMethod::Regular);
        let fixed = |r: &[Vector1<f64>], _p: &VarParams| (-0.5 * r[0].x * r[0].x).exp();
        let sample_fn = |_p: &VarParams, rng: &mut StdRng| exact_samples(&dvector![1.0], rng);
        let mut rng = StdRng::seed_from_u64(6);
        let result = descent.optimize(&[], &fixed, &sample_fn, &mut rng).unwrap();
        assert_eq!(result.best_params.len(), 0);
        assert_relative_eq!(result.energy, 0.5, epsilon = 1e-12);
        assert_relative_eq!(result.std_dev, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_walkers_is_rejected() {
        let descent = GradientDescent::default().with_n_walkers(0);
        let bounds = [Bound::new(0.1, 2.0).unwrap()];
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            descent.optimize(&bounds, &gaussian, &exact_samples, &mut rng),
            Err(VmcError::InvalidWalkerCount(0))
        ));
    }

    #[test]
    fn test_reweighting_step_follows_momentum_norm() {
        let evaluated = Mutex::new(Vec::new());
        let recording = |r: &[Vector1<f64>], p: &VarParams| {
            evaluated.lock().unwrap().push(p[0]);
            gaussian(r, p)
        };
        let descent = GradientDescent::default().with_max_iterations(2);
        let bounds = [Bound::new(0.1, 2.0).unwrap()];
        let mut rng = StdRng::seed_from_u64(8);
        let _ = descent.descend(dvector![0.5], &bounds, &recording, &exact_samples, &mut rng);

        // first iteration: α₀ = 0.5 and α₀ ± ‖α₀‖/100
        let first = [0.5, 0.505, 0.495];
        let mut second: Vec<f64> = evaluated
            .into_inner()
            .unwrap()
            .into_iter()
            .filter(|a| first.iter().all(|b| (a - b).abs() > 1e-9))
            .collect();
        second.sort_by(f64::total_cmp);
        second.dedup();
        assert_eq!(second.len(), 3, "{second:?}");

        let (low, alpha, high) = (second[0], second[1], second[2]);
        let momentum = (alpha - 0.5) / descent.initial_multiplier;
        assert!(momentum > 0.0);
        assert_relative_eq!(high - alpha, momentum, epsilon = 1e-9);
        assert_relative_eq!(alpha - low, momentum, epsilon = 1e-9);
    }

    #[test]
    fn test_reweighting_survives_large_steps() {
        let samples: Vec<LocalEnergySample<1>> = [0.0, 1.0, 2.0, 3.0]
            .into_iter()
            .zip([1.0, 2.0, 3.0, 4.0])
            .map(|(x, energy)| LocalEnergySample {
                energy,
                positions: vec![Position::<1>::new(x)],
            })
            .collect();
        let params = dvector![1.0];
        // (ψ(α − 100) / ψ(α))² = exp(100 x²) overflows at x = 3
        let down = reweighted_energies(&gaussian, &params, &samples, -100.0);
        assert_relative_eq!(down[0], 4.0, epsilon = 1e-12);
        let up = reweighted_energies(&gaussian, &params, &samples, 100.0);
        assert_relative_eq!(up[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_settings_fail_before_sampling() {
        let calls = AtomicUsize::new(0);
        let counting = |p: &VarParams, rng: &mut StdRng| {
            calls.fetch_add(1, Ordering::SeqCst);
            exact_samples(p, rng)
        };
        let bounds = [Bound::new(0.1, 2.0).unwrap()];
        let mut rng = StdRng::seed_from_u64(9);

        for resamples in [0, 1] {
            let descent =
                GradientDescent::default().with_error_method(ErrorMethod::Bootstrap { resamples });
            assert!(matches!(
                descent.optimize(&bounds, &gaussian, &counting, &mut rng),
                Err(VmcError::InvalidResampleCount(r)) if r == resamples
            ));
            assert!(matches!(
                descent.optimize(&[], &gaussian, &counting, &mut rng),
                Err(VmcError::InvalidResampleCount(_))
            ));
        }
        for (descent, field) in [
            (GradientDescent::default().with_initial_multiplier(0.0), "initial_multiplier"),
            (GradientDescent::default().with_stopping_threshold(-1.0), "stopping_threshold"),
            (
                GradientDescent::default().with_grad_step_denominator(f64::NAN),
                "grad_step_denominator",
            ),
        ] {
            assert!(matches!(
                descent.optimize(&bounds, &gaussian, &counting, &mut rng),
                Err(VmcError::InvalidParameter { name, .. }) if name == field
            ));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
