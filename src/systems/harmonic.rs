//! Isotropic harmonic oscillator: N particles in D dimensions.
//!
//! Exact ground state for mass m and angular frequency ω:
//!   ψ₀ = exp(−α Σ|xₙ|² / 2), α = mω/ħ, E₀ = N·D·ħω/2

use serde::{Deserialize, Serialize};

use crate::types::{Configuration, Position, VarParams};
use crate::wavefunction::{AnalyticWfn, Potential, TrialWfn};

/// V(R) = ½ m ω² Σ|xₙ|²
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HarmonicPotential {
    pub mass: f64,
    pub omega: f64,
}

impl HarmonicPotential {
    pub fn new(mass: f64, omega: f64) -> Self {
        Self { mass, omega }
    }

    /// Variational parameter of the exact Gaussian ground state.
    pub fn exact_alpha(&self, hbar: f64) -> f64 {
        self.mass * self.omega / hbar
    }

    pub fn ground_state_energy(&self, hbar: f64, n_particles: usize, dim: usize) -> f64 {
        0.5 * hbar * self.omega * (n_particles * dim) as f64
    }
}

impl<const D: usize> Potential<D> for HarmonicPotential {
    fn potential(&self, r: &[Position<D>]) -> f64 {
        0.5 * self.mass * self.omega * self.omega * r.iter().map(|x| x.norm_squared()).sum::<f64>()
    }
}

fn gaussian<const D: usize>(r: &[Position<D>], alpha: f64) -> f64 {
    (-0.5 * alpha * r.iter().map(|x| x.norm_squared()).sum::<f64>()).exp()
}

fn gaussian_derivative<const D: usize>(r: &[Position<D>], alpha: f64) -> Configuration<D> {
    let psi = gaussian(r, alpha);
    r.iter().map(|x| x * (-alpha * psi)).collect()
}

fn gaussian_laplacian<const D: usize>(r: &[Position<D>], alpha: f64) -> Vec<f64> {
    let psi = gaussian(r, alpha);
    r.iter()
        .map(|x| (alpha * alpha * x.norm_squared() - D as f64 * alpha) * psi)
        .collect()
}

/// Gaussian trial wavefunction with α = `params[0]`.
#[derive(Copy, Clone, Debug, Default)]
pub struct GaussianWfn;

impl<const D: usize> TrialWfn<D> for GaussianWfn {
    fn evaluate(&self, r: &[Position<D>], params: &VarParams) -> f64 {
        gaussian(r, params[0])
    }
}

impl<const D: usize> AnalyticWfn<D> for GaussianWfn {
    fn derivative(&self, r: &[Position<D>], params: &VarParams) -> Configuration<D> {
        gaussian_derivative(r, params[0])
    }

    fn laplacian(&self, r: &[Position<D>], params: &VarParams) -> Vec<f64> {
        gaussian_laplacian(r, params[0])
    }
}

/// Gaussian wavefunction without free parameters.
#[derive(Copy, Clone, Debug)]
pub struct FixedGaussianWfn {
    pub alpha: f64,
}

impl FixedGaussianWfn {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    pub fn ground_state(potential: &HarmonicPotential, hbar: f64) -> Self {
        Self::new(potential.exact_alpha(hbar))
    }
}

impl<const D: usize> TrialWfn<D> for FixedGaussianWfn {
    fn evaluate(&self, r: &[Position<D>], _params: &VarParams) -> f64 {
        gaussian(r, self.alpha)
    }
}

impl<const D: usize> AnalyticWfn<D> for FixedGaussianWfn {
    fn derivative(&self, r: &[Position<D>], _params: &VarParams) -> Configuration<D> {
        gaussian_derivative(r, self.alpha)
    }

    fn laplacian(&self, r: &[Position<D>], _params: &VarParams) -> Vec<f64> {
        gaussian_laplacian(r, self.alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{dvector, DVector, Vector1, Vector3};

    #[test]
    fn test_potential_value() {
        let pot = HarmonicPotential::new(2.0, 3.0);
        let r = vec![Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 1.0)];
        // 0.5 * 2 * 9 * 3
        assert_relative_eq!(Potential::<3>::potential(&pot, &r), 27.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gaussian_derivatives_match_numerical() {
        let wfn = GaussianWfn;
        let r = vec![Vector3::new(0.3, -0.4, 0.1), Vector3::new(-0.2, 0.5, 0.7)];
        let params = dvector![1.3];
        let h = 1e-5;

        let analytical_grad = AnalyticWfn::<3>::derivative(&wfn, &r, &params);
        let numerical_grad = TrialWfn::<3>::numerical_derivative(&wfn, &r, &params, h);
        for i in 0..r.len() {
            assert_relative_eq!(analytical_grad[i].x, numerical_grad[i].x, epsilon = 1e-6);
            assert_relative_eq!(analytical_grad[i].y, numerical_grad[i].y, epsilon = 1e-6);
            assert_relative_eq!(analytical_grad[i].z, numerical_grad[i].z, epsilon = 1e-6);
        }

        let analytical_laplacian = AnalyticWfn::<3>::laplacian(&wfn, &r, &params);
        let numerical_laplacian = TrialWfn::<3>::numerical_laplacian(&wfn, &r, &params, 1e-4);
        for i in 0..r.len() {
            assert_relative_eq!(analytical_laplacian[i], numerical_laplacian[i], epsilon = 1e-5);
        }
    }

    #[test]
    fn test_fixed_gaussian_ignores_params() {
        let pot = HarmonicPotential::new(1.0, 2.0);
        let fixed = FixedGaussianWfn::ground_state(&pot, 1.0);
        let r = vec![Vector1::new(0.7)];
        let none: VarParams = DVector::zeros(0);
        assert_relative_eq!(
            TrialWfn::<1>::evaluate(&fixed, &r, &none),
            TrialWfn::<1>::evaluate(&GaussianWfn, &r, &dvector![2.0]),
            epsilon = 1e-14
        );
    }

    #[test]
    fn test_ground_state_energy() {
        let pot = HarmonicPotential::new(1.0, 1.0);
        assert_relative_eq!(pot.ground_state_energy(1.0, 1, 1), 0.5);
        assert_relative_eq!(pot.ground_state_energy(1.0, 2, 3), 3.0);
    }
}
