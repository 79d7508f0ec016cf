//! Local energy estimators.

use super::traits::LocalEnergy;
use crate::error::{Result, VmcError};
use crate::types::{Position, VarParams};
use crate::wavefunction::{AnalyticWfn, Potential, TrialWfn};

/// Kinetic prefactors and potential of the system: H = −(ħ²/2) Σ ∇ₙ²/mₙ + V.
#[derive(Clone, Debug)]
pub struct Hamiltonian<P> {
    potential: P,
    masses: Vec<f64>,
    hbar: f64,
}

impl<P> Hamiltonian<P> {
    pub fn new(potential: P, masses: Vec<f64>, hbar: f64) -> Result<Self> {
        if masses.is_empty() || masses.iter().any(|m| !(m.is_finite() && *m > 0.0)) {
            return Err(VmcError::InvalidMass(masses));
        }
        Ok(Self { potential, masses, hbar })
    }

    pub fn potential(&self) -> &P {
        &self.potential
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn n_particles(&self) -> usize {
        self.masses.len()
    }

    pub fn hbar(&self) -> f64 {
        self.hbar
    }

    /// Diffusion constant ħ²/(2m) of every particle.
    pub fn diffusion_constants(&self) -> Vec<f64> {
        self.masses
            .iter()
            .map(|m| self.hbar * self.hbar / (2.0 * m))
            .collect()
    }

    /// −(ħ²/2) Σ lapl[n]/m[n] / ψ + V(r)
    fn combine<const D: usize>(&self, laplacians: &[f64], psi: f64, r: &[Position<D>]) -> f64
    where
        P: Potential<D>,
    {
        let weighted: f64 = laplacians
            .iter()
            .zip(self.masses.iter())
            .map(|(l, m)| l / m)
            .sum();
        -(self.hbar * self.hbar / 2.0) * weighted / psi + self.potential.potential(r)
    }
}

/// Local energy from the wavefunction's analytic Laplacians.
#[derive(Copy, Clone, Debug, Default)]
pub struct AnalyticEnergy;

impl<const D: usize, W, P> LocalEnergy<D, W, P> for AnalyticEnergy
where
    W: AnalyticWfn<D>,
    P: Potential<D>,
{
    fn local_energy(
        &self,
        hamiltonian: &Hamiltonian<P>,
        wfn: &W,
        params: &VarParams,
        r: &[Position<D>],
    ) -> f64 {
        let laplacians = wfn.laplacian(r, params);
        hamiltonian.combine(&laplacians, wfn.evaluate(r, params), r)
    }
}

/// Local energy with Laplacians from central second differences of step `step`.
/// Truncation error is O(step²).
#[derive(Copy, Clone, Debug)]
pub struct NumericEnergy {
    pub step: f64,
}

impl NumericEnergy {
    pub fn new(step: f64) -> Self {
        Self { step }
    }
}

impl<const D: usize, W, P> LocalEnergy<D, W, P> for NumericEnergy
where
    W: TrialWfn<D>,
    P: Potential<D>,
{
    fn local_energy(
        &self,
        hamiltonian: &Hamiltonian<P>,
        wfn: &W,
        params: &VarParams,
        r: &[Position<D>],
    ) -> f64 {
        let laplacians = wfn.numerical_laplacian(r, params, self.step);
        hamiltonian.combine(&laplacians, wfn.evaluate(r, params), r)
    }
}
