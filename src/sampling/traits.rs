//! Traits for Monte Carlo sampling.

use rand::Rng;

use super::energy::Hamiltonian;
use super::vmc::VmcParams;
use crate::types::{Configuration, Position, VarParams};

/// Markov-chain update policy whose stationary distribution is |ψ|².
pub trait Sampler<const D: usize, W> {
    /// Attempt to move every particle once, in order. Rejected moves restore the
    /// particle's previous position exactly. Returns the number of accepted moves.
    fn sweep<R: Rng + ?Sized>(
        &mut self,
        wfn: &W,
        params: &VarParams,
        r: &mut Configuration<D>,
        rng: &mut R,
    ) -> usize;

    /// Adjust the proposal after a sample, given the acceptance rate observed
    /// over the decorrelation sweeps.
    fn adapt(&mut self, _acceptance_rate: f64, _config: &VmcParams) {}
}

/// Drift force F = 2∇ψ/ψ of one particle.
pub trait DriftForce<const D: usize, W> {
    fn drift(&self, wfn: &W, params: &VarParams, r: &[Position<D>], particle: usize) -> Position<D>;
}

/// Local energy estimator E_L = Hψ/ψ.
pub trait LocalEnergy<const D: usize, W, P> {
    fn local_energy(
        &self,
        hamiltonian: &Hamiltonian<P>,
        wfn: &W,
        params: &VarParams,
        r: &[Position<D>],
    ) -> f64;
}
