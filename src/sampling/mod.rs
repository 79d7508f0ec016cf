//! Sampling module - Monte Carlo updates, local energies, the VMC loop and the optimizer.

mod energy;
mod optimize;
mod traits;
mod update;
mod vmc;

pub use energy::{AnalyticEnergy, Hamiltonian, NumericEnergy};
pub use optimize::{reweighted_energies, GradientDescent};
pub use traits::{DriftForce, LocalEnergy, Sampler};
pub use update::{AnalyticDrift, ImportanceSampling, Metropolis, NumericDrift};
pub use vmc::{no_params, VmcParams, VmcSimulation};
