//! VMC QMC - Variational Monte Carlo in Rust
//!
//! This crate samples |ψ|² of a parametrized trial wavefunction with Metropolis or
//! importance-sampling updates, estimates the energy from local energies, optimizes
//! the variational parameters by reweighted gradient descent and attaches blocking
//! or bootstrap error bars to the result.

pub mod error;
pub mod io;
pub mod sampling;
pub mod statistics;
pub mod systems;
pub mod types;
pub mod wavefunction;

// Re-export commonly used types at crate root
pub use error::{Result, VmcError};
pub use sampling::{
    AnalyticEnergy, GradientDescent, Hamiltonian, ImportanceSampling, Metropolis, NumericEnergy,
    VmcParams, VmcSimulation,
};
pub use statistics::{
    blocking_analysis, blocking_analysis_with, bootstrap_analysis, error_on_mean, mean_and_error,
    BlockingOptions, ErrorMethod,
};
pub use types::{
    BlockingResult, BootstrapResult, Bound, Configuration, LocalEnergySample, Position, VarParams,
    VmcResult,
};
pub use wavefunction::{AnalyticWfn, Potential, TrialWfn};
