//! Systems module - reference problem definitions.

mod harmonic;

pub use harmonic::{FixedGaussianWfn, GaussianWfn, HarmonicPotential};
