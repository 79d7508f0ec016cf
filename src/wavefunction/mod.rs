//! Wavefunction module - capability traits supplied by the problem definition.

mod traits;

pub use traits::{AnalyticWfn, Potential, TrialWfn};
