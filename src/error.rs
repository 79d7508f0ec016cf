//! Error type shared by the sampling, optimization and statistics layers.
//!
//! Every variant is fatal for the run that produced it: nothing in the crate retries.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmcError {
    #[error("invalid bound: lower {lower} is greater than upper {upper}")]
    InvalidBound { lower: f64, upper: f64 },

    #[error("sample count must be positive, got {0}")]
    InvalidSampleCount(usize),

    #[error("resample count must be greater than one, got {0}")]
    InvalidResampleCount(usize),

    #[error("at least {required} samples are needed, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },

    #[error("walker count must be positive, got {0}")]
    InvalidWalkerCount(usize),

    #[error("block size increment must be positive")]
    InvalidBlockStep,

    #[error("parameter {index} = {value} lies outside its search bound")]
    ParameterOutOfBounds { index: usize, value: f64 },

    #[error("particle masses must be finite and positive, got {0:?}")]
    InvalidMass(Vec<f64>),

    #[error("{what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("no configuration with wavefunction above {floor} among {points} trial points")]
    NoStartingPoint { floor: f64, points: usize },

    #[error("non-finite value encountered in {0}")]
    NonFinite(&'static str),

    #[error("gradient descent failed to converge after {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("{name} = {value} is out of range")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("invalid run configuration: {0}")]
    InvalidConfig(String),

    #[error("configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VmcError>;
