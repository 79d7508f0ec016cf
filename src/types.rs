//! Data model: configurations, bounds and the results produced by a run.

use nalgebra::{DVector, SVector};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VmcError};

/// Position of a single particle in `D` dimensions.
pub type Position<const D: usize> = SVector<f64, D>;

/// Positions of all particles at one instant.
pub type Configuration<const D: usize> = Vec<Position<D>>;

/// Free parameters of the trial wavefunction.
pub type VarParams = DVector<f64>;

/// Closed interval `[lower, upper]`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Bound {
    lower: f64,
    upper: f64,
}

impl Bound {
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        // also rejects NaN endpoints
        if !(lower <= upper) || !lower.is_finite() || !upper.is_finite() {
            return Err(VmcError::InvalidBound { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn length(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn center(&self) -> f64 {
        0.5 * (self.lower + self.upper)
    }

    pub fn contains(&self, x: f64) -> bool {
        self.lower <= x && x <= self.upper
    }

    /// Maps `u` in `[0, 1)` linearly onto the interval.
    pub fn lerp(&self, u: f64) -> f64 {
        self.lower + self.length() * u
    }
}

impl<'de> Deserialize<'de> for Bound {
    fn deserialize<De>(deserializer: De) -> std::result::Result<Self, De::Error>
    where
        De: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            lower: f64,
            upper: f64,
        }
        let raw = Raw::deserialize(deserializer)?;
        Bound::new(raw.lower, raw.upper).map_err(serde::de::Error::custom)
    }
}

/// Local energy together with the configuration it was evaluated at.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalEnergySample<const D: usize> {
    pub energy: f64,
    pub positions: Configuration<D>,
}

/// Energy estimate of an optimized run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VmcResult {
    pub energy: f64,
    /// Standard deviation of the energy estimate
    pub std_dev: f64,
    pub best_params: VarParams,
}

/// One row per tested block size.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BlockingResult {
    pub sizes: Vec<usize>,
    pub n_blocks: Vec<usize>,
    pub means: Vec<f64>,
    pub std_devs: Vec<f64>,
}

impl BlockingResult {
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ConfInterval {
    pub min: f64,
    pub max: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct BootstrapResult {
    pub mean: f64,
    pub std_dev: f64,
    pub conf_interval: ConfInterval,
}

/// Local energies of a sample sequence, in order.
pub fn energies<const D: usize>(samples: &[LocalEnergySample<D>]) -> Vec<f64> {
    samples.iter().map(|s| s.energy).collect()
}
