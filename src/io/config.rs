use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VmcError};
use crate::sampling::{GradientDescent, VmcParams};
use crate::systems::HarmonicPotential;
use crate::types::Bound;

/// Markov-chain update used while sampling.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMethod {
    #[default]
    Metropolis,
    ImportanceSampling,
}

/// How local energies (and, for importance sampling, drift forces) are computed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyMethod {
    #[default]
    Analytic,
    Numeric { derivative_step: f64 },
}

fn default_resamples() -> usize {
    1000
}

/// Harmonic oscillator run read by the `vmc-qmc` binary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub system: HarmonicPotential,
    pub n_particles: usize,
    /// Spatial dimensions, 1 to 3
    pub dimensions: usize,
    /// Interval every coordinate is initialized in
    pub coordinate_bound: Bound,
    /// Search interval of α. Empty runs the exact ground state without optimization.
    #[serde(default)]
    pub param_bounds: Vec<Bound>,
    pub num_samples: usize,
    #[serde(default)]
    pub update: UpdateMethod,
    #[serde(default)]
    pub energy: EnergyMethod,
    #[serde(default)]
    pub descent: GradientDescent,
    #[serde(default = "default_resamples")]
    pub bootstrap_resamples: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub vmc: VmcParams,
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=3).contains(&self.dimensions) {
            return Err(VmcError::InvalidConfig(format!(
                "dimensions must be 1, 2 or 3, got {}",
                self.dimensions
            )));
        }
        if self.n_particles == 0 {
            return Err(VmcError::InvalidConfig("n_particles must be positive".into()));
        }
        if !(self.system.mass.is_finite() && self.system.mass > 0.0) {
            return Err(VmcError::InvalidMass(vec![self.system.mass]));
        }
        if self.param_bounds.len() > 1 {
            return Err(VmcError::DimensionMismatch {
                what: "parameter bounds",
                expected: 1,
                actual: self.param_bounds.len(),
            });
        }
        // every error method needs at least two samples
        if self.num_samples < 2 {
            return Err(VmcError::InsufficientSamples {
                required: 2,
                actual: self.num_samples,
            });
        }
        if self.bootstrap_resamples < 2 {
            return Err(VmcError::InvalidResampleCount(self.bootstrap_resamples));
        }
        if let EnergyMethod::Numeric { derivative_step } = self.energy {
            if !(derivative_step.is_finite() && derivative_step > 0.0) {
                return Err(VmcError::InvalidConfig(format!(
                    "derivative_step must be positive, got {derivative_step}"
                )));
            }
        }
        self.vmc.validate()?;
        self.descent.validate()
    }

    pub fn masses(&self) -> Vec<f64> {
        vec![self.system.mass; self.n_particles]
    }
}

/// Read and validate a YAML run configuration.
pub fn read_run_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let config: RunConfig = serde_yaml::from_reader(reader)?;
    config.validate()?;
    Ok(config)
}
