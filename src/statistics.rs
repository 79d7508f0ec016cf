//! Error analysis of correlated local-energy sequences.
//!
//! Consecutive VMC samples are correlated, so the naive standard error underestimates
//! the true uncertainty. Blocking analysis and bootstrap resampling give more
//! trustworthy error bars.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VmcError};
use crate::types::{BlockingResult, BootstrapResult, ConfInterval};

/// Critical value of a two-sided 95% Gaussian confidence interval.
pub const Z_SCORE: f64 = 1.96;

/// How the error bar of an optimized energy is computed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMethod {
    /// Naive standard error, valid for uncorrelated samples.
    Regular,
    /// Largest block standard error over all block sizes.
    #[default]
    Blocking,
    /// Standard deviation of bootstrap resampled means.
    Bootstrap { resamples: usize },
}

/// Sequence of block sizes tried by blocking analysis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockGrowth {
    /// 1, 2, 4, 8, ...
    Doubling,
    /// 1, 1 + k, 1 + 2k, ...
    Linear(usize),
}

/// What happens to the trailing samples that do not fill a whole block.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Remainder {
    Discard,
    /// The trailing samples form one shorter block.
    Keep,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingOptions {
    pub growth: BlockGrowth,
    pub remainder: Remainder,
}

impl Default for BlockingOptions {
    fn default() -> Self {
        Self {
            growth: BlockGrowth::Doubling,
            remainder: Remainder::Discard,
        }
    }
}

fn require_samples(data: &[f64], required: usize) -> Result<()> {
    if data.len() < required {
        return Err(VmcError::InsufficientSamples {
            required,
            actual: data.len(),
        });
    }
    Ok(())
}

fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

/// Mean and naive standard error √(Σ(x − x̄)² / (M(M − 1))).
pub fn mean_and_error(data: &[f64]) -> Result<(f64, f64)> {
    require_samples(data, 2)?;
    let m = data.len() as f64;
    let avg = mean(data);
    let sum_sq: f64 = data.iter().map(|x| (x - avg).powi(2)).sum();
    Ok((avg, (sum_sq / (m * (m - 1.0))).sqrt()))
}

/// Blocking analysis with doubling block sizes and full blocks only.
pub fn blocking_analysis(data: &[f64]) -> Result<BlockingResult> {
    blocking_analysis_with(data, &BlockingOptions::default())
}

/// Blocking analysis over block sizes up to half the sample count.
///
/// For every block size the sequence is cut into contiguous blocks, and the mean and
/// standard error of the block means are recorded. The error grows with the block
/// size until blocks are longer than the autocorrelation time, then plateaus.
pub fn blocking_analysis_with(data: &[f64], options: &BlockingOptions) -> Result<BlockingResult> {
    require_samples(data, 2)?;
    let increment = match options.growth {
        BlockGrowth::Linear(0) => return Err(VmcError::InvalidBlockStep),
        BlockGrowth::Linear(k) => k,
        BlockGrowth::Doubling => 0,
    };

    let max_size = data.len() / 2;
    let mut result = BlockingResult::default();
    let mut size = 1;
    while size <= max_size {
        let block_means: Vec<f64> = match options.remainder {
            Remainder::Discard => data.chunks_exact(size).map(mean).collect(),
            Remainder::Keep => data.chunks(size).map(mean).collect(),
        };
        let n_blocks = block_means.len();
        let avg = mean(&block_means);
        let variance =
            block_means.iter().map(|b| (b - avg).powi(2)).sum::<f64>() / n_blocks as f64;

        result.sizes.push(size);
        result.n_blocks.push(n_blocks);
        result.means.push(avg);
        result.std_devs.push((variance / (n_blocks - 1) as f64).sqrt());

        size = match options.growth {
            BlockGrowth::Doubling => size * 2,
            BlockGrowth::Linear(_) => size + increment,
        };
    }
    Ok(result)
}

/// Bootstrap estimate of the mean and its uncertainty from `resamples` resamples.
pub fn bootstrap_analysis<R: Rng + ?Sized>(
    data: &[f64],
    resamples: usize,
    rng: &mut R,
) -> Result<BootstrapResult> {
    if resamples < 2 {
        return Err(VmcError::InvalidResampleCount(resamples));
    }
    require_samples(data, 2)?;

    let m = data.len();
    let resampled_means: Vec<f64> = (0..resamples)
        .map(|_| (0..m).map(|_| data[rng.gen_range(0..m)]).sum::<f64>() / m as f64)
        .collect();

    let avg = mean(&resampled_means);
    let variance = resampled_means
        .iter()
        .map(|x| (x - avg).powi(2))
        .sum::<f64>()
        / (resamples - 1) as f64;
    let std_dev = variance.sqrt();

    Ok(BootstrapResult {
        mean: avg,
        std_dev,
        conf_interval: ConfInterval {
            min: avg - Z_SCORE * std_dev,
            max: avg + Z_SCORE * std_dev,
        },
    })
}

/// Error bar on the mean of `data` computed with `method`.
pub fn error_on_mean<R: Rng + ?Sized>(
    data: &[f64],
    method: ErrorMethod,
    rng: &mut R,
) -> Result<f64> {
    match method {
        ErrorMethod::Regular => mean_and_error(data).map(|(_, err)| err),
        ErrorMethod::Blocking => {
            let blocking = blocking_analysis(data)?;
            Ok(blocking.std_devs.iter().copied().fold(0.0, f64::max))
        }
        ErrorMethod::Bootstrap { resamples } => {
            bootstrap_analysis(data, resamples, rng).map(|b| b.std_dev)
        }
    }
}
