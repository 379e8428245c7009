//! Dispersion-based probe filtering.
//!
//! Probes with little spread across samples carry little discriminative
//! signal. This filter keeps only the most dispersed probes, measured by the
//! interquartile range (IQR).

use crate::data::BetaMatrix;
use crate::error::{MethylError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Sample quantile with linear interpolation between order statistics
/// (Hyndman & Fan type 7, the R default).
///
/// Returns `NaN` for an empty slice.
pub fn quantile(values: &[f64], prob: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile_sorted(&sorted, prob)
}

fn quantile_sorted(sorted: &[f64], prob: f64) -> f64 {
    let n = sorted.len();
    let h = (n - 1) as f64 * prob.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Median; the midpoint of the two middle values for even lengths.
pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5)
}

/// Interquartile range (Q3 - Q1, type 7 quantiles).
pub fn iqr(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile_sorted(&sorted, 0.75) - quantile_sorted(&sorted, 0.25)
}

/// Result of variance filtering with statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceFilterResult {
    /// Retention quantile requested.
    pub quantile: f64,
    /// IQR threshold; probes at or above it were kept.
    pub threshold: f64,
    /// Number of probes before filtering.
    pub n_before: usize,
    /// Number of probes after filtering.
    pub n_after: usize,
    /// Column indices (into the input matrix) of the kept probes.
    pub kept: Vec<usize>,
}

/// Keep probes whose IQR lies in the top `1 - quantile` of all probes.
///
/// With `m` probes the threshold is the `ceil((1 - quantile) * m)`-th largest
/// IQR and every probe whose IQR is greater than or equal to it is kept. When
/// IQRs are distinct exactly `ceil((1 - quantile) * m)` probes survive; ties
/// at the threshold are all retained. Column order is preserved.
///
/// # Arguments
/// * `betas` - Sample × probe beta matrix without missing values
/// * `quantile` - Retention cutoff in [0, 1), e.g. 0.95
pub fn filter_variance(
    betas: &BetaMatrix,
    quantile: f64,
) -> Result<(BetaMatrix, VarianceFilterResult)> {
    if !(0.0..1.0).contains(&quantile) {
        return Err(MethylError::InvalidParameter(
            "Variance quantile must be in [0, 1)".to_string(),
        ));
    }
    let n_probes = betas.n_probes();
    if n_probes == 0 {
        return Err(MethylError::EmptyData("No probes to filter".to_string()));
    }
    if betas.has_missing() {
        return Err(MethylError::InvalidParameter(
            "Variance filtering requires a matrix without missing values".to_string(),
        ));
    }

    let dispersions: Vec<f64> = (0..n_probes)
        .into_par_iter()
        .map(|col| iqr(&betas.column(col)))
        .collect();

    // Subtract a tiny epsilon so 0.05 * 100 stays 5 despite rounding.
    let n_keep = ((((1.0 - quantile) * n_probes as f64) - 1e-9).ceil() as usize).clamp(1, n_probes);

    let mut sorted = dispersions.clone();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let threshold = sorted[n_keep - 1];

    let kept: Vec<usize> = dispersions
        .iter()
        .enumerate()
        .filter(|(_, d)| **d >= threshold)
        .map(|(i, _)| i)
        .collect();

    let filtered = betas.subset_probes(&kept)?;
    let stats = VarianceFilterResult {
        quantile,
        threshold,
        n_before: n_probes,
        n_after: kept.len(),
        kept,
    };
    Ok((filtered, stats))
}
