//! Removal of samples with missing probe measurements.

use crate::data::BetaMatrix;
use crate::error::{MethylError, Result};
use serde::{Deserialize, Serialize};

/// Result of missing-value filtering with statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteCasesResult {
    /// Number of samples before filtering.
    pub n_before: usize,
    /// Number of samples after filtering.
    pub n_after: usize,
    /// Identifiers of the dropped samples.
    pub dropped: Vec<String>,
}

impl CompleteCasesResult {
    pub fn n_dropped(&self) -> usize {
        self.dropped.len()
    }
}

impl std::fmt::Display for CompleteCasesResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Complete Cases")?;
        writeln!(f, "  Before:    {} samples", self.n_before)?;
        writeln!(f, "  After:     {} samples", self.n_after)?;
        writeln!(f, "  Dropped:   {} samples", self.n_dropped())?;
        Ok(())
    }
}

/// Drop every sample (row) that has a missing value in any probe.
///
/// Rows are removed entirely, never imputed. The returned matrix contains no
/// `NaN`; the statistics record which samples were lost.
pub fn drop_incomplete_rows(betas: &BetaMatrix) -> Result<(BetaMatrix, CompleteCasesResult)> {
    let (keep, dropped): (Vec<usize>, Vec<usize>) =
        (0..betas.n_samples()).partition(|&row| !betas.row_has_missing(row));

    if keep.is_empty() {
        return Err(MethylError::EmptyData(
            "Every sample has at least one missing probe value".to_string(),
        ));
    }

    let stats = CompleteCasesResult {
        n_before: betas.n_samples(),
        n_after: keep.len(),
        dropped: dropped
            .iter()
            .map(|&i| betas.sample_ids()[i].clone())
            .collect(),
    };
    Ok((betas.subset_samples(&keep)?, stats))
}

/// Remove probes missing in more than `max_missing` (a fraction) of samples.
///
/// Returns the filtered matrix and the number of probes removed. Applied
/// before [`drop_incomplete_rows`] on array data where a handful of failed
/// probes would otherwise take every sample with them.
pub fn drop_sparse_probes(betas: &BetaMatrix, max_missing: f64) -> Result<(BetaMatrix, usize)> {
    if !(0.0..=1.0).contains(&max_missing) {
        return Err(MethylError::InvalidParameter(
            "max_missing must be in [0, 1]".to_string(),
        ));
    }
    let n = betas.n_samples() as f64;
    let keep: Vec<usize> = (0..betas.n_probes())
        .filter(|&col| {
            let missing = betas.column(col).iter().filter(|v| v.is_nan()).count();
            missing as f64 <= max_missing * n
        })
        .collect();
    if keep.is_empty() {
        return Err(MethylError::EmptyData(
            "Every probe exceeds the missing-value limit".to_string(),
        ));
    }
    let removed = betas.n_probes() - keep.len();
    Ok((betas.subset_probes(&keep)?, removed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    #[test]
    fn test_drops_rows_with_any_missing() {
        let data = DMatrix::from_row_slice(
            4,
            3,
            &[
                0.1, 0.2, 0.3, //
                0.4, f64::NAN, 0.6, //
                0.7, 0.8, 0.9, //
                f64::NAN, f64::NAN, f64::NAN,
            ],
        );
        let betas = BetaMatrix::new(data, ids("s", 4), ids("cg", 3)).unwrap();

        let (complete, stats) = drop_incomplete_rows(&betas).unwrap();
        assert_eq!(complete.n_samples(), 2);
        assert_eq!(complete.sample_ids(), &["s0".to_string(), "s2".to_string()]);
        assert!(!complete.has_missing());
        assert_eq!(stats.n_dropped(), 2);
        assert_eq!(stats.dropped, vec!["s1".to_string(), "s3".to_string()]);
    }

    #[test]
    fn test_sparse_probes_removed_first() {
        let data = DMatrix::from_row_slice(
            3,
            3,
            &[
                0.1, f64::NAN, 0.3, //
                0.4, f64::NAN, 0.6, //
                0.7, 0.8, f64::NAN,
            ],
        );
        let betas = BetaMatrix::new(data, ids("s", 3), ids("cg", 3)).unwrap();
        let (probes, removed) = drop_sparse_probes(&betas, 0.5).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(probes.probe_ids(), &["cg0".to_string(), "cg2".to_string()]);

        let (complete, stats) = drop_incomplete_rows(&probes).unwrap();
        assert_eq!(complete.n_samples(), 2);
        assert_eq!(stats.dropped, vec!["s2".to_string()]);
        assert!(drop_sparse_probes(&betas, 1.5).is_err());
    }

    #[test]
    fn test_all_missing_is_error() {
        let data = DMatrix::from_element(2, 2, f64::NAN);
        let betas = BetaMatrix::new(data, ids("s", 2), ids("cg", 2)).unwrap();
        assert!(matches!(
            drop_incomplete_rows(&betas),
            Err(MethylError::EmptyData(_))
        ));
    }
}
