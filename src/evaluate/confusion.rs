//! Confusion matrix and derived rates with Primary Tumor as the positive class.

use crate::data::TissueType;
use crate::error::{MethylError, Result};
use serde::{Deserialize, Serialize};

/// Counts of a binary classification against the truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Tumor predicted as tumor.
    pub true_positives: usize,
    /// Normal predicted as tumor.
    pub false_positives: usize,
    /// Tumor predicted as normal.
    pub false_negatives: usize,
    /// Normal predicted as normal.
    pub true_negatives: usize,
}

impl ConfusionMatrix {
    /// Tabulate predictions against the true labels, position by position.
    pub fn from_predictions(predicted: &[TissueType], truth: &[TissueType]) -> Result<Self> {
        if predicted.len() != truth.len() {
            return Err(MethylError::DimensionMismatch {
                expected: truth.len(),
                actual: predicted.len(),
            });
        }

        let mut cm = Self::default();
        for (p, t) in predicted.iter().zip(truth) {
            match (p.is_positive(), t.is_positive()) {
                (true, true) => cm.true_positives += 1,
                (true, false) => cm.false_positives += 1,
                (false, true) => cm.false_negatives += 1,
                (false, false) => cm.true_negatives += 1,
            }
        }
        Ok(cm)
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.false_negatives + self.true_negatives
    }

    /// TP / (TP + FP); NaN when nothing was predicted positive.
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// TN / (TN + FP); NaN without true negatives in the truth.
    pub fn specificity(&self) -> f64 {
        ratio(self.true_negatives, self.true_negatives + self.false_positives)
    }

    /// TP / (TP + FN); NaN without positives in the truth.
    pub fn sensitivity(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        f64::NAN
    } else {
        numerator as f64 / denominator as f64
    }
}

impl std::fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "                 truth: Tumor  Normal")?;
        writeln!(
            f,
            "  predicted Tumor   {:>8}  {:>6}",
            self.true_positives, self.false_positives
        )?;
        writeln!(
            f,
            "  predicted Normal  {:>8}  {:>6}",
            self.false_negatives, self.true_negatives
        )?;
        writeln!(f, "  Precision:   {:.3}", self.precision())?;
        writeln!(f, "  Specificity: {:.3}", self.specificity())?;
        write!(f, "  Sensitivity: {:.3}", self.sensitivity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use TissueType::{PrimaryTumor as T, SolidTissueNormal as N};

    #[test]
    fn test_perfect_classifier() {
        let truth: Vec<TissueType> = [vec![T; 10], vec![N; 10]].concat();
        let cm = ConfusionMatrix::from_predictions(&truth, &truth).unwrap();
        assert_eq!(cm.true_positives, 10);
        assert_eq!(cm.true_negatives, 10);
        assert_eq!(cm.precision(), 1.0);
        assert_eq!(cm.specificity(), 1.0);
        assert_eq!(cm.sensitivity(), 1.0);
    }

    #[test]
    fn test_one_missed_tumor() {
        let truth: Vec<TissueType> = [vec![T; 10], vec![N; 10]].concat();
        let mut predicted = truth.clone();
        predicted[0] = N;
        let cm = ConfusionMatrix::from_predictions(&predicted, &truth).unwrap();
        assert_eq!(cm.false_negatives, 1);
        assert_relative_eq!(cm.sensitivity(), 0.9);
        assert_relative_eq!(cm.precision(), 1.0);
        assert_relative_eq!(cm.accuracy(), 0.95);
    }

    #[test]
    fn test_undefined_rates_are_nan() {
        // No predicted positives and no negatives in the truth.
        let cm = ConfusionMatrix::from_predictions(&[N, N], &[T, T]).unwrap();
        assert!(cm.precision().is_nan());
        assert!(cm.specificity().is_nan());
        assert_eq!(cm.sensitivity(), 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(ConfusionMatrix::from_predictions(&[T], &[T, N]).is_err());
    }
}
