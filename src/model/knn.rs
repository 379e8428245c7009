//! k-Nearest-Neighbor classification by Euclidean distance.

use crate::data::{BetaMatrix, TissueType};
use crate::error::{MethylError, Result};
use crate::model::Classifier;
use rayon::prelude::*;

/// A k-NN classifier: the stored training set and the neighbor count.
///
/// Ties are resolved deterministically:
/// - neighbors are ranked by (distance, training row index);
/// - if classes tie in vote count, the class of the nearest neighbor among the
///   tied classes wins.
#[derive(Debug, Clone)]
pub struct KnnClassifier {
    train: BetaMatrix,
    labels: Vec<TissueType>,
    k: usize,
}

impl KnnClassifier {
    /// Store the training set. `k` larger than the training set is clamped.
    pub fn fit(train: &BetaMatrix, labels: &[TissueType], k: usize) -> Result<Self> {
        if labels.len() != train.n_samples() {
            return Err(MethylError::DimensionMismatch {
                expected: train.n_samples(),
                actual: labels.len(),
            });
        }
        if k == 0 {
            return Err(MethylError::InvalidParameter("k must be positive".to_string()));
        }
        if train.n_samples() == 0 {
            return Err(MethylError::EmptyData("Empty training set".to_string()));
        }
        Ok(Self {
            train: train.clone(),
            labels: labels.to_vec(),
            k: k.min(train.n_samples()),
        })
    }

    /// Effective neighbor count.
    pub fn k(&self) -> usize {
        self.k
    }

    fn classify(&self, query: &[f64]) -> TissueType {
        let mut neighbors: Vec<(f64, usize)> = (0..self.train.n_samples())
            .map(|i| {
                let d2: f64 = query
                    .iter()
                    .enumerate()
                    .map(|(j, q)| (q - self.train.get(i, j)).powi(2))
                    .sum();
                (d2, i)
            })
            .collect();
        neighbors.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        neighbors.truncate(self.k);

        let votes = |class: TissueType| {
            neighbors
                .iter()
                .filter(|(_, i)| self.labels[*i] == class)
                .count()
        };
        let tumor = votes(TissueType::PrimaryTumor);
        let normal = votes(TissueType::SolidTissueNormal);

        match tumor.cmp(&normal) {
            std::cmp::Ordering::Greater => TissueType::PrimaryTumor,
            std::cmp::Ordering::Less => TissueType::SolidTissueNormal,
            // Nearest neighbor decides.
            std::cmp::Ordering::Equal => self.labels[neighbors[0].1],
        }
    }
}

impl Classifier for KnnClassifier {
    fn predict(&self, x: &BetaMatrix) -> Result<Vec<TissueType>> {
        if x.probe_ids() != self.train.probe_ids() {
            return Err(MethylError::InvalidParameter(
                "Test probes must match the training probes".to_string(),
            ));
        }
        Ok((0..x.n_samples())
            .into_par_iter()
            .map(|i| self.classify(&x.row(i)))
            .collect())
    }
}

/// Classify `test` rows by majority vote among their `k` nearest `train` rows.
pub fn knn(
    train: &BetaMatrix,
    test: &BetaMatrix,
    labels: &[TissueType],
    k: usize,
) -> Result<Vec<TissueType>> {
    KnnClassifier::fit(train, labels, k)?.predict(test)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn matrix(rows: &[&[f64]], prefix: &str) -> BetaMatrix {
        let n = rows.len();
        let p = rows[0].len();
        let flat: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        BetaMatrix::new(
            DMatrix::from_row_slice(n, p, &flat),
            (0..n).map(|i| format!("{}{}", prefix, i)).collect(),
            (0..p).map(|j| format!("cg{}", j)).collect(),
        )
        .unwrap()
    }

    use TissueType::{PrimaryTumor as T, SolidTissueNormal as N};

    #[test]
    fn test_majority_vote() {
        let train = matrix(&[&[0.1], &[0.15], &[0.2], &[0.8], &[0.85], &[0.9]], "tr");
        let labels = [N, N, N, T, T, T];
        let test = matrix(&[&[0.12], &[0.88]], "te");
        let predicted = knn(&train, &test, &labels, 3).unwrap();
        assert_eq!(predicted, vec![N, T]);
    }

    #[test]
    fn test_vote_tie_goes_to_nearest() {
        // k = 4 with two votes each; the closest neighbor is tumor.
        let train = matrix(&[&[0.50], &[0.40], &[0.62], &[0.35]], "tr");
        let labels = [T, N, T, N];
        let test = matrix(&[&[0.5]], "te");
        let classifier = KnnClassifier::fit(&train, &labels, 4).unwrap();
        assert_eq!(classifier.predict(&test).unwrap(), vec![T]);

        let flipped = [N, T, N, T];
        let classifier = KnnClassifier::fit(&train, &flipped, 4).unwrap();
        assert_eq!(classifier.predict(&test).unwrap(), vec![N]);
    }

    #[test]
    fn test_equidistant_neighbors_ranked_by_index() {
        // Rows 0 and 1 are equally distant; row 0 wins the tie.
        let train = matrix(&[&[0.4], &[0.6]], "tr");
        let test = matrix(&[&[0.5]], "te");
        assert_eq!(knn(&train, &test, &[N, T], 2).unwrap(), vec![N]);
        assert_eq!(knn(&train, &test, &[T, N], 2).unwrap(), vec![T]);
    }

    #[test]
    fn test_k9_repeatable_with_ties() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64 / 10.0, 0.5]).collect();
        let refs: Vec<&[f64]> = rows.iter().map(|r| r.as_slice()).collect();
        let train = matrix(&refs, "tr");
        let labels: Vec<TissueType> = (0..10).map(|i| if i % 2 == 0 { T } else { N }).collect();
        let test = matrix(&[&[0.45, 0.5]], "te");

        let first = knn(&train, &test, &labels, 9).unwrap();
        let second = knn(&train, &test, &labels, 9).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_k_clamped_and_validated() {
        let train = matrix(&[&[0.1], &[0.9]], "tr");
        let classifier = KnnClassifier::fit(&train, &[N, T], 9).unwrap();
        assert_eq!(classifier.k(), 2);
        assert!(KnnClassifier::fit(&train, &[N], 1).is_err());
        assert!(KnnClassifier::fit(&train, &[N, T], 0).is_err());
    }
}
