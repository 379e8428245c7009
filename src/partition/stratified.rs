//! Stratified train/test partitioning.

use crate::data::TissueType;
use crate::error::{MethylError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Disjoint train/test row indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Training rows, ascending.
    pub train: Vec<usize>,
    /// Held-out rows, ascending.
    pub test: Vec<usize>,
}

impl Partition {
    pub fn n_train(&self) -> usize {
        self.train.len()
    }

    pub fn n_test(&self) -> usize {
        self.test.len()
    }

    /// Pick the labels of the given rows.
    pub fn select<T: Clone>(indices: &[usize], values: &[T]) -> Vec<T> {
        indices.iter().map(|&i| values[i].clone()).collect()
    }
}

/// Split rows into train and test sets, preserving class proportions.
///
/// Each class is shuffled independently with a ChaCha8 generator seeded from
/// `seed`, and `round(train_fraction * n_class)` of its rows go to training.
/// The same labels, fraction and seed always give the same partition.
pub fn stratified_split(
    labels: &[TissueType],
    train_fraction: f64,
    seed: u64,
) -> Result<Partition> {
    if !(0.0 < train_fraction && train_fraction < 1.0) {
        return Err(MethylError::InvalidParameter(
            "train_fraction must be in (0, 1)".to_string(),
        ));
    }
    if labels.is_empty() {
        return Err(MethylError::EmptyData("No samples to partition".to_string()));
    }

    let mut by_class: BTreeMap<TissueType, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        by_class.entry(*label).or_default().push(i);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for indices in by_class.values_mut() {
        indices.shuffle(&mut rng);
        let n_train = (train_fraction * indices.len() as f64).round() as usize;
        train.extend_from_slice(&indices[..n_train]);
        test.extend_from_slice(&indices[n_train..]);
    }

    train.sort_unstable();
    test.sort_unstable();

    if train.is_empty() || test.is_empty() {
        return Err(MethylError::EmptyData(format!(
            "Partition of {} samples left an empty train or test set",
            labels.len()
        )));
    }

    Ok(Partition { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n_tumor: usize, n_normal: usize) -> Vec<TissueType> {
        let mut out = vec![TissueType::PrimaryTumor; n_tumor];
        out.extend(vec![TissueType::SolidTissueNormal; n_normal]);
        out
    }

    fn proportion(idx: &[usize], labels: &[TissueType]) -> f64 {
        idx.iter().filter(|&&i| labels[i].is_positive()).count() as f64 / idx.len() as f64
    }

    #[test]
    fn test_deterministic_with_seed() {
        let y = labels(80, 20);
        let a = stratified_split(&y, 0.75, 42).unwrap();
        let b = stratified_split(&y, 0.75, 42).unwrap();
        assert_eq!(a, b);

        let c = stratified_split(&y, 0.75, 7).unwrap();
        assert_ne!(a.train, c.train);
    }

    #[test]
    fn test_disjoint_and_complete() {
        let y = labels(30, 13);
        let p = stratified_split(&y, 0.75, 42).unwrap();
        let mut all: Vec<usize> = p.train.iter().chain(p.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..y.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_class_proportions_preserved() {
        let y = labels(70, 17);
        let p = stratified_split(&y, 0.75, 42).unwrap();
        let overall = proportion(&(0..y.len()).collect::<Vec<_>>(), &y);

        // Within one sample of the overall proportion.
        let train_p = proportion(&p.train, &y);
        assert!((train_p - overall).abs() * p.n_train() as f64 <= 1.0);
        let test_p = proportion(&p.test, &y);
        assert!((test_p - overall).abs() * p.n_test() as f64 <= 1.0);

        let ratio = p.n_train() as f64 / y.len() as f64;
        assert!((ratio - 0.75).abs() < 0.02);
    }

    #[test]
    fn test_invalid_fraction() {
        let y = labels(4, 4);
        assert!(stratified_split(&y, 1.0, 42).is_err());
        assert!(stratified_split(&y, 0.0, 42).is_err());
        assert!(stratified_split(&[], 0.75, 42).is_err());
    }
}
