//! Agglomerative clustering with complete linkage.

use crate::error::{MethylError, Result};
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Result of agglomerative clustering of `n` items.
///
/// Cluster ids below `n` are the items themselves; merge `i` creates cluster
/// `n + i`. This is the layout `scipy` uses for linkage matrices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dendrogram {
    /// Pairs of cluster ids joined at each step.
    pub merges: Vec<[usize; 2]>,
    /// Linkage distance of each merge, non-decreasing.
    pub heights: Vec<f64>,
    /// Leaf order for drawing: left subtree before right subtree.
    pub order: Vec<usize>,
}

impl Dendrogram {
    pub fn n_leaves(&self) -> usize {
        self.merges.len() + 1
    }

    /// Members of a cluster id, in drawing order.
    pub fn leaves(&self, cluster: usize) -> Vec<usize> {
        let n = self.n_leaves();
        let mut out = Vec::new();
        let mut stack = vec![cluster];
        while let Some(c) = stack.pop() {
            if c < n {
                out.push(c);
            } else {
                let [a, b] = self.merges[c - n];
                // Right pushed first so the left subtree is emitted first.
                stack.push(b);
                stack.push(a);
            }
        }
        out
    }
}

/// Pairwise distance `(1 - r) / 2` between the rows of `x`, r being Pearson's
/// correlation. An undefined correlation (a constant row) counts as r = 0.
pub fn correlation_distance(x: &DMatrix<f64>) -> DMatrix<f64> {
    let n = x.nrows();
    let p = x.ncols();

    let centered: Vec<Option<Vec<f64>>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let row: Vec<f64> = x.row(i).iter().copied().collect();
            let mean = row.iter().sum::<f64>() / p.max(1) as f64;
            let c: Vec<f64> = row.iter().map(|v| v - mean).collect();
            let norm = c.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 && norm.is_finite() {
                Some(c.iter().map(|v| v / norm).collect())
            } else {
                None
            }
        })
        .collect();

    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            return 0.0;
        }
        let r = match (&centered[i], &centered[j]) {
            (Some(a), Some(b)) => a.iter().zip(b).map(|(u, v)| u * v).sum::<f64>().clamp(-1.0, 1.0),
            _ => 0.0,
        };
        (1.0 - r) / 2.0
    })
}

/// Complete-linkage clustering of a symmetric distance matrix.
///
/// At each step the two active clusters with the smallest maximum pairwise
/// distance are merged; ties go to the pair created first.
pub fn complete_linkage(distances: &DMatrix<f64>) -> Result<Dendrogram> {
    let n = distances.nrows();
    if n != distances.ncols() {
        return Err(MethylError::DimensionMismatch {
            expected: n,
            actual: distances.ncols(),
        });
    }
    if n == 0 {
        return Err(MethylError::EmptyData("Nothing to cluster".to_string()));
    }
    if distances.iter().any(|d| !d.is_finite()) {
        return Err(MethylError::Numerical(
            "Distance matrix contains non-finite values".to_string(),
        ));
    }

    // Slot k holds the cluster id and the complete-linkage distances to other slots.
    let mut ids: Vec<usize> = (0..n).collect();
    let mut active = vec![true; n];
    let mut d = distances.clone();
    let mut merges = Vec::with_capacity(n.saturating_sub(1));
    let mut heights = Vec::with_capacity(n.saturating_sub(1));

    for step in 0..n.saturating_sub(1) {
        let mut best: Option<(f64, usize, usize)> = None;
        for a in 0..n {
            if !active[a] {
                continue;
            }
            for b in (a + 1)..n {
                if !active[b] {
                    continue;
                }
                let dist = d[(a, b)];
                if best.map_or(true, |(bd, _, _)| dist < bd) {
                    best = Some((dist, a, b));
                }
            }
        }
        let Some((height, a, b)) = best else {
            break;
        };

        let (lo, hi) = if ids[a] < ids[b] { (ids[a], ids[b]) } else { (ids[b], ids[a]) };
        merges.push([lo, hi]);
        heights.push(height);

        // Merged cluster lives in slot a.
        for k in 0..n {
            if active[k] && k != a && k != b {
                let m = d[(a, k)].max(d[(b, k)]);
                d[(a, k)] = m;
                d[(k, a)] = m;
            }
        }
        active[b] = false;
        ids[a] = n + step;
    }

    let mut tree = Dendrogram {
        merges,
        heights,
        order: Vec::new(),
    };
    let root = if n == 1 { 0 } else { 2 * n - 2 };
    tree.order = tree.leaves(root);
    Ok(tree)
}
