//! Filtering primitives for beta matrices.

pub mod complete;
pub mod variance;

pub use complete::{drop_incomplete_rows, drop_sparse_probes, CompleteCasesResult};
pub use variance::{filter_variance, iqr, median, quantile, VarianceFilterResult};
