//! Hierarchical clustering of samples and genes, and the clustered heatmap.

mod hclust;
mod heatmap;

pub use hclust::{complete_linkage, correlation_distance, Dendrogram};
pub use heatmap::{cluster_heatmap, Heatmap};
