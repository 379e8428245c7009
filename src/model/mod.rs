//! Tumor/normal classifiers.

pub mod elastic_net;
pub mod knn;

pub use elastic_net::{cv_elastic_net, ElasticNetConfig, ElasticNetFit};
pub use knn::{knn, KnnClassifier};

use crate::data::{BetaMatrix, TissueType};
use crate::error::Result;

/// A fitted model that assigns a tissue class to every row of a beta matrix.
pub trait Classifier {
    fn predict(&self, x: &BetaMatrix) -> Result<Vec<TissueType>>;
}
