//! Classification performance on held-out samples.

mod confusion;

pub use confusion::ConfusionMatrix;
