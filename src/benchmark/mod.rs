//! Synthetic cohorts for testing the analysis without network access.

mod generate;

pub use generate::{generate_synthetic, Direction, GroundTruth, SyntheticConfig, SyntheticData};
