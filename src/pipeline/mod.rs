//! Analysis configuration and the end-to-end runner.

mod config;
mod runner;

pub use config::{AnalysisConfig, ElasticNetSettings};
pub use runner::{
    Analysis, AnalysisReport, AnalysisStep, GeneSurvivalSummary, KnnSummary, MetricsSummary,
    ModelSummary, SurvivalSummary,
};
