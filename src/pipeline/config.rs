//! Analysis configuration, stored as YAML.

use crate::acquire::CohortConfig;
use crate::error::{MethylError, Result};
use crate::model::ElasticNetConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Elastic Net settings exposed in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticNetSettings {
    pub alpha: f64,
    pub n_folds: usize,
    pub n_lambda: usize,
}

impl Default for ElasticNetSettings {
    fn default() -> Self {
        let defaults = ElasticNetConfig::default();
        Self {
            alpha: defaults.alpha,
            n_folds: defaults.n_folds,
            n_lambda: defaults.n_lambda,
        }
    }
}

/// Everything that parameterizes one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Name of the run, copied into the report.
    pub name: String,
    pub cohort: CohortConfig,
    /// Seed for the train/test split and the CV folds.
    pub seed: u64,
    pub train_fraction: f64,
    pub elastic_net: ElasticNetSettings,
    /// Probes with IQR below this quantile are removed before the second fit.
    pub variance_quantile: f64,
    pub knn_k: usize,
    /// Drop probes missing in more than this fraction of samples before
    /// removing incomplete samples. Off when unset.
    pub probe_missing_limit: Option<f64>,
    pub output_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            name: "brca-methylation".to_string(),
            cohort: CohortConfig::default(),
            seed: 42,
            train_fraction: 0.75,
            elastic_net: ElasticNetSettings::default(),
            variance_quantile: 0.95,
            knn_k: 9,
            probe_missing_limit: None,
            output_dir: PathBuf::from("results"),
        }
    }
}

impl AnalysisConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(MethylError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(MethylError::from)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_yaml(&fs::read_to_string(path)?)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_output_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_folds(mut self, n_folds: usize) -> Self {
        self.elastic_net.n_folds = n_folds;
        self
    }

    pub fn with_variance_quantile(mut self, quantile: f64) -> Self {
        self.variance_quantile = quantile;
        self
    }

    pub fn with_knn_k(mut self, k: usize) -> Self {
        self.knn_k = k;
        self
    }

    pub fn with_probe_missing_limit(mut self, limit: f64) -> Self {
        self.probe_missing_limit = Some(limit);
        self
    }

    pub fn with_max_patients(mut self, max_patients: usize) -> Self {
        self.cohort.max_patients = max_patients;
        self
    }

    /// Elastic Net configuration for the fits, seeded from `seed`.
    pub fn elastic_net_config(&self) -> ElasticNetConfig {
        ElasticNetConfig::default()
            .with_alpha(self.elastic_net.alpha)
            .with_folds(self.elastic_net.n_folds)
            .with_n_lambda(self.elastic_net.n_lambda)
            .with_seed(self.seed)
    }

    /// Check ranges before any work is done.
    pub fn validate(&self) -> Result<()> {
        if !(0.0 < self.train_fraction && self.train_fraction < 1.0) {
            return Err(MethylError::InvalidParameter(
                "train_fraction must be in (0, 1)".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.variance_quantile) {
            return Err(MethylError::InvalidParameter(
                "variance_quantile must be in [0, 1)".to_string(),
            ));
        }
        if self.knn_k == 0 {
            return Err(MethylError::InvalidParameter("knn_k must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.elastic_net.alpha) {
            return Err(MethylError::InvalidParameter(
                "elastic_net.alpha must be between 0 and 1".to_string(),
            ));
        }
        if let Some(limit) = self.probe_missing_limit {
            if !(0.0..=1.0).contains(&limit) {
                return Err(MethylError::InvalidParameter(
                    "probe_missing_limit must be in [0, 1]".to_string(),
                ));
            }
        }
        Ok(())
    }
}
