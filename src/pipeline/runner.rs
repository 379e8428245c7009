//! End-to-end analysis runner.

use crate::acquire::Cohort;
use crate::cluster::cluster_heatmap;
use crate::data::{BetaMatrix, ProbeAnnotation, TissueType};
use crate::error::{MethylError, Result};
use crate::evaluate::ConfusionMatrix;
use crate::filter::{drop_incomplete_rows, drop_sparse_probes, filter_variance};
use crate::model::{cv_elastic_net, Classifier, ElasticNetFit, KnnClassifier};
use crate::partition::{stratified_split, Partition};
use crate::pipeline::AnalysisConfig;
use crate::select::{relevant_genes, RelevantGene};
use crate::survival::{analyze_genes, write_survival_plots, GeneSurvival, SurvivalCohort};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// A stage of the analysis, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStep {
    DropSparseProbes,
    DropIncompleteSamples,
    Split,
    ElasticNetAll,
    VarianceFilter,
    ElasticNetFiltered,
    Knn,
    Heatmap,
    Survival,
    Report,
}

impl AnalysisStep {
    fn number(&self) -> usize {
        *self as usize + 1
    }
}

impl fmt::Display for AnalysisStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisStep::DropSparseProbes => "drop sparse probes",
            AnalysisStep::DropIncompleteSamples => "drop incomplete samples",
            AnalysisStep::Split => "train/test split",
            AnalysisStep::ElasticNetAll => "elastic net (all probes)",
            AnalysisStep::VarianceFilter => "variance filter",
            AnalysisStep::ElasticNetFiltered => "elastic net (filtered probes)",
            AnalysisStep::Knn => "k-NN",
            AnalysisStep::Heatmap => "heatmap",
            AnalysisStep::Survival => "survival",
            AnalysisStep::Report => "report",
        };
        write!(f, "{}", name)
    }
}

/// Test-set performance of one classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub confusion: ConfusionMatrix,
    /// `None` where the rate is undefined.
    pub precision: Option<f64>,
    pub specificity: Option<f64>,
    pub sensitivity: Option<f64>,
    pub accuracy: Option<f64>,
}

impl From<ConfusionMatrix> for MetricsSummary {
    fn from(confusion: ConfusionMatrix) -> Self {
        let defined = |x: f64| if x.is_nan() { None } else { Some(x) };
        Self {
            precision: defined(confusion.precision()),
            specificity: defined(confusion.specificity()),
            sensitivity: defined(confusion.sensitivity()),
            accuracy: defined(confusion.accuracy()),
            confusion,
        }
    }
}

/// Elastic Net fit and its test metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub n_probes: usize,
    pub lambda_min: f64,
    pub lambda_1se: f64,
    pub n_nonzero: usize,
    pub genes: Vec<RelevantGene>,
    pub metrics: MetricsSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnSummary {
    pub k: usize,
    pub n_probes: usize,
    pub metrics: MetricsSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneSurvivalSummary {
    pub probe_id: String,
    pub symbol: String,
    pub median_beta: f64,
    pub n_hyper: usize,
    pub n_hypo: usize,
    pub chi_square: f64,
    pub p_value: f64,
    pub plot_file: String,
}

impl From<&GeneSurvival> for GeneSurvivalSummary {
    fn from(result: &GeneSurvival) -> Self {
        Self {
            probe_id: result.probe_id.clone(),
            symbol: result.symbol.clone(),
            median_beta: result.median_beta,
            n_hyper: result.n_hyper,
            n_hypo: result.n_hypo,
            chi_square: result.log_rank.statistic,
            p_value: result.log_rank.p_value,
            plot_file: result.plot_file.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurvivalSummary {
    pub n_subjects: usize,
    pub n_events: usize,
    /// Keyed by probe id.
    pub genes: BTreeMap<String, GeneSurvivalSummary>,
}

/// Everything the analysis produced, written as `report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub name: String,
    pub config: AnalysisConfig,
    pub n_samples: usize,
    pub n_probes: usize,
    /// Probes removed by the optional sparse probe filter.
    pub n_sparse_probes: usize,
    pub n_complete_samples: usize,
    pub dropped_samples: Vec<String>,
    pub n_train: usize,
    pub n_test: usize,
    pub elastic_net_all: ModelSummary,
    pub variance_threshold: f64,
    pub n_filtered_probes: usize,
    pub elastic_net_filtered: ModelSummary,
    pub knn: KnnSummary,
    /// Path of the heatmap, absent when no gene was selected.
    pub heatmap: Option<PathBuf>,
    pub survival: Option<SurvivalSummary>,
}

impl AnalysisReport {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(MethylError::from)
    }

    /// Genes from the filtered model, the set used for clustering and survival.
    pub fn relevant_genes(&self) -> &[RelevantGene] {
        &self.elastic_net_filtered.genes
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Analysis: {}", self.name)?;
        writeln!(
            f,
            "  Samples: {} ({} complete), probes: {}",
            self.n_samples, self.n_complete_samples, self.n_probes
        )?;
        writeln!(f, "  Train/test: {}/{}", self.n_train, self.n_test)?;
        let models = [
            ("Elastic Net (all probes)", &self.elastic_net_all.metrics),
            ("Elastic Net (filtered)", &self.elastic_net_filtered.metrics),
            ("k-NN", &self.knn.metrics),
        ];
        let rate = |x: Option<f64>| x.map_or_else(|| "NA".to_string(), |v| format!("{:.3}", v));
        for (label, m) in models {
            writeln!(
                f,
                "  {}: precision {}, specificity {}, sensitivity {}",
                label,
                rate(m.precision),
                rate(m.specificity),
                rate(m.sensitivity)
            )?;
        }
        writeln!(f, "  Relevant genes: {}", self.relevant_genes().len())?;
        if let Some(survival) = &self.survival {
            for gene in survival.genes.values() {
                writeln!(
                    f,
                    "    {} ({}): p = {:.4}",
                    gene.symbol, gene.probe_id, gene.p_value
                )?;
            }
        }
        Ok(())
    }
}

/// Runs every stage of the analysis on an assembled cohort.
#[derive(Debug, Clone)]
pub struct Analysis {
    config: AnalysisConfig,
}

impl Analysis {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the analysis, writing plots and `report.json` to the output directory.
    pub fn run(&self, cohort: &Cohort, annotation: &ProbeAnnotation) -> Result<AnalysisReport> {
        self.config.validate()?;
        let out_dir = &self.config.output_dir;
        fs::create_dir_all(out_dir)?;
        info!(
            "Running '{}' on {} samples x {} probes",
            self.config.name,
            cohort.betas.n_samples(),
            cohort.betas.n_probes()
        );

        let (betas, n_sparse_probes) = match self.config.probe_missing_limit {
            Some(limit) => {
                step(AnalysisStep::DropSparseProbes, drop_sparse_probes(&cohort.betas, limit))?
            }
            None => (cohort.betas.clone(), 0),
        };
        if n_sparse_probes > 0 {
            info!("Removed {} probes with too many missing values", n_sparse_probes);
        }

        let (complete, dropped) =
            step(AnalysisStep::DropIncompleteSamples, drop_incomplete_rows(&betas))?;
        info!("{}", dropped);

        let labels = step(
            AnalysisStep::DropIncompleteSamples,
            cohort.samples.labels_for(complete.sample_ids()),
        )?;
        let partition = step(
            AnalysisStep::Split,
            stratified_split(&labels, self.config.train_fraction, self.config.seed),
        )?;
        let train_labels = Partition::select(&partition.train, &labels);
        let test_labels = Partition::select(&partition.test, &labels);
        info!(
            "Split {} samples into {} train / {} test",
            labels.len(),
            partition.n_train(),
            partition.n_test()
        );

        let (train, test) = step(AnalysisStep::Split, split_rows(&complete, &partition))?;
        let elastic_net_all = step(
            AnalysisStep::ElasticNetAll,
            self.fit_elastic_net(&train, &test, &train_labels, &test_labels, annotation),
        )?;
        info!(
            "Elastic Net on all probes: {} nonzero, {}",
            elastic_net_all.n_nonzero, elastic_net_all.metrics.confusion
        );

        // Dispersion is computed across every complete sample, then the same
        // columns are taken from both partitions.
        let (filtered, variance) = step(
            AnalysisStep::VarianceFilter,
            filter_variance(&complete, self.config.variance_quantile),
        )?;
        info!(
            "Kept {} of {} probes with IQR >= {:.4}",
            variance.n_after, variance.n_before, variance.threshold
        );
        let (train_f, test_f) = step(AnalysisStep::VarianceFilter, split_rows(&filtered, &partition))?;

        let elastic_net_filtered = step(
            AnalysisStep::ElasticNetFiltered,
            self.fit_elastic_net(&train_f, &test_f, &train_labels, &test_labels, annotation),
        )?;
        info!(
            "Elastic Net on filtered probes: {} nonzero, {}",
            elastic_net_filtered.n_nonzero, elastic_net_filtered.metrics.confusion
        );

        let knn = step(AnalysisStep::Knn, (|| -> Result<KnnSummary> {
            let classifier = KnnClassifier::fit(&train_f, &train_labels, self.config.knn_k)?;
            let predicted = classifier.predict(&test_f)?;
            Ok(KnnSummary {
                k: classifier.k(),
                n_probes: train_f.n_probes(),
                metrics: ConfusionMatrix::from_predictions(&predicted, &test_labels)?.into(),
            })
        })())?;
        info!("k-NN (k = {}): {}", knn.k, knn.metrics.confusion);

        let genes = elastic_net_filtered.genes.clone();
        let (heatmap, survival) = if genes.is_empty() {
            warn!("Filtered model selected no probes; skipping heatmap and survival");
            (None, None)
        } else {
            let heatmap = step(AnalysisStep::Heatmap, (|| -> Result<PathBuf> {
                let path = out_dir.join("heatmap.svg");
                cluster_heatmap(&complete, &genes, &labels)?.render_svg(&path)?;
                Ok(path)
            })())?;
            info!("Wrote {}", heatmap.display());

            let survival = step(AnalysisStep::Survival, self.survival(&complete, cohort, &genes))?;
            (Some(heatmap), Some(survival))
        };

        let report = AnalysisReport {
            name: self.config.name.clone(),
            config: self.config.clone(),
            n_samples: cohort.betas.n_samples(),
            n_probes: cohort.betas.n_probes(),
            n_sparse_probes,
            n_complete_samples: complete.n_samples(),
            dropped_samples: dropped.dropped,
            n_train: partition.n_train(),
            n_test: partition.n_test(),
            elastic_net_all,
            variance_threshold: variance.threshold,
            n_filtered_probes: variance.n_after,
            elastic_net_filtered,
            knn,
            heatmap,
            survival,
        };

        step(AnalysisStep::Report, (|| -> Result<()> {
            fs::write(out_dir.join("report.json"), report.to_json()?)?;
            Ok(())
        })())?;
        info!("Analysis complete; results in {}", out_dir.display());
        Ok(report)
    }

    fn fit_elastic_net(
        &self,
        train: &BetaMatrix,
        test: &BetaMatrix,
        train_labels: &[TissueType],
        test_labels: &[TissueType],
        annotation: &ProbeAnnotation,
    ) -> Result<ModelSummary> {
        let fit: ElasticNetFit =
            cv_elastic_net(train, train_labels, &self.config.elastic_net_config())?;
        let predicted = fit.predict(test)?;
        Ok(ModelSummary {
            n_probes: train.n_probes(),
            lambda_min: fit.lambda,
            lambda_1se: fit.lambda_1se,
            n_nonzero: fit.n_nonzero(),
            genes: relevant_genes(&fit, annotation),
            metrics: ConfusionMatrix::from_predictions(&predicted, test_labels)?.into(),
        })
    }

    fn survival(
        &self,
        complete: &BetaMatrix,
        cohort: &Cohort,
        genes: &[RelevantGene],
    ) -> Result<SurvivalSummary> {
        let subjects = SurvivalCohort::from_samples(complete, &cohort.samples, &cohort.clinical)?;
        let results = analyze_genes(complete, &subjects, genes)?;

        let plot_dir = self.config.output_dir.join("survival");
        fs::create_dir_all(&plot_dir)?;
        let written = write_survival_plots(&results, &plot_dir)?;
        info!("Wrote {} survival plots to {}", written.len(), plot_dir.display());

        Ok(SurvivalSummary {
            n_subjects: subjects.len(),
            n_events: subjects.events().iter().filter(|e| **e).count(),
            genes: results
                .iter()
                .map(|(probe, result)| (probe.clone(), GeneSurvivalSummary::from(result)))
                .collect(),
        })
    }
}

fn step<T>(which: AnalysisStep, result: Result<T>) -> Result<T> {
    result.map_err(|e| {
        MethylError::Pipeline(format!("Step {} ({}) failed: {}", which.number(), which, e))
    })
}

fn split_rows(betas: &BetaMatrix, partition: &Partition) -> Result<(BetaMatrix, BetaMatrix)> {
    Ok((
        betas.subset_samples(&partition.train)?,
        betas.subset_samples(&partition.test)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{generate_synthetic, SyntheticConfig};

    #[test]
    fn test_step_numbering_and_names() {
        assert_eq!(AnalysisStep::DropSparseProbes.number(), 1);
        assert_eq!(AnalysisStep::Report.number(), 10);
        assert_eq!(AnalysisStep::Knn.to_string(), "k-NN");
    }

    #[test]
    fn test_failures_name_the_step() {
        let err = step::<()>(
            AnalysisStep::Split,
            Err(MethylError::EmptyData("nothing".to_string())),
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Step 3 (train/test split) failed"));
        assert!(message.contains("nothing"));
    }

    #[test]
    fn test_metrics_summary_maps_undefined_to_none() {
        let cm = ConfusionMatrix {
            true_positives: 0,
            false_positives: 0,
            false_negatives: 2,
            true_negatives: 3,
        };
        let summary = MetricsSummary::from(cm);
        assert_eq!(summary.precision, None);
        assert_eq!(summary.specificity, Some(1.0));
        assert_eq!(summary.sensitivity, Some(0.0));
    }

    #[test]
    fn test_run_on_synthetic_cohort() {
        let dir = tempfile::tempdir().unwrap();
        let data = generate_synthetic(&SyntheticConfig::small()).unwrap();
        let config = AnalysisConfig::default()
            .with_name("synthetic")
            .with_folds(5)
            .with_variance_quantile(0.8)
            .with_output_dir(dir.path());

        let report = Analysis::new(config).run(&data.cohort, &data.annotation).unwrap();

        assert_eq!(report.n_samples, 20);
        assert_eq!(report.n_train + report.n_test, report.n_complete_samples);
        assert_eq!(report.n_filtered_probes, 10);
        assert_eq!(report.knn.k, 9);
        assert_eq!(report.knn.n_probes, 10);
        assert!(dir.path().join("report.json").exists());

        let json = fs::read_to_string(dir.path().join("report.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["name"], "synthetic");
    }

    #[test]
    fn test_invalid_config_rejected_before_work() {
        let dir = tempfile::tempdir().unwrap();
        let data = generate_synthetic(&SyntheticConfig::small()).unwrap();
        let config = AnalysisConfig::default()
            .with_knn_k(0)
            .with_output_dir(dir.path());
        assert!(Analysis::new(config).run(&data.cohort, &data.annotation).is_err());
    }
}
