//! DNA Methylation Analysis of Breast Cancer Tumors
//!
//! This library classifies TCGA-BRCA samples as Primary Tumor or Solid Tissue
//! Normal from Illumina 450k beta values, picks the probes that drive the
//! classification and relates their methylation to overall survival.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **acquire**: Cohort assembly from the GDC API or an in-memory source
//! - **data**: Core data structures (BetaMatrix, SampleSheet, ClinicalTable)
//! - **filter**: Incomplete-sample removal and IQR variance filtering
//! - **partition**: Stratified train/test split
//! - **model**: Cross-validated Elastic Net and k-NN classifiers
//! - **evaluate**: Confusion matrix, precision, specificity and sensitivity
//! - **select**: Relevant genes from nonzero model coefficients
//! - **cluster**: Complete-linkage clustering and the heatmap
//! - **survival**: Median split, Kaplan-Meier curves and log-rank tests
//! - **pipeline**: Configuration and the end-to-end runner
//! - **benchmark**: Synthetic cohorts with planted signal
//!
//! # Example
//!
//! ```no_run
//! use brca_methylation::prelude::*;
//!
//! let cohort = Cohort::from_tsv("betas.tsv", "samples.tsv", "clinical.tsv").unwrap();
//! let annotation = ProbeAnnotation::from_tsv("annotation.tsv").unwrap();
//!
//! let config = AnalysisConfig::default().with_output_dir("results");
//! let report = Analysis::new(config).run(&cohort, &annotation).unwrap();
//! println!("{}", report);
//! ```

pub mod acquire;
pub mod benchmark;
pub mod cluster;
pub mod data;
pub mod error;
pub mod evaluate;
pub mod filter;
pub mod model;
pub mod partition;
pub mod pipeline;
pub mod select;
pub mod survival;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::acquire::{
        acquire_cohort, common_patients, Cohort, CohortConfig, CohortSource, DataKind, FileQuery,
        FileRecord, GdcClient, InMemorySource,
    };
    pub use crate::benchmark::{
        generate_synthetic, Direction, GroundTruth, SyntheticConfig, SyntheticData,
    };
    pub use crate::cluster::{
        cluster_heatmap, complete_linkage, correlation_distance, Dendrogram, Heatmap,
    };
    pub use crate::data::{
        patient_from_barcode, BetaMatrix, ClinicalRecord, ClinicalTable, ProbeAnnotation,
        SampleInfo, SampleSheet, TissueType, VitalStatus,
    };
    pub use crate::error::{MethylError, Result};
    pub use crate::evaluate::ConfusionMatrix;
    pub use crate::filter::{
        drop_incomplete_rows, drop_sparse_probes, filter_variance, iqr, median,
        CompleteCasesResult, VarianceFilterResult,
    };
    pub use crate::model::{
        cv_elastic_net, knn, Classifier, ElasticNetConfig, ElasticNetFit, KnnClassifier,
    };
    pub use crate::partition::{stratified_split, Partition};
    pub use crate::pipeline::{Analysis, AnalysisConfig, AnalysisReport, AnalysisStep};
    pub use crate::select::{leading_symbol, relevant_genes, RelevantGene};
    pub use crate::survival::{
        analyze_genes, kaplan_meier, log_rank, median_split, render_survival_svg,
        write_survival_plots, GeneSurvival, KaplanMeier, LogRankTest, MethylationGroup,
        SurvivalCohort,
    };
}
