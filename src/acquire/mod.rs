//! Cohort acquisition: file queries, patient intersection and matrix assembly.
//!
//! [`acquire_cohort`] holds the selection logic and talks to a
//! [`CohortSource`], which is either the Genomic Data Commons ([`GdcClient`])
//! or prebuilt records ([`InMemorySource`]).

pub mod gdc;
pub mod memory;

pub use gdc::GdcClient;
pub use memory::InMemorySource;

use crate::data::{
    patient_from_barcode, BetaMatrix, ClinicalTable, SampleInfo, SampleSheet, TissueType,
};
use crate::error::{MethylError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use tracing::info;

/// Which cohort to assemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortConfig {
    pub project: String,
    /// Methylation array platform.
    pub platform: String,
    pub sample_types: Vec<TissueType>,
    /// Patients kept from the methylation/expression intersection.
    pub max_patients: usize,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            project: "TCGA-BRCA".to_string(),
            platform: "Illumina Human Methylation 450".to_string(),
            sample_types: TissueType::all().to_vec(),
            max_patients: 100,
        }
    }
}

impl CohortConfig {
    pub fn with_project(mut self, project: &str) -> Self {
        self.project = project.to_string();
        self
    }

    pub fn with_max_patients(mut self, max_patients: usize) -> Self {
        self.max_patients = max_patients;
        self
    }
}

/// Data modality of a file query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataKind {
    /// Methylation beta values.
    Methylation,
    /// Gene expression counts.
    Expression,
}

/// Filter for a file listing.
#[derive(Debug, Clone, PartialEq)]
pub struct FileQuery {
    pub project: String,
    pub kind: DataKind,
    /// Array platform; only used for methylation.
    pub platform: Option<String>,
    pub sample_types: Vec<TissueType>,
    /// Restrict to these patients when set.
    pub patients: Option<Vec<String>>,
}

impl FileQuery {
    pub fn methylation(config: &CohortConfig) -> Self {
        Self {
            project: config.project.clone(),
            kind: DataKind::Methylation,
            platform: Some(config.platform.clone()),
            sample_types: config.sample_types.clone(),
            patients: None,
        }
    }

    pub fn expression(config: &CohortConfig) -> Self {
        Self {
            project: config.project.clone(),
            kind: DataKind::Expression,
            platform: None,
            sample_types: config.sample_types.clone(),
            patients: None,
        }
    }

    pub fn for_patients(mut self, patients: &[String]) -> Self {
        self.patients = Some(patients.to_vec());
        self
    }

    /// Whether a record passes the tissue and patient filters.
    pub fn matches(&self, record: &FileRecord) -> bool {
        self.sample_types.contains(&record.tissue)
            && self
                .patients
                .as_ref()
                .map_or(true, |p| p.iter().any(|id| *id == record.patient_id))
    }
}

/// One data file of one sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: String,
    pub file_name: String,
    /// Sample barcode.
    pub sample_id: String,
    pub patient_id: String,
    pub tissue: TissueType,
}

impl FileRecord {
    pub fn new(file_id: &str, sample_id: &str, tissue: TissueType) -> Self {
        Self {
            file_id: file_id.to_string(),
            file_name: format!("{}.txt", file_id),
            sample_id: sample_id.to_string(),
            patient_id: patient_from_barcode(sample_id),
            tissue,
        }
    }
}

/// Remote or local provider of cohort data.
pub trait CohortSource {
    /// List files matching a query.
    fn query_files(&self, query: &FileQuery) -> Result<Vec<FileRecord>>;

    /// Beta values of the given files, one matrix row per file in order.
    fn fetch_methylation(&self, files: &[FileRecord]) -> Result<BetaMatrix>;

    /// Clinical records of the given patients.
    fn fetch_clinical(&self, patients: &[String]) -> Result<ClinicalTable>;
}

/// Methylation matrix with its sample descriptions and clinical data.
#[derive(Debug, Clone)]
pub struct Cohort {
    pub betas: BetaMatrix,
    /// Aligned to the rows of `betas`.
    pub samples: SampleSheet,
    pub clinical: ClinicalTable,
}

impl Cohort {
    /// Bundle the parts, reordering the sample sheet to the matrix rows.
    pub fn new(betas: BetaMatrix, samples: SampleSheet, clinical: ClinicalTable) -> Result<Self> {
        let samples = samples.align_to(betas.sample_ids())?;
        Ok(Self {
            betas,
            samples,
            clinical,
        })
    }

    /// Load from a probes × samples beta TSV, a sample sheet and a clinical TSV.
    pub fn from_tsv<P: AsRef<Path>>(betas: P, samples: P, clinical: P) -> Result<Self> {
        let betas = BetaMatrix::from_tsv(betas)?;
        let samples = SampleSheet::from_tsv(samples)?;
        let clinical = ClinicalTable::from_tsv(clinical)?;
        info!(
            "Loaded {} samples x {} probes, {} clinical records",
            betas.n_samples(),
            betas.n_probes(),
            clinical.len()
        );
        Self::new(betas, samples, clinical)
    }

    /// Write `betas.tsv`, `samples.tsv` and `clinical.tsv` into `dir`.
    pub fn write_tsv<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        self.betas.to_tsv(dir.join("betas.tsv"))?;
        self.samples.to_tsv(dir.join("samples.tsv"))?;
        self.clinical.to_tsv(dir.join("clinical.tsv"))?;
        Ok(())
    }

    /// Tissue labels in matrix row order.
    pub fn labels(&self) -> Result<Vec<TissueType>> {
        self.samples.labels_for(self.betas.sample_ids())
    }

    pub fn n_patients(&self) -> usize {
        self.samples
            .samples()
            .iter()
            .map(|s| s.patient_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Patients present in both listings, sorted, at most `max_patients`.
pub fn common_patients(a: &[FileRecord], b: &[FileRecord], max_patients: usize) -> Vec<String> {
    let left: BTreeSet<&str> = a.iter().map(|r| r.patient_id.as_str()).collect();
    let right: HashSet<&str> = b.iter().map(|r| r.patient_id.as_str()).collect();
    left.into_iter()
        .filter(|p| right.contains(p))
        .take(max_patients)
        .map(str::to_string)
        .collect()
}

/// Assemble the cohort: patients with both methylation and expression data,
/// the first `max_patients` of them, their methylation files and clinical data.
pub fn acquire_cohort(source: &dyn CohortSource, config: &CohortConfig) -> Result<Cohort> {
    if config.max_patients == 0 {
        return Err(MethylError::InvalidParameter(
            "max_patients must be positive".to_string(),
        ));
    }

    let methylation = source.query_files(&FileQuery::methylation(config))?;
    let expression = source.query_files(&FileQuery::expression(config))?;
    info!(
        "{}: {} methylation files, {} expression files",
        config.project,
        methylation.len(),
        expression.len()
    );

    let patients = common_patients(&methylation, &expression, config.max_patients);
    if patients.is_empty() {
        return Err(MethylError::Acquisition(format!(
            "No {} patients have both methylation and expression data",
            config.project
        )));
    }
    info!("Selected {} patients with both modalities", patients.len());

    let query = FileQuery::methylation(config).for_patients(&patients);
    let mut seen = HashSet::new();
    let files: Vec<FileRecord> = source
        .query_files(&query)?
        .into_iter()
        .filter(|f| query.matches(f) && seen.insert(f.sample_id.clone()))
        .collect();
    if files.is_empty() {
        return Err(MethylError::Acquisition(
            "Methylation query for selected patients returned no files".to_string(),
        ));
    }

    let betas = source.fetch_methylation(&files)?;
    let samples = SampleSheet::new(
        files
            .iter()
            .map(|f| SampleInfo {
                sample_id: f.sample_id.clone(),
                patient_id: f.patient_id.clone(),
                tissue: f.tissue,
            })
            .collect(),
    )?;
    let clinical = source.fetch_clinical(&patients)?;
    info!(
        "Acquired {} samples x {} probes, {} clinical records",
        betas.n_samples(),
        betas.n_probes(),
        clinical.len()
    );

    Cohort::new(betas, samples, clinical)
}
