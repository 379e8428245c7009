//! Cohort source backed by prebuilt data.

use crate::acquire::{Cohort, CohortSource, DataKind, FileQuery, FileRecord};
use crate::data::{BetaMatrix, ClinicalTable};
use crate::error::{MethylError, Result};

/// Serves queries from a beta matrix whose rows are the methylation files.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    betas: BetaMatrix,
    methylation: Vec<FileRecord>,
    expression: Vec<FileRecord>,
    clinical: ClinicalTable,
}

impl InMemorySource {
    /// `methylation[i]` must describe row `i` of `betas`.
    pub fn new(
        betas: BetaMatrix,
        methylation: Vec<FileRecord>,
        expression: Vec<FileRecord>,
        clinical: ClinicalTable,
    ) -> Result<Self> {
        if methylation.len() != betas.n_samples() {
            return Err(MethylError::DimensionMismatch {
                expected: betas.n_samples(),
                actual: methylation.len(),
            });
        }
        if let Some((row, file)) = methylation
            .iter()
            .enumerate()
            .find(|(row, f)| betas.sample_ids()[*row] != f.sample_id)
        {
            return Err(MethylError::InvalidParameter(format!(
                "File '{}' describes sample '{}' but row {} is '{}'",
                file.file_id,
                file.sample_id,
                row,
                betas.sample_ids()[row]
            )));
        }
        Ok(Self {
            betas,
            methylation,
            expression,
            clinical,
        })
    }

    /// Source over an assembled cohort where every sample also has expression data.
    pub fn from_cohort(cohort: Cohort) -> Result<Self> {
        let methylation: Vec<FileRecord> = cohort
            .samples
            .samples()
            .iter()
            .map(|s| FileRecord {
                file_id: format!("meth-{}", s.sample_id),
                file_name: format!("{}.methylation.txt", s.sample_id),
                sample_id: s.sample_id.clone(),
                patient_id: s.patient_id.clone(),
                tissue: s.tissue,
            })
            .collect();
        let expression = methylation
            .iter()
            .map(|f| FileRecord {
                file_id: format!("expr-{}", f.sample_id),
                file_name: format!("{}.counts.tsv", f.sample_id),
                ..f.clone()
            })
            .collect();
        Self::new(cohort.betas, methylation, expression, cohort.clinical)
    }

    pub fn betas(&self) -> &BetaMatrix {
        &self.betas
    }

    pub fn methylation_files(&self) -> &[FileRecord] {
        &self.methylation
    }
}

impl CohortSource for InMemorySource {
    fn query_files(&self, query: &FileQuery) -> Result<Vec<FileRecord>> {
        let files = match query.kind {
            DataKind::Methylation => &self.methylation,
            DataKind::Expression => &self.expression,
        };
        Ok(files.iter().filter(|f| query.matches(f)).cloned().collect())
    }

    fn fetch_methylation(&self, files: &[FileRecord]) -> Result<BetaMatrix> {
        let rows = files
            .iter()
            .map(|f| {
                self.betas.sample_index(&f.sample_id).ok_or_else(|| {
                    MethylError::Acquisition(format!("Unknown file '{}'", f.file_id))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.betas.subset_samples(&rows)
    }

    fn fetch_clinical(&self, patients: &[String]) -> Result<ClinicalTable> {
        Ok(ClinicalTable::new(
            patients
                .iter()
                .filter_map(|p| self.clinical.get(p).cloned())
                .collect(),
        ))
    }
}
