//! Sample descriptions: tissue type labels and TCGA barcodes.

use crate::error::{MethylError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;

/// Tissue definition of a specimen.
///
/// `PrimaryTumor` is the positive class everywhere in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TissueType {
    #[serde(rename = "Primary Tumor")]
    PrimaryTumor,
    #[serde(rename = "Solid Tissue Normal")]
    SolidTissueNormal,
}

impl TissueType {
    /// Label as used by the Genomic Data Commons.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PrimaryTumor => "Primary Tumor",
            Self::SolidTissueNormal => "Solid Tissue Normal",
        }
    }

    /// Whether this is the positive class of the classifiers.
    pub fn is_positive(&self) -> bool {
        matches!(self, Self::PrimaryTumor)
    }

    /// Binary response used by the logistic model (tumor = 1).
    pub fn as_response(&self) -> f64 {
        if self.is_positive() {
            1.0
        } else {
            0.0
        }
    }

    pub fn from_response(positive: bool) -> Self {
        if positive {
            Self::PrimaryTumor
        } else {
            Self::SolidTissueNormal
        }
    }

    pub fn all() -> [Self; 2] {
        [Self::PrimaryTumor, Self::SolidTissueNormal]
    }
}

impl fmt::Display for TissueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TissueType {
    type Err = MethylError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "primary tumor" | "tumor" | "tp" | "01" => Ok(Self::PrimaryTumor),
            "solid tissue normal" | "normal" | "nt" | "11" => Ok(Self::SolidTissueNormal),
            _ => Err(MethylError::InvalidLabel(s.to_string())),
        }
    }
}

/// Patient identifier of a TCGA barcode: its first three `-`-separated fields.
///
/// `TCGA-A7-A0CE-01A-11D-A10A-05` → `TCGA-A7-A0CE`.
pub fn patient_from_barcode(barcode: &str) -> String {
    barcode
        .trim()
        .splitn(4, '-')
        .take(3)
        .collect::<Vec<_>>()
        .join("-")
}

/// One specimen of the cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleInfo {
    pub sample_id: String,
    pub patient_id: String,
    pub tissue: TissueType,
}

impl SampleInfo {
    /// Describe a sample from its barcode; the patient id is derived from it.
    pub fn from_barcode(barcode: &str, tissue: TissueType) -> Self {
        Self {
            sample_id: barcode.to_string(),
            patient_id: patient_from_barcode(barcode),
            tissue,
        }
    }
}

/// Sample descriptions in matrix order.
#[derive(Debug, Clone, Default)]
pub struct SampleSheet {
    samples: Vec<SampleInfo>,
}

impl SampleSheet {
    pub fn new(samples: Vec<SampleInfo>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(samples.len());
        for s in &samples {
            if !seen.insert(s.sample_id.as_str()) {
                return Err(MethylError::DuplicateKey(format!("sample '{}'", s.sample_id)));
            }
        }
        Ok(Self { samples })
    }

    /// Load a sample sheet from a TSV with columns `sample_id`, `patient_id`, `tissue`.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut samples = Vec::new();
        for record in reader.records() {
            let record = record?;
            let sample_id = record.get(0).unwrap_or("").to_string();
            if sample_id.is_empty() {
                continue;
            }
            let patient_id = match record.get(1) {
                Some(p) if !p.is_empty() => p.to_string(),
                _ => patient_from_barcode(&sample_id),
            };
            let tissue: TissueType = record.get(2).unwrap_or("").parse()?;
            samples.push(SampleInfo {
                sample_id,
                patient_id,
                tissue,
            });
        }

        if samples.is_empty() {
            return Err(MethylError::EmptyData("No samples in sample sheet".to_string()));
        }
        Self::new(samples)
    }

    /// Write the sheet as TSV.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(BufWriter::new(File::create(path)?));
        writer.write_record(["sample_id", "patient_id", "tissue"])?;
        for s in &self.samples {
            writer.write_record([s.sample_id.as_str(), s.patient_id.as_str(), s.tissue.label()])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn samples(&self) -> &[SampleInfo] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, sample_id: &str) -> Option<&SampleInfo> {
        self.samples.iter().find(|s| s.sample_id == sample_id)
    }

    /// Labels aligned to the given sample order.
    pub fn labels_for(&self, sample_ids: &[String]) -> Result<Vec<TissueType>> {
        sample_ids
            .iter()
            .map(|id| {
                self.get(id).map(|s| s.tissue).ok_or_else(|| {
                    MethylError::InvalidParameter(format!("Sample '{}' missing from sample sheet", id))
                })
            })
            .collect()
    }

    /// Sheet restricted and reordered to the given samples.
    pub fn align_to(&self, sample_ids: &[String]) -> Result<Self> {
        let samples = sample_ids
            .iter()
            .map(|id| {
                self.get(id).cloned().ok_or_else(|| {
                    MethylError::InvalidParameter(format!("Sample '{}' missing from sample sheet", id))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_patient_from_barcode() {
        assert_eq!(patient_from_barcode("TCGA-A7-A0CE-01A-11D-A10A-05"), "TCGA-A7-A0CE");
        assert_eq!(patient_from_barcode("TCGA-A7-A0CE-11A"), "TCGA-A7-A0CE");
        assert_eq!(patient_from_barcode("TCGA-A7-A0CE"), "TCGA-A7-A0CE");
    }

    #[test]
    fn test_tissue_parsing() {
        assert_eq!("Primary Tumor".parse::<TissueType>().unwrap(), TissueType::PrimaryTumor);
        assert_eq!(
            "solid tissue normal".parse::<TissueType>().unwrap(),
            TissueType::SolidTissueNormal
        );
        assert!(matches!(
            "Metastatic".parse::<TissueType>(),
            Err(MethylError::InvalidLabel(_))
        ));
        assert!(TissueType::PrimaryTumor.is_positive());
        assert_eq!(TissueType::from_response(false), TissueType::SolidTissueNormal);
    }

    #[test]
    fn test_sheet_from_tsv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tpatient_id\ttissue").unwrap();
        writeln!(file, "TCGA-AA-0001-01A\t\tPrimary Tumor").unwrap();
        writeln!(file, "TCGA-AA-0001-11A\tTCGA-AA-0001\tSolid Tissue Normal").unwrap();
        file.flush().unwrap();

        let sheet = SampleSheet::from_tsv(file.path()).unwrap();
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.samples()[0].patient_id, "TCGA-AA-0001");

        let labels = sheet
            .labels_for(&["TCGA-AA-0001-11A".to_string(), "TCGA-AA-0001-01A".to_string()])
            .unwrap();
        assert_eq!(labels, vec![TissueType::SolidTissueNormal, TissueType::PrimaryTumor]);
        assert!(sheet.labels_for(&["nope".to_string()]).is_err());
    }
}
