//! Patient clinical data and overall survival.

use crate::error::{MethylError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Vital status at last contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VitalStatus {
    Alive,
    Dead,
}

/// Clinical fields of one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalRecord {
    pub patient_id: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub vital_status: Option<VitalStatus>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub days_to_death: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub days_to_last_follow_up: Option<f64>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub tumor_stage: Option<String>,
}

impl ClinicalRecord {
    pub fn new(patient_id: &str) -> Self {
        Self {
            patient_id: patient_id.to_string(),
            vital_status: None,
            days_to_death: None,
            days_to_last_follow_up: None,
            gender: None,
            tumor_stage: None,
        }
    }

    /// Whether the patient is recorded as deceased.
    pub fn is_dead(&self) -> bool {
        self.vital_status == Some(VitalStatus::Dead)
    }

    /// Overall survival as `(time in days, event observed)`.
    ///
    /// Time is days to death for deceased patients and days to last follow-up
    /// otherwise. Returns `None` when the status or the relevant time is missing.
    pub fn overall_survival(&self) -> Option<(f64, bool)> {
        let status = self.vital_status?;
        let time = match status {
            VitalStatus::Dead => self.days_to_death?,
            VitalStatus::Alive => self.days_to_last_follow_up?,
        };
        if time.is_finite() && time >= 0.0 {
            Some((time, status == VitalStatus::Dead))
        } else {
            None
        }
    }
}

/// Clinical records keyed by patient identifier.
#[derive(Debug, Clone, Default)]
pub struct ClinicalTable {
    records: BTreeMap<String, ClinicalRecord>,
}

impl ClinicalTable {
    pub fn new(records: Vec<ClinicalRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|r| (r.patient_id.clone(), r))
                .collect(),
        }
    }

    /// Load clinical data from a TSV with a header naming the record fields.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .trim(csv::Trim::All)
            .from_path(path)?;

        let records = reader
            .deserialize::<ClinicalRecord>()
            .collect::<std::result::Result<Vec<_>, csv::Error>>()?;
        if records.is_empty() {
            return Err(MethylError::EmptyData("No patients in clinical table".to_string()));
        }
        Ok(Self::new(records))
    }

    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(BufWriter::new(File::create(path)?));
        for record in self.records.values() {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn get(&self, patient_id: &str) -> Option<&ClinicalRecord> {
        self.records.get(patient_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClinicalRecord> {
        self.records.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_overall_survival() {
        let mut dead = ClinicalRecord::new("P1");
        dead.vital_status = Some(VitalStatus::Dead);
        dead.days_to_death = Some(400.0);
        dead.days_to_last_follow_up = Some(100.0);
        assert_eq!(dead.overall_survival(), Some((400.0, true)));

        let mut alive = ClinicalRecord::new("P2");
        alive.vital_status = Some(VitalStatus::Alive);
        alive.days_to_last_follow_up = Some(1200.0);
        assert_eq!(alive.overall_survival(), Some((1200.0, false)));

        let mut unknown = ClinicalRecord::new("P3");
        unknown.days_to_last_follow_up = Some(10.0);
        assert_eq!(unknown.overall_survival(), None);

        alive.days_to_last_follow_up = None;
        assert_eq!(alive.overall_survival(), None);
    }

    #[test]
    fn test_from_tsv_tolerates_missing() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "patient_id\tvital_status\tdays_to_death\tdays_to_last_follow_up\tgender\ttumor_stage"
        )
        .unwrap();
        writeln!(file, "P1\tDead\t300\tNA\tfemale\tStage IIA").unwrap();
        writeln!(file, "P2\tAlive\t\t900\tfemale\t").unwrap();
        writeln!(file, "P3\tNot Reported\t\t\t\t").unwrap();
        file.flush().unwrap();

        let table = ClinicalTable::from_tsv(file.path()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("P1").unwrap().overall_survival(), Some((300.0, true)));
        assert_eq!(table.get("P2").unwrap().overall_survival(), Some((900.0, false)));
        assert_eq!(table.get("P3").unwrap().vital_status, None);
        assert_eq!(table.get("P1").unwrap().tumor_stage.as_deref(), Some("Stage IIA"));
    }
}
