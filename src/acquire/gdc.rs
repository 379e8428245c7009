//! Client for the Genomic Data Commons REST API.

use crate::acquire::{CohortSource, DataKind, FileQuery, FileRecord};
use crate::data::{
    parse_beta, patient_from_barcode, BetaMatrix, ClinicalRecord, ClinicalTable, TissueType,
    VitalStatus,
};
use crate::error::{MethylError, Result};
use nalgebra::DMatrix;
use rayon::prelude::*;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const GDC_API: &str = "https://api.gdc.cancer.gov";

/// Listing page size; a project has far fewer files than this.
const PAGE_SIZE: usize = 10_000;

const FILE_FIELDS: &str =
    "file_id,file_name,cases.submitter_id,cases.samples.sample_type,cases.samples.submitter_id";

const CASE_FIELDS: &str = "submitter_id,demographic.vital_status,demographic.days_to_death,\
demographic.gender,diagnoses.days_to_last_follow_up,diagnoses.ajcc_pathologic_stage";

/// Blocking GDC client with an on-disk cache of downloaded beta files.
#[derive(Debug, Clone)]
pub struct GdcClient {
    client: Client,
    base_url: String,
    cache_dir: PathBuf,
}

impl GdcClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;
        Ok(Self {
            client,
            base_url: GDC_API.to_string(),
            cache_dir: default_cache_dir(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_cache_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cache_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn post(&self, endpoint: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()?
            .error_for_status()?;
        Ok(response.json()?)
    }

    /// Path of the cached beta file, downloading it first if needed.
    fn cached_file(&self, file: &FileRecord) -> Result<PathBuf> {
        let path = self.cache_dir.join(format!("{}.txt", file.file_id));
        if path.exists() {
            return Ok(path);
        }
        let url = format!("{}/data/{}", self.base_url, file.file_id);
        debug!("GET {}", url);
        let mut response = self.client.get(&url).send()?.error_for_status()?;
        let mut bytes = Vec::new();
        response.read_to_end(&mut bytes)?;
        if bytes.is_empty() {
            return Err(MethylError::Acquisition(format!(
                "Downloaded file {} is empty",
                file.file_id
            )));
        }
        // Write then rename so an interrupted download never looks cached.
        let partial = path.with_extension("part");
        fs::write(&partial, &bytes)?;
        fs::rename(&partial, &path)?;
        Ok(path)
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("brca-methylation")
        .join("gdc")
}

fn in_filter(field: &str, values: Vec<String>) -> Value {
    json!({"op": "in", "content": {"field": field, "value": values}})
}

/// JSON filter document of a file query.
pub fn file_filters(query: &FileQuery) -> Value {
    let mut content = vec![in_filter(
        "cases.project.project_id",
        vec![query.project.clone()],
    )];
    match query.kind {
        DataKind::Methylation => {
            content.push(in_filter("data_category", vec!["DNA Methylation".into()]));
            content.push(in_filter("data_type", vec!["Methylation Beta Value".into()]));
            if let Some(platform) = &query.platform {
                content.push(in_filter("platform", vec![platform.clone()]));
            }
        }
        DataKind::Expression => {
            content.push(in_filter("data_category", vec!["Transcriptome Profiling".into()]));
            content.push(in_filter(
                "data_type",
                vec!["Gene Expression Quantification".into()],
            ));
            content.push(in_filter(
                "analysis.workflow_type",
                vec!["STAR - Counts".into()],
            ));
        }
    }
    content.push(in_filter(
        "cases.samples.sample_type",
        query.sample_types.iter().map(|t| t.label().to_string()).collect(),
    ));
    if let Some(patients) = &query.patients {
        content.push(in_filter("cases.submitter_id", patients.clone()));
    }
    json!({"op": "and", "content": content})
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Hits<T>,
}

#[derive(Debug, Deserialize)]
struct Hits<T> {
    hits: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct FileHit {
    file_id: String,
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    cases: Vec<CaseRef>,
}

#[derive(Debug, Deserialize)]
struct CaseRef {
    #[serde(default)]
    samples: Vec<SampleRef>,
}

#[derive(Debug, Deserialize)]
struct SampleRef {
    submitter_id: String,
    sample_type: Option<String>,
}

/// File records from a `/files` response. Hits without a recognised sample
/// of a requested type are skipped.
pub fn parse_file_hits(response: Value, sample_types: &[TissueType]) -> Result<Vec<FileRecord>> {
    let envelope: Envelope<FileHit> = serde_json::from_value(response)?;
    let records = envelope
        .data
        .hits
        .into_iter()
        .filter_map(|hit| {
            let sample = hit.cases.iter().flat_map(|c| &c.samples).find_map(|s| {
                let tissue: TissueType = s.sample_type.as_deref()?.parse().ok()?;
                sample_types
                    .contains(&tissue)
                    .then(|| (s.submitter_id.clone(), tissue))
            })?;
            Some(FileRecord {
                file_id: hit.file_id,
                file_name: hit.file_name,
                patient_id: patient_from_barcode(&sample.0),
                sample_id: sample.0,
                tissue: sample.1,
            })
        })
        .collect();
    Ok(records)
}

#[derive(Debug, Deserialize)]
struct CaseHit {
    submitter_id: String,
    demographic: Option<Demographic>,
    #[serde(default)]
    diagnoses: Vec<Diagnosis>,
}

#[derive(Debug, Deserialize)]
struct Demographic {
    vital_status: Option<String>,
    days_to_death: Option<f64>,
    gender: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Diagnosis {
    days_to_last_follow_up: Option<f64>,
    ajcc_pathologic_stage: Option<String>,
}

/// Clinical records from a `/cases` response.
pub fn parse_case_hits(response: Value) -> Result<ClinicalTable> {
    let envelope: Envelope<CaseHit> = serde_json::from_value(response)?;
    let records = envelope
        .data
        .hits
        .into_iter()
        .map(|hit| {
            let mut record = ClinicalRecord::new(&hit.submitter_id);
            if let Some(demographic) = hit.demographic {
                record.vital_status = match demographic.vital_status.as_deref() {
                    Some("Alive") => Some(VitalStatus::Alive),
                    Some("Dead") => Some(VitalStatus::Dead),
                    _ => None,
                };
                record.days_to_death = demographic.days_to_death;
                record.gender = demographic.gender;
            }
            record.days_to_last_follow_up = hit
                .diagnoses
                .iter()
                .filter_map(|d| d.days_to_last_follow_up)
                .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d))));
            record.tumor_stage = hit
                .diagnoses
                .iter()
                .find_map(|d| d.ajcc_pathologic_stage.clone());
            record
        })
        .collect();
    Ok(ClinicalTable::new(records))
}

/// Read a headerless two-column `probe<TAB>beta` file.
pub fn read_beta_file<R: BufRead>(reader: R) -> Result<Vec<(String, f64)>> {
    let mut values = Vec::new();
    for (row, line) in reader.lines().enumerate() {
        let line = line?;
        let mut fields = line.split('\t');
        let probe = fields.next().unwrap_or("").trim();
        if probe.is_empty() {
            continue;
        }
        let raw = fields.next().unwrap_or("").trim();
        let beta = parse_beta(raw).ok_or_else(|| MethylError::InvalidValue {
            value: raw.to_string(),
            row,
            col: 1,
        })?;
        values.push((probe.to_string(), beta));
    }
    Ok(values)
}

/// Stack per-sample profiles into a samples × probes matrix.
///
/// Probes follow the first profile's order; a probe absent from a sample is
/// missing (NaN) there, and probes unknown to the first profile are ignored.
pub fn assemble_profiles(profiles: Vec<(String, Vec<(String, f64)>)>) -> Result<BetaMatrix> {
    let Some((_, first)) = profiles.first() else {
        return Err(MethylError::EmptyData("No methylation profiles".to_string()));
    };
    let probe_ids: Vec<String> = first.iter().map(|(p, _)| p.clone()).collect();
    let index: HashMap<&str, usize> = probe_ids
        .iter()
        .enumerate()
        .map(|(j, p)| (p.as_str(), j))
        .collect();

    let mut data = DMatrix::from_element(profiles.len(), probe_ids.len(), f64::NAN);
    for (i, (_, profile)) in profiles.iter().enumerate() {
        for (probe, beta) in profile {
            if let Some(&j) = index.get(probe.as_str()) {
                data[(i, j)] = *beta;
            }
        }
    }
    let sample_ids = profiles.into_iter().map(|(s, _)| s).collect();
    BetaMatrix::new(data, sample_ids, probe_ids)
}

impl CohortSource for GdcClient {
    fn query_files(&self, query: &FileQuery) -> Result<Vec<FileRecord>> {
        let body = json!({
            "filters": file_filters(query),
            "fields": FILE_FIELDS,
            "format": "JSON",
            "size": PAGE_SIZE.to_string(),
        });
        let records = parse_file_hits(self.post("files", &body)?, &query.sample_types)?;
        debug!("{:?} query returned {} files", query.kind, records.len());
        Ok(records)
    }

    fn fetch_methylation(&self, files: &[FileRecord]) -> Result<BetaMatrix> {
        fs::create_dir_all(&self.cache_dir)?;
        info!(
            "Fetching {} methylation files (cache: {})",
            files.len(),
            self.cache_dir.display()
        );
        let profiles = files
            .par_iter()
            .map(|file| -> Result<(String, Vec<(String, f64)>)> {
                let path = self.cached_file(file)?;
                let values = read_beta_file(BufReader::new(fs::File::open(path)?))?;
                Ok((file.sample_id.clone(), values))
            })
            .collect::<Result<Vec<_>>>()?;
        assemble_profiles(profiles)
    }

    fn fetch_clinical(&self, patients: &[String]) -> Result<ClinicalTable> {
        let body = json!({
            "filters": in_filter("submitter_id", patients.to_vec()),
            "fields": CASE_FIELDS,
            "format": "JSON",
            "size": patients.len().max(1).to_string(),
        });
        parse_case_hits(self.post("cases", &body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::CohortConfig;

    #[test]
    fn test_methylation_filters() {
        let query = FileQuery::methylation(&CohortConfig::default())
            .for_patients(&["TCGA-A1-0001".to_string()]);
        let filters = file_filters(&query);
        let text = filters.to_string();
        assert_eq!(filters["op"], "and");
        assert!(text.contains("\"TCGA-BRCA\""));
        assert!(text.contains("\"Methylation Beta Value\""));
        assert!(text.contains("\"Illumina Human Methylation 450\""));
        assert!(text.contains("\"Solid Tissue Normal\""));
        assert!(text.contains("\"TCGA-A1-0001\""));
    }

    #[test]
    fn test_expression_filters() {
        let filters = file_filters(&FileQuery::expression(&CohortConfig::default()));
        let text = filters.to_string();
        assert!(text.contains("\"STAR - Counts\""));
        assert!(!text.contains("platform"));
    }

    #[test]
    fn test_parse_file_hits() {
        let response = json!({"data": {"hits": [
            {"file_id": "f1", "file_name": "a.txt", "cases": [{"submitter_id": "TCGA-A1-0001",
                "samples": [{"submitter_id": "TCGA-A1-0001-01A", "sample_type": "Primary Tumor"}]}]},
            {"file_id": "f2", "file_name": "b.txt", "cases": [{"submitter_id": "TCGA-A1-0002",
                "samples": [{"submitter_id": "TCGA-A1-0002-06A", "sample_type": "Metastatic"}]}]},
            {"file_id": "f3", "file_name": "c.txt", "cases": [{"submitter_id": "TCGA-A1-0002",
                "samples": [{"submitter_id": "TCGA-A1-0002-11A", "sample_type": "Solid Tissue Normal"}]}]}
        ]}});
        let records = parse_file_hits(response, &TissueType::all()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].patient_id, "TCGA-A1-0001");
        assert_eq!(records[1].tissue, TissueType::SolidTissueNormal);
        assert_eq!(records[1].sample_id, "TCGA-A1-0002-11A");
    }

    #[test]
    fn test_parse_case_hits() {
        let response = json!({"data": {"hits": [
            {"submitter_id": "TCGA-A1-0001",
             "demographic": {"vital_status": "Dead", "days_to_death": 812.0, "gender": "female"},
             "diagnoses": [{"days_to_last_follow_up": null, "ajcc_pathologic_stage": "Stage IIA"}]},
            {"submitter_id": "TCGA-A1-0002",
             "demographic": {"vital_status": "Alive", "days_to_death": null},
             "diagnoses": [{"days_to_last_follow_up": 1500.0}, {"days_to_last_follow_up": 1720.0}]}
        ]}});
        let table = parse_case_hits(response).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get("TCGA-A1-0001").unwrap().overall_survival(),
            Some((812.0, true))
        );
        let alive = table.get("TCGA-A1-0002").unwrap();
        assert_eq!(alive.overall_survival(), Some((1720.0, false)));
        assert_eq!(alive.tumor_stage, None);
    }

    #[test]
    fn test_read_and_assemble() {
        let a = read_beta_file("cg1\t0.1\ncg2\tNA\ncg3\t0.9\n".as_bytes()).unwrap();
        let b = read_beta_file("cg3\t0.8\ncg1\t0.2\n".as_bytes()).unwrap();
        let betas = assemble_profiles(vec![("s1".into(), a), ("s2".into(), b)]).unwrap();
        assert_eq!(betas.probe_ids(), &["cg1", "cg2", "cg3"]);
        assert_eq!(betas.get(1, 0), 0.2);
        assert_eq!(betas.get(1, 2), 0.8);
        assert!(betas.get(0, 1).is_nan());
        assert!(betas.get(1, 1).is_nan());
        assert!(read_beta_file("cg1\tabc\n".as_bytes()).is_err());
    }

    #[test]
    fn test_cached_files_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f1.txt"), "cg1\t0.4\ncg2\t0.6\n").unwrap();
        // Unroutable base URL: only the cache can satisfy the request.
        let client = GdcClient::new()
            .unwrap()
            .with_base_url("http://127.0.0.1:9")
            .with_cache_dir(dir.path());
        let files = vec![FileRecord::new("f1", "TCGA-A1-0001-01A", TissueType::PrimaryTumor)];
        let betas = client.fetch_methylation(&files).unwrap();
        assert_eq!(betas.sample_ids(), &["TCGA-A1-0001-01A"]);
        assert_eq!(betas.get(0, 1), 0.6);
    }
}
