//! Synthetic methylation cohorts with planted tumor/normal signal.
//!
//! Generates beta matrices with known differentially methylated probes plus
//! matching sample sheets, clinical data and probe annotation, for testing the
//! analysis end to end without network access.

use crate::acquire::Cohort;
use crate::data::{
    BetaMatrix, ClinicalRecord, ClinicalTable, ProbeAnnotation, SampleInfo, SampleSheet,
    TissueType, VitalStatus,
};
use crate::error::{MethylError, Result};
use nalgebra::DMatrix;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Configuration for synthetic cohort generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Name/identifier for this dataset.
    pub name: String,
    pub n_tumor: usize,
    pub n_normal: usize,
    pub n_probes: usize,
    /// Probes whose mean beta differs between tumor and normal.
    pub n_planted: usize,
    /// Tumor minus normal mean beta of planted probes (sign alternates).
    pub effect_size: f64,
    /// Standard deviation of per-sample noise.
    pub noise_sd: f64,
    /// Samples given one missing probe value.
    pub n_incomplete: usize,
    /// Hazard ratio per unit beta of the first planted probe among tumors.
    pub survival_effect: f64,
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            name: "synthetic".to_string(),
            n_tumor: 60,
            n_normal: 20,
            n_probes: 500,
            n_planted: 10,
            effect_size: 0.35,
            noise_sd: 0.05,
            n_incomplete: 2,
            survival_effect: 4.0,
            seed: 42,
        }
    }
}

impl SyntheticConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Set cohort and probe counts.
    pub fn with_dimensions(mut self, n_tumor: usize, n_normal: usize, n_probes: usize) -> Self {
        self.n_tumor = n_tumor;
        self.n_normal = n_normal;
        self.n_probes = n_probes;
        self
    }

    /// Set planted probes.
    pub fn with_planted(mut self, n: usize, effect_size: f64) -> Self {
        self.n_planted = n;
        self.effect_size = effect_size;
        self
    }

    pub fn with_noise(mut self, sd: f64) -> Self {
        self.noise_sd = sd;
        self
    }

    pub fn with_incomplete(mut self, n: usize) -> Self {
        self.n_incomplete = n;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// The small cohort used in tests: 20 samples, 50 probes, 5 planted.
    pub fn small() -> Self {
        Self::new("small")
            .with_dimensions(10, 10, 50)
            .with_planted(5, 0.4)
            .with_incomplete(0)
    }

    fn validate(&self) -> Result<()> {
        if self.n_tumor == 0 || self.n_normal == 0 {
            return Err(MethylError::InvalidParameter(
                "Synthetic cohort needs tumor and normal samples".to_string(),
            ));
        }
        if self.n_planted > self.n_probes || self.n_probes == 0 {
            return Err(MethylError::InvalidParameter(format!(
                "Cannot plant {} of {} probes",
                self.n_planted, self.n_probes
            )));
        }
        if self.n_incomplete >= self.n_tumor + self.n_normal {
            return Err(MethylError::InvalidParameter(
                "n_incomplete must leave complete samples".to_string(),
            ));
        }
        Ok(())
    }
}

/// Direction of a planted effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Hypermethylated in tumor.
    Up,
    /// Hypomethylated in tumor.
    Down,
}

/// Ground truth for a synthetic cohort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruth {
    /// Planted probe ids, in column order.
    pub planted_probes: Vec<String>,
    pub directions: HashMap<String, Direction>,
    /// Probe whose tumor methylation drives the hazard.
    pub survival_probe: Option<String>,
}

impl GroundTruth {
    pub fn is_planted(&self, probe_id: &str) -> bool {
        self.planted_probes.iter().any(|p| p == probe_id)
    }

    /// Write ground truth to TSV format.
    pub fn to_tsv(&self) -> String {
        let mut lines = vec!["probe_id\tdirection".to_string()];
        for probe in &self.planted_probes {
            let dir = match self.directions.get(probe) {
                Some(Direction::Up) => "up",
                Some(Direction::Down) => "down",
                None => "none",
            };
            lines.push(format!("{}\t{}", probe, dir));
        }
        lines.join("\n")
    }
}

/// Result of synthetic data generation.
#[derive(Debug, Clone)]
pub struct SyntheticData {
    pub cohort: Cohort,
    pub annotation: ProbeAnnotation,
    pub ground_truth: GroundTruth,
    /// Configuration used.
    pub config: SyntheticConfig,
}

impl SyntheticData {
    /// Write the cohort TSVs, annotation, ground truth and config to a directory.
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        self.cohort.write_tsv(dir)?;

        let mut annotation = vec!["probe_id\tgene_symbol".to_string()];
        for probe in self.cohort.betas.probe_ids() {
            if let Some(symbol) = self.annotation.symbol(probe) {
                annotation.push(format!("{}\t{}", probe, symbol));
            }
        }
        std::fs::write(dir.join("annotation.tsv"), annotation.join("\n"))?;
        std::fs::write(dir.join("ground_truth.tsv"), self.ground_truth.to_tsv())?;
        std::fs::write(dir.join("config.yaml"), serde_yaml::to_string(&self.config)?)?;
        Ok(())
    }
}

/// Standard normal draw (Box-Muller).
fn next_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-12);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Generate a synthetic cohort with known ground truth.
///
/// Tumor samples are `TCGA-SY-NNNN-01A`, normals `TCGA-SY-NNNN-11A`, so the
/// first `n_normal` patients contribute a matched pair. Every third gene
/// symbol is shared by two probes, and symbols carry a second
/// `;`-separated name.
pub fn generate_synthetic(config: &SyntheticConfig) -> Result<SyntheticData> {
    config.validate()?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let probe_ids: Vec<String> = (0..config.n_probes).map(|j| format!("cg{:08}", j)).collect();
    let mut samples = Vec::with_capacity(config.n_tumor + config.n_normal);
    for i in 0..config.n_tumor {
        samples.push(SampleInfo::from_barcode(
            &format!("TCGA-SY-{:04}-01A", i),
            TissueType::PrimaryTumor,
        ));
    }
    for i in 0..config.n_normal {
        samples.push(SampleInfo::from_barcode(
            &format!("TCGA-SY-{:04}-11A", i),
            TissueType::SolidTissueNormal,
        ));
    }
    let n = samples.len();

    // Planted probes are a random subset; directions alternate.
    let mut order: Vec<usize> = (0..config.n_probes).collect();
    order.shuffle(&mut rng);
    let mut planted: Vec<usize> = order[..config.n_planted].to_vec();
    planted.sort_unstable();
    let shift: HashMap<usize, f64> = planted
        .iter()
        .enumerate()
        .map(|(k, &j)| {
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            (j, sign * config.effect_size)
        })
        .collect();

    let base: Vec<f64> = (0..config.n_probes).map(|_| rng.gen_range(0.25..0.75)).collect();
    let mut data = DMatrix::from_fn(n, config.n_probes, |_, _| 0.0);
    for i in 0..n {
        let tumor = samples[i].tissue.is_positive();
        for j in 0..config.n_probes {
            let effect = match shift.get(&j) {
                Some(delta) if tumor => delta / 2.0,
                Some(delta) => -delta / 2.0,
                None => 0.0,
            };
            let value = base[j] + effect + config.noise_sd * next_normal(&mut rng);
            data[(i, j)] = value.clamp(0.001, 0.999);
        }
    }

    let mut incomplete: Vec<usize> = (0..n).collect();
    incomplete.shuffle(&mut rng);
    for &i in &incomplete[..config.n_incomplete] {
        let j = rng.gen_range(0..config.n_probes);
        data[(i, j)] = f64::NAN;
    }

    // Exponential survival with hazard rising with the first planted probe.
    let survival_probe = planted.first().copied();
    let mut records = Vec::new();
    for i in 0..config.n_tumor.max(config.n_normal) {
        let patient = format!("TCGA-SY-{:04}", i);
        let mut record = ClinicalRecord::new(&patient);
        let driver = match survival_probe {
            Some(j) if i < config.n_tumor && !data[(i, j)].is_nan() => data[(i, j)] - base[j],
            _ => 0.0,
        };
        let hazard = (config.survival_effect * driver).exp() / 1500.0;
        let event_time = -rng.gen::<f64>().max(1e-12).ln() / hazard;
        let follow_up = rng.gen_range(300.0..4000.0);
        if event_time <= follow_up {
            record.vital_status = Some(VitalStatus::Dead);
            record.days_to_death = Some(event_time.round().max(1.0));
        } else {
            record.vital_status = Some(VitalStatus::Alive);
            record.days_to_last_follow_up = Some(follow_up.round());
        }
        record.gender = Some("female".to_string());
        records.push(record);
    }

    let annotation: ProbeAnnotation = probe_ids
        .iter()
        .enumerate()
        .map(|(j, p)| {
            let gene = if j % 3 == 2 { j - 1 } else { j };
            (p.clone(), format!("GENE{};GENE{}-AS1", gene, gene))
        })
        .collect();

    let ground_truth = GroundTruth {
        planted_probes: planted.iter().map(|&j| probe_ids[j].clone()).collect(),
        directions: planted
            .iter()
            .map(|&j| {
                let dir = if shift[&j] > 0.0 { Direction::Up } else { Direction::Down };
                (probe_ids[j].clone(), dir)
            })
            .collect(),
        survival_probe: survival_probe.map(|j| probe_ids[j].clone()),
    };

    let sample_ids = samples.iter().map(|s| s.sample_id.clone()).collect();
    let betas = BetaMatrix::new(data, sample_ids, probe_ids)?;
    let cohort = Cohort::new(betas, SampleSheet::new(samples)?, ClinicalTable::new(records))?;

    Ok(SyntheticData {
        cohort,
        annotation,
        ground_truth,
        config: config.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_and_truth() {
        let data = generate_synthetic(&SyntheticConfig::small()).unwrap();
        assert_eq!(data.cohort.betas.n_samples(), 20);
        assert_eq!(data.cohort.betas.n_probes(), 50);
        assert_eq!(data.ground_truth.planted_probes.len(), 5);
        assert!(!data.cohort.betas.has_missing());
        assert_eq!(data.cohort.n_patients(), 10);
        assert_eq!(data.cohort.clinical.len(), 10);
    }

    #[test]
    fn test_reproducible() {
        let a = generate_synthetic(&SyntheticConfig::small().with_seed(7)).unwrap();
        let b = generate_synthetic(&SyntheticConfig::small().with_seed(7)).unwrap();
        assert_eq!(a.cohort.betas.data(), b.cohort.betas.data());
        assert_eq!(a.ground_truth.planted_probes, b.ground_truth.planted_probes);
    }

    #[test]
    fn test_planted_probes_separate_tissues() {
        let data = generate_synthetic(&SyntheticConfig::small()).unwrap();
        let labels = data.cohort.labels().unwrap();
        for probe in &data.ground_truth.planted_probes {
            let col = data.cohort.betas.probe_index(probe).unwrap();
            let mean = |tumor: bool| {
                let v: Vec<f64> = (0..labels.len())
                    .filter(|&i| labels[i].is_positive() == tumor)
                    .map(|i| data.cohort.betas.get(i, col))
                    .collect();
                v.iter().sum::<f64>() / v.len() as f64
            };
            let diff = mean(true) - mean(false);
            match data.ground_truth.directions[probe] {
                Direction::Up => assert!(diff > 0.2),
                Direction::Down => assert!(diff < -0.2),
            }
        }
    }

    #[test]
    fn test_incomplete_samples() {
        let config = SyntheticConfig::small().with_incomplete(3);
        let data = generate_synthetic(&config).unwrap();
        let incomplete = (0..data.cohort.betas.n_samples())
            .filter(|&i| data.cohort.betas.row_has_missing(i))
            .count();
        assert_eq!(incomplete, 3);
    }

    #[test]
    fn test_write_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data = generate_synthetic(&SyntheticConfig::small()).unwrap();
        data.write_to_dir(dir.path()).unwrap();
        for file in ["betas.tsv", "samples.tsv", "clinical.tsv", "annotation.tsv", "ground_truth.tsv", "config.yaml"] {
            assert!(dir.path().join(file).exists(), "{} missing", file);
        }
        let annotation = ProbeAnnotation::from_tsv(dir.path().join("annotation.tsv")).unwrap();
        assert_eq!(annotation.len(), 50);
        assert_eq!(annotation.symbol("cg00000002"), Some("GENE1;GENE1-AS1"));
    }

    #[test]
    fn test_invalid_config() {
        let config = SyntheticConfig::small().with_planted(60, 0.3);
        assert!(generate_synthetic(&config).is_err());
    }
}
