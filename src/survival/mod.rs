//! Per-gene survival analysis: median split on methylation, Kaplan-Meier
//! curves per group and a log-rank test.

mod kaplan_meier;
mod logrank;
mod plot;

pub use kaplan_meier::{kaplan_meier, KaplanMeier};
pub use logrank::{log_rank, LogRankTest};
pub use plot::render_survival_svg;

use crate::data::{BetaMatrix, ClinicalTable, SampleSheet, TissueType};
use crate::error::{MethylError, Result};
use crate::filter::median;
use crate::select::RelevantGene;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Methylation group of a subject for one gene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MethylationGroup {
    /// Beta at or above the median.
    Hyper,
    Hypo,
}

impl fmt::Display for MethylationGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hyper => f.write_str("HYPER"),
            Self::Hypo => f.write_str("HYPO"),
        }
    }
}

/// Split values at their median: `value >= median` is HYPER.
///
/// With an odd count the median is itself a value, so that subject is HYPER.
pub fn median_split(values: &[f64]) -> (f64, Vec<MethylationGroup>) {
    let m = median(values);
    let groups = values
        .iter()
        .map(|v| {
            if *v >= m {
                MethylationGroup::Hyper
            } else {
                MethylationGroup::Hypo
            }
        })
        .collect();
    (m, groups)
}

/// One patient with overall survival, tied to a beta matrix row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalSubject {
    pub sample_id: String,
    pub patient_id: String,
    /// Days to death or to last follow-up.
    pub time: f64,
    /// Death observed.
    pub event: bool,
}

/// Tumor samples usable for survival analysis, one per patient.
#[derive(Debug, Clone, Default)]
pub struct SurvivalCohort {
    rows: Vec<usize>,
    subjects: Vec<SurvivalSubject>,
}

impl SurvivalCohort {
    /// Select Primary Tumor rows of `betas` whose patient has a usable overall
    /// survival. The first tumor sample of a patient in matrix order is used.
    pub fn from_samples(
        betas: &BetaMatrix,
        samples: &SampleSheet,
        clinical: &ClinicalTable,
    ) -> Result<Self> {
        let mut cohort = Self::default();
        let mut seen: HashSet<&str> = HashSet::new();
        let (mut non_tumor, mut duplicate, mut no_clinical) = (0usize, 0usize, 0usize);

        for (row, sample_id) in betas.sample_ids().iter().enumerate() {
            let Some(info) = samples.get(sample_id) else {
                return Err(MethylError::InvalidParameter(format!(
                    "Sample '{}' missing from sample sheet",
                    sample_id
                )));
            };
            if info.tissue != TissueType::PrimaryTumor {
                non_tumor += 1;
                continue;
            }
            if seen.contains(info.patient_id.as_str()) {
                duplicate += 1;
                continue;
            }
            let Some((time, event)) = clinical
                .get(&info.patient_id)
                .and_then(|r| r.overall_survival())
            else {
                no_clinical += 1;
                continue;
            };
            seen.insert(info.patient_id.as_str());
            cohort.rows.push(row);
            cohort.subjects.push(SurvivalSubject {
                sample_id: sample_id.clone(),
                patient_id: info.patient_id.clone(),
                time,
                event,
            });
        }

        info!(
            "Survival cohort: {} patients ({} non-tumor, {} repeat, {} without survival data excluded)",
            cohort.len(),
            non_tumor,
            duplicate,
            no_clinical
        );
        if cohort.rows.is_empty() {
            return Err(MethylError::Survival(
                "No tumor samples with overall survival data".to_string(),
            ));
        }
        Ok(cohort)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Beta matrix rows of the subjects.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn subjects(&self) -> &[SurvivalSubject] {
        &self.subjects
    }

    pub fn times(&self) -> Vec<f64> {
        self.subjects.iter().map(|s| s.time).collect()
    }

    pub fn events(&self) -> Vec<bool> {
        self.subjects.iter().map(|s| s.event).collect()
    }
}

/// Survival comparison of HYPER and HYPO patients for one probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneSurvival {
    pub probe_id: String,
    pub symbol: String,
    pub median_beta: f64,
    pub n_hyper: usize,
    pub n_hypo: usize,
    pub hyper: KaplanMeier,
    pub hypo: KaplanMeier,
    /// Group A is HYPER.
    pub log_rank: LogRankTest,
    /// File name of the survival plot.
    pub plot_file: String,
}

impl GeneSurvival {
    pub fn p_value(&self) -> f64 {
        self.log_rank.p_value
    }
}

/// Plot file name per probe id: `<SYMBOL>_survival.svg`, or
/// `<SYMBOL>_<PROBE>_survival.svg` for every probe whose symbol is shared.
pub fn plot_file_names(genes: &[RelevantGene]) -> BTreeMap<String, String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for gene in genes {
        *counts.entry(gene.symbol.as_str()).or_default() += 1;
    }
    genes
        .iter()
        .map(|g| {
            let name = if counts[g.symbol.as_str()] > 1 {
                format!("{}_{}_survival.svg", g.symbol, g.probe_id)
            } else {
                format!("{}_survival.svg", g.symbol)
            };
            (g.probe_id.clone(), name)
        })
        .collect()
}

/// Median split and survival comparison for one probe.
pub fn analyze_gene(
    betas: &BetaMatrix,
    cohort: &SurvivalCohort,
    gene: &RelevantGene,
    plot_file: &str,
) -> Result<GeneSurvival> {
    let col = betas.probe_index(&gene.probe_id).ok_or_else(|| {
        MethylError::InvalidParameter(format!("Probe '{}' not in beta matrix", gene.probe_id))
    })?;
    let values: Vec<f64> = cohort.rows().iter().map(|&r| betas.get(r, col)).collect();
    if values.iter().any(|v| v.is_nan()) {
        return Err(MethylError::Survival(format!(
            "Missing beta values for probe '{}'",
            gene.probe_id
        )));
    }

    let (median_beta, groups) = median_split(&values);
    let times = cohort.times();
    let events = cohort.events();
    let is_hyper: Vec<bool> = groups.iter().map(|g| *g == MethylationGroup::Hyper).collect();

    let pick = |want: bool| -> (Vec<f64>, Vec<bool>) {
        is_hyper
            .iter()
            .zip(times.iter().zip(&events))
            .filter(|(h, _)| **h == want)
            .map(|(_, (t, e))| (*t, *e))
            .unzip()
    };
    let (hyper_t, hyper_e) = pick(true);
    let (hypo_t, hypo_e) = pick(false);
    if hyper_t.is_empty() || hypo_t.is_empty() {
        return Err(MethylError::Survival(format!(
            "Probe '{}' ({}): median split left an empty group",
            gene.probe_id, gene.symbol
        )));
    }

    let log_rank = log_rank(&times, &events, &is_hyper).map_err(|e| {
        MethylError::Survival(format!("Probe '{}' ({}): {}", gene.probe_id, gene.symbol, e))
    })?;
    debug!(
        "{} ({}): {} HYPER / {} HYPO, p = {:.4}",
        gene.symbol,
        gene.probe_id,
        hyper_t.len(),
        hypo_t.len(),
        log_rank.p_value
    );

    Ok(GeneSurvival {
        probe_id: gene.probe_id.clone(),
        symbol: gene.symbol.clone(),
        median_beta,
        n_hyper: hyper_t.len(),
        n_hypo: hypo_t.len(),
        hyper: kaplan_meier(&hyper_t, &hyper_e)?,
        hypo: kaplan_meier(&hypo_t, &hypo_e)?,
        log_rank,
        plot_file: plot_file.to_string(),
    })
}

/// Analyze all genes in parallel. Results are keyed by probe id.
pub fn analyze_genes(
    betas: &BetaMatrix,
    cohort: &SurvivalCohort,
    genes: &[RelevantGene],
) -> Result<BTreeMap<String, GeneSurvival>> {
    let names = plot_file_names(genes);
    let results: Vec<GeneSurvival> = genes
        .par_iter()
        .map(|gene| {
            let file = names
                .get(&gene.probe_id)
                .map(|s| s.as_str())
                .unwrap_or_default();
            analyze_gene(betas, cohort, gene, file)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut map = BTreeMap::new();
    for result in results {
        if map.contains_key(&result.probe_id) {
            return Err(MethylError::DuplicateKey(format!("probe '{}'", result.probe_id)));
        }
        map.insert(result.probe_id.clone(), result);
    }
    Ok(map)
}

/// Write one plot per gene into `dir`, returning paths in probe id order.
pub fn write_survival_plots(
    results: &BTreeMap<String, GeneSurvival>,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    results
        .par_iter()
        .map(|(_, result)| -> Result<PathBuf> {
            let path = dir.join(&result.plot_file);
            render_survival_svg(result, &path)?;
            Ok(path)
        })
        .collect()
}
