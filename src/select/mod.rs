//! Relevant gene extraction from a fitted Elastic Net.

use crate::data::ProbeAnnotation;
use crate::model::ElasticNetFit;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A probe with a non-zero coefficient and the gene it is reported under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevantGene {
    pub probe_id: String,
    /// Leading token of the annotated symbol, or the probe id when unannotated.
    pub symbol: String,
    pub coefficient: f64,
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9]+").expect("static pattern"))
}

/// Leading alphanumeric token of a symbol string.
///
/// `"BRCA1;NBR2"` → `"BRCA1"`. Returns `None` when the string does not start
/// with an alphanumeric character.
pub fn leading_symbol(raw: &str) -> Option<&str> {
    token_pattern().find(raw.trim()).map(|m| m.as_str())
}

/// Probes with non-zero coefficients at the selected λ, in model column order.
///
/// The intercept is not part of `fit.coefficients` and so never appears.
pub fn relevant_genes(fit: &ElasticNetFit, annotation: &ProbeAnnotation) -> Vec<RelevantGene> {
    fit.nonzero()
        .into_iter()
        .map(|(probe_id, coefficient)| {
            let symbol = annotation
                .symbol(probe_id)
                .and_then(leading_symbol)
                .unwrap_or(probe_id)
                .to_string();
            RelevantGene {
                probe_id: probe_id.to_string(),
                symbol,
                coefficient,
            }
        })
        .collect()
}

/// Probe ids of a gene list, in order.
pub fn probe_ids(genes: &[RelevantGene]) -> Vec<String> {
    genes.iter().map(|g| g.probe_id.clone()).collect()
}
