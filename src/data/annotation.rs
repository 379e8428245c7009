//! Probe to gene-symbol annotation.

use crate::error::{MethylError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Lookup table mapping methylation probe identifiers to gene symbol strings.
///
/// Symbol strings are stored as annotated, which may list several genes
/// (`"BRCA1;NBR2"`). Use [`crate::select::leading_symbol`] to reduce them.
#[derive(Debug, Clone, Default)]
pub struct ProbeAnnotation {
    symbols: HashMap<String, String>,
}

impl ProbeAnnotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TSV whose first two columns are probe ID and gene symbol.
    ///
    /// A header row is expected. Probes with an empty symbol are skipped.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        lines
            .next()
            .ok_or_else(|| MethylError::EmptyData("Empty annotation file".to_string()))??;

        let mut symbols = HashMap::new();
        for line_result in lines {
            let line = line_result?;
            let mut fields = line.split('\t');
            let probe = fields.next().unwrap_or("").trim();
            let symbol = fields.next().unwrap_or("").trim();
            if probe.is_empty() || symbol.is_empty() || symbol == "NA" {
                continue;
            }
            symbols.insert(probe.to_string(), symbol.to_string());
        }
        Ok(Self { symbols })
    }

    pub fn insert(&mut self, probe_id: &str, symbol: &str) {
        self.symbols.insert(probe_id.to_string(), symbol.to_string());
    }

    /// Raw symbol string of a probe.
    pub fn symbol(&self, probe_id: &str) -> Option<&str> {
        self.symbols.get(probe_id).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl FromIterator<(String, String)> for ProbeAnnotation {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            symbols: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_from_tsv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "probe_id\tgene_symbol").unwrap();
        writeln!(file, "cg00000029\tRBL2").unwrap();
        writeln!(file, "cg00000108\tC3orf35;C3orf35").unwrap();
        writeln!(file, "cg00000109\t").unwrap();
        file.flush().unwrap();

        let ann = ProbeAnnotation::from_tsv(file.path()).unwrap();
        assert_eq!(ann.len(), 2);
        assert_eq!(ann.symbol("cg00000029"), Some("RBL2"));
        assert_eq!(ann.symbol("cg00000108"), Some("C3orf35;C3orf35"));
        assert_eq!(ann.symbol("cg00000109"), None);
    }
}
