//! Dense beta-value matrix for DNA methylation data.

use crate::error::{MethylError, Result};
use nalgebra::DMatrix;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A dense matrix of methylation beta values.
///
/// Rows are samples, columns are probes. Missing measurements are stored as
/// `NaN` until [`crate::filter::drop_incomplete_rows`] removes them.
#[derive(Debug, Clone)]
pub struct BetaMatrix {
    /// Values (samples × probes).
    data: DMatrix<f64>,
    /// Sample identifiers (row names).
    sample_ids: Vec<String>,
    /// Probe identifiers (column names).
    probe_ids: Vec<String>,
}

impl BetaMatrix {
    /// Create a new BetaMatrix from a samples × probes matrix and identifiers.
    pub fn new(data: DMatrix<f64>, sample_ids: Vec<String>, probe_ids: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != sample_ids.len() {
            return Err(MethylError::DimensionMismatch {
                expected: nrows,
                actual: sample_ids.len(),
            });
        }
        if ncols != probe_ids.len() {
            return Err(MethylError::DimensionMismatch {
                expected: ncols,
                actual: probe_ids.len(),
            });
        }
        ensure_unique(&sample_ids, "sample")?;
        ensure_unique(&probe_ids, "probe")?;
        Ok(Self {
            data,
            sample_ids,
            probe_ids,
        })
    }

    /// Create from an assay laid out probes × samples, as delivered by the archive.
    pub fn from_probe_major(
        assay: DMatrix<f64>,
        probe_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        Self::new(assay.transpose(), sample_ids, probe_ids)
    }

    /// Load a beta matrix from a probes × samples TSV file.
    ///
    /// Expected format:
    /// - First row: header with sample IDs (first column is the probe ID header)
    /// - Subsequent rows: probe ID followed by beta values
    ///
    /// Empty cells and `NA` are read as missing.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| MethylError::EmptyData("Empty TSV file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(MethylError::EmptyData(
                "TSV must have at least one sample".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();
        let n_samples = sample_ids.len();

        let mut values: Vec<f64> = Vec::new();
        let mut probe_ids: Vec<String> = Vec::new();

        for (row_idx, line_result) in lines.enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            probe_ids.push(fields[0].trim().to_string());

            for col_idx in 0..n_samples {
                let raw = fields.get(col_idx + 1).map(|s| s.trim()).unwrap_or("");
                values.push(parse_beta(raw).ok_or_else(|| MethylError::InvalidValue {
                    value: raw.to_string(),
                    row: row_idx,
                    col: col_idx,
                })?);
            }
        }

        if probe_ids.is_empty() {
            return Err(MethylError::EmptyData("No probes in TSV".to_string()));
        }

        // Row-major probes × samples buffer
        let assay = DMatrix::from_row_slice(probe_ids.len(), n_samples, &values);
        Self::from_probe_major(assay, probe_ids, sample_ids)
    }

    /// Write the matrix as a probes × samples TSV file (missing values as `NA`).
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "probe_id")?;
        for sample_id in &self.sample_ids {
            write!(writer, "\t{}", sample_id)?;
        }
        writeln!(writer)?;

        for (col, probe_id) in self.probe_ids.iter().enumerate() {
            write!(writer, "{}", probe_id)?;
            for row in 0..self.n_samples() {
                let value = self.data[(row, col)];
                if value.is_nan() {
                    write!(writer, "\tNA")?;
                } else {
                    write!(writer, "\t{}", value)?;
                }
            }
            writeln!(writer)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Get the value at (sample, probe).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[(row, col)]
    }

    /// Number of samples (rows).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Number of probes (columns).
    #[inline]
    pub fn n_probes(&self) -> usize {
        self.data.ncols()
    }

    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    #[inline]
    pub fn probe_ids(&self) -> &[String] {
        &self.probe_ids
    }

    /// Get the underlying dense matrix.
    #[inline]
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Row index of a sample.
    pub fn sample_index(&self, sample_id: &str) -> Option<usize> {
        self.sample_ids.iter().position(|s| s == sample_id)
    }

    /// Column index of a probe.
    pub fn probe_index(&self, probe_id: &str) -> Option<usize> {
        self.probe_ids.iter().position(|p| p == probe_id)
    }

    /// Beta values of one sample across all probes.
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.data.row(row).iter().copied().collect()
    }

    /// Beta values of one probe across all samples.
    pub fn column(&self, col: usize) -> Vec<f64> {
        self.data.column(col).iter().copied().collect()
    }

    /// Whether a sample has at least one missing probe value.
    pub fn row_has_missing(&self, row: usize) -> bool {
        self.data.row(row).iter().any(|v| v.is_nan())
    }

    /// Whether any value in the matrix is missing.
    pub fn has_missing(&self) -> bool {
        self.data.iter().any(|v| v.is_nan())
    }

    /// Subset the matrix to the given samples (by row index), in the given order.
    pub fn subset_samples(&self, indices: &[usize]) -> Result<Self> {
        for &idx in indices {
            if idx >= self.n_samples() {
                return Err(MethylError::InvalidParameter(format!(
                    "Sample index {} out of bounds",
                    idx
                )));
            }
        }
        let data = self.data.select_rows(indices.iter());
        let sample_ids = indices.iter().map(|&i| self.sample_ids[i].clone()).collect();
        Self::new(data, sample_ids, self.probe_ids.clone())
    }

    /// Subset the matrix to the given probes (by column index), in the given order.
    pub fn subset_probes(&self, indices: &[usize]) -> Result<Self> {
        for &idx in indices {
            if idx >= self.n_probes() {
                return Err(MethylError::InvalidParameter(format!(
                    "Probe index {} out of bounds",
                    idx
                )));
            }
        }
        let data = self.data.select_columns(indices.iter());
        let probe_ids = indices.iter().map(|&i| self.probe_ids[i].clone()).collect();
        Self::new(data, self.sample_ids.clone(), probe_ids)
    }

    /// Subset to the named probes, failing on any unknown identifier.
    pub fn subset_probes_by_id(&self, probe_ids: &[String]) -> Result<Self> {
        let index: HashMap<&str, usize> = self
            .probe_ids
            .iter()
            .enumerate()
            .map(|(i, p)| (p.as_str(), i))
            .collect();
        let indices = probe_ids
            .iter()
            .map(|p| {
                index.get(p.as_str()).copied().ok_or_else(|| {
                    MethylError::InvalidParameter(format!("Probe '{}' not in matrix", p))
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        self.subset_probes(&indices)
    }
}

pub(crate) fn parse_beta(raw: &str) -> Option<f64> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("na") || raw.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    raw.parse::<f64>().ok()
}

fn ensure_unique(ids: &[String], kind: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(MethylError::DuplicateKey(format!("{} '{}'", kind, id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_matrix() -> BetaMatrix {
        // 3 samples × 4 probes
        let data = DMatrix::from_row_slice(
            3,
            4,
            &[
                0.1, 0.2, 0.3, 0.4, //
                0.5, f64::NAN, 0.7, 0.8, //
                0.9, 0.8, 0.7, 0.6,
            ],
        );
        let sample_ids = vec!["s1".to_string(), "s2".to_string(), "s3".to_string()];
        let probe_ids = (1..=4).map(|i| format!("cg{:08}", i)).collect();
        BetaMatrix::new(data, sample_ids, probe_ids).unwrap()
    }

    #[test]
    fn test_dimensions() {
        let mat = create_test_matrix();
        assert_eq!(mat.n_samples(), 3);
        assert_eq!(mat.n_probes(), 4);
        assert!(mat.has_missing());
        assert!(mat.row_has_missing(1));
        assert!(!mat.row_has_missing(0));
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let data = DMatrix::zeros(2, 1);
        let result = BetaMatrix::new(
            data,
            vec!["s1".to_string(), "s1".to_string()],
            vec!["cg1".to_string()],
        );
        assert!(matches!(result, Err(MethylError::DuplicateKey(_))));
    }

    #[test]
    fn test_from_tsv_transposes() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "probe_id\tA\tB").unwrap();
        writeln!(file, "cg1\t0.1\t0.2").unwrap();
        writeln!(file, "cg2\tNA\t0.4").unwrap();
        writeln!(file, "cg3\t0.5\t").unwrap();
        file.flush().unwrap();

        let mat = BetaMatrix::from_tsv(file.path()).unwrap();
        assert_eq!(mat.n_samples(), 2);
        assert_eq!(mat.n_probes(), 3);
        assert_eq!(mat.sample_ids(), &["A".to_string(), "B".to_string()]);
        assert_eq!(mat.get(1, 0), 0.2);
        assert!(mat.get(0, 1).is_nan());
        assert!(mat.get(1, 2).is_nan());
        assert_eq!(mat.column(1)[1], 0.4);
    }

    #[test]
    fn test_invalid_value() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "probe_id\tA").unwrap();
        writeln!(file, "cg1\tabc").unwrap();
        file.flush().unwrap();

        let result = BetaMatrix::from_tsv(file.path());
        assert!(matches!(result, Err(MethylError::InvalidValue { .. })));
    }

    #[test]
    fn test_tsv_roundtrip_keeps_missing() {
        let mat = create_test_matrix();
        let file = NamedTempFile::new().unwrap();
        mat.to_tsv(file.path()).unwrap();
        let back = BetaMatrix::from_tsv(file.path()).unwrap();
        assert_eq!(back.probe_ids(), mat.probe_ids());
        assert!(back.get(1, 1).is_nan());
        assert_eq!(back.get(2, 3), 0.6);
    }

    #[test]
    fn test_subsets() {
        let mat = create_test_matrix();
        let rows = mat.subset_samples(&[2, 0]).unwrap();
        assert_eq!(rows.sample_ids(), &["s3".to_string(), "s1".to_string()]);
        assert_eq!(rows.get(0, 0), 0.9);

        let cols = mat.subset_probes(&[3]).unwrap();
        assert_eq!(cols.n_probes(), 1);
        assert_eq!(cols.column(0), vec![0.4, 0.8, 0.6]);

        let by_id = mat
            .subset_probes_by_id(&["cg00000002".to_string()])
            .unwrap();
        assert_eq!(by_id.probe_ids()[0], "cg00000002");
        assert!(mat.subset_samples(&[5]).is_err());
        assert!(mat.subset_probes_by_id(&["missing".to_string()]).is_err());
    }
}
