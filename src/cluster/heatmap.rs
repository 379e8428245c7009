//! Clustered heatmap of relevant-gene methylation across samples.

use crate::cluster::hclust::{complete_linkage, correlation_distance, Dendrogram};
use crate::data::{BetaMatrix, TissueType};
use crate::error::{MethylError, Result};
use crate::select::RelevantGene;
use nalgebra::DMatrix;
use plotters::prelude::*;
use std::path::Path;
use tracing::debug;

/// Display range of row z-scores.
const Z_LIMIT: f64 = 3.0;

const TUMOR_COLOR: RGBColor = RGBColor(215, 48, 39);
const NORMAL_COLOR: RGBColor = RGBColor(69, 117, 180);

/// Genes × samples z-scores with both dendrograms, ready to draw.
#[derive(Debug, Clone)]
pub struct Heatmap {
    /// Row labels (gene symbols).
    pub genes: Vec<String>,
    pub probe_ids: Vec<String>,
    pub sample_ids: Vec<String>,
    pub tissue: Vec<TissueType>,
    /// Row-standardized values, clamped to ±3, genes × samples.
    pub z: DMatrix<f64>,
    pub gene_tree: Dendrogram,
    pub sample_tree: Dendrogram,
}

/// Cluster the relevant-gene columns of `betas` by complete linkage on
/// correlation distance, genes and samples separately.
pub fn cluster_heatmap(
    betas: &BetaMatrix,
    genes: &[RelevantGene],
    tissue: &[TissueType],
) -> Result<Heatmap> {
    if genes.is_empty() {
        return Err(MethylError::EmptyData(
            "No relevant genes to cluster".to_string(),
        ));
    }
    if tissue.len() != betas.n_samples() {
        return Err(MethylError::DimensionMismatch {
            expected: betas.n_samples(),
            actual: tissue.len(),
        });
    }

    let probe_ids: Vec<String> = genes.iter().map(|g| g.probe_id.clone()).collect();
    let subset = betas.subset_probes_by_id(&probe_ids)?;
    if subset.has_missing() {
        return Err(MethylError::Numerical(
            "Heatmap input contains missing values".to_string(),
        ));
    }
    let values = subset.data().transpose();

    let gene_tree = complete_linkage(&correlation_distance(&values))?;
    let sample_tree = complete_linkage(&correlation_distance(&values.transpose()))?;
    debug!(
        "Clustered {} genes x {} samples",
        values.nrows(),
        values.ncols()
    );

    Ok(Heatmap {
        genes: genes.iter().map(|g| g.symbol.clone()).collect(),
        probe_ids,
        sample_ids: subset.sample_ids().to_vec(),
        tissue: tissue.to_vec(),
        z: row_z_scores(&values),
        gene_tree,
        sample_tree,
    })
}

/// Standardize each row to mean 0, sd 1 (n - 1 denominator). Constant rows
/// become zero.
fn row_z_scores(x: &DMatrix<f64>) -> DMatrix<f64> {
    let mut z = x.clone();
    let n = x.ncols();
    for mut row in z.row_iter_mut() {
        let mean = row.iter().sum::<f64>() / n as f64;
        let var = if n > 1 {
            row.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        let sd = var.sqrt();
        for v in row.iter_mut() {
            *v = if sd > 0.0 {
                ((*v - mean) / sd).clamp(-Z_LIMIT, Z_LIMIT)
            } else {
                0.0
            };
        }
    }
    z
}

/// Diverging blue-white-red color for a z-score.
fn z_color(z: f64) -> RGBColor {
    let t = ((z + Z_LIMIT) / (2.0 * Z_LIMIT)).clamp(0.0, 1.0);
    let lerp = |a: u8, b: u8, s: f64| (a as f64 + (b as f64 - a as f64) * s).round() as u8;
    let (blue, white, red) = ((49, 54, 149), (255, 255, 255), (165, 0, 38));
    let (from, to, s) = if t < 0.5 {
        (blue, white, t * 2.0)
    } else {
        (white, red, (t - 0.5) * 2.0)
    };
    RGBColor(lerp(from.0, to.0, s), lerp(from.1, to.1, s), lerp(from.2, to.2, s))
}

/// U-shaped links of a dendrogram as (leaf position, height) polylines.
fn dendrogram_links(tree: &Dendrogram) -> Vec<[(f64, f64); 4]> {
    let n = tree.n_leaves();
    let mut position = vec![0.0; n + tree.merges.len()];
    let mut height = vec![0.0; n + tree.merges.len()];
    for (slot, leaf) in tree.order.iter().enumerate() {
        position[*leaf] = slot as f64 + 0.5;
    }

    tree.merges
        .iter()
        .zip(&tree.heights)
        .enumerate()
        .map(|(i, ([a, b], h))| {
            position[n + i] = (position[*a] + position[*b]) / 2.0;
            height[n + i] = *h;
            [
                (position[*a], height[*a]),
                (position[*a], *h),
                (position[*b], *h),
                (position[*b], height[*b]),
            ]
        })
        .collect()
}

impl Heatmap {
    pub fn n_genes(&self) -> usize {
        self.z.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.z.ncols()
    }

    /// Draw the heatmap as SVG: sample dendrogram and tissue strip on top,
    /// gene dendrogram on the left, gene labels on the right, color key below.
    pub fn render_svg<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let cell_w = (800 / self.n_samples().max(1)).clamp(2, 14) as i32;
        let cell_h = (500 / self.n_genes().max(1)).clamp(8, 20) as i32;
        let dendro = 90;
        let strip = 12;
        let x0 = dendro + 20;
        let y0 = dendro + strip + 24;
        let heat_w = cell_w * self.n_samples() as i32;
        let heat_h = cell_h * self.n_genes() as i32;
        let width = (x0 + heat_w + 140) as u32;
        let height = (y0 + heat_h + 80) as u32;

        let root = SVGBackend::new(path.as_ref(), (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(MethylError::plot)?;

        for (col, &sample) in self.sample_tree.order.iter().enumerate() {
            let x = x0 + col as i32 * cell_w;
            let color = match self.tissue[sample] {
                TissueType::PrimaryTumor => TUMOR_COLOR,
                TissueType::SolidTissueNormal => NORMAL_COLOR,
            };
            root.draw(&Rectangle::new(
                [(x, dendro + 14), (x + cell_w, dendro + 14 + strip)],
                color.filled(),
            ))
            .map_err(MethylError::plot)?;

            for (row, &gene) in self.gene_tree.order.iter().enumerate() {
                let y = y0 + row as i32 * cell_h;
                root.draw(&Rectangle::new(
                    [(x, y), (x + cell_w, y + cell_h)],
                    z_color(self.z[(gene, sample)]).filled(),
                ))
                .map_err(MethylError::plot)?;
            }
        }

        let label_font = ("sans-serif", (cell_h - 2).clamp(8, 14) as f64).into_font();
        for (row, &gene) in self.gene_tree.order.iter().enumerate() {
            root.draw(&Text::new(
                self.genes[gene].clone(),
                (x0 + heat_w + 6, y0 + row as i32 * cell_h + cell_h / 4),
                label_font.clone(),
            ))
            .map_err(MethylError::plot)?;
        }

        let sample_max = self.sample_tree.heights.last().copied().unwrap_or(0.0);
        for link in dendrogram_links(&self.sample_tree) {
            let points: Vec<(i32, i32)> = link
                .iter()
                .map(|(p, h)| {
                    let x = x0 + (p * cell_w as f64) as i32;
                    let y = dendro + 10 - scale(*h, sample_max, dendro);
                    (x, y)
                })
                .collect();
            root.draw(&PathElement::new(points, BLACK.stroke_width(1)))
                .map_err(MethylError::plot)?;
        }

        let gene_max = self.gene_tree.heights.last().copied().unwrap_or(0.0);
        for link in dendrogram_links(&self.gene_tree) {
            let points: Vec<(i32, i32)> = link
                .iter()
                .map(|(p, h)| {
                    let x = dendro + 10 - scale(*h, gene_max, dendro);
                    let y = y0 + (p * cell_h as f64) as i32;
                    (x, y)
                })
                .collect();
            root.draw(&PathElement::new(points, BLACK.stroke_width(1)))
                .map_err(MethylError::plot)?;
        }

        // Color key.
        let key_y = y0 + heat_h + 30;
        let steps = 60;
        for s in 0..steps {
            let z = -Z_LIMIT + 2.0 * Z_LIMIT * (s as f64 + 0.5) / steps as f64;
            let x = x0 + s * 3;
            root.draw(&Rectangle::new([(x, key_y), (x + 3, key_y + 12)], z_color(z).filled()))
                .map_err(MethylError::plot)?;
        }
        let key_font = ("sans-serif", 11.0).into_font();
        for (text, offset) in [("-3", 0), ("0", steps * 3 / 2), ("3", steps * 3)] {
            root.draw(&Text::new(text, (x0 + offset - 4, key_y + 16), key_font.clone()))
                .map_err(MethylError::plot)?;
        }
        root.draw(&Text::new("row z-score", (x0 + steps * 3 + 12, key_y), key_font.clone()))
            .map_err(MethylError::plot)?;

        for (i, (label, color)) in [("Primary Tumor", TUMOR_COLOR), ("Solid Tissue Normal", NORMAL_COLOR)]
            .into_iter()
            .enumerate()
        {
            let x = x0 + steps * 3 + 110 + i as i32 * 150;
            root.draw(&Rectangle::new([(x, key_y), (x + 12, key_y + 12)], color.filled()))
                .map_err(MethylError::plot)?;
            root.draw(&Text::new(label, (x + 16, key_y), key_font.clone()))
                .map_err(MethylError::plot)?;
        }

        root.present().map_err(MethylError::plot)?;
        Ok(())
    }
}

/// Pixel length of a dendrogram height within `extent` pixels.
fn scale(h: f64, max: f64, extent: i32) -> i32 {
    if max > 0.0 {
        (h / max * extent as f64) as i32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn betas() -> BetaMatrix {
        // 6 samples, 3 probes; cg1 and cg2 move together.
        let rows: [[f64; 3]; 6] = [
            [0.9, 0.8, 0.5],
            [0.85, 0.82, 0.4],
            [0.8, 0.7, 0.6],
            [0.2, 0.1, 0.5],
            [0.15, 0.2, 0.45],
            [0.1, 0.15, 0.55],
        ];
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        BetaMatrix::new(
            DMatrix::from_row_slice(6, 3, &flat),
            (0..6).map(|i| format!("S{}", i)).collect(),
            vec!["cg1".into(), "cg2".into(), "cg3".into()],
        )
        .unwrap()
    }

    fn genes(ids: &[&str]) -> Vec<RelevantGene> {
        ids.iter()
            .map(|id| RelevantGene {
                probe_id: id.to_string(),
                symbol: format!("G{}", id),
                coefficient: 1.0,
            })
            .collect()
    }

    fn tissue() -> Vec<TissueType> {
        let mut t = vec![TissueType::PrimaryTumor; 3];
        t.extend(vec![TissueType::SolidTissueNormal; 3]);
        t
    }

    #[test]
    fn test_row_z_scores() {
        let x = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 5.0, 5.0, 5.0]);
        let z = row_z_scores(&x);
        assert_relative_eq!(z[(0, 0)], -1.0);
        assert_relative_eq!(z[(0, 2)], 1.0);
        assert_eq!(z[(1, 1)], 0.0);
    }

    #[test]
    fn test_z_color_endpoints() {
        assert_eq!(z_color(0.0), RGBColor(255, 255, 255));
        assert_eq!(z_color(-10.0), RGBColor(49, 54, 149));
        assert_eq!(z_color(10.0), RGBColor(165, 0, 38));
    }

    #[test]
    fn test_cluster_heatmap_groups_tissues() {
        let heatmap = cluster_heatmap(&betas(), &genes(&["cg1", "cg2", "cg3"]), &tissue()).unwrap();
        assert_eq!(heatmap.n_genes(), 3);
        assert_eq!(heatmap.n_samples(), 6);
        assert_eq!(heatmap.gene_tree.merges[0], [0, 1]);

        // The last sample merge joins the tumor and normal groups.
        let n = heatmap.n_samples();
        let [a, b] = heatmap.sample_tree.merges[n - 2];
        let mut left = heatmap.sample_tree.leaves(a);
        let mut right = heatmap.sample_tree.leaves(b);
        left.sort_unstable();
        right.sort_unstable();
        let mut groups = vec![left, right];
        groups.sort();
        assert_eq!(groups, vec![vec![0, 1, 2], vec![3, 4, 5]]);
        assert!(heatmap.z.iter().all(|v| v.abs() <= Z_LIMIT));
    }

    #[test]
    fn test_render_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heatmap.svg");
        let heatmap = cluster_heatmap(&betas(), &genes(&["cg1", "cg3"]), &tissue()).unwrap();
        heatmap.render_svg(&path).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Gcg3"));
    }

    #[test]
    fn test_no_genes() {
        assert!(cluster_heatmap(&betas(), &[], &tissue()).is_err());
    }
}
