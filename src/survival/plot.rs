//! Kaplan-Meier plots with a risk table.

use crate::error::{MethylError, Result};
use crate::survival::{GeneSurvival, KaplanMeier};
use plotters::prelude::*;
use std::path::Path;

const HYPER_COLOR: RGBColor = RGBColor(200, 30, 45);
const HYPO_COLOR: RGBColor = RGBColor(30, 90, 180);

const WIDTH: u32 = 800;
const HEIGHT: u32 = 640;
const TABLE_HEIGHT: u32 = 130;

/// Number of time points in the risk table.
const RISK_TICKS: usize = 5;

/// Draw HYPER and HYPO survival curves with censor ticks, the log-rank
/// p-value and the numbers at risk below the axes.
pub fn render_survival_svg<P: AsRef<Path>>(result: &GeneSurvival, path: P) -> Result<()> {
    let root = SVGBackend::new(path.as_ref(), (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(MethylError::plot)?;
    let (upper, lower) = root.split_vertically((HEIGHT - TABLE_HEIGHT) as i32);

    let t_max = result
        .hyper
        .times
        .iter()
        .chain(&result.hypo.times)
        .fold(0.0f64, |a, b| a.max(*b))
        .max(1.0);

    let mut chart = ChartBuilder::on(&upper)
        .caption(
            format!("{} ({})", result.symbol, result.probe_id),
            ("sans-serif", 24.0),
        )
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..t_max * 1.05, 0.0..1.05)
        .map_err(MethylError::plot)?;

    chart
        .configure_mesh()
        .x_desc("Days")
        .y_desc("Overall survival probability")
        .x_labels(6)
        .y_labels(6)
        .disable_mesh()
        .draw()
        .map_err(MethylError::plot)?;

    let groups: [(&str, &KaplanMeier, usize, RGBColor); 2] = [
        ("HYPER", &result.hyper, result.n_hyper, HYPER_COLOR),
        ("HYPO", &result.hypo, result.n_hypo, HYPO_COLOR),
    ];

    for (name, curve, n, color) in groups {
        let mut steps = curve.steps();
        // Carry the last level to the final follow-up.
        if let (Some(&t), Some(&s)) = (curve.times.last(), curve.survival.last()) {
            steps.push((t, s));
        }
        chart
            .draw_series(LineSeries::new(steps, color.stroke_width(2)))
            .map_err(MethylError::plot)?
            .label(format!("{} (n={})", name, n))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

        chart
            .draw_series(curve.censor_marks().into_iter().map(|(t, s)| {
                EmptyElement::at((t, s))
                    + PathElement::new(vec![(0, -5), (0, 5)], color.stroke_width(1))
            }))
            .map_err(MethylError::plot)?;
    }

    chart
        .draw_series(std::iter::once(Text::new(
            format!("log-rank p = {}", format_p(result.log_rank.p_value)),
            (t_max * 0.05, 0.12),
            ("sans-serif", 18.0).into_font(),
        )))
        .map_err(MethylError::plot)?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(MethylError::plot)?;

    // Risk table, aligned with the x axis of the chart.
    let font = ("sans-serif", 14.0).into_font();
    lower
        .draw(&Text::new("Number at risk", (10, 8), font.clone()))
        .map_err(MethylError::plot)?;
    for (row, (name, curve, _, color)) in groups.iter().enumerate() {
        let y = 36 + row as i32 * 28;
        lower
            .draw(&Text::new(*name, (10, y), font.clone().color(color)))
            .map_err(MethylError::plot)?;
        for k in 0..RISK_TICKS {
            let t = t_max * k as f64 / (RISK_TICKS - 1) as f64;
            let (x, _) = chart.backend_coord(&(t, 0.0));
            lower
                .draw(&Text::new(
                    curve.at_risk_at(t).to_string(),
                    (x - 6, y),
                    font.clone(),
                ))
                .map_err(MethylError::plot)?;
        }
    }

    root.present().map_err(MethylError::plot)?;
    Ok(())
}

fn format_p(p: f64) -> String {
    if p < 1e-4 {
        format!("{:.2e}", p)
    } else {
        format!("{:.4}", p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survival::{kaplan_meier, log_rank};

    #[test]
    fn test_format_p() {
        assert_eq!(format_p(0.04321), "0.0432");
        assert_eq!(format_p(0.00001234), "1.23e-5");
    }

    #[test]
    fn test_render() {
        let hyper_t = [100.0, 200.0, 300.0, 400.0];
        let hypo_t = [150.0, 900.0, 1200.0, 1500.0];
        let hyper_e = [true, true, false, true];
        let hypo_e = [true, false, false, false];
        let times: Vec<f64> = hyper_t.iter().chain(&hypo_t).copied().collect();
        let events: Vec<bool> = hyper_e.iter().chain(&hypo_e).copied().collect();
        let in_a: Vec<bool> = (0..8).map(|i| i < 4).collect();

        let result = GeneSurvival {
            probe_id: "cg0001".to_string(),
            symbol: "RASSF1".to_string(),
            median_beta: 0.5,
            n_hyper: 4,
            n_hypo: 4,
            hyper: kaplan_meier(&hyper_t, &hyper_e).unwrap(),
            hypo: kaplan_meier(&hypo_t, &hypo_e).unwrap(),
            log_rank: log_rank(&times, &events, &in_a).unwrap(),
            plot_file: "RASSF1_survival.svg".to_string(),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(&result.plot_file);
        render_survival_svg(&result, &path).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("RASSF1"));
        assert!(svg.contains("log-rank p"));
        assert!(svg.contains("Number at risk"));
    }
}
