//! Two-group log-rank test.

use crate::error::{MethylError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use tracing::warn;

/// Log-rank comparison of two survival groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRankTest {
    /// Chi-squared statistic, 1 degree of freedom.
    pub statistic: f64,
    pub p_value: f64,
    /// Observed events in (group A, group B).
    pub observed: [usize; 2],
    /// Expected events under equal hazards.
    pub expected: [f64; 2],
    pub variance: f64,
}

/// Compare survival between `in_a == true` and `in_a == false` subjects.
///
/// When no event time has subjects of both groups at risk the variance is
/// zero; the test then reports a statistic of 0 and a p-value of 1.
pub fn log_rank(times: &[f64], events: &[bool], in_a: &[bool]) -> Result<LogRankTest> {
    let n = times.len();
    if events.len() != n || in_a.len() != n {
        return Err(MethylError::DimensionMismatch {
            expected: n,
            actual: if events.len() != n { events.len() } else { in_a.len() },
        });
    }
    let n_a = in_a.iter().filter(|a| **a).count();
    if n_a == 0 || n_a == n {
        return Err(MethylError::Survival(
            "Log-rank test needs subjects in both groups".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| times[a].total_cmp(&times[b]));

    let mut at_risk = [n_a as f64, (n - n_a) as f64];
    let mut observed = [0usize; 2];
    let mut expected = [0.0f64; 2];
    let mut variance = 0.0;

    let mut i = 0;
    while i < n {
        let t = times[order[i]];
        let mut deaths = [0usize; 2];
        let mut leaving = [0usize; 2];
        while i < n && times[order[i]] == t {
            let g = if in_a[order[i]] { 0 } else { 1 };
            if events[order[i]] {
                deaths[g] += 1;
            }
            leaving[g] += 1;
            i += 1;
        }

        let d = (deaths[0] + deaths[1]) as f64;
        let total = at_risk[0] + at_risk[1];
        if d > 0.0 {
            for g in 0..2 {
                observed[g] += deaths[g];
                expected[g] += d * at_risk[g] / total;
            }
            if total > 1.0 {
                variance += d * (at_risk[0] / total) * (at_risk[1] / total) * (total - d)
                    / (total - 1.0);
            }
        }
        at_risk[0] -= leaving[0] as f64;
        at_risk[1] -= leaving[1] as f64;
    }

    if !variance.is_finite() {
        return Err(MethylError::Numerical("Log-rank variance is not finite".to_string()));
    }
    if variance <= 0.0 {
        warn!(
            "Log-rank variance is zero ({} events); reporting p = 1",
            observed[0] + observed[1]
        );
        return Ok(LogRankTest {
            statistic: 0.0,
            p_value: 1.0,
            observed,
            expected,
            variance: 0.0,
        });
    }

    let statistic = (observed[0] as f64 - expected[0]).powi(2) / variance;
    let chi_sq = ChiSquared::new(1.0)
        .map_err(|e| MethylError::Numerical(format!("chi-squared distribution: {}", e)))?;
    let p_value = 1.0 - chi_sq.cdf(statistic);

    Ok(LogRankTest {
        statistic,
        p_value,
        observed,
        expected,
        variance,
    })
}
