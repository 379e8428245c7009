//! Kaplan-Meier product-limit estimator.

use crate::error::{MethylError, Result};
use serde::{Deserialize, Serialize};

/// Survival curve evaluated at each distinct observed time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KaplanMeier {
    /// Distinct times, ascending.
    pub times: Vec<f64>,
    /// S(t) just after each time.
    pub survival: Vec<f64>,
    /// Subjects with follow-up ≥ t.
    pub n_at_risk: Vec<usize>,
    pub n_events: Vec<usize>,
    pub n_censored: Vec<usize>,
    /// Total subjects.
    pub n: usize,
}

/// Fit a Kaplan-Meier curve to `(time, event)` pairs.
pub fn kaplan_meier(times: &[f64], events: &[bool]) -> Result<KaplanMeier> {
    if times.len() != events.len() {
        return Err(MethylError::DimensionMismatch {
            expected: times.len(),
            actual: events.len(),
        });
    }
    if times.is_empty() {
        return Err(MethylError::Survival("No subjects for Kaplan-Meier".to_string()));
    }
    if times.iter().any(|t| !t.is_finite() || *t < 0.0) {
        return Err(MethylError::Survival(
            "Survival times must be finite and non-negative".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by(|&a, &b| times[a].total_cmp(&times[b]));

    let mut curve = KaplanMeier {
        times: Vec::new(),
        survival: Vec::new(),
        n_at_risk: Vec::new(),
        n_events: Vec::new(),
        n_censored: Vec::new(),
        n: times.len(),
    };

    let mut at_risk = times.len();
    let mut s = 1.0;
    let mut i = 0;
    while i < order.len() {
        let t = times[order[i]];
        let mut events_here = 0;
        let mut censored_here = 0;
        while i < order.len() && times[order[i]] == t {
            if events[order[i]] {
                events_here += 1;
            } else {
                censored_here += 1;
            }
            i += 1;
        }

        s *= 1.0 - events_here as f64 / at_risk as f64;
        curve.times.push(t);
        curve.survival.push(s);
        curve.n_at_risk.push(at_risk);
        curve.n_events.push(events_here);
        curve.n_censored.push(censored_here);
        at_risk -= events_here + censored_here;
    }

    Ok(curve)
}

impl KaplanMeier {
    /// S(t), right-continuous; 1 before the first time.
    pub fn survival_at(&self, t: f64) -> f64 {
        match self.times.iter().rposition(|&u| u <= t) {
            Some(k) => self.survival[k],
            None => 1.0,
        }
    }

    /// Subjects still under observation at `t`.
    pub fn at_risk_at(&self, t: f64) -> usize {
        match self.times.iter().position(|&u| u >= t) {
            Some(k) => self.n_at_risk[k],
            None => 0,
        }
    }

    /// Times at which at least one subject was censored, with S(t) there.
    pub fn censor_marks(&self) -> Vec<(f64, f64)> {
        self.times
            .iter()
            .zip(&self.survival)
            .zip(&self.n_censored)
            .filter(|(_, c)| **c > 0)
            .map(|((t, s), _)| (*t, *s))
            .collect()
    }

    /// Step-function vertices starting at (0, 1), for drawing.
    pub fn steps(&self) -> Vec<(f64, f64)> {
        let mut points = vec![(0.0, 1.0)];
        let mut last = 1.0;
        for (t, s) in self.times.iter().zip(&self.survival) {
            points.push((*t, last));
            points.push((*t, *s));
            last = *s;
        }
        points
    }

    /// Smallest time with S(t) ≤ 0.5, if reached.
    pub fn median_survival(&self) -> Option<f64> {
        self.times
            .iter()
            .zip(&self.survival)
            .find(|(_, s)| **s <= 0.5)
            .map(|(t, _)| *t)
    }

    pub fn total_events(&self) -> usize {
        self.n_events.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_textbook_curve() {
        // Times 1, 2+, 3, 3, 4+, 5.
        let times = [1.0, 2.0, 3.0, 3.0, 4.0, 5.0];
        let events = [true, false, true, true, false, true];
        let km = kaplan_meier(&times, &events).unwrap();

        assert_eq!(km.times, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(km.n_at_risk, vec![6, 5, 4, 2, 1]);
        assert_relative_eq!(km.survival[0], 5.0 / 6.0);
        assert_relative_eq!(km.survival[1], 5.0 / 6.0);
        assert_relative_eq!(km.survival[2], 5.0 / 6.0 * 0.5);
        assert_relative_eq!(km.survival[4], 0.0);
        assert_eq!(km.total_events(), 4);
        assert_eq!(km.median_survival(), Some(3.0));
    }

    #[test]
    fn test_queries() {
        let km = kaplan_meier(&[10.0, 20.0, 30.0], &[true, false, true]).unwrap();
        assert_eq!(km.survival_at(5.0), 1.0);
        assert_relative_eq!(km.survival_at(15.0), 2.0 / 3.0);
        assert_eq!(km.at_risk_at(15.0), 2);
        assert_eq!(km.at_risk_at(31.0), 0);
        let marks = km.censor_marks();
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].0, 20.0);
        assert_relative_eq!(marks[0].1, 2.0 / 3.0);
        assert_eq!(km.steps()[0], (0.0, 1.0));
    }

    #[test]
    fn test_all_censored() {
        let km = kaplan_meier(&[1.0, 2.0], &[false, false]).unwrap();
        assert!(km.survival.iter().all(|s| *s == 1.0));
        assert_eq!(km.median_survival(), None);
    }

    #[test]
    fn test_invalid_input() {
        assert!(kaplan_meier(&[], &[]).is_err());
        assert!(kaplan_meier(&[1.0], &[true, false]).is_err());
        assert!(kaplan_meier(&[-1.0], &[true]).is_err());
    }
}
