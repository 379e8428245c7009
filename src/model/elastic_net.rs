//! Elastic Net penalized logistic regression with cross-validated lambda.
//!
//! Fits the binomial model
//!
//! ```text
//! min_{b0, β}  -(1/n) loglik(b0, β) + λ [ (1 - α)/2 ||β||² + α ||β||₁ ]
//! ```
//!
//! over a decreasing path of λ values, following the glmnet recipe:
//!
//! 1. Columns are standardized (population sd); coefficients are reported on
//!    the original scale. Constant columns keep a zero coefficient.
//! 2. Each λ is solved by IRLS. The weighted least-squares subproblem is
//!    solved by cyclic coordinate descent with soft-thresholding, iterating on
//!    the active set between full passes.
//! 3. A sequential strong rule screens columns before each λ; KKT conditions
//!    are checked afterwards and violators are added back.
//! 4. The path stops once the deviance ratio exceeds 0.999.
//! 5. K-fold cross-validation over the path selects `lambda_min`, the λ with
//!    the smallest mean held-out binomial deviance.
//!
//! # Example
//!
//! ```ignore
//! use brca_methylation::model::{cv_elastic_net, ElasticNetConfig};
//!
//! let fit = cv_elastic_net(&train, &labels, &ElasticNetConfig::default())?;
//! let predicted = fit.predict(&test)?;
//! ```

use crate::data::{BetaMatrix, TissueType};
use crate::error::{MethylError, Result};
use crate::model::Classifier;
use nalgebra::DMatrix;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Probabilities are clamped to [PMIN, 1 - PMIN] for weights and deviance.
const PMIN: f64 = 1e-5;
/// Path stops once this fraction of null deviance is explained.
const MAX_DEV_RATIO: f64 = 0.999;
/// IRLS stops once the penalized objective changes by less than this, relatively.
const OBJECTIVE_TOLERANCE: f64 = 1e-9;
/// Step halvings tried before an IRLS step is abandoned.
const MAX_HALVINGS: usize = 30;

/// Configuration for the cross-validated Elastic Net fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticNetConfig {
    /// Mixing parameter: 1 = lasso, 0 = ridge.
    pub alpha: f64,
    /// Number of cross-validation folds (clamped to the sample count, minimum 3).
    pub n_folds: usize,
    /// Length of the λ path.
    pub n_lambda: usize,
    /// Smallest λ as a fraction of λ_max. `None` picks 0.01 when n < p, else 1e-4.
    pub lambda_min_ratio: Option<f64>,
    /// Coordinate descent convergence threshold.
    pub tolerance: f64,
    /// Maximum coordinate descent passes per λ before failing.
    pub max_passes: usize,
    /// Maximum IRLS iterations per λ; the path ends early when exceeded.
    pub max_irls: usize,
    /// Seed for fold assignment.
    pub seed: u64,
}

impl Default for ElasticNetConfig {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            n_folds: 10,
            n_lambda: 100,
            lambda_min_ratio: None,
            tolerance: 1e-7,
            max_passes: 100_000,
            max_irls: 50,
            seed: 42,
        }
    }
}

impl ElasticNetConfig {
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }

    pub fn with_n_lambda(mut self, n_lambda: usize) -> Self {
        self.n_lambda = n_lambda;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(MethylError::InvalidParameter(
                "alpha must be between 0 and 1".to_string(),
            ));
        }
        if self.n_lambda < 2 {
            return Err(MethylError::InvalidParameter(
                "n_lambda must be at least 2".to_string(),
            ));
        }
        if let Some(ratio) = self.lambda_min_ratio {
            if !(0.0 < ratio && ratio < 1.0) {
                return Err(MethylError::InvalidParameter(
                    "lambda_min_ratio must be in (0, 1)".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// A cross-validated Elastic Net classifier at the selected λ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticNetFit {
    /// Probe identifiers, aligned with `coefficients`.
    pub probe_ids: Vec<String>,
    /// Coefficients on the original beta-value scale.
    pub coefficients: Vec<f64>,
    /// Intercept on the original scale.
    pub intercept: f64,
    /// Selected λ (`lambda_min`).
    pub lambda: f64,
    /// Largest λ within one standard error of the minimum CV deviance.
    pub lambda_1se: f64,
    /// λ values actually fitted.
    pub lambda_path: Vec<f64>,
    /// Mean cross-validated deviance per λ.
    pub cv_deviance: Vec<f64>,
    /// Standard error of the CV deviance per λ.
    pub cv_std_error: Vec<f64>,
    /// Number of folds used.
    pub n_folds: usize,
    /// Mixing parameter.
    pub alpha: f64,
}

impl ElasticNetFit {
    /// Probes with a non-zero coefficient, in column order.
    pub fn nonzero(&self) -> Vec<(&str, f64)> {
        self.probe_ids
            .iter()
            .zip(&self.coefficients)
            .filter(|(_, c)| **c != 0.0)
            .map(|(p, c)| (p.as_str(), *c))
            .collect()
    }

    pub fn n_nonzero(&self) -> usize {
        self.coefficients.iter().filter(|c| **c != 0.0).count()
    }

    /// Index of the selected λ within the path.
    pub fn lambda_index(&self) -> usize {
        self.lambda_path
            .iter()
            .position(|l| *l == self.lambda)
            .unwrap_or(0)
    }

    /// Probability of `PrimaryTumor` for each sample of `x`.
    pub fn predict_proba(&self, x: &BetaMatrix) -> Result<Vec<f64>> {
        let aligned;
        let x = if x.probe_ids() == self.probe_ids.as_slice() {
            x
        } else {
            aligned = x.subset_probes_by_id(&self.probe_ids)?;
            &aligned
        };
        let support: Vec<(usize, f64)> = self
            .coefficients
            .iter()
            .enumerate()
            .filter(|(_, c)| **c != 0.0)
            .map(|(j, c)| (j, *c))
            .collect();

        Ok((0..x.n_samples())
            .map(|i| {
                let eta = self.intercept
                    + support
                        .iter()
                        .map(|&(j, b)| b * x.get(i, j))
                        .sum::<f64>();
                sigmoid(eta)
            })
            .collect())
    }
}

impl Classifier for ElasticNetFit {
    /// Tumor when the fitted probability exceeds 0.5.
    fn predict(&self, x: &BetaMatrix) -> Result<Vec<TissueType>> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| TissueType::from_response(p > 0.5))
            .collect())
    }
}

/// Fit an Elastic Net logistic model and select λ by K-fold cross-validation.
///
/// # Arguments
/// * `x` - Training beta matrix (samples × probes), no missing values
/// * `labels` - Tissue type per training sample
/// * `config` - Mixing parameter, folds, path length and seed
///
/// # Returns
/// The full-data fit evaluated at `lambda_min`.
pub fn cv_elastic_net(
    x: &BetaMatrix,
    labels: &[TissueType],
    config: &ElasticNetConfig,
) -> Result<ElasticNetFit> {
    config.validate()?;
    let n = x.n_samples();
    let p = x.n_probes();
    if labels.len() != n {
        return Err(MethylError::DimensionMismatch {
            expected: n,
            actual: labels.len(),
        });
    }
    if p == 0 {
        return Err(MethylError::EmptyData("No probes to fit".to_string()));
    }
    if x.has_missing() {
        return Err(MethylError::InvalidParameter(
            "Elastic Net requires a matrix without missing values".to_string(),
        ));
    }
    if n < 3 {
        return Err(MethylError::EmptyData(format!(
            "Cross-validation needs at least 3 samples, got {}",
            n
        )));
    }

    let y: Vec<f64> = labels.iter().map(|l| l.as_response()).collect();
    let full = LogisticProblem::new(x.data(), (0..n).collect(), &y)?;

    let ratio = config
        .lambda_min_ratio
        .unwrap_or(if n < p { 0.01 } else { 1e-4 });
    let lambda_max = full.lambda_max(config.alpha);
    if !(lambda_max > 0.0) {
        return Err(MethylError::Numerical(
            "No probe is associated with the labels (lambda_max = 0)".to_string(),
        ));
    }
    let lambdas: Vec<f64> = (0..config.n_lambda)
        .map(|k| lambda_max * ratio.powf(k as f64 / (config.n_lambda - 1) as f64))
        .collect();

    let path = full.fit_path(&lambdas, config)?;
    let lambdas = lambdas[..path.len()].to_vec();
    debug!(
        "Elastic Net path: {} lambdas, lambda_max = {:.4e}",
        lambdas.len(),
        lambda_max
    );

    // Fold ids: 0..K repeated to length n, then shuffled.
    let n_folds = config.n_folds.clamp(3, n);
    let mut fold_ids: Vec<usize> = (0..n).map(|i| i % n_folds).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    fold_ids.shuffle(&mut rng);

    let fold_deviances: Vec<Vec<f64>> = (0..n_folds)
        .into_par_iter()
        .map(|fold| {
            let train_rows: Vec<usize> = (0..n).filter(|&i| fold_ids[i] != fold).collect();
            let test_rows: Vec<usize> = (0..n).filter(|&i| fold_ids[i] == fold).collect();
            let train_y: Vec<f64> = train_rows.iter().map(|&i| y[i]).collect();

            let problem = LogisticProblem::new(x.data(), train_rows, &train_y)?;
            let fold_path = problem.fit_path(&lambdas, config)?;

            Ok(lambdas
                .iter()
                .enumerate()
                .map(|(l, _)| {
                    // Points past an early-stopped fold path reuse its last solution.
                    let point = &fold_path[l.min(fold_path.len() - 1)];
                    let (b0, beta) = problem.to_original_scale(point);
                    let dev: f64 = test_rows
                        .iter()
                        .map(|&i| {
                            let eta = b0
                                + beta
                                    .iter()
                                    .map(|&(j, b)| b * x.get(i, j))
                                    .sum::<f64>();
                            unit_deviance(y[i], sigmoid(eta))
                        })
                        .sum();
                    dev / test_rows.len() as f64
                })
                .collect())
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let fold_sizes: Vec<f64> = (0..n_folds)
        .map(|f| fold_ids.iter().filter(|&&id| id == f).count() as f64)
        .collect();
    let total: f64 = fold_sizes.iter().sum();

    let mut cv_deviance = Vec::with_capacity(lambdas.len());
    let mut cv_std_error = Vec::with_capacity(lambdas.len());
    for l in 0..lambdas.len() {
        let mean = fold_deviances
            .iter()
            .zip(&fold_sizes)
            .map(|(d, w)| d[l] * w)
            .sum::<f64>()
            / total;
        let var = fold_deviances
            .iter()
            .zip(&fold_sizes)
            .map(|(d, w)| w * (d[l] - mean).powi(2))
            .sum::<f64>()
            / total;
        cv_deviance.push(mean);
        cv_std_error.push((var / (n_folds as f64 - 1.0)).sqrt());
    }

    // First minimum, i.e. the largest λ attaining it.
    let best = cv_deviance
        .iter()
        .enumerate()
        .fold(0, |best, (l, d)| if *d < cv_deviance[best] { l } else { best });
    let bound = cv_deviance[best] + cv_std_error[best];
    let one_se = cv_deviance
        .iter()
        .position(|d| *d <= bound)
        .unwrap_or(best);

    let (intercept, support) = full.to_original_scale(&path[best]);
    let mut coefficients = vec![0.0; p];
    for (j, b) in support {
        coefficients[j] = b;
    }

    debug!(
        "Selected lambda = {:.4e} (index {}), CV deviance = {:.4}",
        lambdas[best], best, cv_deviance[best]
    );

    Ok(ElasticNetFit {
        probe_ids: x.probe_ids().to_vec(),
        coefficients,
        intercept,
        lambda: lambdas[best],
        lambda_1se: lambdas[one_se],
        lambda_path: lambdas,
        cv_deviance,
        cv_std_error,
        n_folds,
        alpha: config.alpha,
    })
}

/// Solution at one λ on the standardized scale; `beta` holds non-zeros only.
#[derive(Debug, Clone)]
struct PathPoint {
    intercept: f64,
    beta: Vec<(usize, f64)>,
}

impl PathPoint {
    fn from_state(state: &State) -> Self {
        Self {
            intercept: state.intercept,
            beta: state
                .beta
                .iter()
                .enumerate()
                .filter(|(_, b)| **b != 0.0)
                .map(|(j, b)| (j, *b))
                .collect(),
        }
    }
}

/// Current iterate on the standardized scale.
struct State {
    intercept: f64,
    beta: Vec<f64>,
}

/// Logistic problem over a subset of rows of a shared matrix.
struct LogisticProblem<'a> {
    x: &'a DMatrix<f64>,
    rows: Vec<usize>,
    y: Vec<f64>,
    means: Vec<f64>,
    /// Population standard deviations; 0 marks a constant column.
    scales: Vec<f64>,
}

impl<'a> LogisticProblem<'a> {
    fn new(x: &'a DMatrix<f64>, rows: Vec<usize>, y: &[f64]) -> Result<Self> {
        let n = rows.len() as f64;
        let ybar = y.iter().sum::<f64>() / n;
        if ybar <= 0.0 || ybar >= 1.0 {
            return Err(MethylError::InvalidParameter(
                "Both tissue types must be present to fit a classifier".to_string(),
            ));
        }

        let (means, scales): (Vec<f64>, Vec<f64>) = (0..x.ncols())
            .into_par_iter()
            .map(|j| {
                let mean = rows.iter().map(|&i| x[(i, j)]).sum::<f64>() / n;
                let var = rows.iter().map(|&i| (x[(i, j)] - mean).powi(2)).sum::<f64>() / n;
                let sd = var.sqrt();
                (mean, if sd > 1e-12 { sd } else { 0.0 })
            })
            .unzip();

        Ok(Self {
            x,
            rows,
            y: y.to_vec(),
            means,
            scales,
        })
    }

    #[inline]
    fn n(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    fn p(&self) -> usize {
        self.means.len()
    }

    /// Standardized value of row `k` (local index) in column `j`.
    #[inline]
    fn xs(&self, k: usize, j: usize) -> f64 {
        (self.x[(self.rows[k], j)] - self.means[j]) / self.scales[j]
    }

    fn lambda_max(&self, alpha: f64) -> f64 {
        let n = self.n() as f64;
        let ybar = self.y.iter().sum::<f64>() / n;
        (0..self.p())
            .into_par_iter()
            .filter(|&j| self.scales[j] > 0.0)
            .map(|j| {
                let g: f64 = (0..self.n()).map(|k| self.xs(k, j) * (self.y[k] - ybar)).sum();
                g.abs() / n
            })
            .reduce(|| 0.0, f64::max)
            / alpha.max(1e-3)
    }

    fn null_deviance(&self) -> f64 {
        let ybar = self.y.iter().sum::<f64>() / self.n() as f64;
        self.y.iter().map(|&yi| unit_deviance(yi, ybar)).sum()
    }

    fn linear_predictor(&self, state: &State) -> Vec<f64> {
        let support: Vec<(usize, f64)> = state
            .beta
            .iter()
            .enumerate()
            .filter(|(_, b)| **b != 0.0)
            .map(|(j, b)| (j, *b))
            .collect();
        (0..self.n())
            .map(|k| {
                state.intercept
                    + support
                        .iter()
                        .map(|&(j, b)| b * self.xs(k, j))
                        .sum::<f64>()
            })
            .collect()
    }

    fn probabilities(&self, state: &State) -> Vec<f64> {
        self.linear_predictor(state)
            .into_iter()
            .map(|eta| sigmoid(eta).clamp(PMIN, 1.0 - PMIN))
            .collect()
    }

    /// |∂ loglik / ∂β_j| / n for every non-constant column.
    fn gradients(&self, prob: &[f64]) -> Vec<f64> {
        let n = self.n() as f64;
        (0..self.p())
            .into_par_iter()
            .map(|j| {
                if self.scales[j] == 0.0 {
                    return 0.0;
                }
                let g: f64 = (0..self.n())
                    .map(|k| self.xs(k, j) * (self.y[k] - prob[k]))
                    .sum();
                g.abs() / n
            })
            .collect()
    }

    fn fit_path(&self, lambdas: &[f64], config: &ElasticNetConfig) -> Result<Vec<PathPoint>> {
        let alpha = config.alpha;
        let ybar = self.y.iter().sum::<f64>() / self.n() as f64;
        let null_dev = self.null_deviance();

        let mut state = State {
            intercept: (ybar / (1.0 - ybar)).ln(),
            beta: vec![0.0; self.p()],
        };
        let mut in_strong = vec![false; self.p()];
        let mut path = Vec::with_capacity(lambdas.len());
        let mut prev_lambda = lambdas[0];

        for &lambda in lambdas {
            // Sequential strong rule screening.
            let grad = self.gradients(&self.probabilities(&state));
            let cutoff = alpha * (2.0 * lambda - prev_lambda);
            for j in 0..self.p() {
                if self.scales[j] > 0.0 && (state.beta[j] != 0.0 || grad[j] >= cutoff) {
                    in_strong[j] = true;
                }
            }

            let converged = loop {
                let strong: Vec<usize> = (0..self.p()).filter(|&j| in_strong[j]).collect();
                if !self.irls(&mut state, &strong, lambda, null_dev, config)? {
                    break false;
                }

                // KKT check on the columns that were screened out.
                let grad = self.gradients(&self.probabilities(&state));
                let violators: Vec<usize> = (0..self.p())
                    .filter(|&j| {
                        !in_strong[j] && self.scales[j] > 0.0 && grad[j] > alpha * lambda * (1.0 + 1e-6)
                    })
                    .collect();
                if violators.is_empty() {
                    break true;
                }
                for j in violators {
                    in_strong[j] = true;
                }
            };

            if !converged {
                warn!(
                    "IRLS did not converge within {} iterations at lambda = {:.4e}; path ends after {} values",
                    config.max_irls,
                    lambda,
                    path.len().max(1)
                );
                if path.is_empty() {
                    path.push(PathPoint::from_state(&state));
                }
                break;
            }

            path.push(PathPoint::from_state(&state));
            prev_lambda = lambda;

            if 1.0 - self.deviance(&state) / null_dev > MAX_DEV_RATIO {
                break;
            }
        }

        Ok(path)
    }

    /// Binomial deviance of the current iterate.
    fn deviance(&self, state: &State) -> f64 {
        self.probabilities(state)
            .iter()
            .zip(&self.y)
            .map(|(&p, &yi)| unit_deviance(yi, p))
            .sum()
    }

    /// Penalized objective minimized at each λ: deviance / 2n plus the elastic net penalty.
    fn objective(&self, state: &State, lambda: f64, alpha: f64) -> (f64, f64) {
        let dev = self.deviance(state);
        let penalty: f64 = state
            .beta
            .iter()
            .map(|b| alpha * b.abs() + 0.5 * (1.0 - alpha) * b * b)
            .sum();
        (dev / (2.0 * self.n() as f64) + lambda * penalty, dev)
    }

    /// Iteratively reweighted least squares restricted to `cols`.
    ///
    /// A step that raises the penalized objective is halved back toward the
    /// previous iterate. Returns `false` when `max_irls` iterations pass
    /// without convergence; the state then holds the best iterate found.
    fn irls(
        &self,
        state: &mut State,
        cols: &[usize],
        lambda: f64,
        null_dev: f64,
        config: &ElasticNetConfig,
    ) -> Result<bool> {
        let alpha = config.alpha;
        let (mut obj, _) = self.objective(state, lambda, alpha);

        for _ in 0..config.max_irls {
            let eta = self.linear_predictor(state);
            let mut weights = Vec::with_capacity(self.n());
            let mut residuals = Vec::with_capacity(self.n());
            for (k, &e) in eta.iter().enumerate() {
                let p = sigmoid(e).clamp(PMIN, 1.0 - PMIN);
                let w = (p * (1.0 - p)).max(PMIN);
                weights.push(w);
                // Working response minus the current linear predictor.
                residuals.push((self.y[k] - p) / w);
            }

            let old_intercept = state.intercept;
            let old_beta = state.beta.clone();

            self.coordinate_descent(state, cols, lambda, config, &weights, &mut residuals)?;

            let (mut new_obj, mut dev) = self.objective(state, lambda, alpha);
            let mut halvings = 0;
            while new_obj > obj * (1.0 + 1e-12) && halvings < MAX_HALVINGS {
                state.intercept = 0.5 * (state.intercept + old_intercept);
                for &j in cols {
                    state.beta[j] = 0.5 * (state.beta[j] + old_beta[j]);
                }
                (new_obj, dev) = self.objective(state, lambda, alpha);
                halvings += 1;
            }
            if new_obj > obj {
                // No descent along this direction; keep the previous iterate.
                state.intercept = old_intercept;
                state.beta = old_beta;
                return Ok(true);
            }

            let delta = cols
                .iter()
                .map(|&j| (state.beta[j] - old_beta[j]).abs())
                .fold((state.intercept - old_intercept).abs(), f64::max);
            let relative = (obj - new_obj).abs() / (new_obj.abs() + 0.1);
            obj = new_obj;
            if delta < 1e-6 || relative < OBJECTIVE_TOLERANCE || 1.0 - dev / null_dev > MAX_DEV_RATIO
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Weighted least-squares elastic net by cyclic coordinate descent.
    fn coordinate_descent(
        &self,
        state: &mut State,
        cols: &[usize],
        lambda: f64,
        config: &ElasticNetConfig,
        weights: &[f64],
        residuals: &mut [f64],
    ) -> Result<()> {
        let n = self.n() as f64;
        let alpha = config.alpha;
        let l1 = lambda * alpha;
        let l2 = lambda * (1.0 - alpha);
        let sum_w: f64 = weights.iter().sum();

        let xv: Vec<f64> = cols
            .iter()
            .map(|&j| {
                (0..self.n())
                    .map(|k| weights[k] * self.xs(k, j).powi(2))
                    .sum::<f64>()
                    / n
            })
            .collect();

        let mut passes = 0usize;
        let mut active: Vec<usize> = Vec::new();
        let mut full_pass = true;

        loop {
            let positions: Vec<usize> = if full_pass {
                (0..cols.len()).collect()
            } else {
                active.clone()
            };

            let mut dlx = 0.0f64;
            for &c in &positions {
                let j = cols[c];
                let old = state.beta[j];
                let g: f64 = (0..self.n())
                    .map(|k| weights[k] * self.xs(k, j) * residuals[k])
                    .sum::<f64>()
                    / n;
                let u = g + xv[c] * old;
                let new = soft_threshold(u, l1) / (xv[c] + l2);
                if new != old {
                    let diff = new - old;
                    state.beta[j] = new;
                    for (k, r) in residuals.iter_mut().enumerate() {
                        *r -= diff * self.xs(k, j);
                    }
                    dlx = dlx.max(xv[c] * diff * diff);
                }
            }

            let shift = residuals
                .iter()
                .zip(weights)
                .map(|(r, w)| r * w)
                .sum::<f64>()
                / sum_w;
            if shift != 0.0 {
                state.intercept += shift;
                for r in residuals.iter_mut() {
                    *r -= shift;
                }
                dlx = dlx.max(sum_w / n * shift * shift);
            }

            passes += 1;
            if passes > config.max_passes {
                return Err(MethylError::Convergence(format!(
                    "Coordinate descent exceeded {} passes at lambda = {:.4e}",
                    config.max_passes, lambda
                )));
            }

            if dlx < config.tolerance {
                if full_pass {
                    return Ok(());
                }
                // Active set converged; confirm with a full pass.
                full_pass = true;
            } else if full_pass {
                active = (0..cols.len())
                    .filter(|&c| state.beta[cols[c]] != 0.0)
                    .collect();
                full_pass = false;
            }
        }
    }

    /// Convert a standardized solution to the original beta-value scale.
    fn to_original_scale(&self, point: &PathPoint) -> (f64, Vec<(usize, f64)>) {
        let beta: Vec<(usize, f64)> = point
            .beta
            .iter()
            .map(|&(j, b)| (j, b / self.scales[j]))
            .collect();
        let intercept =
            point.intercept - beta.iter().map(|&(j, b)| b * self.means[j]).sum::<f64>();
        (intercept, beta)
    }
}

#[inline]
fn sigmoid(eta: f64) -> f64 {
    1.0 / (1.0 + (-eta).exp())
}

#[inline]
fn soft_threshold(z: f64, gamma: f64) -> f64 {
    if z > gamma {
        z - gamma
    } else if z < -gamma {
        z + gamma
    } else {
        0.0
    }
}

/// Binomial deviance contribution of one observation.
#[inline]
fn unit_deviance(y: f64, p: f64) -> f64 {
    let p = p.clamp(PMIN, 1.0 - PMIN);
    -2.0 * (y * p.ln() + (1.0 - y) * (1.0 - p).ln())
}
