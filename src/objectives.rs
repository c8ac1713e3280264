//! Objective function: errors between SROM and target statistics.
//!
//! Each term measures, under the configured metric, the discrepancy between
//! one family of SROM statistics and the target's: CDF values on a fixed
//! grid, raw moments up to a maximum order, and the correlation matrix.
//! The corresponding hand-coded gradients live in `gradients.rs` and must
//! mirror the `Sse` formulation here exactly.

use crate::grid::cdf_evaluation_grid;
use crate::types::{
    ErrorMetric, ObjectiveConfig, ObjectiveOptions, SromError, SromModel, TargetRandomVector,
};
use ndarray::{Array1, Array2, Axis};
use std::cell::RefCell;

// ─────────────────────────────────────────────────────────────
//  Softplus barrier  (used by the optimizer's feasibility penalty)
// ─────────────────────────────────────────────────────────────

/// Numerically stable log(1 + exp(z)).
#[inline]
fn log1pexp(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// Smooth one-sided barrier.
/// `k < 0` ⟹  penalise x < b  (min barrier).
/// `k > 0` ⟹  penalise x > b  (max barrier).
#[inline]
pub fn softplus(x: f64, b: f64, k: f64) -> f64 {
    let z = -k * (b - x) - 1.0;
    log1pexp(z)
}

/// Derivative of `softplus` w.r.t. `x`.
/// d/dx softplus = k · σ(z)  where z = −k(b−x)−1 and σ is the logistic fn.
#[inline]
pub fn softplus_grad(x: f64, b: f64, k: f64) -> f64 {
    let z = -k * (b - x) - 1.0;
    let sigma = 1.0 / (1.0 + (-z).exp());
    k * sigma
}

// ─────────────────────────────────────────────────────────────
//  Simplex feasibility penalty  (barrier on the probability vector)
// ─────────────────────────────────────────────────────────────

/// Smooth penalty keeping the probability vector near the simplex:
/// (Σp − 1)²  +  Σ softplus(p_k, 0, −sharpness).
pub fn simplex_penalty(probs: &[f64], sharpness: f64) -> f64 {
    let sum: f64 = probs.iter().sum();
    let mut penalty = (sum - 1.0).powi(2);
    for &p in probs {
        penalty += softplus(p, 0.0, -sharpness);
    }
    penalty
}

/// Gradient of [`simplex_penalty`] scaled by `weight`, accumulated into
/// `grad`.
pub fn simplex_penalty_grad(grad: &mut [f64], probs: &[f64], sharpness: f64, weight: f64) {
    let sum: f64 = probs.iter().sum();
    let d_sum = 2.0 * (sum - 1.0);
    for (g, &p) in grad.iter_mut().zip(probs) {
        *g += weight * (d_sum + softplus_grad(p, 0.0, -sharpness));
    }
}

// ─────────────────────────────────────────────────────────────
//  Objective function
// ─────────────────────────────────────────────────────────────

/// Weighted error between the statistics of a SROM and a target random
/// vector.  Wrapping this `evaluate` is what an outer optimization library
/// minimizes; [`crate::gradients::SromGradient`] supplies the matching
/// derivative.
///
/// The SROM model is shared mutable state (`set_params` precedes every
/// statistic query), hence the `RefCell`.
pub struct ObjectiveFunction<'a, S, T> {
    srom: &'a RefCell<S>,
    target: &'a T,
    x_grid: Array2<f64>,
    config: ObjectiveConfig,
}

impl<'a, S: SromModel, T: TargetRandomVector> ObjectiveFunction<'a, S, T> {
    /// Build the objective from validated options.  Generates the CDF
    /// evaluation grid from the target's range.
    pub fn new(
        srom: &'a RefCell<S>,
        target: &'a T,
        options: &ObjectiveOptions,
    ) -> Result<Self, SromError> {
        let config = ObjectiveConfig::from_options(options)?;
        let x_grid = cdf_evaluation_grid(target, config.cdf_grid_pts);
        Ok(Self { srom, target, x_grid, config })
    }

    /// The resolved configuration (weights, metric, orders).
    pub fn config(&self) -> &ObjectiveConfig {
        &self.config
    }

    /// Evaluate the weighted total error at the given SROM parameters.
    ///
    /// Synchronizes the SROM model to `(samples, probs)` first; terms with
    /// zero weight are skipped entirely.
    pub fn evaluate(&self, samples: &Array2<f64>, probs: &Array1<f64>) -> f64 {
        self.srom.borrow_mut().set_params(samples, probs);

        let w = self.config.weights;
        let mut error = 0.0;

        if w[0] > 0.0 {
            error += w[0] * self.cdf_error();
        }
        if w[1] > 0.0 {
            error += w[1] * self.moment_error();
        }
        if w[2] > 0.0 {
            error += w[2] * self.corr_error();
        }

        error
    }

    /// CDF error term for the given parameters (syncs the model).
    pub fn get_cdf_error(&self, samples: &Array2<f64>, probs: &Array1<f64>) -> f64 {
        self.srom.borrow_mut().set_params(samples, probs);
        self.cdf_error()
    }

    /// Moment error term for the given parameters (syncs the model).
    pub fn get_moment_error(&self, samples: &Array2<f64>, probs: &Array1<f64>) -> f64 {
        self.srom.borrow_mut().set_params(samples, probs);
        self.moment_error()
    }

    /// Correlation error term for the given parameters (syncs the model).
    pub fn get_corr_error(&self, samples: &Array2<f64>, probs: &Array1<f64>) -> f64 {
        self.srom.borrow_mut().set_params(samples, probs);
        self.corr_error()
    }

    // ── Per-term errors (model must already be synchronized) ──

    /// Error between SROM and target CDFs at the grid points.
    ///
    /// Grid rows where the target CDF is zero (first dimension) are dropped
    /// to avoid dividing by zero in the relative formulation — by
    /// construction the grid starts at the target's minimum, where the CDF
    /// is exactly zero.
    fn cdf_error(&self) -> f64 {
        let srom_cdfs = self.srom.borrow().compute_cdf(&self.x_grid);
        let target_cdfs = self.target.compute_cdf(&self.x_grid);

        let keep: Vec<usize> = (0..target_cdfs.nrows())
            .filter(|&z| target_cdfs[[z, 0]] > 0.0)
            .collect();
        let srom_cdfs = srom_cdfs.select(Axis(0), &keep);
        let target_cdfs = target_cdfs.select(Axis(0), &keep);

        metric_error(self.config.metric, &srom_cdfs, &target_cdfs)
    }

    /// Error between SROM and target raw moments up to `max_moment`.
    ///
    /// A moment row (one order, all dimensions) containing any entry within
    /// 1e-12 of zero is replaced wholesale by 1.0 before the relative
    /// division — the whole order is neutralized, not just the offending
    /// dimension.
    fn moment_error(&self) -> f64 {
        let srom_moments = self.srom.borrow().compute_moments(self.config.max_moment);
        let mut target_moments = self.target.compute_moments(self.config.max_moment);
        for mut row in target_moments.rows_mut() {
            if row.iter().any(|t| t.abs() <= 1e-12) {
                row.fill(1.0);
            }
        }

        metric_error(self.config.metric, &srom_moments, &target_moments)
    }

    /// Error between SROM and target correlation matrices.
    /// Identically zero for a 1-D random vector.
    fn corr_error(&self) -> f64 {
        if self.target.dim() == 1 {
            return 0.0;
        }

        let srom_corr = self.srom.borrow().compute_corr_mat();
        let target_corr = self.target.compute_corr_mat();

        metric_error(self.config.metric, &srom_corr, &target_corr)
    }
}

/// Scalar error between two matching statistic matrices under a metric.
///
///   `Sse`  = ½ Σ ((s − t)/t)²
///   `Max`  = max |s − t|
///   `Mean` = mean |s − t|
fn metric_error(metric: ErrorMetric, srom: &Array2<f64>, target: &Array2<f64>) -> f64 {
    match metric {
        ErrorMetric::Sse => {
            let rel = (srom - target) / target;
            0.5 * rel.mapv(|r| r * r).sum()
        }
        ErrorMetric::Max => (srom - target).fold(0.0, |m, &d| m.max(d.abs())),
        ErrorMetric::Mean => {
            let diffs = (srom - target).mapv(f64::abs);
            diffs.mean().unwrap_or(0.0)
        }
    }
}
