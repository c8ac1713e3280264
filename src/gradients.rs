//! Hand-coded gradients of the objective w.r.t. SROM probability weights.
//!
//! Each term is the closed-form derivative of the squared-relative (`Sse`)
//! error between one family of SROM statistics and the target's:
//!
//!   1. CDF term:     Σ over grid points above the sample, of the relative
//!                    CDF sensitivity (the "erf" kernel of the full
//!                    derivation collapses to an indicator when the CDF is
//!                    not smoothed).
//!   2. Moment term:  Σ_q  x^q · relative moment sensitivity.
//!   3. Corr term:    xₖᵀ · (relative correlation sensitivity) · xₖ.
//!
//! The weighted sum feeds derivative information to a gradient-based
//! optimizer for faster minimization.  Only probability gradients are
//! implemented; sample locations are held fixed.

use crate::grid::cdf_evaluation_grid;
use crate::types::{ObjectiveConfig, ObjectiveOptions, SromError, SromModel, TargetRandomVector};
use ndarray::{Array1, Array2, Axis};
use std::cell::RefCell;

/// Gradient of the SROM objective with respect to the probability vector.
///
/// Built from the *same* [`ObjectiveOptions`] as the objective function it
/// mirrors; the two must agree on weights, metric, moment order, and grid
/// resolution or every optimization step is silently corrupted.
///
/// Note that no valid gradient exists for the `Max` error metric (the
/// max-based objective is non-smooth).  `Max` is accepted at construction
/// for parity with the objective, but the returned gradient is always the
/// derivative of the `Sse`-shaped relative error.
pub struct SromGradient<'a, S, T> {
    srom: &'a RefCell<S>,
    target: &'a T,
    x_grid: Array2<f64>,
    config: ObjectiveConfig,
}

impl<'a, S: SromModel, T: TargetRandomVector> SromGradient<'a, S, T> {
    /// Build the gradient evaluator.  Validates options and generates the
    /// CDF evaluation grid from the target's range; both are immutable for
    /// the evaluator's lifetime.
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

    /// The prebuilt CDF evaluation grid (grid_pts × dim).
    pub fn x_grid(&self) -> &Array2<f64> {
        &self.x_grid
    }

    /// Primary optimizer-facing entry point.
    ///
    /// Synchronizes the SROM model to `(samples, probs)` — a required side
    /// effect, so subsequent statistic queries reflect exactly these values
    /// — then returns [`Self::gradient_wrt_probs`].
    pub fn evaluate(&self, samples: &Array2<f64>, probs: &Array1<f64>) -> Array1<f64> {
        self.srom.borrow_mut().set_params(samples, probs);
        self.gradient_wrt_probs(samples, probs)
    }

    /// Weighted total gradient w.r.t. the probability vector (length
    /// `size`).  Assumes the SROM model has already been synchronized.
    ///
    /// A term whose configured weight is zero is replaced by a zero vector
    /// without evaluating it: behaviorally equivalent to computing and
    /// zero-weighting, but avoids touching statistics that may be undefined
    /// for the caller's target (e.g. a zero-valued correlation entry).
    pub fn gradient_wrt_probs(&self, samples: &Array2<f64>, _probs: &Array1<f64>) -> Array1<f64> {
        let size = self.srom.borrow().size();
        let w = self.config.weights;

        let cdf_grad = if w[0] > 0.0 {
            self.cdf_wrt_prob(samples)
        } else {
            Array1::zeros(size)
        };
        let moment_grad = if w[1] > 0.0 {
            self.moment_wrt_prob(samples)
        } else {
            Array1::zeros(size)
        };
        let corr_grad = if w[2] > 0.0 {
            self.corr_wrt_prob(samples)
        } else {
            Array1::zeros(size)
        };

        cdf_grad * w[0] + moment_grad * w[1] + corr_grad * w[2]
    }

    /// Gradient of the CDF error term w.r.t. each probability weight.
    ///
    /// d(½ Σ ((F_srom − F_tgt)/F_tgt)²)/dp_k  =  Σ_i Σ_z diff[z, i] · 1{x_grid[z, i] ≥ samples[k, i]}
    ///
    /// where diff = (F_srom − F_tgt)/F_tgt².  When the target CDF is zero
    /// at a grid point (it is, at the domain minimum) the division yields a
    /// non-finite diff; the indicator excludes that row whenever every
    /// sample lies strictly above the minimum, otherwise the non-finite
    /// value propagates — a documented sharp edge, not silently fixed.
    fn cdf_wrt_prob(&self, samples: &Array2<f64>) -> Array1<f64> {
        let (size, dim) = samples.dim();

        let srom_cdfs = self.srom.borrow().compute_cdf(&self.x_grid);
        let target_cdfs = self.target.compute_cdf(&self.x_grid);
        let denom = &target_cdfs * &target_cdfs;
        let diffs = (srom_cdfs - target_cdfs) / denom;

        let mut grad = Array1::zeros(size);

        for k in 0..size {
            let mut grad_k = 0.0;

            for i in 0..dim {
                let sample_ki = samples[[k, i]];
                for (z, &x) in self.x_grid.column(i).iter().enumerate() {
                    if x >= sample_ki {
                        grad_k += diffs[[z, i]];
                    }
                }
            }

            grad[k] = grad_k;
        }

        grad
    }

    /// Gradient of the moment error term w.r.t. each probability weight.
    ///
    /// The SROM's q-th raw moment is linear in p (m_q = Σ_k p_k x_k^q), so
    ///
    ///   d(error)/dp_k  =  Σ_q Σ_i  x_{k,i}^q · (m_srom − m_tgt)/m_tgt² [q, i]
    ///
    /// The per-order diff row is broadcast across all samples.  A zero
    /// target moment divides to a non-finite diff (same caveat as the CDF
    /// term).
    fn moment_wrt_prob(&self, samples: &Array2<f64>) -> Array1<f64> {
        let size = samples.nrows();

        let srom_moments = self.srom.borrow().compute_moments(self.config.max_moment);
        let target_moments = self.target.compute_moments(self.config.max_moment);
        let denom = &target_moments * &target_moments;
        let diffs = (srom_moments - target_moments) / denom;

        let mut grad = Array1::zeros(size);

        for q in 1..=self.config.max_moment {
            let samples_q = samples.mapv(|x| x.powi(q as i32));
            let weighted = &samples_q * &diffs.row(q - 1);
            grad += &weighted.sum_axis(Axis(1));
        }

        grad
    }

    /// Gradient of the correlation error term w.r.t. each probability
    /// weight: the bilinear form  xₖᵀ · diff · xₖ  per sample.
    ///
    /// Correlation is irrelevant for a 1-D random vector; the term is then
    /// identically zero.
    fn corr_wrt_prob(&self, samples: &Array2<f64>) -> Array1<f64> {
        let (size, dim) = samples.dim();

        if dim == 1 {
            return Array1::zeros(size);
        }

        let srom_corr = self.srom.borrow().compute_corr_mat();
        let target_corr = self.target.compute_corr_mat();
        let denom = &target_corr * &target_corr;
        let diffs = (srom_corr - target_corr) / denom;

        let mut grad = Array1::zeros(size);

        for k in 0..size {
            let sample_k = samples.row(k);
            grad[k] = sample_k.dot(&diffs.dot(&sample_k));
        }

        grad
    }
}
