//! Shared test fixtures: a weighted-sample SROM model and analytic uniform
//! targets implementing the collaborator traits.

#![allow(dead_code)]

use ndarray::{Array1, Array2};
use sromopt::types::{SromModel, TargetRandomVector};

// ─────────────────────────────────────────────────────────────
//  Discrete SROM model
// ─────────────────────────────────────────────────────────────

/// Finite-support SROM: the empirical statistics of weighted sample points.
///
/// CDF convention:  F_i(x) = Σ_k p_k · 1{samples[k, i] ≤ x},  which makes
/// dF/dp_k the indicator `grid ≥ sample` used by the analytic gradient.
/// The correlation matrix is the raw second-moment matrix Σ_k p_k x_k x_kᵀ.
pub struct DiscreteSrom {
    samples: Array2<f64>,
    probs: Array1<f64>,
}

impl DiscreteSrom {
    pub fn new(size: usize, dim: usize) -> Self {
        Self {
            samples: Array2::zeros((size, dim)),
            probs: Array1::zeros(size),
        }
    }
}

impl SromModel for DiscreteSrom {
    fn size(&self) -> usize {
        self.probs.len()
    }

    fn set_params(&mut self, samples: &Array2<f64>, probs: &Array1<f64>) {
        self.samples = samples.clone();
        self.probs = probs.clone();
    }

    fn compute_cdf(&self, grid: &Array2<f64>) -> Array2<f64> {
        let (grid_pts, dim) = grid.dim();
        let mut cdf = Array2::zeros((grid_pts, dim));

        for i in 0..dim {
            for z in 0..grid_pts {
                let x = grid[[z, i]];
                let mut mass = 0.0;
                for k in 0..self.probs.len() {
                    if self.samples[[k, i]] <= x {
                        mass += self.probs[k];
                    }
                }
                cdf[[z, i]] = mass;
            }
        }

        cdf
    }

    fn compute_moments(&self, max_order: usize) -> Array2<f64> {
        let dim = self.samples.ncols();
        let mut moments = Array2::zeros((max_order, dim));

        for q in 1..=max_order {
            for i in 0..dim {
                let mut m = 0.0;
                for k in 0..self.probs.len() {
                    m += self.probs[k] * self.samples[[k, i]].powi(q as i32);
                }
                moments[[q - 1, i]] = m;
            }
        }

        moments
    }

    fn compute_corr_mat(&self) -> Array2<f64> {
        let dim = self.samples.ncols();
        let mut corr = Array2::zeros((dim, dim));

        for i in 0..dim {
            for j in 0..dim {
                let mut c = 0.0;
                for k in 0..self.probs.len() {
                    c += self.probs[k] * self.samples[[k, i]] * self.samples[[k, j]];
                }
                corr[[i, j]] = c;
            }
        }

        corr
    }
}

// ─────────────────────────────────────────────────────────────
//  Analytic uniform target
// ─────────────────────────────────────────────────────────────

/// Random vector with independent uniform components on [mins_i, maxs_i].
///
/// Correlation matrix uses the same raw second-moment convention as the
/// SROM fixture:  diag = E[Xᵢ²], off-diag = E[Xᵢ]·E[Xⱼ] (independence).
pub struct UniformTarget {
    mins: Vec<f64>,
    maxs: Vec<f64>,
}

impl UniformTarget {
    pub fn new(mins: Vec<f64>, maxs: Vec<f64>) -> Self {
        assert_eq!(mins.len(), maxs.len());
        Self { mins, maxs }
    }

    /// Raw moment E[X^q] of a uniform on [a, b].
    fn raw_moment(a: f64, b: f64, q: usize) -> f64 {
        let p = q as i32 + 1;
        (b.powi(p) - a.powi(p)) / (p as f64 * (b - a))
    }
}

impl TargetRandomVector for UniformTarget {
    fn dim(&self) -> usize {
        self.mins.len()
    }

    fn mins(&self) -> &[f64] {
        &self.mins
    }

    fn maxs(&self) -> &[f64] {
        &self.maxs
    }

    fn compute_cdf(&self, grid: &Array2<f64>) -> Array2<f64> {
        let (grid_pts, dim) = grid.dim();
        let mut cdf = Array2::zeros((grid_pts, dim));

        for i in 0..dim {
            let (a, b) = (self.mins[i], self.maxs[i]);
            for z in 0..grid_pts {
                cdf[[z, i]] = ((grid[[z, i]] - a) / (b - a)).clamp(0.0, 1.0);
            }
        }

        cdf
    }

    fn compute_moments(&self, max_order: usize) -> Array2<f64> {
        let dim = self.dim();
        let mut moments = Array2::zeros((max_order, dim));

        for q in 1..=max_order {
            for i in 0..dim {
                moments[[q - 1, i]] = Self::raw_moment(self.mins[i], self.maxs[i], q);
            }
        }

        moments
    }

    fn compute_corr_mat(&self) -> Array2<f64> {
        let dim = self.dim();
        let mut corr = Array2::zeros((dim, dim));

        for i in 0..dim {
            for j in 0..dim {
                corr[[i, j]] = if i == j {
                    Self::raw_moment(self.mins[i], self.maxs[i], 2)
                } else {
                    Self::raw_moment(self.mins[i], self.maxs[i], 1)
                        * Self::raw_moment(self.mins[j], self.maxs[j], 1)
                };
            }
        }

        corr
    }
}

// ─────────────────────────────────────────────────────────────
//  Poisoned target  (proves weight-zero terms are never computed)
// ─────────────────────────────────────────────────────────────

/// Wraps a [`UniformTarget`] and panics on selected statistic queries.
/// Used to verify that a zero-weighted error term is skipped entirely
/// instead of computed and multiplied by zero.
pub struct PanickyTarget {
    pub inner: UniformTarget,
    pub panic_cdf: bool,
    pub panic_moments: bool,
    pub panic_corr: bool,
}

impl TargetRandomVector for PanickyTarget {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn mins(&self) -> &[f64] {
        self.inner.mins()
    }

    fn maxs(&self) -> &[f64] {
        self.inner.maxs()
    }

    fn compute_cdf(&self, grid: &Array2<f64>) -> Array2<f64> {
        assert!(!self.panic_cdf, "CDF statistic queried for a zero-weighted term");
        self.inner.compute_cdf(grid)
    }

    fn compute_moments(&self, max_order: usize) -> Array2<f64> {
        assert!(
            !self.panic_moments,
            "moment statistic queried for a zero-weighted term"
        );
        self.inner.compute_moments(max_order)
    }

    fn compute_corr_mat(&self) -> Array2<f64> {
        assert!(
            !self.panic_corr,
            "correlation statistic queried for a zero-weighted term"
        );
        self.inner.compute_corr_mat()
    }
}
