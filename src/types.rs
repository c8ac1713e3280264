use ndarray::{Array1, Array2};
use std::fmt;
use std::str::FromStr;

// ─────────────────────────────────────────────────────────────
//  Error type
// ─────────────────────────────────────────────────────────────

/// Unified error type for all fallible operations in the crate.
///
/// Configuration errors abort construction immediately — no evaluator is
/// ever built with partial state.  Numerical degeneracies (division by a
/// zero-valued target statistic) are *not* errors: they propagate as
/// non-finite values into the returned gradient, by design of the
/// relative-error formulation.
#[derive(Debug)]
pub enum SromError {
    /// Invalid construction-time configuration (weights, metric, ...).
    Config(String),
    /// Argmin solver returned an error.
    Solver(String),
}

impl fmt::Display for SromError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Solver(msg) => write!(f, "solver error: {msg}"),
        }
    }
}

impl std::error::Error for SromError {}

impl From<argmin::core::Error> for SromError {
    fn from(e: argmin::core::Error) -> Self {
        Self::Solver(e.to_string())
    }
}

// ─────────────────────────────────────────────────────────────
//  Error metric
// ─────────────────────────────────────────────────────────────

/// How the error between SROM and target statistics is measured.
///
/// Parsing is case-insensitive (`"mean"`, `"Mean"`, `"MEAN"` are the same).
/// `Max` is accepted for objective evaluation, but note that a max-based
/// objective is non-smooth: the analytic gradients in this crate are the
/// derivative of the squared-relative (`Sse`) formulation regardless of the
/// selected metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMetric {
    /// Mean of absolute differences.
    Mean,
    /// Maximum absolute difference (non-differentiable).
    Max,
    /// Half the sum of squared relative differences.
    Sse,
}

impl FromStr for ErrorMetric {
    type Err = SromError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MEAN" => Ok(Self::Mean),
            "MAX" => Ok(Self::Max),
            "SSE" => Ok(Self::Sse),
            other => Err(SromError::Config(format!(
                "error must be either 'mean', 'max', or 'sse' (got '{other}')"
            ))),
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  Construction options / resolved configuration
// ─────────────────────────────────────────────────────────────

/// Recognized construction options for the objective function and the
/// gradient evaluator.  Both are built from the *same* options so the
/// gradient mirrors the objective exactly.
#[derive(Debug, Clone)]
pub struct ObjectiveOptions {
    /// Relative weights of the CDF, moment, and correlation error terms,
    /// in that order.  `None` means equal weights `[1, 1, 1]`.
    pub obj_weights: Option<Vec<f64>>,
    /// Error metric name: `"mean"`, `"max"`, or `"sse"` (case-insensitive).
    pub error: String,
    /// Highest raw-moment order included in the moment error term.
    pub max_moment: usize,
    /// Number of grid points per dimension for the CDF error term.
    pub cdf_grid_pts: usize,
}

impl Default for ObjectiveOptions {
    fn default() -> Self {
        Self {
            obj_weights: None,
            error: "mean".into(),
            max_moment: 5,
            cdf_grid_pts: 100,
        }
    }
}

/// Resolved, validated configuration.  Immutable after construction.
#[derive(Debug, Clone)]
pub struct ObjectiveConfig {
    pub weights: [f64; 3],
    pub metric: ErrorMetric,
    pub max_moment: usize,
    pub cdf_grid_pts: usize,
}

impl ObjectiveConfig {
    /// Validate options and resolve defaults.  Fails fast with
    /// [`SromError::Config`] before any evaluation occurs.
    pub fn from_options(options: &ObjectiveOptions) -> Result<Self, SromError> {
        let weights = match &options.obj_weights {
            Some(w) => {
                if w.len() != 3 {
                    return Err(SromError::Config(
                        "obj_weights must have length 3".into(),
                    ));
                }
                if w.iter().any(|&wi| wi < 0.0) {
                    return Err(SromError::Config(
                        "obj_weights cannot be less than zero".into(),
                    ));
                }
                [w[0], w[1], w[2]]
            }
            None => [1.0; 3],
        };

        let metric: ErrorMetric = options.error.parse()?;

        if options.max_moment < 1 {
            return Err(SromError::Config(
                "max_moment must be a positive integer".into(),
            ));
        }
        if options.cdf_grid_pts < 1 {
            return Err(SromError::Config(
                "cdf_grid_pts must be a positive integer".into(),
            ));
        }

        Ok(Self {
            weights,
            metric,
            max_moment: options.max_moment,
            cdf_grid_pts: options.cdf_grid_pts,
        })
    }
}

// ─────────────────────────────────────────────────────────────
//  Collaborator interfaces
// ─────────────────────────────────────────────────────────────

/// The SROM model collaborator: stores the current sample/probability
/// assignment and computes its statistics.
///
/// `set_params` mutates internal state; every statistic query reflects the
/// most recent assignment.  Callers sharing one model between an objective
/// and a gradient evaluator must serialize access (the evaluators take the
/// model as `&RefCell<S>`, which enforces this in a single-threaded
/// setting).  Nothing here is thread-safe.
pub trait SromModel {
    /// Number of sample points (the gradient length).
    fn size(&self) -> usize;

    /// Synchronize internal state to the given samples (size × dim) and
    /// probability weights (size).  Must precede any statistic query.
    fn set_params(&mut self, samples: &Array2<f64>, probs: &Array1<f64>);

    /// SROM CDF evaluated per dimension at each grid row
    /// (grid_pts × dim in, grid_pts × dim out).
    fn compute_cdf(&self, grid: &Array2<f64>) -> Array2<f64>;

    /// Raw moments E[X^q] for q = 1..max_order (max_order × dim).
    fn compute_moments(&self, max_order: usize) -> Array2<f64>;

    /// Correlation matrix (dim × dim).
    fn compute_corr_mat(&self) -> Array2<f64>;
}

/// The target random vector collaborator: the true distribution the SROM is
/// fit against.  Analytic or sample-based; must expose finite per-dimension
/// bounds for the CDF grid.
pub trait TargetRandomVector {
    /// Dimension of the random vector.
    fn dim(&self) -> usize;

    /// Per-dimension minimum of the support.
    fn mins(&self) -> &[f64];

    /// Per-dimension maximum of the support.
    fn maxs(&self) -> &[f64];

    /// Target CDF evaluated per dimension at each grid row.
    fn compute_cdf(&self, grid: &Array2<f64>) -> Array2<f64>;

    /// Target raw moments E[X^q] for q = 1..max_order (max_order × dim).
    fn compute_moments(&self, max_order: usize) -> Array2<f64>;

    /// Target correlation matrix (dim × dim).
    fn compute_corr_mat(&self) -> Array2<f64>;
}
