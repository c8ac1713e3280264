//! L-BFGS optimisation driver via the `argmin` crate.
//!
//! Wraps an [`ObjectiveFunction`] / [`SromGradient`] pair into argmin's
//! `CostFunction` + `Gradient` traits and runs L-BFGS over the probability
//! vector.  Simplex feasibility (p ≥ 0, Σp = 1) is handled with a smooth
//! penalty rather than a constrained solver: a softplus barrier below zero
//! plus a quadratic on the probability-mass deficit.
//!
//! Uses `Vec<f64>` as the argmin parameter type to avoid ndarray version
//! conflicts between our ndarray 0.16 and argmin-math's bundled ndarray.

use crate::gradients::SromGradient;
use crate::objectives::{simplex_penalty, simplex_penalty_grad, ObjectiveFunction};
use crate::types::{SromError, SromModel, TargetRandomVector};
use argmin::core::{CostFunction, Executor, Gradient, State, TerminationReason};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use ndarray::{Array1, Array2};
use std::cell::RefCell;

// ─────────────────────────────────────────────────────────────
//  Options / result
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OptimizerOptions {
    pub max_iterations: usize,
    /// Scale of the simplex feasibility penalty added to the objective.
    pub penalty_weight: f64,
    /// Sharpness of the softplus barrier at p = 0.
    pub penalty_sharpness: f64,
    /// Number of L-BFGS correction pairs.
    pub memory: usize,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            penalty_weight: 1000.0,
            penalty_sharpness: 10.0,
            memory: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Best probability vector found (not renormalized).
    pub probs: Array1<f64>,
    /// Objective value at the best point, penalty included.
    pub cost: f64,
    pub iterations: usize,
    pub converged: bool,
}

// ─────────────────────────────────────────────────────────────
//  argmin problem wrapper
// ─────────────────────────────────────────────────────────────

/// Wraps the objective + gradient pair so argmin can evaluate cost and
/// gradient over the probability vector (sample locations held fixed).
///
/// **Evaluation cache**: argmin calls `cost(p)` and `gradient(p)` separately
/// at the same p each iteration.  We cache the last `(p, cost, grad)` so the
/// statistic computations run only once per unique p.
struct SromProblem<'a, S, T> {
    objective: &'a ObjectiveFunction<'a, S, T>,
    gradient: &'a SromGradient<'a, S, T>,
    samples: &'a Array2<f64>,
    penalty_weight: f64,
    penalty_sharpness: f64,
    /// Cached (p, cost, gradient) from the last evaluation.
    last_eval: RefCell<Option<(Vec<f64>, f64, Vec<f64>)>>,
}

impl<'a, S: SromModel, T: TargetRandomVector> SromProblem<'a, S, T> {
    /// Ensure the cache contains results for `p`.  A cache hit is a no-op;
    /// otherwise the full objective and gradient are evaluated.
    fn ensure_evaluated(&self, p: &[f64]) -> Result<(), argmin::core::Error> {
        {
            let cached = self.last_eval.borrow();
            if let Some((ref cached_p, _, _)) = *cached {
                if cached_p == p {
                    return Ok(());
                }
            }
        }

        let probs = Array1::from(p.to_vec());
        let cost = self.objective.evaluate(self.samples, &probs)
            + self.penalty_weight * simplex_penalty(p, self.penalty_sharpness);

        let mut grad = self.gradient.evaluate(self.samples, &probs).to_vec();
        simplex_penalty_grad(&mut grad, p, self.penalty_sharpness, self.penalty_weight);

        *self.last_eval.borrow_mut() = Some((p.to_vec(), cost, grad));
        Ok(())
    }
}

impl<'a, S: SromModel, T: TargetRandomVector> CostFunction for SromProblem<'a, S, T> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        self.ensure_evaluated(p)?;
        let cached = self.last_eval.borrow();
        Ok(cached.as_ref().map(|(_, c, _)| *c).unwrap_or(f64::INFINITY))
    }
}

impl<'a, S: SromModel, T: TargetRandomVector> Gradient for SromProblem<'a, S, T> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, p: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        self.ensure_evaluated(p)?;
        let cached = self.last_eval.borrow();
        Ok(cached
            .as_ref()
            .map(|(_, _, g)| g.clone())
            .unwrap_or_else(|| vec![0.0; p.len()]))
    }
}

// ─────────────────────────────────────────────────────────────
//  Top-level optimisation entry point
// ─────────────────────────────────────────────────────────────

/// Run L-BFGS on the SROM probability weights from `init_probs`.
///
/// The objective and gradient must have been built from the same
/// [`crate::types::ObjectiveOptions`] (and share the SROM model), otherwise
/// the search direction will not be a descent direction of the cost.
pub fn optimize_probs<S: SromModel, T: TargetRandomVector>(
    objective: &ObjectiveFunction<'_, S, T>,
    gradient: &SromGradient<'_, S, T>,
    samples: &Array2<f64>,
    init_probs: &Array1<f64>,
    options: &OptimizerOptions,
) -> Result<OptimizationResult, SromError> {
    let problem = SromProblem {
        objective,
        gradient,
        samples,
        penalty_weight: options.penalty_weight,
        penalty_sharpness: options.penalty_sharpness,
        last_eval: RefCell::new(None),
    };

    let linesearch = MoreThuenteLineSearch::new();
    let solver = LBFGS::new(linesearch, options.memory);

    let executor = Executor::new(problem, solver).configure(|config| {
        config
            .param(init_probs.to_vec())
            .max_iters(options.max_iterations as u64)
            .target_cost(f64::NEG_INFINITY)
    });

    let result = executor.run()?;

    let best_param = result
        .state()
        .get_best_param()
        .ok_or_else(|| SromError::Solver("L-BFGS returned no best parameters".into()))?;

    let converged = matches!(
        result.state().get_termination_reason(),
        Some(TerminationReason::SolverConverged)
    );

    Ok(OptimizationResult {
        probs: Array1::from(best_param.clone()),
        cost: result.state().get_best_cost(),
        iterations: result.state().get_iter() as usize,
        converged,
    })
}
