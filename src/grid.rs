//! Numerical evaluation grid for the CDF error term.

use crate::types::TargetRandomVector;
use ndarray::{Array1, Array2};

/// Build the CDF evaluation grid from the target's per-dimension range.
///
/// Column `i` holds `grid_pts` uniformly spaced values from `mins()[i]` to
/// `maxs()[i]`, both endpoints included.  Pure function of the target's
/// declared bounds; built once at evaluator construction and immutable
/// thereafter.
pub fn cdf_evaluation_grid<T: TargetRandomVector + ?Sized>(
    target: &T,
    grid_pts: usize,
) -> Array2<f64> {
    let dim = target.dim();
    let mut grid = Array2::zeros((grid_pts, dim));

    for i in 0..dim {
        let col = Array1::linspace(target.mins()[i], target.maxs()[i], grid_pts);
        grid.column_mut(i).assign(&col);
    }

    grid
}
