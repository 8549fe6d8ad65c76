//! Matrix-level graph operations shared by the partition and centrality stages

use ndarray::{Array2, Zip};

use crate::config::Threshold;
use crate::error::{HubError, Result};
use crate::stats::round_half_even;

/// Keep the strongest `proportion` of edges of a weighted adjacency matrix.
///
/// The diagonal is cleared first. For a symmetric matrix only the strict upper
/// triangle is ranked, `round(n(n-1)p/2)` entries are kept, and the result is
/// mirrored back; otherwise `round(n(n-1)p)` entries of the full matrix are
/// kept. Entries are ranked by signed weight, strongest first.
pub fn threshold_proportional(matrix: &Array2<f64>, proportion: f64) -> Result<Array2<f64>> {
    if !(0.0..=1.0).contains(&proportion) {
        return Err(HubError::InvalidThreshold(proportion));
    }

    let n = matrix.nrows();
    let mut w = matrix.to_owned();
    w.diag_mut().fill(0.0);

    let symmetric = is_symmetric(&w);
    if symmetric {
        for ((i, j), value) in w.indexed_iter_mut() {
            if i >= j {
                *value = 0.0;
            }
        }
    }
    let halving = if symmetric { 2.0 } else { 1.0 };

    let mut links: Vec<(usize, usize, f64)> = w
        .indexed_iter()
        .filter(|(_, v)| **v != 0.0)
        .map(|((i, j), &v)| (i, j, v))
        .collect();
    links.sort_by(|a, b| b.2.total_cmp(&a.2));

    let keep = round_half_even((n * n - n) as f64 * proportion / halving) as usize;
    for &(i, j, _) in links.iter().skip(keep) {
        w[[i, j]] = 0.0;
    }

    if symmetric {
        let mirrored = w.t().to_owned();
        w = w + mirrored;
    }
    Ok(w)
}

/// Threshold a distance-censored matrix at one sweep entry, rejecting NaNs.
///
/// Both the partition and centrality stages go through this function so they
/// see the same graph for the same threshold.
pub fn threshold_for_sweep(matrix: &Array2<f64>, threshold: Threshold) -> Result<Array2<f64>> {
    let thresholded = threshold_proportional(matrix, threshold.value())?;
    if thresholded.iter().any(|v| v.is_nan()) {
        return Err(HubError::NanInThresholdedMatrix {
            threshold: threshold.value(),
        });
    }
    Ok(thresholded)
}

/// Copy of `matrix` with everything on or below the diagonal set to zero
pub fn strict_upper_triangle(matrix: &Array2<f64>) -> Array2<f64> {
    let mut upper = matrix.to_owned();
    for ((i, j), value) in upper.indexed_iter_mut() {
        if i >= j {
            *value = 0.0;
        }
    }
    upper
}

/// Binary degree of each node over the strict upper triangle.
///
/// Counts the nonzero entries in each column, the convention the hub protocol
/// applies to its upper-triangular matrices.
pub fn upper_triangle_degrees(upper: &Array2<f64>) -> Vec<f64> {
    upper
        .columns()
        .into_iter()
        .map(|column| column.iter().filter(|&&v| v != 0.0).count() as f64)
        .collect()
}

/// Number of nonzero entries in a matrix
pub fn nonzero_count(matrix: &Array2<f64>) -> usize {
    matrix.iter().filter(|&&v| v != 0.0).count()
}

/// Symmetry check with the usual relative/absolute float tolerances
fn is_symmetric(matrix: &Array2<f64>) -> bool {
    if matrix.nrows() != matrix.ncols() {
        return false;
    }
    let mut symmetric = true;
    Zip::from(matrix).and(matrix.t()).for_each(|&a, &b| {
        if !((a - b).abs() <= 1e-8 + 1e-5 * b.abs()) {
            symmetric = false;
        }
    });
    symmetric
}
