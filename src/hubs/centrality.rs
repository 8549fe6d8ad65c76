//! Per-threshold participation coefficient percentiles with degree censoring

use ndarray::{Array1, Array2};

use crate::cluster::metrics::{participation_coefficient, participation_coefficient_zeroed};
use crate::cluster::Affiliation;
use crate::error::{HubError, Result};
use crate::graph::algorithms::upper_triangle_degrees;
use crate::stats::{nanmean_columns, percentile_linear, percentile_ranks};

/// Score every parcel at one threshold.
///
/// `upper` is the strict upper triangle of the thresholded matrix. Each node's
/// zeroed participation coefficient is ranked against all zeroed coefficients.
/// A node ends up NaN when its degree is below the `low_degree_percentile`-th
/// degree percentile, or when its raw coefficient was NaN.
pub fn censored_pc_percentiles(
    upper: &Array2<f64>,
    affiliation: &Affiliation,
    low_degree_percentile: f64,
) -> Result<Vec<f64>> {
    if affiliation.len() != upper.nrows() {
        return Err(HubError::ShapeMismatch {
            what: "affiliation vector",
            expected: upper.nrows().to_string(),
            found: affiliation.len().to_string(),
        });
    }

    let with_nan = participation_coefficient(upper, affiliation);
    let reference = participation_coefficient_zeroed(upper, affiliation).to_vec();
    let percentiles = percentile_ranks(&reference, &reference);

    let degrees = upper_triangle_degrees(upper);
    let low = percentile_linear(&degrees, low_degree_percentile);

    let censored = percentiles
        .iter()
        .zip(&degrees)
        .zip(with_nan.iter())
        .map(|((&pct, &degree), &pc)| {
            if degree < low || pc.is_nan() {
                f64::NAN
            } else {
                pct
            }
        })
        .collect::<Vec<_>>();

    let excluded = censored.iter().filter(|v| v.is_nan()).count();
    log::debug!(
        "   {} of {} parcels censored (degree cut {:.2})",
        excluded,
        censored.len(),
        low
    );
    Ok(censored)
}

/// Average per-threshold percentile vectors, ignoring NaNs per parcel.
///
/// A parcel that is NaN at every threshold averages to 0.
pub fn average_percentiles(per_threshold: &[Vec<f64>]) -> Result<Array1<f64>> {
    let rows = per_threshold.len();
    let cols = per_threshold.first().map_or(0, Vec::len);
    if let Some(bad) = per_threshold.iter().find(|v| v.len() != cols) {
        return Err(HubError::ShapeMismatch {
            what: "percentile vector",
            expected: cols.to_string(),
            found: bad.len().to_string(),
        });
    }

    let flat: Vec<f64> = per_threshold.iter().flatten().copied().collect();
    let stack = Array2::from_shape_vec((rows, cols), flat).map_err(|e| HubError::ShapeMismatch {
        what: "percentile stack",
        expected: format!("{rows} x {cols}"),
        found: e.to_string(),
    })?;
    Ok(nanmean_columns(&stack))
}
