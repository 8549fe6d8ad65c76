//! Connectivity matrix construction and distance censoring

use ndarray::{Array2, Axis, Zip};

use crate::error::{HubError, Result};

/// Largest correlation magnitude passed to `atanh`, keeping z-scores finite
const MAX_CORRELATION: f64 = 1.0 - f64::EPSILON;

/// Pearson correlation between every pair of rows
pub fn correlation_matrix(timeseries: &Array2<f64>) -> Result<Array2<f64>> {
    let (parcels, timepoints) = timeseries.dim();

    if let Some(((parcel, timepoint), _)) = timeseries
        .indexed_iter()
        .find(|(_, value)| !value.is_finite())
    {
        return Err(HubError::NonFiniteSample { parcel, timepoint });
    }

    // Center each row and scale it to unit length
    let mut normalized = timeseries.to_owned();
    for (parcel, mut row) in normalized.axis_iter_mut(Axis(0)).enumerate() {
        let mean = row.sum() / timepoints as f64;
        row.mapv_inplace(|v| v - mean);
        let norm = row.dot(&row).sqrt();
        if norm == 0.0 || timepoints < 2 {
            return Err(HubError::ConstantTimeseries { parcel });
        }
        row.mapv_inplace(|v| v / norm);
    }

    let mut corr = normalized.dot(&normalized.t());
    corr.mapv_inplace(|r| r.clamp(-1.0, 1.0));
    debug_assert_eq!(corr.dim(), (parcels, parcels));
    Ok(corr)
}

/// Build the Fisher z-transformed connectivity matrix for one subject.
///
/// Self-correlations are removed before the transform and the diagonal is set
/// to exactly 1 afterwards.
pub fn build_connectivity(timeseries: &Array2<f64>) -> Result<Array2<f64>> {
    let mut zmat = correlation_matrix(timeseries)?;
    zmat.diag_mut().fill(0.0);
    zmat.mapv_inplace(|r| r.clamp(-MAX_CORRELATION, MAX_CORRELATION).atanh());
    zmat.diag_mut().fill(1.0);

    log::debug!("Built {} x {} connectivity matrix", zmat.nrows(), zmat.ncols());
    Ok(zmat)
}

/// Zero every connection the distance mask marks as too close
pub fn distance_censor(zmat: &Array2<f64>, mask: &Array2<f64>) -> Result<Array2<f64>> {
    if zmat.dim() != mask.dim() {
        return Err(HubError::ShapeMismatch {
            what: "distance mask",
            expected: format!("{} x {}", zmat.nrows(), zmat.ncols()),
            found: format!("{} x {}", mask.nrows(), mask.ncols()),
        });
    }

    // Adding +0.0 turns -0.0 into +0.0 and leaves everything else unchanged
    let mut censored = Array2::zeros(zmat.dim());
    Zip::from(&mut censored)
        .and(zmat)
        .and(mask)
        .for_each(|out, &z, &m| *out = z * m + 0.0);

    let kept = censored.iter().filter(|&&v| v != 0.0).count();
    log::debug!("Distance censoring kept {} nonzero entries", kept);
    Ok(censored)
}
