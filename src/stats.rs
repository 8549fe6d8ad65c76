//! Percentile and NaN-aware summary statistics

use ndarray::{Array1, Array2, Axis};
use statrs::statistics::Statistics;

/// Percentile rank of `score` within `reference`, in [0, 100].
///
/// Uses the "rank" convention: the mean of the strict and weak percentages, so
/// tied values share the midpoint of their range. NaNs in `reference` count as
/// neither below nor equal.
pub fn percentile_of_score(reference: &[f64], score: f64) -> f64 {
    let n = reference.len();
    if n == 0 {
        return f64::NAN;
    }
    let left = reference.iter().filter(|&&a| a < score).count();
    let right = reference.iter().filter(|&&a| a <= score).count();
    let tie = usize::from(right > left);
    (left + right + tie) as f64 * 50.0 / n as f64
}

/// Percentile rank of every value in `values` against `reference`
pub fn percentile_ranks(reference: &[f64], values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .map(|&v| percentile_of_score(reference, v))
        .collect()
}

/// `q`-th percentile (0..=100) with linear interpolation between order statistics
pub fn percentile_linear(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Mean of each column ignoring NaNs; a column with no finite entries yields 0
pub fn nanmean_columns(stack: &Array2<f64>) -> Array1<f64> {
    stack
        .axis_iter(Axis(1))
        .map(|column| {
            let mean = column.iter().copied().filter(|v| !v.is_nan()).mean();
            if mean.is_nan() {
                0.0
            } else {
                mean
            }
        })
        .collect()
}

/// Round to the nearest integer, ties to even
pub fn round_half_even(x: f64) -> f64 {
    let rounded = x.round();
    if (x - x.trunc()).abs() == 0.5 && rounded % 2.0 != 0.0 {
        rounded - x.signum()
    } else {
        rounded
    }
}

/// Round to `places` decimals from the exact binary value, ties to even
pub fn round_decimals(x: f64, places: usize) -> f64 {
    format!("{x:.places$}").parse().unwrap_or(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn percentile_of_score_uses_rank_convention() {
        let reference = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile_of_score(&reference, 3.0), 62.5);
        assert_eq!(percentile_of_score(&reference, 4.0), 87.5);
        assert_eq!(percentile_of_score(&reference, 0.5), 0.0);
        assert_eq!(percentile_of_score(&reference, 10.0), 100.0);
    }

    #[test]
    fn percentile_of_score_splits_ties() {
        let reference = [0.0, 0.0, 0.0, 1.0];
        // left = 0, right = 3 -> (0 + 3 + 1) * 50 / 4
        assert_eq!(percentile_of_score(&reference, 0.0), 50.0);
    }

    #[test]
    fn percentile_linear_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile_linear(&values, 25.0), 1.75);
        assert_eq!(percentile_linear(&values, 0.0), 1.0);
        assert_eq!(percentile_linear(&values, 100.0), 4.0);
    }

    #[test]
    fn nanmean_skips_nans_and_zeroes_empty_columns() {
        let stack = array![
            [1.0, f64::NAN, f64::NAN],
            [3.0, 4.0, f64::NAN],
            [f64::NAN, 8.0, f64::NAN],
        ];
        let means = nanmean_columns(&stack);
        assert_eq!(means[0], 2.0);
        assert_eq!(means[1], 6.0);
        assert_eq!(means[2], 0.0);
    }

    #[test]
    fn round_half_even_matches_bankers_rounding() {
        assert_eq!(round_half_even(0.5), 0.0);
        assert_eq!(round_half_even(1.5), 2.0);
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(2.6), 3.0);
        assert_eq!(round_half_even(0.198), 0.0);
    }

    #[test]
    fn round_decimals_works_on_the_stored_value() {
        assert_eq!(round_decimals(8.03125, 4), 8.0312);
        assert_eq!(round_decimals(8.09375, 4), 8.0938);
        // 8.00015 is stored just below the half
        assert_eq!(round_decimals(8.00015, 4), 8.0001);
        assert_eq!(round_decimals(-0.12345678, 4), -0.1235);
        assert!(round_decimals(f64::NAN, 4).is_nan());
    }
}
