//! Hub flagging from threshold-averaged percentile scores

use crate::stats::percentile_ranks;

/// Re-rank the averaged scores against themselves and return the 1-based
/// parcels scoring at or above `cutoff`
pub fn hub_indices(averaged: &[f64], cutoff: f64) -> Vec<usize> {
    percentile_ranks(averaged, averaged)
        .iter()
        .enumerate()
        .filter(|(_, score)| **score >= cutoff)
        .map(|(index, _)| index + 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores() -> Vec<f64> {
        (0..20).map(|i| f64::from(i * 7 % 20) * 3.5).collect()
    }

    #[test]
    fn cutoff_is_inclusive() {
        // Ten distinct values rank at 10, 20, ..., 100
        let averaged: Vec<f64> = (0..10).map(f64::from).collect();
        let hubs = hub_indices(&averaged, 90.0);
        assert_eq!(hubs, vec![9, 10]);
    }

    #[test]
    fn indices_are_one_based() {
        let averaged = vec![10.0, 0.0, 0.0, 0.0, 0.0];
        assert_eq!(hub_indices(&averaged, 80.0), vec![1]);
    }

    #[test]
    fn raising_cutoff_never_adds_hubs() {
        let averaged = scores();
        let at_80 = hub_indices(&averaged, 80.0);
        let at_90 = hub_indices(&averaged, 90.0);
        assert!(at_90.len() <= at_80.len());
        assert!(at_90.iter().all(|hub| at_80.contains(hub)));
    }

    #[test]
    fn all_zero_scores_yield_no_hubs() {
        let averaged = vec![0.0; 8];
        // Every parcel ties at rank 56.25
        assert!(hub_indices(&averaged, 80.0).is_empty());
    }
}
