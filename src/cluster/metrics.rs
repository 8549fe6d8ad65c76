//! Participation coefficient of nodes relative to a community partition

use ndarray::{Array1, Array2};

use crate::cluster::Affiliation;

/// Participation coefficient of every node, NaN for nodes without weight.
///
/// For row `i` of `w`: `P = 1 - sum_c(K_ic^2) / K_i^2`, where `K_i` is the row
/// sum and `K_ic` the weight from `i` into community `c`. A node whose row sums
/// to zero gets `0 / 0 = NaN`, which is left in place.
pub fn participation_coefficient(w: &Array2<f64>, affiliation: &Affiliation) -> Array1<f64> {
    let labels = affiliation.labels();
    debug_assert_eq!(w.ncols(), labels.len());

    let mut community_weight: Vec<(u32, f64)> = Vec::new();
    w.rows()
        .into_iter()
        .map(|row| {
            community_weight.clear();
            let mut degree = 0.0;
            for (j, &weight) in row.iter().enumerate() {
                degree += weight;
                if weight == 0.0 {
                    continue;
                }
                match community_weight.iter_mut().find(|(c, _)| *c == labels[j]) {
                    Some((_, total)) => *total += weight,
                    None => community_weight.push((labels[j], weight)),
                }
            }
            let spread: f64 = community_weight.iter().map(|(_, k)| k * k).sum();
            1.0 - spread / (degree * degree)
        })
        .collect()
}

/// Participation coefficient with zero-weight nodes scored 0 instead of NaN
pub fn participation_coefficient_zeroed(
    w: &Array2<f64>,
    affiliation: &Affiliation,
) -> Array1<f64> {
    let degrees = w.sum_axis(ndarray::Axis(1));
    let mut pc = participation_coefficient(w, affiliation);
    for (value, &degree) in pc.iter_mut().zip(degrees.iter()) {
        if degree == 0.0 {
            *value = 0.0;
        }
    }
    pc
}
