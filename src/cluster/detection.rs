//! In-process community detection by Louvain modularity optimization

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::cluster::{Assignment, CommunityDetector, DetectionRequest};
use crate::error::Result;
use crate::graph::builder::{compress, GraphBuilder};
use crate::graph::CompressedGraph;

/// Minimum modularity gain for a node to change community
const MIN_GAIN: f64 = 1e-12;

/// Upper bound on local-moving sweeps per level
const MAX_SWEEPS: usize = 1000;

/// Two-level Louvain detector.
///
/// Each attempt runs the full multi-level procedure with its own shuffled node
/// order and reports the final flat partition; the attempt with the highest
/// modularity wins, ties going to the earliest attempt. Edges with non-positive
/// weight are ignored.
#[derive(Debug, Clone, Default)]
pub struct LouvainDetector;

impl CommunityDetector for LouvainDetector {
    fn detect(&self, request: &DetectionRequest<'_>) -> Result<Vec<Assignment>> {
        let graph = compress(request.graph);
        let attempts = request.attempts.max(1);

        let best = (0..attempts)
            .into_par_iter()
            .map(|attempt| {
                let mut rng = StdRng::seed_from_u64(attempt_seed(request.seed, attempt));
                let labels = louvain(&graph, &mut rng);
                let quality = modularity(&graph, &labels);
                (attempt, quality, labels)
            })
            .reduce_with(|best, candidate| {
                let better = candidate.1 > best.1 || (candidate.1 == best.1 && candidate.0 < best.0);
                if better {
                    candidate
                } else {
                    best
                }
            });

        let labels = best.map(|(_, _, labels)| labels).unwrap_or_default();
        log::debug!(
            "Louvain partitioned {} into {} communities",
            request.name,
            labels.iter().max().map_or(0, |&m| m + 1)
        );

        Ok(labels
            .into_iter()
            .enumerate()
            .map(|(node, module)| Assignment {
                node: node + 1,
                module: module as u32 + 1,
            })
            .collect())
    }
}

fn attempt_seed(seed: u64, attempt: u32) -> u64 {
    seed.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(u64::from(attempt))
}

/// Run Louvain to convergence and return one 0-based community per node
pub fn louvain(graph: &CompressedGraph, rng: &mut StdRng) -> Vec<usize> {
    let mut membership: Vec<usize> = (0..graph.node_count).collect();
    let mut level = graph.clone();

    loop {
        let (communities, moved) = local_moving(&level, rng);
        if !moved {
            break;
        }
        let (renumbered, count) = renumber(&communities);
        for community in membership.iter_mut() {
            *community = renumbered[*community];
        }
        level = aggregate(&level, &renumbered, count);
    }

    renumber(&membership).0
}

/// Greedily move nodes between communities until no move improves modularity
fn local_moving(graph: &CompressedGraph, rng: &mut StdRng) -> (Vec<usize>, bool) {
    let n = graph.node_count;
    let mut community: Vec<usize> = (0..n).collect();
    let two_m = graph.total_strength();
    if two_m <= 0.0 {
        return (community, false);
    }

    let strength: Vec<f64> = (0..n).map(|node| graph.strength(node)).collect();
    let mut totals = strength.clone();

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    // Scratch space for weights from one node to each neighboring community
    let mut link_weight = vec![0.0; n];
    let mut touched: Vec<usize> = Vec::new();

    let mut moved_any = false;
    for _ in 0..MAX_SWEEPS {
        let mut improved = false;

        for &node in &order {
            let current = community[node];
            for (neighbor, weight) in graph.neighbors(node) {
                let c = community[neighbor];
                if link_weight[c] == 0.0 {
                    touched.push(c);
                }
                link_weight[c] += weight;
            }

            totals[current] -= strength[node];
            let gain = |c: usize, totals: &[f64]| link_weight[c] - totals[c] * strength[node] / two_m;

            let mut best = current;
            let mut best_gain = gain(current, &totals);
            for &c in &touched {
                let candidate = gain(c, &totals);
                if candidate > best_gain + MIN_GAIN {
                    best = c;
                    best_gain = candidate;
                }
            }

            totals[best] += strength[node];
            community[node] = best;
            if best != current {
                improved = true;
                moved_any = true;
            }

            for &c in &touched {
                link_weight[c] = 0.0;
            }
            touched.clear();
        }

        if !improved {
            break;
        }
    }

    (community, moved_any)
}

/// Collapse each community into a single node
fn aggregate(graph: &CompressedGraph, community: &[usize], count: usize) -> CompressedGraph {
    let mut builder = GraphBuilder::with_capacity(count);
    for node in 0..graph.node_count {
        let c = community[node];
        builder.add_self_loop(c, graph.self_loops[node]);
        for (neighbor, weight) in graph.neighbors(node) {
            let d = community[neighbor];
            if c == d {
                builder.add_self_loop(c, weight);
            } else {
                builder.add_arc(c, d, weight);
            }
        }
    }
    builder.build()
}

/// Relabel communities as 0..count in order of first appearance
fn renumber(community: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping = vec![usize::MAX; community.len()];
    let mut next = 0;
    let renumbered = community
        .iter()
        .map(|&c| {
            if mapping[c] == usize::MAX {
                mapping[c] = next;
                next += 1;
            }
            mapping[c]
        })
        .collect();
    (renumbered, next)
}

/// Newman modularity of a partition
pub fn modularity(graph: &CompressedGraph, community: &[usize]) -> f64 {
    let two_m = graph.total_strength();
    if two_m <= 0.0 {
        return 0.0;
    }

    let count = community.iter().max().map_or(0, |&c| c + 1);
    let mut internal = vec![0.0; count];
    let mut totals = vec![0.0; count];

    for node in 0..graph.node_count {
        let c = community[node];
        totals[c] += graph.strength(node);
        internal[c] += graph.self_loops[node];
        for (neighbor, weight) in graph.neighbors(node) {
            if community[neighbor] == c {
                internal[c] += weight;
            }
        }
    }

    internal
        .iter()
        .zip(&totals)
        .map(|(&inside, &total)| inside / two_m - (total / two_m).powi(2))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::parcel_graph;
    use ndarray::Array2;

    /// Two 4-cliques joined by one weak edge, plus an isolated node
    fn two_cliques() -> Array2<f64> {
        let mut matrix = Array2::zeros((9, 9));
        for block in [0..4, 4..8] {
            for i in block.clone() {
                for j in block.clone() {
                    if i != j {
                        matrix[[i, j]] = 1.0;
                    }
                }
            }
        }
        matrix[[3, 4]] = 0.1;
        matrix[[4, 3]] = 0.1;
        matrix
    }

    #[test]
    fn finds_planted_communities() {
        let graph = parcel_graph(&two_cliques());
        let request = DetectionRequest {
            graph: &graph,
            name: "cliques",
            seed: 7,
            attempts: 10,
        };
        let assignments = LouvainDetector.detect(&request).expect("detection succeeds");

        assert_eq!(assignments.len(), 9);
        let module = |node: usize| assignments[node - 1].module;
        assert!((1..=4).all(|n| module(n) == module(1)));
        assert!((5..=8).all(|n| module(n) == module(5)));
        assert_ne!(module(1), module(5));
        assert_ne!(module(9), module(1));
        assert_ne!(module(9), module(5));
    }

    #[test]
    fn same_seed_gives_same_partition() {
        let graph = parcel_graph(&two_cliques());
        let request = DetectionRequest {
            graph: &graph,
            name: "cliques",
            seed: 1234,
            attempts: 5,
        };
        let first = LouvainDetector.detect(&request).expect("detection succeeds");
        let second = LouvainDetector.detect(&request).expect("detection succeeds");
        assert_eq!(first, second);
    }

    #[test]
    fn short_partition_names_the_network_not_a_clu_file() {
        let graph = parcel_graph(&two_cliques());
        let request = DetectionRequest {
            graph: &graph,
            name: "sub01_0.01_upper_mat",
            seed: 3,
            attempts: 1,
        };
        let assignments = LouvainDetector.detect(&request).expect("detection succeeds");
        let source = LouvainDetector.source(request.name);
        let err = crate::cluster::Affiliation::from_assignments(assignments, 10, &source)
            .expect_err("graph has 9 nodes");
        match err {
            crate::error::HubError::AffiliationCount { path, found, .. } => {
                assert_eq!(path, std::path::PathBuf::from("sub01_0.01_upper_mat"));
                assert_eq!(found, 9);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_graph_gives_singletons() {
        let graph = parcel_graph(&Array2::zeros((3, 3)));
        let request = DetectionRequest {
            graph: &graph,
            name: "empty",
            seed: 1,
            attempts: 3,
        };
        let assignments = LouvainDetector.detect(&request).expect("detection succeeds");
        let modules: Vec<u32> = assignments.iter().map(|a| a.module).collect();
        assert_eq!(modules, vec![1, 2, 3]);
    }

    #[test]
    fn planted_partition_beats_single_community() {
        let graph = compress(&parcel_graph(&two_cliques()));
        let planted = vec![0, 0, 0, 0, 1, 1, 1, 1, 2];
        let merged = vec![0; 9];
        assert!(modularity(&graph, &planted) > modularity(&graph, &merged));
        assert!(modularity(&graph, &merged).abs() < 1e-12);
    }
}
