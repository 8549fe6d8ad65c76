//! Graph construction from thresholded connectivity matrices

use ndarray::Array2;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::graph::CompressedGraph;

/// Undirected parcel graph; node weights are 0-based parcel indices
pub type ParcelGraph = UnGraph<usize, f64>;

/// Build an undirected weighted graph from a symmetric thresholded matrix.
///
/// Every parcel becomes a node, isolated or not, and each nonzero entry above
/// the diagonal becomes one edge.
pub fn parcel_graph(matrix: &Array2<f64>) -> ParcelGraph {
    let n = matrix.nrows();
    let edge_count = matrix.iter().filter(|&&v| v != 0.0).count() / 2;
    let mut graph = ParcelGraph::with_capacity(n, edge_count);

    let nodes: Vec<NodeIndex> = (0..n).map(|parcel| graph.add_node(parcel)).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            let weight = matrix[[i, j]];
            if weight != 0.0 {
                graph.add_edge(nodes[i], nodes[j], weight);
            }
        }
    }

    log::debug!(
        "Built parcel graph with {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    graph
}

/// Compress a parcel graph, keeping only positive edge weights
pub fn compress(graph: &ParcelGraph) -> CompressedGraph {
    let mut builder = GraphBuilder::with_capacity(graph.node_count());
    for edge in graph.edge_references() {
        let weight = *edge.weight();
        if weight > 0.0 {
            builder.add_edge(edge.source().index(), edge.target().index(), weight);
        }
    }
    builder.build()
}

/// Builder for incrementally constructing a CompressedGraph
pub struct GraphBuilder {
    /// Adjacency lists for each node
    adjacency_lists: Vec<Vec<(u32, f64)>>,

    /// Self-loop weight per node
    self_loops: Vec<f64>,
}

impl GraphBuilder {
    /// Create a builder for a fixed number of nodes
    pub fn with_capacity(node_count: usize) -> Self {
        Self {
            adjacency_lists: vec![Vec::new(); node_count],
            self_loops: vec![0.0; node_count],
        }
    }

    /// Add an undirected edge, stored in both directions
    pub fn add_edge(&mut self, a: usize, b: usize, weight: f64) {
        if a == b {
            self.self_loops[a] += 2.0 * weight;
            return;
        }
        self.adjacency_lists[a].push((b as u32, weight));
        self.adjacency_lists[b].push((a as u32, weight));
    }

    /// Add a single directed entry; the caller adds the reverse entry itself
    pub fn add_arc(&mut self, src: usize, dst: usize, weight: f64) {
        self.adjacency_lists[src].push((dst as u32, weight));
    }

    /// Add weight to a node's self-loop
    pub fn add_self_loop(&mut self, node: usize, weight: f64) {
        self.self_loops[node] += weight;
    }

    /// Build the compressed graph, merging parallel entries
    pub fn build(mut self) -> CompressedGraph {
        let node_count = self.adjacency_lists.len();
        let edge_count: usize = self.adjacency_lists.iter().map(Vec::len).sum();
        let mut graph = CompressedGraph::with_capacity(node_count, edge_count);

        graph.offsets.push(0);
        let mut offset = 0u32;
        for list in &mut self.adjacency_lists {
            list.sort_by_key(|&(dst, _)| dst);
            let mut last: Option<u32> = None;
            for &(dst, weight) in list.iter() {
                if last == Some(dst) {
                    if let Some(w) = graph.weights.last_mut() {
                        *w += weight;
                    }
                    continue;
                }
                graph.edges.push(dst);
                graph.weights.push(weight);
                last = Some(dst);
                offset += 1;
            }
            graph.offsets.push(offset);
        }
        graph.self_loops = self.self_loops;

        graph
    }
}
