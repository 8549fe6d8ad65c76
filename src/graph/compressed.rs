//! Compressed sparse representation of a weighted undirected graph

/// Weighted graph in CSR form.
///
/// Every undirected edge is stored once per direction. Self-loops are kept out
/// of the adjacency arrays and held in `self_loops`, which is how aggregated
/// community graphs carry their internal weight.
#[derive(Debug, Clone, Default)]
pub struct CompressedGraph {
    /// Number of nodes in the graph
    pub node_count: usize,

    /// offsets[i] to offsets[i+1] defines the edge range for node i
    pub offsets: Vec<u32>,

    /// Concatenated neighbor lists
    pub edges: Vec<u32>,

    /// Weight of each entry in `edges`
    pub weights: Vec<f64>,

    /// Self-loop weight per node
    pub self_loops: Vec<f64>,
}

impl CompressedGraph {
    /// Create an empty graph with pre-allocated capacity
    pub fn with_capacity(node_count: usize, edge_count: usize) -> Self {
        Self {
            node_count,
            offsets: Vec::with_capacity(node_count + 1),
            edges: Vec::with_capacity(edge_count),
            weights: Vec::with_capacity(edge_count),
            self_loops: vec![0.0; node_count],
        }
    }

    /// Neighbors of a node
    pub fn outgoing_edges(&self, node: usize) -> &[u32] {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        &self.edges[start..end]
    }

    /// Weights aligned with [`outgoing_edges`](Self::outgoing_edges)
    pub fn edge_weights(&self, node: usize) -> &[f64] {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        &self.weights[start..end]
    }

    /// `(neighbor, weight)` pairs of a node
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.outgoing_edges(node)
            .iter()
            .zip(self.edge_weights(node))
            .map(|(&dst, &w)| (dst as usize, w))
    }

    /// Weighted degree including the self-loop
    pub fn strength(&self, node: usize) -> f64 {
        self.edge_weights(node).iter().sum::<f64>() + self.self_loops[node]
    }

    /// Sum of all strengths (twice the total edge weight)
    pub fn total_strength(&self) -> f64 {
        (0..self.node_count).map(|node| self.strength(node)).sum()
    }

    /// Number of neighbors of a node
    pub fn out_degree(&self, node: usize) -> usize {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        end - start
    }
}
