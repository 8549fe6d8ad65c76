//! Pajek `.net` export for external community detection

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use petgraph::visit::EdgeRef;

use crate::error::{HubError, Result};
use crate::graph::ParcelGraph;

/// Write a parcel graph as a Pajek network.
///
/// Vertices are numbered from 1 in parcel order and labeled with their 0-based
/// parcel index.
pub fn write_pajek(graph: &ParcelGraph, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(HubError::io(path))?;
    let mut out = BufWriter::new(file);
    write_network(graph, &mut out).map_err(HubError::io(path))?;
    out.flush().map_err(HubError::io(path))
}

fn write_network<W: Write>(graph: &ParcelGraph, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "*Vertices {}", graph.node_count())?;
    for node in graph.node_indices() {
        writeln!(out, "{} \"{}\"", node.index() + 1, graph[node])?;
    }
    writeln!(out, "*Edges")?;
    for edge in graph.edge_references() {
        writeln!(
            out,
            "{} {} {}",
            edge.source().index() + 1,
            edge.target().index() + 1,
            edge.weight()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::parcel_graph;
    use ndarray::array;

    #[test]
    fn pajek_uses_one_based_vertices() {
        let matrix = array![[0.0, 0.5, 0.0], [0.5, 0.0, 0.0], [0.0, 0.0, 0.0]];
        let mut buffer = Vec::new();
        write_network(&parcel_graph(&matrix), &mut buffer).expect("write to memory");
        let text = String::from_utf8(buffer).expect("pajek output is utf-8");

        assert_eq!(
            text,
            "*Vertices 3\n1 \"0\"\n2 \"1\"\n3 \"2\"\n*Edges\n1 2 0.5\n"
        );
    }
}
