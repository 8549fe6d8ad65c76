//! Community detection and community-aware centrality

pub mod detection;
pub mod infomap;
pub mod metrics;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{HubError, Result};
use crate::graph::ParcelGraph;

pub use detection::LouvainDetector;
pub use infomap::InfomapDetector;

/// Available community detection backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    /// External two-level Infomap
    Infomap,
    /// In-process Louvain modularity optimization
    Louvain,
}

/// Community label of one node as reported by a detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    /// 1-based node (parcel) number
    pub node: usize,

    /// Community label, meaningful only within one detection run
    pub module: u32,
}

/// What a detector is asked to partition
#[derive(Debug, Clone, Copy)]
pub struct DetectionRequest<'a> {
    pub graph: &'a ParcelGraph,

    /// Unique name for any files the detector writes
    pub name: &'a str,

    pub seed: u64,

    /// Randomized attempts; the detector keeps its best partition
    pub attempts: u32,
}

/// Capability to assign one community label to every node of a weighted graph.
///
/// Output order is not guaranteed; callers sort by node.
pub trait CommunityDetector: Send + Sync {
    fn detect(&self, request: &DetectionRequest<'_>) -> Result<Vec<Assignment>>;

    /// Where the partition for `name` comes from, for error reporting
    fn source(&self, name: &str) -> PathBuf {
        PathBuf::from(name)
    }
}

/// Community labels in parcel order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affiliation {
    labels: Vec<u32>,
}

impl Affiliation {
    /// Order detector output by node and check it covers every parcel exactly once
    pub fn from_assignments(
        mut assignments: Vec<Assignment>,
        parcel_count: usize,
        source: &Path,
    ) -> Result<Self> {
        assignments.sort_by_key(|a| a.node);
        assignments.dedup_by_key(|a| a.node);

        let covers_all = assignments.len() == parcel_count
            && assignments.iter().enumerate().all(|(i, a)| a.node == i + 1);
        if !covers_all {
            return Err(HubError::AffiliationCount {
                path: source.to_path_buf(),
                expected: parcel_count,
                found: assignments.len(),
            });
        }

        Ok(Self {
            labels: assignments.into_iter().map(|a| a.module).collect(),
        })
    }

    pub fn from_labels(labels: Vec<u32>) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(1-based parcel, label)` pairs
    pub fn pairs(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.labels.iter().enumerate().map(|(i, &label)| (i + 1, label))
    }

    /// Number of distinct communities
    pub fn community_count(&self) -> usize {
        let mut labels = self.labels.clone();
        labels.sort_unstable();
        labels.dedup();
        labels.len()
    }
}
