//! Artifact layout, persistence and run summaries

pub mod formats;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::to_string_pretty;

use crate::config::{Config, Threshold, THRESHOLDS};
use crate::error::{HubError, Result};

/// Working directories, removed at the end of a run unless cleanup is disabled
pub const WORKING_DIRS: [&str; 3] = ["pajek_files", "infomap_outputs", "pc_outputs"];

/// Directories kept after cleanup
pub const FINAL_DIRS: [&str; 4] = [
    "final_csv_outputs",
    "final_avg_pc_percs",
    "final_hub_indices",
    "final_hubs_dlabels",
];

/// Every artifact the hub pipeline reads or writes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactId {
    /// Distance-censored z-matrix, canonical input of every later stage
    DistCensoredMatrix { subject: String },

    /// `<parcel> <label>` affiliation pairs
    AffiliationReference { subject: String, threshold: Threshold },

    /// Label-only affiliation vector
    AffiliationVector { subject: String, threshold: Threshold },

    /// Degree-censored PC percentiles at one threshold
    CensoredPcPercentiles { subject: String, threshold: Threshold },

    /// PC percentiles averaged across thresholds
    AveragePcPercentiles { subject: String },

    /// 1-based hub parcel numbers
    HubIndices { subject: String },

    /// Label table handed to the label writer
    HubLabelTable { subject: String },

    /// Rendered hub `.dlabel.nii`
    HubLabels { subject: String },
}

impl ArtifactId {
    /// Directory (relative to the output root) and file name
    fn location(&self) -> (&'static str, String) {
        match self {
            ArtifactId::DistCensoredMatrix { subject } => {
                ("final_csv_outputs", format!("{subject}_DIST_CENSORED_ZMAT.csv"))
            }
            ArtifactId::AffiliationReference { subject, threshold } => {
                ("infomap_outputs", format!("{subject}_{threshold}_aff_vect_REF.txt"))
            }
            ArtifactId::AffiliationVector { subject, threshold } => {
                ("infomap_outputs", format!("{subject}_{threshold}_aff_vect.txt"))
            }
            ArtifactId::CensoredPcPercentiles { subject, threshold } => {
                ("pc_outputs", format!("{subject}_{threshold}_CENS_PC_PERC.txt"))
            }
            ArtifactId::AveragePcPercentiles { subject } => (
                "final_avg_pc_percs",
                format!("{subject}_FINAL_AVG_PC_PERCENTAGE.txt"),
            ),
            ArtifactId::HubIndices { subject } => {
                ("final_hub_indices", format!("{subject}_HUB_INDICES.txt"))
            }
            ArtifactId::HubLabelTable { subject } => {
                ("final_hubs_dlabels", format!("{subject}_hub_label_table.txt"))
            }
            ArtifactId::HubLabels { subject } => {
                ("final_hubs_dlabels", format!("{subject}.dlabel.nii"))
            }
        }
    }
}

/// Base name shared by a threshold's network and its detector outputs
pub fn network_name(subject: &str, threshold: Threshold) -> String {
    format!("{subject}_{threshold}_upper_mat")
}

/// Maps artifact IDs to files under one output directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory inside the output root
    pub fn dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn path(&self, id: &ArtifactId) -> PathBuf {
        let (dir, file) = id.location();
        self.root.join(dir).join(file)
    }

    pub fn exists(&self, id: &ArtifactId) -> bool {
        self.path(id).is_file()
    }

    /// Create every working and final directory
    pub fn ensure_layout(&self) -> Result<()> {
        for name in WORKING_DIRS.iter().chain(FINAL_DIRS.iter()) {
            let dir = self.dir(name);
            fs::create_dir_all(&dir).map_err(HubError::io(&dir))?;
        }
        Ok(())
    }

    /// Best-effort removal of the working directories
    pub fn cleanup_working_dirs(&self) {
        log::debug!(" -Cleaning files from non-final output folders...");
        for name in WORKING_DIRS {
            let dir = self.dir(name);
            match fs::remove_dir_all(&dir) {
                Ok(()) => log::debug!("  -Removed {}", dir.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    log::debug!("  -Not found? {}", dir.display());
                }
                Err(e) => log::warn!("  -Could not remove {}: {}", dir.display(), e),
            }
        }
    }
}

/// Outcome of one subject's run
#[derive(Debug, Clone, Serialize)]
pub struct SubjectReport {
    pub subject: String,
    pub status: SubjectStatus,
    pub hub_count: Option<usize>,
    pub hubs: Vec<usize>,
    pub error: Option<String>,
    pub seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectStatus {
    Completed,
    Failed,
}

/// Save the run summary as `run_summary.json`
pub fn save_summary(store: &ArtifactStore, config: &Config, reports: &[SubjectReport]) -> Result<()> {
    let path = store.root().join("run_summary.json");
    log::info!("Saving run summary to {}", path.display());

    let completed = reports
        .iter()
        .filter(|r| r.status == SubjectStatus::Completed)
        .count();
    let summary = serde_json::json!({
        "parameters": {
            "thresholds": THRESHOLDS,
            "attempts": config.attempts,
            "detector": config.detector,
            "hub_cutoff": config.hub_cutoff,
            "low_degree_percentile": config.low_degree_percentile,
            "overlay": config.overlay,
            "seed": config.seed,
        },
        "subject_stats": {
            "subject_count": reports.len(),
            "completed": completed,
            "failed": reports.len() - completed,
            "avg_hub_count": average_hub_count(reports),
        },
        "subjects": reports,
    });

    let text = to_string_pretty(&summary).map_err(|e| HubError::Io {
        path: path.clone(),
        source: e.into(),
    })?;
    let mut file = File::create(&path).map_err(HubError::io(&path))?;
    file.write_all(text.as_bytes()).map_err(HubError::io(&path))?;
    Ok(())
}

fn average_hub_count(reports: &[SubjectReport]) -> f64 {
    let counts: Vec<usize> = reports.iter().filter_map(|r| r.hub_count).collect();
    if counts.is_empty() {
        0.0
    } else {
        counts.iter().sum::<usize>() as f64 / counts.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_output_layout() {
        let store = ArtifactStore::new("/out");
        let threshold = Threshold::all().nth(3).expect("sweep has 12 entries");

        assert_eq!(
            store.path(&ArtifactId::DistCensoredMatrix {
                subject: "sub01".into()
            }),
            PathBuf::from("/out/final_csv_outputs/sub01_DIST_CENSORED_ZMAT.csv")
        );
        assert_eq!(
            store.path(&ArtifactId::AffiliationVector {
                subject: "sub01".into(),
                threshold
            }),
            PathBuf::from("/out/infomap_outputs/sub01_0.01_aff_vect.txt")
        );
        assert_eq!(
            store.path(&ArtifactId::CensoredPcPercentiles {
                subject: "sub01".into(),
                threshold
            }),
            PathBuf::from("/out/pc_outputs/sub01_0.01_CENS_PC_PERC.txt")
        );
    }

    #[test]
    fn cleanup_keeps_final_dirs_and_tolerates_missing() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let store = ArtifactStore::new(dir.path());
        store.ensure_layout().expect("layout should be created");
        fs::remove_dir_all(store.dir("pc_outputs")).expect("dir exists");

        store.cleanup_working_dirs();

        for name in WORKING_DIRS {
            assert!(!store.dir(name).exists());
        }
        for name in FINAL_DIRS {
            assert!(store.dir(name).is_dir());
        }
    }
}
