//! Configuration management for the hub identification pipeline

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::cluster::DetectorKind;
use crate::error::{HubError, Result};
use crate::viz::OverlayColor;

/// Number of parcels in the Gordon 333 parcellation
pub const PARCEL_COUNT: usize = 333;

/// Proportional edge densities swept for every subject, smallest graph first
pub const THRESHOLDS: [f64; 12] = [
    0.003, 0.004, 0.005, 0.01, 0.015, 0.02, 0.025, 0.03, 0.035, 0.04, 0.045, 0.05,
];

/// Handle to one entry of [`THRESHOLDS`].
///
/// Every stage that thresholds a matrix or names a threshold-keyed artifact goes
/// through this type, so the float used to build a graph and the key used to
/// read its affiliation vector back always come from the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Threshold(usize);

impl Threshold {
    /// All thresholds in sweep order
    pub fn all() -> impl Iterator<Item = Threshold> {
        (0..THRESHOLDS.len()).map(Threshold)
    }

    pub fn index(self) -> usize {
        self.0
    }

    pub fn value(self) -> f64 {
        THRESHOLDS[self.0]
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Settings for a hub identification run
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for every artifact the run writes
    pub output_dir: PathBuf,

    /// Comma-delimited 0/1 distance multiplication mask
    pub distance_mask: PathBuf,

    /// Parcellation `.dlabel.nii` used as the label template
    pub parcel_template: PathBuf,

    /// Randomized community detection attempts per threshold
    pub attempts: u32,

    /// Overlay color for hub parcels in the label output
    pub overlay: OverlayColor,

    /// Re-percentiled score at or above which a parcel is a hub
    pub hub_cutoff: f64,

    /// Degree percentile below which parcels are censored
    pub low_degree_percentile: f64,

    /// Community detection backend
    pub detector: DetectorKind,

    /// Infomap executable
    pub infomap_binary: PathBuf,

    /// Connectome Workbench executable
    pub wb_command: PathBuf,

    /// Wall-clock limit for one community detection invocation
    pub detector_timeout: Duration,

    /// Relaunch attempts when an external program fails to start
    pub launch_retries: u32,

    /// Base delay between relaunch attempts, doubled each time
    pub launch_backoff: Duration,

    /// Base seed; when unset each detection call draws a fresh random seed
    pub seed: Option<u64>,

    /// Subjects processed concurrently (1 = sequential, 0 = all cores)
    pub jobs: usize,

    /// Remove working directories once all subjects are done
    pub cleanup: bool,

    /// Skip stages whose outputs already exist
    pub resume: bool,

    /// Do not render hub label files
    pub skip_labels: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("hub_results"),
            distance_mask: PathBuf::from("COMBINED333_LR_Distance_MULTIPLICATION_MASK.csv"),
            parcel_template: PathBuf::from("Parcels_LR.dlabel.nii"),
            attempts: 1000,
            overlay: OverlayColor::Pink,
            hub_cutoff: 80.0,
            low_degree_percentile: 25.0,
            detector: DetectorKind::Infomap,
            infomap_binary: PathBuf::from("infomap"),
            wb_command: PathBuf::from("wb_command"),
            detector_timeout: Duration::from_secs(3600),
            launch_retries: 3,
            launch_backoff: Duration::from_millis(250),
            seed: None,
            jobs: 1,
            cleanup: true,
            resume: false,
            skip_labels: false,
        }
    }
}

impl Config {
    /// Create a configuration with the required paths and default settings
    pub fn new(output_dir: PathBuf, distance_mask: PathBuf, parcel_template: PathBuf) -> Self {
        Self {
            output_dir,
            distance_mask,
            parcel_template,
            ..Self::default()
        }
    }

    /// Check everything every subject depends on before any work starts
    pub fn validate(&self) -> Result<()> {
        if !self.output_dir.is_dir() {
            return Err(HubError::Config(format!(
                "output directory not found: {}",
                self.output_dir.display()
            )));
        }
        if !self.distance_mask.is_file() {
            return Err(HubError::MissingTemplate(self.distance_mask.clone()));
        }
        if !self.skip_labels && !self.parcel_template.is_file() {
            return Err(HubError::MissingTemplate(self.parcel_template.clone()));
        }
        if self.attempts == 0 {
            return Err(HubError::Config("attempts must be at least 1".into()));
        }
        if !(0.0..=100.0).contains(&self.hub_cutoff) {
            return Err(HubError::Config(format!(
                "hub cutoff must lie in [0, 100], got {}",
                self.hub_cutoff
            )));
        }
        if !(0.0..=100.0).contains(&self.low_degree_percentile) {
            return Err(HubError::Config(format!(
                "low degree percentile must lie in [0, 100], got {}",
                self.low_degree_percentile
            )));
        }
        Ok(())
    }

    /// Worker threads implied by `jobs`
    pub fn worker_threads(&self) -> usize {
        if self.jobs > 0 {
            self.jobs
        } else {
            num_cpus::get()
        }
    }
}
