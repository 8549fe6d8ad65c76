//! Subject inputs: manifest, timeseries, distance mask, and their preprocessing

pub mod loaders;
pub mod preprocessing;

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{HubError, Result};

/// One manifest entry: a subject ID and its parcel timeseries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: String,
    pub timeseries: PathBuf,
}

/// Reject manifests that name the same subject twice.
///
/// Artifacts are namespaced by subject ID, so two entries with one ID would
/// write the same files.
pub fn ensure_unique_subjects(subjects: &[Subject]) -> Result<()> {
    let mut seen = HashSet::with_capacity(subjects.len());
    for subject in subjects {
        if !seen.insert(subject.id.as_str()) {
            return Err(HubError::Config(format!(
                "subject {} is listed more than once",
                subject.id
            )));
        }
    }
    Ok(())
}
