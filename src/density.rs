//! Group hub density: how many subjects flagged each parcel as a hub

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::PARCEL_COUNT;
use crate::error::{HubError, Result};
use crate::storage::formats::read_indices;
use crate::viz::ScalarMapWriter;

/// Per-parcel hub counts, indexed by 1-based parcel number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubCounts {
    counts: [u32; PARCEL_COUNT],
}

impl Default for HubCounts {
    fn default() -> Self {
        Self {
            counts: [0; PARCEL_COUNT],
        }
    }
}

impl HubCounts {
    /// Count for a 1-based parcel
    pub fn get(&self, parcel: usize) -> u32 {
        parcel
            .checked_sub(1)
            .and_then(|i| self.counts.get(i))
            .copied()
            .unwrap_or(0)
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Add one hub index file's parcels
    pub fn add_file(&mut self, path: &Path) -> Result<()> {
        log::debug!("{}", path.display());
        for index in read_indices(path)? {
            let slot = index
                .checked_sub(1)
                .and_then(|i| self.counts.get_mut(i))
                .ok_or_else(|| HubError::ParcelOutOfRange {
                    path: path.to_path_buf(),
                    index,
                    max: PARCEL_COUNT,
                })?;
            *slot += 1;
        }
        Ok(())
    }

    /// Accumulate every `*_HUB_INDICES.txt` file in `dir`, in sorted order
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(HubError::MissingInput(dir.to_path_buf()));
        }
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(HubError::io(dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with("_HUB_INDICES.txt"))
            })
            .collect();
        files.sort();

        let mut counts = Self::default();
        for file in &files {
            counts.add_file(file)?;
        }
        log::info!("Counted hubs from {} subjects", files.len());
        Ok(counts)
    }

    /// One count per line, parcel 1 first
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(HubError::io(path))?;
        let mut out = BufWriter::new(file);
        for count in &self.counts {
            writeln!(out, "{count}").map_err(HubError::io(path))?;
        }
        out.flush().map_err(HubError::io(path))
    }
}

/// Count hubs across a directory of index files and render the density map.
///
/// Writes `<name>_Gordon333_Hub_Counts.txt` and
/// `<name>_hubs_density_map.pscalar.nii` into `output_dir`.
pub fn create_density_map(
    indices_dir: &Path,
    output_dir: &Path,
    name: &str,
    template: &Path,
    writer: &dyn ScalarMapWriter,
) -> Result<PathBuf> {
    if !output_dir.is_dir() {
        return Err(HubError::Config(format!(
            "output directory not found: {}",
            output_dir.display()
        )));
    }
    if !template.is_file() {
        return Err(HubError::MissingTemplate(template.to_path_buf()));
    }

    let counts = HubCounts::from_dir(indices_dir)?;
    let values = output_dir.join(format!("{name}_Gordon333_Hub_Counts.txt"));
    counts.write(&values)?;
    log::info!("Hub count text file created: {}", values.display());

    let map = output_dir.join(format!("{name}_hubs_density_map.pscalar.nii"));
    writer.write_scalars(&values, template, &map)?;
    log::info!("Density map created: {}", map.display());
    Ok(map)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[derive(Default)]
    struct RecordingScalars {
        calls: RefCell<Vec<(PathBuf, PathBuf)>>,
    }

    impl ScalarMapWriter for RecordingScalars {
        fn write_scalars(&self, values: &Path, _template: &Path, output: &Path) -> Result<()> {
            self.calls
                .borrow_mut()
                .push((values.to_path_buf(), output.to_path_buf()));
            Ok(())
        }
    }

    fn indices_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).expect("indices should be written");
        }
        dir
    }

    #[test]
    fn counts_parcels_across_subjects() {
        let dir = indices_dir(&[
            ("a_HUB_INDICES.txt", "5\n10\n"),
            ("b_HUB_INDICES.txt", "5\n"),
            ("c_HUB_INDICES.txt", ""),
        ]);

        let counts = HubCounts::from_dir(dir.path()).expect("counts should accumulate");
        assert_eq!(counts.get(5), 2);
        assert_eq!(counts.get(10), 1);
        assert_eq!(counts.counts().iter().sum::<u32>(), 3);
    }

    #[test]
    fn out_of_range_parcel_is_rejected() {
        let dir = indices_dir(&[("a_HUB_INDICES.txt", "334\n")]);
        assert!(matches!(
            HubCounts::from_dir(dir.path()),
            Err(HubError::ParcelOutOfRange { index: 334, .. })
        ));

        let dir = indices_dir(&[("a_HUB_INDICES.txt", "0\n")]);
        assert!(matches!(
            HubCounts::from_dir(dir.path()),
            Err(HubError::ParcelOutOfRange { index: 0, .. })
        ));
    }

    #[test]
    fn density_map_writes_counts_and_calls_writer() {
        let indices = indices_dir(&[("a_HUB_INDICES.txt", "1\n333\n")]);
        let out = tempfile::tempdir().expect("temp dir should be created");
        let template = out.path().join("Gordon333_TEMPLATE.pscalar.nii");
        fs::write(&template, b"").expect("template should be written");
        let writer = RecordingScalars::default();

        let map = create_density_map(indices.path(), out.path(), "group", &template, &writer)
            .expect("density map should be created");

        let text = fs::read_to_string(out.path().join("group_Gordon333_Hub_Counts.txt"))
            .expect("counts should exist");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), PARCEL_COUNT);
        assert_eq!(lines[0], "1");
        assert_eq!(lines[1], "0");
        assert_eq!(lines[332], "1");
        assert_eq!(
            writer.calls.borrow().as_slice(),
            &[(out.path().join("group_Gordon333_Hub_Counts.txt"), map)]
        );
    }
}
