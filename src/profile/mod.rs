//! Hub connectivity profiles and the cross-hub profile correlation matrix
//!
//! A hub's profile is its mean connectivity to each of the 13 functional
//! networks, read from the distance-censored matrix the identification run
//! kept. Profiles from every subject are then correlated with each other so
//! hubs can later be grouped by profile similarity.

pub mod networks;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use itertools::Itertools;
use ndarray::Array2;
use statrs::statistics::Statistics;

use crate::config::PARCEL_COUNT;
use crate::data::loaders::parse_float;
use crate::error::{HubError, Result};
use crate::storage::formats::{read_indices, read_matrix_csv};
use crate::stats::round_decimals;
use crate::storage::{ArtifactId, ArtifactStore};

pub use networks::{Network, NETWORKS};

const INDICES_SUFFIX: &str = "_HUB_INDICES.txt";
const PROFILES_DIR: &str = "final_conn_profiles";

/// One hub's network connectivity means
#[derive(Debug, Clone, PartialEq)]
pub struct HubProfile {
    /// `<subject>_<1-based hub>`
    pub key: String,
    pub values: Vec<f64>,
}

/// Network means of a hub's matrix row, rounded to 4 decimals.
///
/// The hub's own entry is left out of the one network it belongs to.
pub fn hub_profile(matrix: &Array2<f64>, hub: usize) -> Result<Vec<f64>> {
    let parcel = hub.checked_sub(1).filter(|&p| p < matrix.nrows());
    let Some(parcel) = parcel else {
        return Err(HubError::SelfConnection {
            hub,
            memberships: 0,
        });
    };
    let memberships = NETWORKS.iter().filter(|n| n.contains(parcel)).count();
    if memberships != 1 {
        return Err(HubError::SelfConnection { hub, memberships });
    }

    let row = matrix.row(parcel);
    Ok(NETWORKS
        .iter()
        .map(|network| {
            let mean = network
                .parcels
                .iter()
                .filter(|&&p| p != parcel)
                .map(|&p| row[p])
                .mean();
            round_decimals(mean, 4)
        })
        .collect())
}

/// Profiles of every hub of one subject, in hub order
pub fn subject_profiles(subject: &str, matrix: &Array2<f64>, hubs: &[usize]) -> Result<Vec<HubProfile>> {
    if matrix.dim() != (PARCEL_COUNT, PARCEL_COUNT) {
        return Err(HubError::ShapeMismatch {
            what: "connectivity matrix",
            expected: format!("{PARCEL_COUNT} x {PARCEL_COUNT}"),
            found: format!("{} x {}", matrix.nrows(), matrix.ncols()),
        });
    }
    hubs.iter()
        .map(|&hub| -> Result<HubProfile> {
            Ok(HubProfile {
                key: format!("{subject}_{hub}"),
                values: hub_profile(matrix, hub)?,
            })
        })
        .collect()
}

/// One `key v1 .. v13` line per profile
pub fn write_profiles(profiles: &[HubProfile], path: &Path) -> Result<()> {
    let file = File::create(path).map_err(HubError::io(path))?;
    let mut out = BufWriter::new(file);
    for profile in profiles {
        writeln!(out, "{} {}", profile.key, profile.values.iter().join(" "))
            .map_err(HubError::io(path))?;
    }
    out.flush().map_err(HubError::io(path))
}

pub fn read_profiles(path: &Path) -> Result<Vec<HubProfile>> {
    if !path.exists() {
        return Err(HubError::MissingInput(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(HubError::io(path))?;

    let mut profiles = Vec::new();
    for (line_idx, line) in text.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let Some(key) = fields.next() else {
            continue;
        };
        let values = fields
            .map(|field| {
                parse_float(field).ok_or_else(|| HubError::Parse {
                    path: path.to_path_buf(),
                    line: line_idx + 1,
                    message: format!("not a number: {field:?}"),
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        if values.len() != NETWORKS.len() {
            return Err(HubError::Parse {
                path: path.to_path_buf(),
                line: line_idx + 1,
                message: format!("expected {} network values, found {}", NETWORKS.len(), values.len()),
            });
        }
        profiles.push(HubProfile {
            key: key.to_string(),
            values,
        });
    }
    Ok(profiles)
}

/// Pearson correlation between every pair of profiles
pub fn profile_correlations(profiles: &[HubProfile]) -> Array2<f64> {
    let n = profiles.len();
    let mut corr = Array2::zeros((n, n));
    for i in 0..n {
        for j in i..n {
            let r = pearson(&profiles[i].values, &profiles[j].values);
            corr[[i, j]] = r;
            corr[[j, i]] = r;
        }
    }
    corr
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let covariance = a.iter().covariance(b.iter());
    covariance / (a.iter().std_dev() * b.iter().std_dev())
}

/// Comma-delimited matrix with 6 decimals
pub fn write_correlation_csv(matrix: &Array2<f64>, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(HubError::io(path))?;
    let mut out = BufWriter::new(file);
    for row in matrix.rows() {
        let line = row
            .iter()
            .map(|v| {
                if v.is_nan() {
                    "nan".to_string()
                } else {
                    format!("{v:.6}")
                }
            })
            .join(",");
        writeln!(out, "{line}").map_err(HubError::io(path))?;
    }
    out.flush().map_err(HubError::io(path))
}

/// Subject IDs with a hub index file in `dir`, sorted
pub fn discover_subjects(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Err(HubError::MissingInput(dir.to_path_buf()));
    }
    let mut subjects: Vec<String> = fs::read_dir(dir)
        .map_err(HubError::io(dir))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_suffix(INDICES_SUFFIX))
                .map(str::to_string)
        })
        .collect();
    subjects.sort();
    Ok(subjects)
}

/// Subject IDs, one per line, blank lines skipped
pub fn read_order_list(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(HubError::MissingInput(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(HubError::io(path))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Build profiles for every subject of a finished run and correlate them.
///
/// Subjects are discovered from `final_hub_indices`; `order_list` picks the
/// subjects and their order in the correlation matrix. Returns the path of
/// `<name>_Hub_Profile_CorrMat.csv`.
pub fn create_profiles(output_dir: &Path, name: &str, order_list: Option<&Path>) -> Result<PathBuf> {
    let store = ArtifactStore::new(output_dir);
    let hub_dir = store.dir("final_hub_indices");
    let zmat_dir = store.dir("final_csv_outputs");
    if !zmat_dir.is_dir() {
        return Err(HubError::MissingInput(zmat_dir));
    }
    let profile_dir = store.dir(PROFILES_DIR);
    fs::create_dir_all(&profile_dir).map_err(HubError::io(&profile_dir))?;

    let subjects = discover_subjects(&hub_dir)?;
    log::info!("Hub index files found: {}", subjects.len());

    for subject in &subjects {
        log::debug!("Working on {}...", subject);
        let hubs = read_indices(&store.path(&ArtifactId::HubIndices {
            subject: subject.clone(),
        }))?;
        let matrix = read_matrix_csv(&store.path(&ArtifactId::DistCensoredMatrix {
            subject: subject.clone(),
        }))?;
        let profiles = subject_profiles(subject, &matrix, &hubs)?;
        write_profiles(&profiles, &profile_path(&profile_dir, subject))?;
    }
    log::info!("Hub profiles made for {} participants", subjects.len());

    let order = match order_list {
        Some(path) => read_order_list(path)?,
        None => subjects,
    };
    let mut profiles = Vec::new();
    for subject in &order {
        profiles.extend(read_profiles(&profile_path(&profile_dir, subject))?);
    }

    let corr = profile_correlations(&profiles);
    let out = output_dir.join(format!("{name}_Hub_Profile_CorrMat.csv"));
    log::info!(
        "Saving {} x {} hub profile correlation matrix: {}",
        corr.nrows(),
        corr.ncols(),
        out.display()
    );
    write_correlation_csv(&corr, &out)?;
    Ok(out)
}

fn profile_path(dir: &Path, subject: &str) -> PathBuf {
    dir.join(format!("{subject}_HUB_CONN_PROFILES.txt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Matrix where every connection from parcel `i` to a parcel of network
    /// `k` equals `k`, with a 1 on the diagonal
    fn network_coded_matrix() -> Array2<f64> {
        let mut network_of = vec![0usize; PARCEL_COUNT];
        for (k, network) in NETWORKS.iter().enumerate() {
            for &p in network.parcels {
                network_of[p] = k;
            }
        }
        Array2::from_shape_fn((PARCEL_COUNT, PARCEL_COUNT), |(i, j)| {
            if i == j {
                1.0
            } else {
                network_of[j] as f64
            }
        })
    }

    #[test]
    fn profile_excludes_self_connection() {
        let matrix = network_coded_matrix();
        // Parcel 1 (0-based 0) is in Default, the fourth network
        let profile = hub_profile(&matrix, 1).expect("hub is in one network");
        let expected: Vec<f64> = (0..13).map(|k| k as f64).collect();
        assert_eq!(profile, expected);
    }

    #[test]
    fn profile_values_are_rounded() {
        let mut matrix = network_coded_matrix();
        // Salience holds parcels 28, 82, 182, 246
        matrix[[0, 28]] = 8.123456;
        let profile = hub_profile(&matrix, 1).expect("hub is in one network");
        assert_eq!(profile[8], 8.0309);
    }

    #[test]
    fn profile_ties_round_half_to_even() {
        let mut matrix = network_coded_matrix();
        // Salience holds parcels 28, 82, 182, 246; the mean is 8 + (x - 8) / 4
        matrix[[0, 246]] = 8.125;
        let profile = hub_profile(&matrix, 1).expect("hub is in one network");
        assert_eq!(profile[8], 8.0312);

        matrix[[0, 246]] = 8.375;
        let profile = hub_profile(&matrix, 1).expect("hub is in one network");
        assert_eq!(profile[8], 8.0938);
    }

    #[test]
    fn short_profile_line_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("x_HUB_CONN_PROFILES.txt");
        let full = (1..=13).map(|v| v.to_string()).join(" ");
        fs::write(&path, format!("x_1 {full}\nx_2 1 2 3\n")).expect("profiles should be written");

        assert!(matches!(read_profiles(&path), Err(HubError::Parse { line: 2, .. })));
    }

    #[test]
    fn hub_outside_table_is_rejected() {
        let matrix = Array2::zeros((400, 400));
        assert!(matches!(
            hub_profile(&matrix, 350),
            Err(HubError::SelfConnection { memberships: 0, .. })
        ));
    }

    #[test]
    fn correlations_are_symmetric_with_unit_diagonal() {
        let profiles = vec![
            HubProfile {
                key: "a_1".into(),
                values: vec![1.0, 2.0, 3.0, 4.0],
            },
            HubProfile {
                key: "a_2".into(),
                values: vec![2.0, 4.0, 6.0, 8.0],
            },
            HubProfile {
                key: "b_7".into(),
                values: vec![4.0, 3.0, 2.0, 1.0],
            },
        ];
        let corr = profile_correlations(&profiles);
        assert!((corr[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((corr[[0, 1]] - 1.0).abs() < 1e-12);
        assert!((corr[[0, 2]] + 1.0).abs() < 1e-12);
        assert_eq!(corr[[2, 0]], corr[[0, 2]]);
    }

    #[test]
    fn create_profiles_follows_order_list() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let store = ArtifactStore::new(dir.path());
        store.ensure_layout().expect("layout should be created");

        let matrix = network_coded_matrix();
        for (subject, hubs) in [("subA", "1\n2\n"), ("subB", "5\n")] {
            crate::storage::formats::write_matrix_csv(
                &matrix,
                &store.path(&ArtifactId::DistCensoredMatrix {
                    subject: subject.into(),
                }),
            )
            .expect("matrix should be written");
            fs::write(
                store.path(&ArtifactId::HubIndices {
                    subject: subject.into(),
                }),
                hubs,
            )
            .expect("indices should be written");
        }
        let order = dir.path().join("order.txt");
        fs::write(&order, "subB\n\nsubA\n").expect("order list should be written");

        let out = create_profiles(dir.path(), "group", Some(&order)).expect("profiles should be built");

        assert_eq!(out, dir.path().join("group_Hub_Profile_CorrMat.csv"));
        let csv = fs::read_to_string(&out).expect("matrix should exist");
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.starts_with("1.000000,"));

        let profiles = read_profiles(&dir.path().join("final_conn_profiles/subA_HUB_CONN_PROFILES.txt"))
            .expect("profiles should parse");
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[1].key, "subA_2");
        assert_eq!(profiles[1].values.len(), 13);
    }

    #[test]
    fn missing_order_list_is_fatal() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let store = ArtifactStore::new(dir.path());
        store.ensure_layout().expect("layout should be created");

        let err = create_profiles(dir.path(), "group", Some(&dir.path().join("nope.txt")))
            .expect_err("order list is missing");
        assert!(matches!(err, HubError::MissingInput(_)));
    }
}
