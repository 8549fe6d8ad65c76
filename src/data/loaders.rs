//! Text file readers for manifests, timeseries and matrices

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::data::Subject;
use crate::error::{HubError, Result};

/// Load the `<subjectID> <timeseries path>` manifest, skipping blank lines
pub fn load_manifest(path: &Path) -> Result<Vec<Subject>> {
    log::info!("Reading manifest: {}", path.display());

    if !path.exists() {
        return Err(HubError::MissingInput(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(HubError::io(path))?;

    let mut subjects = Vec::new();
    for (line_idx, line) in text.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let Some(id) = fields.next() else {
            continue;
        };
        let Some(timeseries) = fields.next() else {
            return Err(HubError::Parse {
                path: path.to_path_buf(),
                line: line_idx + 1,
                message: format!("subject {id} has no timeseries path"),
            });
        };
        subjects.push(Subject {
            id: id.to_string(),
            timeseries: PathBuf::from(timeseries),
        });
    }

    log::info!("Loaded {} subjects", subjects.len());
    Ok(subjects)
}

/// Load a parcels × timepoints matrix of whitespace-separated samples
pub fn load_timeseries(path: &Path) -> Result<Array2<f64>> {
    log::debug!("Reading timeseries: {}", path.display());
    read_matrix(path, |line| line.split_whitespace().collect())
}

/// Load a comma-delimited square matrix such as the distance mask
pub fn load_csv_matrix(path: &Path) -> Result<Array2<f64>> {
    let matrix = read_matrix(path, |line| line.split(',').map(str::trim).collect())?;
    if matrix.nrows() != matrix.ncols() {
        return Err(HubError::ShapeMismatch {
            what: "square matrix",
            expected: format!("{} x {}", matrix.nrows(), matrix.nrows()),
            found: format!("{} x {}", matrix.nrows(), matrix.ncols()),
        });
    }
    Ok(matrix)
}

/// Parse a numeric matrix, one row per non-empty line
fn read_matrix<F>(path: &Path, split: F) -> Result<Array2<f64>>
where
    F: Fn(&str) -> Vec<&str>,
{
    if !path.exists() {
        return Err(HubError::MissingInput(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(HubError::io(path))?;

    let mut values = Vec::new();
    let mut rows = 0;
    let mut cols = None;

    for (line_idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split(line);
        match cols {
            None => cols = Some(fields.len()),
            Some(expected) if expected != fields.len() => {
                return Err(HubError::Parse {
                    path: path.to_path_buf(),
                    line: line_idx + 1,
                    message: format!("expected {} columns, found {}", expected, fields.len()),
                });
            }
            Some(_) => {}
        }
        for field in fields {
            let value = parse_float(field).ok_or_else(|| HubError::Parse {
                path: path.to_path_buf(),
                line: line_idx + 1,
                message: format!("not a number: {field:?}"),
            })?;
            values.push(value);
        }
        rows += 1;
    }

    let cols = cols.unwrap_or(0);
    Array2::from_shape_vec((rows, cols), values).map_err(|e| HubError::Parse {
        path: path.to_path_buf(),
        line: rows,
        message: e.to_string(),
    })
}

/// Parse a float, accepting the `nan` literal written by the vector writers
pub fn parse_float(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok()
}
