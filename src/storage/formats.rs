//! Plain-text artifact formats

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use itertools::Itertools;
use ndarray::Array2;

use crate::cluster::Affiliation;
use crate::data::loaders::{load_csv_matrix, parse_float};
use crate::error::{HubError, Result};

/// Write a matrix as comma-delimited rows in shortest round-trip form
pub fn write_matrix_csv(matrix: &Array2<f64>, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(HubError::io(path))?;
    let mut out = BufWriter::new(file);
    for row in matrix.rows() {
        writeln!(out, "{}", row.iter().map(|v| format_float(*v)).join(","))
            .map_err(HubError::io(path))?;
    }
    out.flush().map_err(HubError::io(path))
}

pub fn read_matrix_csv(path: &Path) -> Result<Array2<f64>> {
    load_csv_matrix(path)
}

/// One value per line, `nan` for NaN
pub fn write_float_vector(values: &[f64], path: &Path) -> Result<()> {
    write_lines(path, values.iter().map(|v| format_float(*v)))
}

pub fn read_float_vector(path: &Path) -> Result<Vec<f64>> {
    read_lines(path, parse_float)
}

/// Write both affiliation flavors: `<parcel> <label>` lines and label-only lines
pub fn write_affiliation(affiliation: &Affiliation, reference: &Path, vector: &Path) -> Result<()> {
    write_lines(
        reference,
        affiliation.pairs().map(|(parcel, label)| format!("{parcel} {label}")),
    )?;
    write_lines(vector, affiliation.labels().iter().map(u32::to_string))
}

/// Read a label-only affiliation vector and check its length
pub fn read_affiliation_vector(path: &Path, parcel_count: usize) -> Result<Affiliation> {
    let labels = read_lines(path, |field| field.parse::<u32>().ok())?;
    if labels.len() != parcel_count {
        return Err(HubError::AffiliationCount {
            path: path.to_path_buf(),
            expected: parcel_count,
            found: labels.len(),
        });
    }
    Ok(Affiliation::from_labels(labels))
}

/// 1-based hub parcel numbers, one per line
pub fn write_indices(indices: &[usize], path: &Path) -> Result<()> {
    write_lines(path, indices.iter().map(usize::to_string))
}

pub fn read_indices(path: &Path) -> Result<Vec<usize>> {
    read_lines(path, |field| field.parse::<usize>().ok())
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        value.to_string()
    }
}

fn write_lines<I>(path: &Path, lines: I) -> Result<()>
where
    I: IntoIterator,
    I::Item: std::fmt::Display,
{
    let file = File::create(path).map_err(HubError::io(path))?;
    let mut out = BufWriter::new(file);
    for line in lines {
        writeln!(out, "{line}").map_err(HubError::io(path))?;
    }
    out.flush().map_err(HubError::io(path))
}

/// Parse one value per non-empty line
fn read_lines<T, F>(path: &Path, parse: F) -> Result<Vec<T>>
where
    F: Fn(&str) -> Option<T>,
{
    if !path.exists() {
        return Err(HubError::MissingInput(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(HubError::io(path))?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(line_idx, line)| {
            parse(line.trim()).ok_or_else(|| HubError::Parse {
                path: path.to_path_buf(),
                line: line_idx + 1,
                message: format!("unexpected value: {line:?}"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn matrix_csv_is_bit_exact() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("zmat.csv");
        let matrix = array![
            [1.0, 0.1 + 0.2, -1.0e-17],
            [0.1 + 0.2, 1.0, 18.714973875118524],
            [-1.0e-17, 18.714973875118524, 1.0]
        ];
        write_matrix_csv(&matrix, &path).expect("matrix should be written");

        let read = read_matrix_csv(&path).expect("matrix should parse");
        assert!(read
            .iter()
            .zip(matrix.iter())
            .all(|(a, b)| a.to_bits() == b.to_bits()));
    }

    #[test]
    fn float_vector_keeps_nan() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("pc.txt");
        write_float_vector(&[12.5, f64::NAN, 100.0], &path).expect("vector should be written");

        assert_eq!(
            fs::read_to_string(&path).expect("vector should exist"),
            "12.5\nnan\n100\n"
        );
        let read = read_float_vector(&path).expect("vector should parse");
        assert_eq!(read[0], 12.5);
        assert!(read[1].is_nan());
        assert_eq!(read[2], 100.0);
    }

    #[test]
    fn affiliation_round_trip_preserves_order_and_labels() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let reference = dir.path().join("aff_REF.txt");
        let vector = dir.path().join("aff.txt");
        let affiliation = Affiliation::from_labels(vec![3, 1, 1, 2]);

        write_affiliation(&affiliation, &reference, &vector).expect("affiliation should be written");

        assert_eq!(
            fs::read_to_string(&reference).expect("reference should exist"),
            "1 3\n2 1\n3 1\n4 2\n"
        );
        let read = read_affiliation_vector(&vector, 4).expect("vector should parse");
        assert_eq!(read, affiliation);
    }

    #[test]
    fn short_affiliation_vector_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("aff.txt");
        fs::write(&path, "1\n2\n").expect("vector should be written");

        assert!(matches!(
            read_affiliation_vector(&path, 3),
            Err(HubError::AffiliationCount {
                expected: 3,
                found: 2,
                ..
            })
        ));
    }
}
