// ==============================================================================
// tables.rs - Wide and Tall CSV Tables
// ==============================================================================
// Description: CSV projection of pairwise matrices and generic wide→tall flattening
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================
// Layouts:
//   Wide:  personId,A0001,A0002        Tall:  A,B,value
//          A0001,0,12                         A0001,A0001,0
//          A0002,12,0                         A0001,A0002,12
// One header row, '\n' after every record.
// ==============================================================================

use csv::{ReaderBuilder, StringRecord, Terminator, Trim, Writer, WriterBuilder};
use std::fmt::Display;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::matrix::{KeyIndex, PairMatrix};

/// Errors raised while reading or writing tables
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Table file not found: {0}")]
    MissingSource(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Unexpected table layout in {path:?}: {details}")]
    SchemaMismatch { path: PathBuf, details: String },

    #[error("Invalid value '{value}' at row {row}, column '{column}'")]
    InvalidCell {
        row: usize,
        column: String,
        value: String,
    },
}

impl TableError {
    pub fn schema_mismatch(path: &Path, details: impl Into<String>) -> Self {
        TableError::SchemaMismatch {
            path: path.to_path_buf(),
            details: details.into(),
        }
    }
}

/// Column names of a three-column tall table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallColumns {
    pub key_a: String,
    pub key_b: String,
    pub value: String,
}

impl TallColumns {
    pub fn new(key_a: impl Into<String>, key_b: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key_a: key_a.into(),
            key_b: key_b.into(),
            value: value.into(),
        }
    }

    fn header(&self) -> [&str; 3] {
        [&self.key_a, &self.key_b, &self.value]
    }
}

impl Default for TallColumns {
    fn default() -> Self {
        Self::new("A", "B", "value")
    }
}

/// CSV writer with one '\n' per record
pub(crate) fn csv_writer(path: &Path) -> Result<Writer<File>, TableError> {
    Ok(WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_path(path)?)
}

/// CSV reader that trims whitespace around fields ("PersonId, rs1, rs2")
pub(crate) fn csv_reader(path: &Path) -> Result<csv::Reader<File>, TableError> {
    if !path.is_file() {
        return Err(TableError::MissingSource(path.to_path_buf()));
    }
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)?)
}

/// Write a matrix as a wide table: header row of keys, one row per key
pub fn write_wide_matrix<T: Copy + Display>(
    matrix: &PairMatrix<T>,
    key_column: &str,
    path: &Path,
) -> Result<(), TableError> {
    let mut writer = csv_writer(path)?;

    let mut header = Vec::with_capacity(matrix.len() + 1);
    header.push(key_column.to_string());
    header.extend(matrix.keys().keys().iter().cloned());
    writer.write_record(&header)?;

    for (key, values) in matrix.rows() {
        let mut row = Vec::with_capacity(values.len() + 1);
        row.push(key.to_string());
        row.extend(values.iter().map(|v| v.to_string()));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    info!("Wrote {}x{} wide table to {:?}", matrix.len(), matrix.len(), path);
    Ok(())
}

/// Read a wide integer table written by `write_wide_matrix`
///
/// The first header field must be `key_column`, and row keys must repeat the
/// column keys in the same order.
pub fn read_wide_matrix(path: &Path, key_column: &str) -> Result<PairMatrix<u64>, TableError> {
    let mut reader = csv_reader(path)?;
    let headers = reader.headers()?.clone();

    match headers.get(0) {
        Some(first) if first == key_column => {}
        other => {
            return Err(TableError::schema_mismatch(
                path,
                format!("expected key column '{}', found {:?}", key_column, other),
            ))
        }
    }

    let column_keys: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    let keys = KeyIndex::new(column_keys.iter().cloned());
    if keys.len() != column_keys.len() {
        return Err(TableError::schema_mismatch(path, "duplicate column keys"));
    }

    let mut matrix = PairMatrix::new(keys);
    let mut row_count = 0;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        let row_key = record.get(0).unwrap_or_default();

        if row_idx >= column_keys.len() || row_key != column_keys[row_idx] {
            return Err(TableError::schema_mismatch(
                path,
                format!("row {} key '{}' does not match column order", row_idx + 1, row_key),
            ));
        }

        for (col_idx, cell) in record.iter().skip(1).enumerate() {
            let value = cell.parse::<u64>().map_err(|_| TableError::InvalidCell {
                row: row_idx + 1,
                column: column_keys[col_idx].clone(),
                value: cell.to_string(),
            })?;
            matrix.set(row_idx, col_idx, value);
        }
        row_count += 1;
    }

    if row_count != column_keys.len() {
        return Err(TableError::schema_mismatch(
            path,
            format!("{} rows for {} columns", row_count, column_keys.len()),
        ));
    }

    debug!("Read {}x{} wide table from {:?}", row_count, row_count, path);
    Ok(matrix)
}

/// Write a matrix as a tall table, keeping only cells accepted by `keep`
///
/// # Returns
/// * Number of data rows written
pub fn write_tall_matrix<T, F>(
    matrix: &PairMatrix<T>,
    columns: &TallColumns,
    path: &Path,
    keep: F,
) -> Result<usize, TableError>
where
    T: Copy + Display,
    F: Fn(&str, &str, T) -> bool,
{
    write_tall_records(
        path,
        columns,
        matrix.cells().filter(|&(a, b, value)| keep(a, b, value)),
    )
}

/// Write (key, key, value) triples under a single header row
pub fn write_tall_records<A, B, V, I>(
    path: &Path,
    columns: &TallColumns,
    records: I,
) -> Result<usize, TableError>
where
    A: AsRef<str>,
    B: AsRef<str>,
    V: Display,
    I: IntoIterator<Item = (A, B, V)>,
{
    let mut writer = csv_writer(path)?;
    writer.write_record(columns.header())?;

    let mut written = 0;
    for (a, b, value) in records {
        writer.write_record([a.as_ref(), b.as_ref(), value.to_string().as_str()])?;
        written += 1;
    }

    writer.flush()?;
    info!("Wrote {} rows to tall table {:?}", written, path);
    Ok(written)
}

/// Flatten any wide CSV into a tall table
///
/// Every non-key cell becomes one (row key, column name, value) row; values
/// are copied verbatim. The key column may sit at any position.
pub fn flatten_wide_csv(
    input: &Path,
    output: &Path,
    key_column: &str,
    columns: &TallColumns,
) -> Result<usize, TableError> {
    let mut reader = csv_reader(input)?;
    let headers: StringRecord = reader.headers()?.clone();

    let key_idx = headers.iter().position(|h| h == key_column).ok_or_else(|| {
        TableError::schema_mismatch(input, format!("missing key column '{}'", key_column))
    })?;

    let mut triples = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row_key = record.get(key_idx).unwrap_or_default().to_string();
        for (col_idx, (field, value)) in headers.iter().zip(record.iter()).enumerate() {
            if col_idx == key_idx {
                continue;
            }
            triples.push((row_key.clone(), field.to_string(), value.to_string()));
        }
    }

    write_tall_records(output, columns, triples)
}
