// ==============================================================================
// output.rs - Multi-Format Matrix Output
// ==============================================================================
// Description: Write pairwise matrices as CSV, JSON, or Parquet
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================
// Layouts:
//   CSV     - wide (square) or tall (A,B,value rows)
//   JSON    - wide: {"key_column", "keys", "rows"}; tall: array of objects
//   Parquet - always tall triples (key_a: Utf8, key_b: Utf8, value: UInt64)
// The tall filter applies to every tall projection, Parquet included.
// ==============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

// Apache Arrow/Parquet for columnar data
use arrow::array::{ArrayRef, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use crate::matrix::PairMatrix;
use crate::tables::{write_tall_matrix, write_wide_matrix, TallColumns};

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma-separated values (spreadsheets, R, pandas)
    #[default]
    Csv,
    /// JSON (web APIs and JavaScript)
    Json,
    /// Apache Parquet (Python, R, Spark)
    Parquet,
}

impl OutputFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Parquet => "parquet",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "parquet" => Ok(OutputFormat::Parquet),
            other => Err(format!(
                "Invalid output format '{}' (expected csv, json, or parquet)",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Wide (square) or tall (one row per cell) projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableLayout {
    #[default]
    Wide,
    Tall,
}

impl FromStr for TableLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wide" => Ok(TableLayout::Wide),
            "tall" => Ok(TableLayout::Tall),
            other => Err(format!("Invalid layout '{}' (expected wide or tall)", other)),
        }
    }
}

/// Naming for one exported matrix
#[derive(Debug, Clone)]
pub struct MatrixTable {
    /// Header of the key column in wide layouts (e.g., "personId")
    pub key_column: String,
    /// Column names for tall layouts
    pub tall_columns: TallColumns,
}

impl MatrixTable {
    pub fn new(key_column: impl Into<String>, tall_columns: TallColumns) -> Self {
        Self {
            key_column: key_column.into(),
            tall_columns,
        }
    }
}

/// Wide JSON document
#[derive(Debug, Serialize, Deserialize)]
pub struct WideMatrixJson {
    pub key_column: String,
    pub keys: Vec<String>,
    pub rows: Vec<Vec<u64>>,
}

/// Writes count matrices in the configured format and layout
#[derive(Debug, Clone, Copy, Default)]
pub struct MatrixExporter {
    pub format: OutputFormat,
    pub layout: TableLayout,
}

impl MatrixExporter {
    pub fn new(format: OutputFormat, layout: TableLayout) -> Self {
        Self { format, layout }
    }

    /// Write `matrix` to `path`
    ///
    /// # Arguments
    /// * `keep` - Tall projection filter over (key a, key b, value)
    ///
    /// # Returns
    /// * Path written (same as `path`)
    pub fn export<F>(
        &self,
        matrix: &PairMatrix<u64>,
        table: &MatrixTable,
        path: &Path,
        keep: F,
    ) -> Result<PathBuf>
    where
        F: Fn(&str, &str, u64) -> bool,
    {
        info!(
            "Writing {}x{} matrix as {} ({:?}) to {:?}",
            matrix.len(),
            matrix.len(),
            self.format,
            self.layout,
            path
        );

        match (self.format, self.layout) {
            (OutputFormat::Csv, TableLayout::Wide) => {
                write_wide_matrix(matrix, &table.key_column, path)
                    .context("Failed to write wide CSV")?;
            }
            (OutputFormat::Csv, TableLayout::Tall) => {
                write_tall_matrix(matrix, &table.tall_columns, path, keep)
                    .context("Failed to write tall CSV")?;
            }
            (OutputFormat::Json, TableLayout::Wide) => self.write_wide_json(matrix, table, path)?,
            (OutputFormat::Json, TableLayout::Tall) => {
                self.write_tall_json(matrix, table, path, keep)?
            }
            (OutputFormat::Parquet, _) => self.write_parquet(matrix, table, path, keep)?,
        }

        Ok(path.to_path_buf())
    }

    fn write_wide_json(&self, matrix: &PairMatrix<u64>, table: &MatrixTable, path: &Path) -> Result<()> {
        let document = WideMatrixJson {
            key_column: table.key_column.clone(),
            keys: matrix.keys().keys().to_vec(),
            rows: matrix.rows().map(|(_, row)| row.to_vec()).collect(),
        };

        let file = std::fs::File::create(path).context("Failed to create JSON output file")?;
        serde_json::to_writer_pretty(file, &document).context("Failed to write JSON output")?;
        Ok(())
    }

    fn write_tall_json<F>(
        &self,
        matrix: &PairMatrix<u64>,
        table: &MatrixTable,
        path: &Path,
        keep: F,
    ) -> Result<()>
    where
        F: Fn(&str, &str, u64) -> bool,
    {
        let columns = &table.tall_columns;
        let rows: Vec<Value> = matrix
            .cells()
            .filter(|&(a, b, value)| keep(a, b, value))
            .map(|(a, b, value)| {
                let mut object = Map::new();
                object.insert(columns.key_a.clone(), Value::from(a));
                object.insert(columns.key_b.clone(), Value::from(b));
                object.insert(columns.value.clone(), Value::from(value));
                Value::Object(object)
            })
            .collect();

        let file = std::fs::File::create(path).context("Failed to create JSON output file")?;
        serde_json::to_writer_pretty(file, &rows).context("Failed to write JSON output")?;

        info!("JSON output complete: {} rows", rows.len());
        Ok(())
    }

    /// Tall triples in one Snappy-compressed row group
    fn write_parquet<F>(
        &self,
        matrix: &PairMatrix<u64>,
        table: &MatrixTable,
        path: &Path,
        keep: F,
    ) -> Result<()>
    where
        F: Fn(&str, &str, u64) -> bool,
    {
        let cells: Vec<(&str, &str, u64)> = matrix
            .cells()
            .filter(|&(a, b, value)| keep(a, b, value))
            .collect();

        let columns = &table.tall_columns;
        let schema = Arc::new(Schema::new(vec![
            Field::new(columns.key_a.as_str(), DataType::Utf8, false),
            Field::new(columns.key_b.as_str(), DataType::Utf8, false),
            Field::new(columns.value.as_str(), DataType::UInt64, false),
        ]));

        let key_a: ArrayRef = Arc::new(StringArray::from(
            cells.iter().map(|c| c.0).collect::<Vec<_>>(),
        ));
        let key_b: ArrayRef = Arc::new(StringArray::from(
            cells.iter().map(|c| c.1).collect::<Vec<_>>(),
        ));
        let values: ArrayRef = Arc::new(UInt64Array::from(
            cells.iter().map(|c| c.2).collect::<Vec<_>>(),
        ));

        let batch = RecordBatch::try_new(schema.clone(), vec![key_a, key_b, values])
            .context("Failed to create Arrow RecordBatch")?;

        let file = std::fs::File::create(path).context("Failed to create Parquet file")?;
        let props = WriterProperties::builder()
            .set_compression(parquet::basic::Compression::SNAPPY)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema, Some(props))
            .context("Failed to create Parquet writer")?;
        writer.write(&batch).context("Failed to write Parquet data")?;
        writer.close().context("Failed to close Parquet writer")?;

        info!("Parquet output complete: {} rows", cells.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::KeyIndex;
    use parquet::file::reader::{FileReader, SerializedFileReader};
    use tempfile::tempdir;

    fn matrix() -> PairMatrix<u64> {
        let keys = KeyIndex::new(["A0001", "A0002"].iter().map(|s| s.to_string()));
        PairMatrix::symmetric_from_fn(keys, |i, j| if i == j { 0 } else { 9 })
    }

    fn table() -> MatrixTable {
        MatrixTable::new("personId", TallColumns::default())
    }

    #[test]
    fn test_output_format_extension() {
        assert_eq!(OutputFormat::Csv.extension(), "csv");
        assert_eq!(OutputFormat::Json.extension(), "json");
        assert_eq!(OutputFormat::Parquet.extension(), "parquet");
    }

    #[test]
    fn test_output_format_serde() {
        // Test JSON serialization
        let format = OutputFormat::Json;
        let json = serde_json::to_string(&format).unwrap();
        assert_eq!(json, "\"json\"");

        // Test deserialization
        let parsed: OutputFormat = serde_json::from_str("\"parquet\"").unwrap();
        assert_eq!(parsed, OutputFormat::Parquet);
    }

    #[test]
    fn test_parse_format_and_layout() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("sqlite".parse::<OutputFormat>().is_err());
        assert_eq!("tall".parse::<TableLayout>().unwrap(), TableLayout::Tall);
        assert!("square".parse::<TableLayout>().is_err());
    }

    #[test]
    fn test_wide_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("diff.json");
        MatrixExporter::new(OutputFormat::Json, TableLayout::Wide)
            .export(&matrix(), &table(), &path, |_, _, _| true)
            .unwrap();

        let document: WideMatrixJson =
            serde_json::from_reader(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(document.key_column, "personId");
        assert_eq!(document.keys, vec!["A0001", "A0002"]);
        assert_eq!(document.rows, vec![vec![0, 9], vec![9, 0]]);
    }

    #[test]
    fn test_tall_json_filtered() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("diff.json");
        MatrixExporter::new(OutputFormat::Json, TableLayout::Tall)
            .export(&matrix(), &table(), &path, |_, _, v| v > 0)
            .unwrap();

        let rows: Vec<Value> = serde_json::from_reader(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["A"], "A0001");
        assert_eq!(rows[0]["B"], "A0002");
        assert_eq!(rows[0]["value"], 9);
    }

    #[test]
    fn test_parquet_row_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("diff.parquet");
        MatrixExporter::new(OutputFormat::Parquet, TableLayout::Wide)
            .export(&matrix(), &table(), &path, |_, _, _| true)
            .unwrap();

        let reader = SerializedFileReader::new(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(reader.metadata().file_metadata().num_rows(), 4);
    }

    #[test]
    fn test_csv_wide() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("diff.csv");
        MatrixExporter::default()
            .export(&matrix(), &table(), &path, |_, _, _| true)
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "personId,A0001,A0002\nA0001,0,9\nA0002,9,0\n");
    }
}
