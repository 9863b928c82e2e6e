// ==============================================================================
// risk_table.rs - Person × Risk SNP Score Table
// ==============================================================================
// Description: Wide table of allele scores, one row per person, one column per panel SNP
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// CSV layout:
//   PersonId,rs1998598,rs2549794,...
//   A0024,4,0,...
//   ...
//   0,0,0,...            <- normalization rows, ids "0".."4"
//   4,4,4,...
// Normalization rows keep every column's value range identical for
// downstream tools; they are skipped by every analysis in this crate.
// ==============================================================================

use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::allele_encoder::AlleleScore;
use crate::models::PersonVector;
use crate::parsers::is_snp_id;
use crate::risk_panel::RiskPanel;
use crate::tables::{csv_reader, csv_writer, TableError};

pub const PERSON_ID_COLUMN: &str = "PersonId";

/// Cell values treated as "not found" when reading legacy tables
const MISSING_MARKERS: &[&str] = &["", "#N/A", "NA", "N/A"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskScoreTable {
    snp_ids: Vec<String>,
    rows: Vec<PersonVector>,
}

impl RiskScoreTable {
    /// Empty table whose columns follow the panel order
    pub fn new(panel: &RiskPanel) -> Self {
        Self::with_columns(panel.snp_ids().map(str::to_string).collect())
    }

    pub fn with_columns(snp_ids: Vec<String>) -> Self {
        Self {
            snp_ids,
            rows: Vec::new(),
        }
    }

    /// Append a row; its length must match the column count
    pub fn push(&mut self, row: PersonVector) -> Result<(), TableError> {
        if row.len() != self.snp_ids.len() {
            return Err(TableError::InvalidCell {
                row: self.rows.len() + 1,
                column: PERSON_ID_COLUMN.to_string(),
                value: format!("{} ({} scores for {} columns)", row.person_id, row.len(), self.snp_ids.len()),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append one row per score 0..=4
    pub fn add_normalization_rows(&mut self) {
        let len = self.snp_ids.len();
        self.rows.extend(
            (0..=AlleleScore::MAX)
                .filter_map(AlleleScore::new)
                .map(|score| PersonVector::placeholder(score, len)),
        );
    }

    pub fn snp_ids(&self) -> &[String] {
        &self.snp_ids
    }

    pub fn rows(&self) -> &[PersonVector] {
        &self.rows
    }

    /// Rows for real people (normalization rows excluded)
    pub fn people(&self) -> impl Iterator<Item = &PersonVector> {
        self.rows.iter().filter(|row| !row.is_placeholder())
    }

    /// Non-zero scores as (person, SNP, score) for every row in table order
    pub fn tall_records(&self) -> impl Iterator<Item = (&str, &str, AlleleScore)> {
        self.rows.iter().flat_map(move |row| {
            self.snp_ids
                .iter()
                .zip(row.scores.iter())
                .filter(|(_, score)| score.is_found())
                .map(move |(snp_id, &score)| (row.person_id.as_str(), snp_id.as_str(), score))
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the table as CSV
    pub fn write_csv(&self, path: &Path) -> Result<(), TableError> {
        let mut writer = csv_writer(path)?;

        let mut header = Vec::with_capacity(self.snp_ids.len() + 1);
        header.push(PERSON_ID_COLUMN.to_string());
        header.extend(self.snp_ids.iter().cloned());
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = Vec::with_capacity(row.len() + 1);
            record.push(row.person_id.clone());
            record.extend(row.scores.iter().map(|s| s.to_string()));
            writer.write_record(&record)?;
        }

        writer.flush()?;
        info!(
            "Wrote risk table ({} rows x {} SNPs) to {:?}",
            self.rows.len(),
            self.snp_ids.len(),
            path
        );
        Ok(())
    }

    /// Read a risk table written by this crate or by earlier spreadsheet tooling
    ///
    /// Header fields are trimmed ("PersonId, rs1, rs2"). Missing markers such
    /// as "#N/A" read as 0; other values outside 0..=4 are rejected.
    pub fn read_csv(path: &Path) -> Result<Self, TableError> {
        let mut reader = csv_reader(path)?;
        let headers = reader.headers()?.clone();

        match headers.get(0) {
            Some(first) if first.eq_ignore_ascii_case(PERSON_ID_COLUMN) => {}
            other => {
                return Err(TableError::schema_mismatch(
                    path,
                    format!("expected '{}' as first column, found {:?}", PERSON_ID_COLUMN, other),
                ))
            }
        }

        let snp_ids: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
        let mut seen = HashSet::new();
        for snp_id in &snp_ids {
            if !seen.insert(snp_id.as_str()) {
                return Err(TableError::schema_mismatch(
                    path,
                    format!("duplicate column '{}'", snp_id),
                ));
            }
            if !is_snp_id(snp_id) {
                warn!("Risk table column '{}' is not a SNP id", snp_id);
            }
        }

        let mut table = Self::with_columns(snp_ids);

        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            let person_id = record.get(0).unwrap_or_default().to_string();
            let mut scores = Vec::with_capacity(table.snp_ids.len());

            for (col_idx, cell) in record.iter().skip(1).enumerate() {
                scores.push(parse_score(cell).ok_or_else(|| TableError::InvalidCell {
                    row: row_idx + 1,
                    column: table.snp_ids[col_idx].clone(),
                    value: cell.to_string(),
                })?);
            }

            table.push(PersonVector { person_id, scores })?;
        }

        debug!(
            "Read risk table with {} rows ({} people) from {:?}",
            table.len(),
            table.people().count(),
            path
        );
        Ok(table)
    }
}

fn parse_score(cell: &str) -> Option<AlleleScore> {
    if MISSING_MARKERS.iter().any(|m| cell.eq_ignore_ascii_case(m)) {
        return Some(AlleleScore::NOT_FOUND);
    }
    cell.parse::<u8>().ok().and_then(AlleleScore::new)
}
