// ==============================================================================
// risk_panel.rs - Risk SNP Panel Reader
// ==============================================================================
// Description: Ordered list of risk SNPs with risk alleles and odds ratios
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================
// Format: CSV with header; columns located by name, positions may vary
// Example:
//   dbSNP ID,Gene,OddsRatio,Risk Allele
//   rs1998598,LOC1,1.05,G
//   rs2549794,LOC2,1.07,C
//
// Row order is kept as panel order (downstream tables use it as column order).
// ==============================================================================

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::allele_encoder::Nucleotide;
use crate::parsers::is_snp_id;

pub const SNP_ID_COLUMN: &str = "dbSNP ID";
pub const ODDS_RATIO_COLUMN: &str = "OddsRatio";
pub const RISK_ALLELE_COLUMN: &str = "Risk Allele";

/// One risk SNP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPanelEntry {
    pub snp_id: String,
    pub risk_allele: Nucleotide,
    pub odds_ratio: Option<f64>,
}

impl RiskPanelEntry {
    pub fn new(snp_id: impl Into<String>, risk_allele: Nucleotide) -> Self {
        Self {
            snp_id: snp_id.into(),
            risk_allele,
            odds_ratio: None,
        }
    }
}

/// Errors that can occur while loading a risk panel
#[derive(Error, Debug)]
pub enum RiskPanelError {
    #[error("Risk panel file not found: {0}")]
    MissingSource(PathBuf),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Risk panel header is missing required column '{column}'")]
    SchemaMismatch { column: String },
}

/// Ordered, immutable set of risk SNPs
#[derive(Debug, Clone, Default)]
pub struct RiskPanel {
    entries: Vec<RiskPanelEntry>,
    index: HashMap<String, usize>,
}

impl RiskPanel {
    /// Build a panel from in-memory entries (ad-hoc SNP lists)
    ///
    /// Entries whose id is not an rsID are skipped with a warning. Later
    /// duplicates of a SNP id are dropped so ids stay unique.
    pub fn from_entries(entries: impl IntoIterator<Item = RiskPanelEntry>) -> Self {
        let mut panel = RiskPanel::default();
        for entry in entries {
            if !is_snp_id(&entry.snp_id) {
                warn!("Invalid SNP id '{}' in risk SNP list, skipping", entry.snp_id);
                continue;
            }
            panel.push(entry);
        }
        panel
    }

    /// Load a panel from a CSV file
    ///
    /// # Arguments
    /// * `path` - Risk panel CSV (e.g., oddsratio.csv)
    ///
    /// # Returns
    /// * `Ok(RiskPanel)` - Entries in file row order, header excluded
    /// * `Err(RiskPanelError)` - Missing file, unreadable CSV, or missing column
    ///
    /// Rows with an invalid SNP id or risk allele, and repeated SNP ids, are
    /// skipped with a warning. An unparsable odds ratio is kept as `None`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RiskPanelError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(RiskPanelError::MissingSource(path.to_path_buf()));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .flexible(true)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        let snp_col = Self::find_column(&headers, SNP_ID_COLUMN)?;
        let allele_col = Self::find_column(&headers, RISK_ALLELE_COLUMN)?;
        let odds_col = headers.iter().position(|h| h == ODDS_RATIO_COLUMN);

        let mut panel = RiskPanel::default();
        let mut skipped = 0usize;

        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            let row = row_idx + 2; // header is row 1

            let snp_id = record.get(snp_col).unwrap_or_default();
            if !is_snp_id(snp_id) {
                warn!("Risk panel row {}: invalid SNP id '{}', skipping", row, snp_id);
                skipped += 1;
                continue;
            }

            let allele_str = record.get(allele_col).unwrap_or_default();
            let risk_allele = match allele_str.parse::<Nucleotide>() {
                Ok(allele) => allele,
                Err(e) => {
                    warn!("Risk panel row {} ({}): {}, skipping", row, snp_id, e);
                    skipped += 1;
                    continue;
                }
            };

            let odds_ratio = odds_col
                .and_then(|col| record.get(col))
                .filter(|value| !value.is_empty())
                .and_then(|value| match value.parse::<f64>() {
                    Ok(v) if v.is_finite() => Some(v),
                    _ => {
                        warn!("Risk panel row {} ({}): invalid odds ratio '{}'", row, snp_id, value);
                        None
                    }
                });

            let entry = RiskPanelEntry {
                snp_id: snp_id.to_string(),
                risk_allele,
                odds_ratio,
            };

            if !panel.push(entry) {
                warn!("Risk panel row {}: duplicate SNP id '{}', skipping", row, snp_id);
                skipped += 1;
            }
        }

        info!(
            "Loaded {} risk SNPs from {:?} ({} rows skipped)",
            panel.len(),
            path,
            skipped
        );

        Ok(panel)
    }

    /// Replace this panel's contents with a fresh load of `path`
    pub fn reload(&mut self, path: impl AsRef<Path>) -> Result<(), RiskPanelError> {
        *self = Self::load(path)?;
        Ok(())
    }

    fn find_column(headers: &StringRecord, name: &str) -> Result<usize, RiskPanelError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| RiskPanelError::SchemaMismatch {
                column: name.to_string(),
            })
    }

    /// Append an entry unless its SNP id is already present
    fn push(&mut self, entry: RiskPanelEntry) -> bool {
        if self.index.contains_key(&entry.snp_id) {
            return false;
        }
        self.index.insert(entry.snp_id.clone(), self.entries.len());
        self.entries.push(entry);
        true
    }

    /// Find a SNP's entry
    pub fn lookup(&self, snp_id: &str) -> Option<&RiskPanelEntry> {
        self.index.get(snp_id).map(|&idx| &self.entries[idx])
    }

    /// Column position of a SNP in panel order
    pub fn position(&self, snp_id: &str) -> Option<usize> {
        self.index.get(snp_id).copied()
    }

    pub fn get(&self, idx: usize) -> Option<&RiskPanelEntry> {
        self.entries.get(idx)
    }

    pub fn entries(&self) -> &[RiskPanelEntry] {
        &self.entries
    }

    pub fn snp_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.snp_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
