// ==============================================================================
// cooccurrence.rs - Risk Allele Co-occurrence Between SNPs
// ==============================================================================
// Description: SNP × SNP counts of people carrying the risk allele at both SNPs
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use tracing::info;

use crate::matrix::{CoOccurrenceMatrix, KeyIndex};
use crate::parsers::is_snp_id;
use crate::risk_table::RiskScoreTable;

/// Counts, for every pair of panel SNPs, how many people score 4 at both
///
/// The diagonal holds the number of risk carriers for each SNP.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoOccurrenceEngine;

impl CoOccurrenceEngine {
    pub fn new() -> Self {
        Self
    }

    /// Build the co-occurrence matrix from a risk table
    ///
    /// Normalization rows are excluded. Keys follow the table's column order.
    pub fn build_matrix(&self, table: &RiskScoreTable) -> CoOccurrenceMatrix {
        let keys = KeyIndex::new(table.snp_ids().iter().cloned());

        // Column-major risk flags: carriers[snp][person]
        let people: Vec<_> = table.people().collect();
        let carriers: Vec<Vec<bool>> = (0..keys.len())
            .map(|col| people.iter().map(|p| p.scores[col].is_risk()).collect())
            .collect();

        info!(
            "Computing co-occurrence matrix for {} SNPs over {} people",
            keys.len(),
            people.len()
        );

        CoOccurrenceMatrix::symmetric_from_fn(keys, |i, j| {
            carriers[i]
                .iter()
                .zip(&carriers[j])
                .filter(|&(a, b)| *a && *b)
                .count() as u64
        })
    }
}

/// Tall projection filter: non-zero counts between two SNP ids
pub fn keep_tall_cell(snp_a: &str, snp_b: &str, count: u64) -> bool {
    count > 0 && is_snp_id(snp_a) && is_snp_id(snp_b)
}
