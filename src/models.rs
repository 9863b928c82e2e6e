// ==============================================================================
// models.rs - Person and Comparison Data Models
// ==============================================================================
// Description: Per-person score vectors and comparison policies
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-10-18
// Version: 3.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::allele_encoder::{encode_against, AlleleScore};
use crate::parsers::VariantRecord;
use crate::risk_panel::RiskPanel;

/// True for the injected normalization rows of a risk table ("0".."4", "#N/A")
///
/// Real person ids are longer than two characters (e.g., "A0024").
pub fn is_placeholder_person_id(person_id: &str) -> bool {
    let id = person_id.trim();
    id.len() <= 2 || id.starts_with('#')
}

/// One person's allele scores, aligned with a risk panel's column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonVector {
    /// Person identifier (e.g., "A0024")
    pub person_id: String,

    /// One score per panel SNP, 0 when the SNP was not observed
    pub scores: Vec<AlleleScore>,
}

impl PersonVector {
    /// All-zero vector for a panel of `len` SNPs
    pub fn empty(person_id: impl Into<String>, len: usize) -> Self {
        Self {
            person_id: person_id.into(),
            scores: vec![AlleleScore::NOT_FOUND; len],
        }
    }

    /// Normalization row: every column set to `score`, id is the score itself
    pub fn placeholder(score: AlleleScore, len: usize) -> Self {
        Self {
            person_id: score.to_string(),
            scores: vec![score; len],
        }
    }

    /// Score parsed records against the panel
    ///
    /// SNPs outside the panel are ignored; a SNP seen twice keeps its last score.
    pub fn from_records<'a>(
        person_id: impl Into<String>,
        records: impl IntoIterator<Item = &'a VariantRecord>,
        panel: &RiskPanel,
    ) -> Self {
        let mut vector = Self::empty(person_id, panel.len());
        for record in records {
            vector.apply(record, panel);
        }
        vector
    }

    /// Score a fallible record stream (e.g., a lazy file reader) against the panel
    pub fn try_from_records<I, E>(
        person_id: impl Into<String>,
        records: I,
        panel: &RiskPanel,
    ) -> Result<Self, E>
    where
        I: IntoIterator<Item = Result<VariantRecord, E>>,
    {
        let mut vector = Self::empty(person_id, panel.len());
        for record in records {
            vector.apply(&record?, panel);
        }
        Ok(vector)
    }

    fn apply(&mut self, record: &VariantRecord, panel: &RiskPanel) {
        if let Some(idx) = panel.position(&record.snp_id) {
            let risk = panel.entries()[idx].risk_allele;
            self.scores[idx] = encode_against(&record.observed_allele, risk);
        }
    }

    pub fn is_placeholder(&self) -> bool {
        is_placeholder_person_id(&self.person_id)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// How a SNP present in only one of two people counts toward their difference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbsencePolicy {
    /// Absent on one side counts as a disagreement
    #[default]
    Count,
    /// Only SNPs present in both files are compared
    Ignore,
}

impl AbsencePolicy {
    pub fn counts_as_difference(&self) -> bool {
        matches!(self, AbsencePolicy::Count)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AbsencePolicy::Count => "count",
            AbsencePolicy::Ignore => "ignore",
        }
    }
}

impl FromStr for AbsencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "count" => Ok(AbsencePolicy::Count),
            "ignore" => Ok(AbsencePolicy::Ignore),
            other => Err(format!(
                "Invalid absence policy '{}' (expected 'count' or 'ignore')",
                other
            )),
        }
    }
}

impl fmt::Display for AbsencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
