// ==============================================================================
// difference.rs - Person-to-Person Genetic Difference Counts
// ==============================================================================
// Description: Merge-join over sorted (SNP, allele) sequences
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Algorithm (two cursors, each either at a record or exhausted):
//   - same SNP id on both sides: +1 if alleles differ, advance both
//   - SNP id only on one side:   +1 (absence policy permitting), advance that side
//   - one side exhausted:        every remaining record on the other side counts
//   - both exhausted:            done
// Each comparison is O(n + m); the matrix is O(P^2 * (n + m)) for P people.
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info};

use crate::matrix::{DifferenceMatrix, KeyIndex};
use crate::models::AbsencePolicy;
use crate::parsers::VariantRecord;

/// SNP id and observed allele, the unit of comparison between people
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnpAllele {
    pub snp_id: String,
    pub allele: String,
}

impl SnpAllele {
    pub fn new(snp_id: impl Into<String>, allele: impl Into<String>) -> Self {
        Self {
            snp_id: snp_id.into(),
            allele: allele.into(),
        }
    }
}

/// One person's (SNP, allele) pairs, sorted ascending by SNP id then allele
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedSnpSequence {
    pairs: Vec<SnpAllele>,
}

impl SortedSnpSequence {
    /// Sort arbitrary pairs into comparison order
    pub fn new(mut pairs: Vec<SnpAllele>) -> Self {
        pairs.sort_unstable();
        Self { pairs }
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a VariantRecord>) -> Self {
        Self::new(
            records
                .into_iter()
                .map(|r| SnpAllele::new(r.snp_id.clone(), r.observed_allele.clone()))
                .collect(),
        )
    }

    pub fn as_slice(&self) -> &[SnpAllele] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FromIterator<SnpAllele> for SortedSnpSequence {
    fn from_iter<I: IntoIterator<Item = SnpAllele>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A person's cached, sorted sequence
#[derive(Debug, Clone)]
pub struct PersonSequence {
    pub person_id: String,
    pub sequence: SortedSnpSequence,
}

/// Count differences between two sorted sequences
///
/// # Arguments
/// * `a`, `b` - Sequences sorted ascending by SNP id (ASCII order)
/// * `policy` - Whether a SNP present on only one side counts as a difference
///
/// # Returns
/// * Number of disagreeing SNPs; symmetric in `a` and `b`
pub fn compute_difference(a: &[SnpAllele], b: &[SnpAllele], policy: AbsencePolicy) -> u64 {
    let absent = u64::from(policy.counts_as_difference());
    let mut i = 0;
    let mut j = 0;
    let mut diffs = 0u64;

    loop {
        match (a.get(i), b.get(j)) {
            (Some(left), Some(right)) => match left.snp_id.cmp(&right.snp_id) {
                Ordering::Equal => {
                    if left.allele != right.allele {
                        diffs += 1;
                    }
                    i += 1;
                    j += 1;
                }
                Ordering::Less => {
                    diffs += absent;
                    i += 1;
                }
                Ordering::Greater => {
                    diffs += absent;
                    j += 1;
                }
            },
            (Some(_), None) => {
                diffs += absent * (a.len() - i) as u64;
                break;
            }
            (None, Some(_)) => {
                diffs += absent * (b.len() - j) as u64;
                break;
            }
            (None, None) => break,
        }
    }

    diffs
}

/// Builds person × person difference matrices over cached sequences
#[derive(Debug, Clone, Copy, Default)]
pub struct PairwiseDifferenceEngine {
    pub policy: AbsencePolicy,
}

impl PairwiseDifferenceEngine {
    pub fn new(policy: AbsencePolicy) -> Self {
        Self { policy }
    }

    /// Difference between two people; the same person short-circuits to 0
    pub fn compare(&self, a: &PersonSequence, b: &PersonSequence) -> u64 {
        if a.person_id == b.person_id {
            return 0;
        }
        let diffs = compute_difference(a.sequence.as_slice(), b.sequence.as_slice(), self.policy);
        debug!("{} vs {}: {} differences", a.person_id, b.person_id, diffs);
        diffs
    }

    /// Full matrix over every pair of people, keyed by person id in input order
    ///
    /// People sharing an id collapse onto the first occurrence.
    pub fn build_matrix(&self, people: &[PersonSequence]) -> DifferenceMatrix {
        let keys = KeyIndex::new(people.iter().map(|p| p.person_id.clone()));

        // Key positions line up with `people` only when ids are unique
        let by_key: Vec<&PersonSequence> = keys
            .keys()
            .iter()
            .filter_map(|key| people.iter().find(|p| &p.person_id == key))
            .collect();

        info!(
            "Computing difference matrix for {} people ({} comparisons, absence policy: {})",
            by_key.len(),
            by_key.len() * by_key.len().saturating_sub(1) / 2,
            self.policy
        );

        DifferenceMatrix::symmetric_from_fn(keys, |i, j| self.compare(by_key[i], by_key[j]))
    }
}
