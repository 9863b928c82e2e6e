// ==============================================================================
// property_tests.rs - Property-Based Tests
// ==============================================================================
// Description: Invariants of encoding, difference counts, and co-occurrence
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use proptest::prelude::*;
use std::collections::BTreeMap;

use variant_comparison::allele_encoder::{encode, AlleleScore};
use variant_comparison::cooccurrence::CoOccurrenceEngine;
use variant_comparison::difference::{
    compute_difference, PairwiseDifferenceEngine, PersonSequence, SnpAllele, SortedSnpSequence,
};
use variant_comparison::models::{AbsencePolicy, PersonVector};
use variant_comparison::risk_table::RiskScoreTable;

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn base() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["A", "C", "G", "T"])
}

/// One person's SNPs: unique ids, one allele each
fn snp_map() -> impl Strategy<Value = BTreeMap<String, &'static str>> {
    prop::collection::btree_map("rs[0-9]{1,4}", base(), 0..40)
}

fn to_sequence(map: &BTreeMap<String, &'static str>) -> SortedSnpSequence {
    map.iter().map(|(snp, allele)| SnpAllele::new(snp.clone(), *allele)).collect()
}

fn policy() -> impl Strategy<Value = AbsencePolicy> {
    prop::sample::select(vec![AbsencePolicy::Count, AbsencePolicy::Ignore])
}

// ---------------------------------------------------------------------------
// 1. Encoding stays in 0..=4 and scores 4 exactly on a match
// ---------------------------------------------------------------------------
proptest! {
    #[test]
    fn prop_encode_range(observed in "[ACGTN]{0,2}", risk in base()) {
        let score = encode(&observed, risk);
        prop_assert!(score.value() <= AlleleScore::MAX);
        prop_assert_eq!(score.is_risk(), observed == risk);
        if observed.len() != 1 || observed == "N" {
            prop_assert_eq!(score, AlleleScore::NOT_FOUND);
        } else {
            prop_assert!(score.is_found());
        }
    }

    #[test]
    fn prop_each_risk_allele_uses_every_rank(risk in base()) {
        let mut ranks: Vec<u8> = ["A", "C", "G", "T"]
            .iter()
            .map(|observed| encode(observed, risk).value())
            .collect();
        ranks.sort_unstable();
        prop_assert_eq!(ranks, vec![1, 2, 3, 4]);
    }
}

// ---------------------------------------------------------------------------
// 2. Difference counts: identity, symmetry, policy ordering
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_self_difference_is_zero(a in snp_map(), policy in policy()) {
        let seq = to_sequence(&a);
        prop_assert_eq!(compute_difference(seq.as_slice(), seq.as_slice(), policy), 0);
    }

    #[test]
    fn prop_difference_symmetric(a in snp_map(), b in snp_map(), policy in policy()) {
        let (a, b) = (to_sequence(&a), to_sequence(&b));
        prop_assert_eq!(
            compute_difference(a.as_slice(), b.as_slice(), policy),
            compute_difference(b.as_slice(), a.as_slice(), policy)
        );
    }

    #[test]
    fn prop_ignore_never_exceeds_count(a in snp_map(), b in snp_map()) {
        let (a, b) = (to_sequence(&a), to_sequence(&b));
        let ignore = compute_difference(a.as_slice(), b.as_slice(), AbsencePolicy::Ignore);
        let count = compute_difference(a.as_slice(), b.as_slice(), AbsencePolicy::Count);
        prop_assert!(ignore <= count);
        prop_assert!(count <= (a.len() + b.len()) as u64);
    }

    #[test]
    fn prop_disjoint_sequences_count_everything(all in snp_map()) {
        // Alternate SNPs between two people so no id is shared
        let (left, right): (Vec<_>, Vec<_>) = all.iter().enumerate().partition(|(i, _)| i % 2 == 0);
        let a: SortedSnpSequence = left
            .into_iter()
            .map(|(_, (snp, allele))| SnpAllele::new(snp.clone(), *allele))
            .collect();
        let b: SortedSnpSequence = right
            .into_iter()
            .map(|(_, (snp, allele))| SnpAllele::new(snp.clone(), *allele))
            .collect();

        prop_assert_eq!(
            compute_difference(a.as_slice(), b.as_slice(), AbsencePolicy::Count),
            (a.len() + b.len()) as u64
        );
        prop_assert_eq!(compute_difference(a.as_slice(), b.as_slice(), AbsencePolicy::Ignore), 0);
    }
}

// ---------------------------------------------------------------------------
// 3. Matrices are symmetric with the expected diagonal
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_difference_matrix_symmetric(people in prop::collection::vec(snp_map(), 0..6)) {
        let sequences: Vec<PersonSequence> = people
            .iter()
            .enumerate()
            .map(|(i, map)| PersonSequence {
                person_id: format!("A{:04}", i),
                sequence: to_sequence(map),
            })
            .collect();

        let matrix = PairwiseDifferenceEngine::default().build_matrix(&sequences);
        prop_assert_eq!(matrix.len(), sequences.len());
        prop_assert!(matrix.is_symmetric());
        for i in 0..matrix.len() {
            prop_assert_eq!(matrix.get(i, i), 0);
        }
    }

    #[test]
    fn prop_co_occurrence_bounded_by_diagonal(
        rows in prop::collection::vec(prop::collection::vec(0u8..=4, 5), 0..12)
    ) {
        let mut table = RiskScoreTable::with_columns((1..=5).map(|i| format!("rs{}", i)).collect());
        for (i, values) in rows.iter().enumerate() {
            let scores = values.iter().filter_map(|&v| AlleleScore::new(v)).collect();
            table.push(PersonVector { person_id: format!("A{:04}", i), scores }).unwrap();
        }
        table.add_normalization_rows();

        let matrix = CoOccurrenceEngine::new().build_matrix(&table);
        prop_assert!(matrix.is_symmetric());

        for i in 0..5 {
            let carriers = rows.iter().filter(|r| r[i] == 4).count() as u64;
            prop_assert_eq!(matrix.get(i, i), carriers);
            for j in 0..5 {
                prop_assert!(matrix.get(i, j) <= matrix.get(i, i).min(matrix.get(j, j)));
            }
        }
    }
}
