// ==============================================================================
// allele_encoder.rs - Ordinal Risk-Allele Encoding
// ==============================================================================
// Description: Converts an observed allele and a risk allele into a 0-4 score
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================
// Algorithm:
//   For each risk allele, the four nucleotides are ranked on a single axis:
//   - observed == risk allele            → 4
//   - the other three nucleotides        → fixed per-risk-allele ranks 1..3
//   - observed or risk allele not A/C/G/T → 0 (also used for "SNP not found")
//
//   Risk | A  C  G  T
//   -----+-----------
//    A   | 4  1  3  2
//    C   | 1  4  3  2
//    G   | 1  2  4  3
//    T   | 1  2  3  4
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the four DNA bases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Nucleotide {
    A,
    C,
    G,
    T,
}

/// Error returned when a string is not a single A/C/G/T base
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid nucleotide: '{0}' (expected one of A, C, G, T)")]
pub struct InvalidNucleotide(pub String);

impl Nucleotide {
    pub const ALL: [Nucleotide; 4] = [Nucleotide::A, Nucleotide::C, Nucleotide::G, Nucleotide::T];

    fn index(self) -> usize {
        match self {
            Nucleotide::A => 0,
            Nucleotide::C => 1,
            Nucleotide::G => 2,
            Nucleotide::T => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Nucleotide::A => "A",
            Nucleotide::C => "C",
            Nucleotide::G => "G",
            Nucleotide::T => "T",
        }
    }
}

impl FromStr for Nucleotide {
    type Err = InvalidNucleotide;

    /// Case-sensitive: lowercase bases and multi-base alleles are rejected
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Nucleotide::A),
            "C" => Ok(Nucleotide::C),
            "G" => Ok(Nucleotide::G),
            "T" => Ok(Nucleotide::T),
            _ => Err(InvalidNucleotide(s.to_string())),
        }
    }
}

impl fmt::Display for Nucleotide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordinal allele score in the range 0..=4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlleleScore(u8);

impl AlleleScore {
    /// SNP not observed, or allele pair not mappable
    pub const NOT_FOUND: AlleleScore = AlleleScore(0);
    /// Observed allele is the risk allele
    pub const RISK: AlleleScore = AlleleScore(4);
    pub const MAX: u8 = 4;

    /// Build a score from a raw value, rejecting anything above 4
    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(AlleleScore(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_risk(self) -> bool {
        self == Self::RISK
    }

    pub fn is_found(self) -> bool {
        self != Self::NOT_FOUND
    }
}

impl fmt::Display for AlleleScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RANKS[risk][observed], indexed A, C, G, T
const RANKS: [[u8; 4]; 4] = [
    [4, 1, 3, 2],
    [1, 4, 3, 2],
    [1, 2, 4, 3],
    [1, 2, 3, 4],
];

/// Score an observed base against a risk base
pub fn encode_nucleotides(observed: Nucleotide, risk: Nucleotide) -> AlleleScore {
    AlleleScore(RANKS[risk.index()][observed.index()])
}

/// Score an observed allele string against a risk allele string
///
/// # Arguments
/// * `observed` - Allele read from a variant record (may be empty or multi-base)
/// * `risk` - Risk allele from the panel
///
/// # Returns
/// * `AlleleScore::RISK` (4) when the alleles match
/// * 1..=3 for the remaining bases, per the ranking table above
/// * `AlleleScore::NOT_FOUND` (0) when either side is not a single A/C/G/T
///
/// # Examples
/// ```
/// use variant_comparison::allele_encoder::{encode, AlleleScore};
///
/// assert_eq!(encode("G", "G"), AlleleScore::RISK);
/// assert_eq!(encode("A", "G").value(), 1);
/// assert_eq!(encode("", "G"), AlleleScore::NOT_FOUND);
/// ```
pub fn encode(observed: &str, risk: &str) -> AlleleScore {
    match (observed.parse::<Nucleotide>(), risk.parse::<Nucleotide>()) {
        (Ok(observed), Ok(risk)) => encode_nucleotides(observed, risk),
        _ => AlleleScore::NOT_FOUND,
    }
}

/// Score an observed allele string against an already-validated risk base
pub fn encode_against(observed: &str, risk: Nucleotide) -> AlleleScore {
    observed
        .parse::<Nucleotide>()
        .map(|observed| encode_nucleotides(observed, risk))
        .unwrap_or(AlleleScore::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_allele_scores_four() {
        for base in ["A", "C", "G", "T"] {
            assert_eq!(encode(base, base), AlleleScore::RISK);
        }
    }

    #[test]
    fn test_ranking_table() {
        // Risk C: C4 G3 T2 A1
        assert_eq!(encode("G", "C").value(), 3);
        assert_eq!(encode("T", "C").value(), 2);
        assert_eq!(encode("A", "C").value(), 1);

        // Risk A: A4 G3 T2 C1
        assert_eq!(encode("G", "A").value(), 3);
        assert_eq!(encode("T", "A").value(), 2);
        assert_eq!(encode("C", "A").value(), 1);

        // Risk T: T4 G3 C2 A1
        assert_eq!(encode("G", "T").value(), 3);
        assert_eq!(encode("C", "T").value(), 2);
        assert_eq!(encode("A", "T").value(), 1);

        // Risk G: G4 T3 C2 A1
        assert_eq!(encode("T", "G").value(), 3);
        assert_eq!(encode("C", "G").value(), 2);
        assert_eq!(encode("A", "G").value(), 1);
    }

    #[test]
    fn test_non_risk_ranks_are_a_permutation() {
        for risk in Nucleotide::ALL {
            let mut ranks: Vec<u8> = Nucleotide::ALL
                .iter()
                .filter(|&&observed| observed != risk)
                .map(|&observed| encode_nucleotides(observed, risk).value())
                .collect();
            ranks.sort_unstable();
            assert_eq!(ranks, vec![1, 2, 3], "risk allele {}", risk);
        }
    }

    #[test]
    fn test_unmapped_alleles_score_zero() {
        assert_eq!(encode("", "C"), AlleleScore::NOT_FOUND);
        assert_eq!(encode("N", "C"), AlleleScore::NOT_FOUND);
        assert_eq!(encode("AT", "A"), AlleleScore::NOT_FOUND); // indel
        assert_eq!(encode("a", "A"), AlleleScore::NOT_FOUND); // case-sensitive
        assert_eq!(encode("A", "-"), AlleleScore::NOT_FOUND);
        assert_eq!(encode("A", ""), AlleleScore::NOT_FOUND);
    }

    #[test]
    fn test_encode_against() {
        assert_eq!(encode_against("C", Nucleotide::C), AlleleScore::RISK);
        assert_eq!(encode_against("G,T", Nucleotide::C), AlleleScore::NOT_FOUND);
    }

    #[test]
    fn test_score_bounds() {
        assert_eq!(AlleleScore::new(4), Some(AlleleScore::RISK));
        assert_eq!(AlleleScore::new(5), None);
        assert!(AlleleScore::RISK.is_risk());
        assert!(!AlleleScore::NOT_FOUND.is_found());
    }

    #[test]
    fn test_nucleotide_parse_error() {
        let err = "X".parse::<Nucleotide>().unwrap_err();
        assert_eq!(err, InvalidNucleotide("X".to_string()));
    }
}
