// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for per-person variant files
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

pub mod variant;

pub use variant::{
    is_snp_id, person_id_from_path, VariantParseError, VariantParser, VariantRecord,
    VariantRecords, ALLELE_FIELD, SNP_ID_FIELD,
};
