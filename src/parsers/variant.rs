// ==============================================================================
// variant.rs - Per-Person Variant Record Parser
// ==============================================================================
// Description: Lazy reader for whitespace-delimited per-person variant files
// Author: Matt Barham
// Created: 2025-11-04
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================
// Format: Whitespace-delimited text, one variant per line (simplified VCF)
// Example:
//   ##fileformat=VCFv4.1
//   #CHROM  POS      ID          REF  ALT
//   chr1    12345    rs7553640   G    C
//   chr1    13000    .           A    T      <- skipped, no rsID
//
// Fields used: 0 = chromosome, 1 = position, 2 = SNP id (rs<digits>),
// 4 = observed allele. Lines without an rsID in field 2 are skipped.
// Person identity comes from the file name: "A0024_hg19.gatk.flt.vcf" -> "A0024".
// ==============================================================================

use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const SNP_ID_FIELD: usize = 2;
pub const ALLELE_FIELD: usize = 4;

/// One SNP line from a person's variant file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// SNP identifier (e.g., "rs7553640")
    pub snp_id: String,
    /// Observed allele; empty when the line had no allele field
    pub observed_allele: String,
    /// Chromosome as written in the file (e.g., "chr1")
    pub chromosome: Option<String>,
    /// Base pair position, when the field parses as an integer
    pub position: Option<u64>,
}

/// Errors that can occur while reading a variant file
#[derive(Error, Debug)]
pub enum VariantParseError {
    #[error("Variant file not found: {0}")]
    MissingSource(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Logged and recovered by the reader, never returned from it
    #[error("Malformed SNP line {line} ({snp_id}): expected at least 5 fields, found {fields}")]
    MalformedLine {
        line: usize,
        snp_id: String,
        fields: usize,
    },
}

/// True for identifiers of the form `rs<digits>`
pub fn is_snp_id(token: &str) -> bool {
    token
        .strip_prefix("rs")
        .map(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// Person id from a variant file path: file name up to the first underscore
pub fn person_id_from_path(path: impl AsRef<Path>) -> String {
    let file_name = path
        .as_ref()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    file_name
        .split('_')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Parser for per-person variant files
#[derive(Debug, Clone, Default)]
pub struct VariantParser {
    /// Chromosomes to include (e.g., vec!["chr1", "chr2"])
    /// If empty, includes all chromosomes
    pub include_chromosomes: Vec<String>,
}

impl VariantParser {
    /// Create a new parser that includes all chromosomes
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser with specific chromosomes to include
    pub fn with_chromosomes(chromosomes: Vec<String>) -> Self {
        Self {
            include_chromosomes: chromosomes,
        }
    }

    /// Open a variant file as a lazy record sequence
    ///
    /// Files ending in `.gz` are decompressed transparently.
    ///
    /// # Returns
    /// * `Ok(VariantRecords)` - Iterator over SNP records in file order
    /// * `Err(VariantParseError::MissingSource)` - The file does not exist
    pub fn records(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<VariantRecords<Box<dyn BufRead>>, VariantParseError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(VariantParseError::MissingSource(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let is_gzip = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("gz"))
            .unwrap_or(false);

        let reader: Box<dyn BufRead> = if is_gzip {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        debug!("Reading variant records from {:?} (gzip: {})", path, is_gzip);

        Ok(self.records_from_reader(reader))
    }

    /// Wrap any buffered reader as a lazy record sequence
    pub fn records_from_reader<R: BufRead>(&self, reader: R) -> VariantRecords<R> {
        VariantRecords {
            lines: reader.split(b'\n'),
            include_chromosomes: self.include_chromosomes.clone(),
            line_number: 0,
            malformed_lines: 0,
        }
    }

    /// Parse a whole variant file into memory
    pub fn parse(&self, path: impl AsRef<Path>) -> Result<Vec<VariantRecord>, VariantParseError> {
        self.records(path)?.collect()
    }

    /// First SNP-bearing record in the file, if any
    pub fn first_snp_record(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Option<VariantRecord>, VariantParseError> {
        self.records(path)?.next().transpose()
    }
}

/// Lazy, single-pass sequence of variant records
///
/// Yields one `VariantRecord` per line whose third field is an rsID.
/// Bytes that are not valid UTF-8 are replaced, never rejected.
/// IO failures end the sequence with an error item.
pub struct VariantRecords<R> {
    lines: std::io::Split<R>,
    include_chromosomes: Vec<String>,
    line_number: usize,
    malformed_lines: usize,
}

impl<R> VariantRecords<R> {
    /// Lines that carried an rsID but no allele field (so far)
    pub fn malformed_lines(&self) -> usize {
        self.malformed_lines
    }

    /// Lines consumed so far, including skipped ones
    pub fn lines_read(&self) -> usize {
        self.line_number
    }

    fn parse_line(&mut self, line: &str) -> Option<VariantRecord> {
        let fields: Vec<&str> = line.split_whitespace().collect();

        let snp_id = fields.get(SNP_ID_FIELD).copied().filter(|id| is_snp_id(id))?;

        let chromosome = fields.first().map(|c| c.to_string());
        if !self.include_chromosomes.is_empty() {
            let wanted = chromosome
                .as_ref()
                .map(|c| self.include_chromosomes.contains(c))
                .unwrap_or(false);
            if !wanted {
                return None;
            }
        }

        let observed_allele = match fields.get(ALLELE_FIELD) {
            Some(allele) => allele.to_string(),
            None => {
                self.malformed_lines += 1;
                let err = VariantParseError::MalformedLine {
                    line: self.line_number,
                    snp_id: snp_id.to_string(),
                    fields: fields.len(),
                };
                warn!("{}; scoring as unknown allele", err);
                String::new()
            }
        };

        Some(VariantRecord {
            snp_id: snp_id.to_string(),
            observed_allele,
            chromosome,
            position: fields.get(1).and_then(|p| p.parse::<u64>().ok()),
        })
    }
}

impl<R: BufRead> Iterator for VariantRecords<R> {
    type Item = Result<VariantRecord, VariantParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let bytes = match self.lines.next()? {
                Ok(bytes) => bytes,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_number += 1;

            let line = String::from_utf8_lossy(&bytes);
            if let Some(record) = self.parse_line(&line) {
                return Some(Ok(record));
            }
        }
    }
}
