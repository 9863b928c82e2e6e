// ==============================================================================
// validator.rs - Input File Discovery and Validation
// ==============================================================================
// Description: Locates per-person variant files and checks size, compression, and content
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::parsers::{person_id_from_path, VariantParseError, ALLELE_FIELD};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedInput {
    pub path: PathBuf,
    pub person_id: String,
    pub size: u64,
    pub hash_sha256: String,
    pub gzipped: bool,
    pub validated_at: chrono::DateTime<chrono::Utc>,
}

/// Input checks; no size cap unless one is configured
pub struct FileValidator {
    max_file_size: Option<u64>,
}

impl FileValidator {
    pub fn new() -> Self {
        Self { max_file_size: None }
    }

    pub fn with_max_file_size(max_file_size: u64) -> Self {
        Self {
            max_file_size: Some(max_file_size),
        }
    }

    /// List variant files directly inside `dir`, sorted by file name
    ///
    /// Subdirectories and hidden files are skipped.
    pub fn locate_inputs(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(VariantParseError::MissingSource(dir.to_path_buf()).into());
        }

        let mut inputs = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.with_context(|| format!("Failed to list {:?}", dir))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.file_name().to_string_lossy().starts_with('.') {
                debug!("Skipping hidden file {:?}", entry.path());
                continue;
            }
            inputs.push(entry.into_path());
        }

        info!("Found {} variant files in {:?}", inputs.len(), dir);
        Ok(inputs)
    }

    pub fn validate(&self, file_path: &Path) -> Result<ValidatedInput> {
        debug!("Validating file: {:?}", file_path);

        // 1. Size check
        let metadata = std::fs::metadata(file_path)
            .with_context(|| format!("Failed to get file metadata for {:?}", file_path))?;
        let size = metadata.len();

        if let Some(max) = self.max_file_size {
            if size > max {
                anyhow::bail!(
                    "File too large: {:?} is {} bytes (max: {} bytes)",
                    file_path,
                    size,
                    max
                );
            }
        }

        // 2. Magic number verification for compressed inputs
        let gzipped = is_gzip_name(file_path);
        if gzipped && size > 0 {
            let magic = self.read_magic_number(file_path)?;
            if magic != GZIP_MAGIC {
                anyhow::bail!("Magic number mismatch for gzip file {:?}", file_path);
            }
        }

        // 3. Content check (first data line)
        if !gzipped {
            self.check_first_data_line(file_path)?;
        }

        // 4. Compute SHA-256 hash
        let hash = self.compute_sha256(file_path)?;
        debug!("SHA-256 of {:?}: {}", file_path, hash);

        Ok(ValidatedInput {
            path: file_path.to_path_buf(),
            person_id: person_id_from_path(file_path),
            size,
            hash_sha256: hash,
            gzipped,
            validated_at: chrono::Utc::now(),
        })
    }

    fn read_magic_number(&self, path: &Path) -> Result<[u8; 2]> {
        let mut file = File::open(path)?;
        let mut buffer = [0u8; 2];
        file.read_exact(&mut buffer)
            .with_context(|| format!("Failed to read header of {:?}", path))?;
        Ok(buffer)
    }

    /// Warn when the first non-header line is too short to carry an allele
    fn check_first_data_line(&self, path: &Path) -> Result<()> {
        let reader = BufReader::new(File::open(path)?);
        for bytes in reader.split(b'\n') {
            let bytes = bytes.with_context(|| format!("Failed to read {:?}", path))?;
            let line = String::from_utf8_lossy(&bytes);
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let columns = line.split_whitespace().count();
            if columns <= ALLELE_FIELD {
                warn!(
                    "{:?}: first data line has {} columns, expected at least {}",
                    path,
                    columns,
                    ALLELE_FIELD + 1
                );
            }
            break;
        }
        Ok(())
    }

    fn compute_sha256(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 8192];

        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn is_gzip_name(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_locate_inputs_sorted_files_only() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("B0002_genome.txt"), "").unwrap();
        std::fs::write(dir.path().join("A0001_genome.txt"), "").unwrap();
        std::fs::write(dir.path().join(".DS_Store"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("C0003_genome.txt"), "").unwrap();

        let inputs = FileValidator::new().locate_inputs(dir.path()).unwrap();
        let names: Vec<_> = inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["A0001_genome.txt", "B0002_genome.txt"]);
    }

    #[test]
    fn test_locate_missing_directory() {
        let err = FileValidator::new()
            .locate_inputs(Path::new("/nonexistent/vcfdata"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VariantParseError>(),
            Some(VariantParseError::MissingSource(_))
        ));
    }

    #[test]
    fn test_validate_computes_hash() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("A0024_genome.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "chr1\t12345\trs7553640\tG\tC").unwrap();
        drop(file);

        let validated = FileValidator::new().validate(&path).unwrap();
        assert_eq!(validated.person_id, "A0024");
        assert_eq!(validated.hash_sha256.len(), 64);
        assert!(!validated.gzipped);
        assert_eq!(validated.size, std::fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn test_validate_rejects_large_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("A0001_genome.txt");
        std::fs::write(&path, "chr1 1 rs1 A C\n").unwrap();

        assert!(FileValidator::with_max_file_size(4).validate(&path).is_err());
    }

    #[test]
    fn test_default_validator_has_no_size_cap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("A0001_genome.txt");
        std::fs::write(&path, "chr1 1 rs1 A C\n").unwrap();

        let validator = FileValidator::default();
        assert!(validator.max_file_size.is_none());
        assert!(validator.validate(&path).is_ok());
        assert!(FileValidator::with_max_file_size(u64::MAX).validate(&path).is_ok());
    }

    #[test]
    fn test_validate_tolerates_latin1_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("A0001_genome.txt");
        std::fs::write(&path, b"##source=caf\xe9 lab\nchr1 1 rs1 A C\n").unwrap();

        let validated = FileValidator::new().validate(&path).unwrap();
        assert_eq!(validated.person_id, "A0001");
    }

    #[test]
    fn test_validate_rejects_fake_gzip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("A0001_genome.txt.gz");
        std::fs::write(&path, "not gzip data").unwrap();

        assert!(FileValidator::new().validate(&path).is_err());
    }
}
