// ==============================================================================
// processor.rs - Variant Comparison Pipeline
// ==============================================================================
// Description: Loads every person once, then builds risk tables, tall tables,
//              difference matrices, and co-occurrence matrices
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-18
// Version: 3.0.0
// ==============================================================================
// Pipeline:
//   1. Locate variant files (sorted by name) and validate each one
//   2. Parse each person exactly once into memory
//   3. Derive the requested table or matrix from the cached records
//   4. Write outputs and, when configured, the run manifest
// ==============================================================================

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::cooccurrence::{keep_tall_cell, CoOccurrenceEngine};
use crate::difference::{PairwiseDifferenceEngine, PersonSequence, SortedSnpSequence};
use crate::manifest::{InputSummary, RunEventType, RunManifest};
use crate::matrix::{CoOccurrenceMatrix, DifferenceMatrix};
use crate::models::{AbsencePolicy, PersonVector};
use crate::output::{MatrixExporter, MatrixTable};
use crate::parsers::{person_id_from_path, VariantParser, VariantRecord};
use crate::risk_panel::RiskPanel;
use crate::risk_table::RiskScoreTable;
use crate::tables::{flatten_wide_csv, write_tall_records, TallColumns};
use crate::validator::{FileValidator, ValidatedInput};

/// Wide key column for person × person matrices
pub const PERSON_KEY_COLUMN: &str = "personId";
/// Wide key column for SNP × SNP matrices
pub const SNP_KEY_COLUMN: &str = "snpId";
/// Default key column for generic wide→tall flattening
pub const DEFAULT_FLATTEN_KEY: &str = "Field";

/// Columns of per-person tall tables
pub fn person_tall_columns() -> TallColumns {
    TallColumns::new("personid", "snpid", "allele")
}

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Directory of per-person variant files
    pub input_dir: Option<PathBuf>,
    /// Chromosomes to read; empty reads all
    pub chromosomes: Vec<String>,
    /// Where to write the run manifest, if anywhere
    pub manifest_path: Option<PathBuf>,
    /// Reject inputs larger than this many bytes; unset accepts any size
    pub max_file_size: Option<u64>,
}

/// One person's validated file and parsed records
#[derive(Debug, Clone)]
pub struct PersonInput {
    pub input: ValidatedInput,
    pub records: Vec<VariantRecord>,
}

impl PersonInput {
    pub fn person_id(&self) -> &str {
        &self.input.person_id
    }
}

pub struct VariantComparisonProcessor {
    config: RunConfig,
    parser: VariantParser,
    validator: FileValidator,
    manifest: RunManifest,
}

impl VariantComparisonProcessor {
    pub fn new(config: RunConfig, command: &str) -> Self {
        let parser = VariantParser::with_chromosomes(config.chromosomes.clone());
        let validator = match config.max_file_size {
            Some(max) => FileValidator::with_max_file_size(max),
            None => FileValidator::new(),
        };

        Self {
            config,
            parser,
            validator,
            manifest: RunManifest::new(command),
        }
    }

    pub fn manifest(&self) -> &RunManifest {
        &self.manifest
    }

    fn input_dir(&self) -> Result<PathBuf> {
        self.config
            .input_dir
            .clone()
            .context("No variant file directory configured")
    }

    /// Locate, validate, and parse every person's file
    ///
    /// When `only` is given, people outside it are skipped before parsing.
    /// A person id seen twice keeps the first file in name order.
    pub fn load_people(&mut self, only: Option<&HashSet<String>>) -> Result<Vec<PersonInput>> {
        let dir = self.input_dir()?;
        let files = self.validator.locate_inputs(&dir)?;

        let mut seen = HashSet::new();
        let mut people = Vec::with_capacity(files.len());

        for path in files {
            let person_id = person_id_from_path(&path);

            if let Some(only) = only {
                if !only.contains(&person_id) {
                    debug!("Skipping {:?}: person {} not requested", path, person_id);
                    continue;
                }
            }

            if !seen.insert(person_id.clone()) {
                warn!("Duplicate person id {} in {:?}, keeping the first file", person_id, path);
                self.manifest.record_event(
                    RunEventType::DuplicatePerson,
                    Some(path.display().to_string()),
                    serde_json::json!({ "person_id": person_id }),
                );
                continue;
            }

            let input = match self.validator.validate(&path) {
                Ok(input) => input,
                Err(e) => {
                    self.manifest.record_event(
                        RunEventType::InputRejected,
                        Some(path.display().to_string()),
                        serde_json::json!({ "error": e.to_string() }),
                    );
                    return Err(e.context(format!("Input validation failed for {:?}", path)));
                }
            };

            let mut reader = self.parser.records(&path)?;
            let records = reader
                .by_ref()
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Failed to read {:?}", path))?;

            info!(
                "Person {}: {} SNP records ({} malformed lines)",
                person_id,
                records.len(),
                reader.malformed_lines()
            );

            self.manifest
                .add_input(InputSummary::new(&input, records.len(), reader.malformed_lines()));
            people.push(PersonInput { input, records });
        }

        if let Some(only) = only {
            for missing in only.iter().filter(|id| !seen.contains(*id)) {
                warn!("Requested person {} has no variant file", missing);
            }
        }

        info!("Loaded {} people from {:?}", people.len(), dir);
        Ok(people)
    }

    pub fn load_panel(&mut self, path: &Path) -> Result<RiskPanel> {
        let panel = RiskPanel::load(path)
            .with_context(|| format!("Failed to load risk panel {:?}", path))?;
        self.manifest.record_event(
            RunEventType::PanelLoaded,
            Some(path.display().to_string()),
            serde_json::json!({ "snps": panel.len() }),
        );
        Ok(panel)
    }

    /// Score every person against the panel
    pub fn build_risk_table(&mut self, panel: &RiskPanel) -> Result<RiskScoreTable> {
        let people = self.load_people(None)?;
        let mut table = RiskScoreTable::new(panel);

        for person in &people {
            table.push(PersonVector::from_records(
                person.person_id(),
                &person.records,
                panel,
            ))?;
        }
        Ok(table)
    }

    /// Wide person × risk SNP table
    pub fn risk_table(
        &mut self,
        panel_path: &Path,
        output: &Path,
        normalization: bool,
    ) -> Result<RiskScoreTable> {
        let panel = self.load_panel(panel_path)?;
        let mut table = self.build_risk_table(&panel)?;
        if normalization {
            table.add_normalization_rows();
        }

        table
            .write_csv(output)
            .with_context(|| format!("Failed to write risk table {:?}", output))?;
        self.manifest.add_output(output);
        Ok(table)
    }

    /// Tall (person, SNP, score) rows for non-zero risk scores
    pub fn risk_tall(&mut self, panel_path: &Path, output: &Path) -> Result<usize> {
        let panel = self.load_panel(panel_path)?;
        let table = self.build_risk_table(&panel)?;

        let written = write_tall_records(output, &person_tall_columns(), table.tall_records())
            .with_context(|| format!("Failed to write {:?}", output))?;
        self.manifest.add_output(output);
        Ok(written)
    }

    /// Tall (person, SNP, allele) rows over every SNP record
    ///
    /// An empty `people` list means everyone in file name order; otherwise
    /// people are written in the order requested. Records with no allele, or
    /// the allele "0", are left out.
    pub fn tall(&mut self, output: &Path, people: &[String]) -> Result<usize> {
        let only: Option<HashSet<String>> =
            (!people.is_empty()).then(|| people.iter().cloned().collect());
        let mut loaded = self.load_people(only.as_ref())?;

        if !people.is_empty() {
            let mut requested: HashMap<&str, usize> = HashMap::new();
            for (i, id) in people.iter().enumerate() {
                requested.entry(id.as_str()).or_insert(i);
            }
            loaded.sort_by_key(|person| requested.get(person.person_id()).copied());
        }

        let rows = loaded.iter().flat_map(|person| {
            person
                .records
                .iter()
                .filter(|r| !r.observed_allele.is_empty() && r.observed_allele != "0")
                .map(move |r| (person.person_id(), r.snp_id.as_str(), r.observed_allele.as_str()))
        });

        let written = write_tall_records(output, &person_tall_columns(), rows)
            .with_context(|| format!("Failed to write {:?}", output))?;
        self.manifest.add_output(output);
        Ok(written)
    }

    /// Person × person difference counts
    pub fn differences(
        &mut self,
        policy: AbsencePolicy,
        exporter: &MatrixExporter,
        output: &Path,
    ) -> Result<DifferenceMatrix> {
        let people = self.load_people(None)?;

        // Sort each person once; comparisons reuse the cached sequences
        let sequences: Vec<PersonSequence> = people
            .iter()
            .map(|person| PersonSequence {
                person_id: person.person_id().to_string(),
                sequence: SortedSnpSequence::from_records(&person.records),
            })
            .collect();

        let matrix = PairwiseDifferenceEngine::new(policy).build_matrix(&sequences);

        let table = MatrixTable::new(PERSON_KEY_COLUMN, TallColumns::default());
        exporter.export(&matrix, &table, output, |_, _, _| true)?;
        self.manifest.add_output(output);
        Ok(matrix)
    }

    /// SNP × SNP co-occurrence from a risk table CSV
    pub fn co_occurrence(
        &mut self,
        risk_table_path: &Path,
        exporter: &MatrixExporter,
        output: &Path,
    ) -> Result<CoOccurrenceMatrix> {
        let table = RiskScoreTable::read_csv(risk_table_path)
            .with_context(|| format!("Failed to read risk table {:?}", risk_table_path))?;

        let matrix = CoOccurrenceEngine::new().build_matrix(&table);

        let columns = MatrixTable::new(SNP_KEY_COLUMN, TallColumns::default());
        exporter.export(&matrix, &columns, output, keep_tall_cell)?;
        self.manifest.add_output(output);
        Ok(matrix)
    }

    /// Flatten any wide CSV into A,B,value rows
    pub fn flatten(&mut self, input: &Path, output: &Path, key_column: &str) -> Result<usize> {
        let written = flatten_wide_csv(input, output, key_column, &TallColumns::default())
            .with_context(|| format!("Failed to flatten {:?}", input))?;
        self.manifest.add_output(output);
        Ok(written)
    }

    /// Write the manifest (if configured) and hand it back
    pub fn finish(mut self) -> Result<RunManifest> {
        if let Some(path) = self.config.manifest_path.clone() {
            self.manifest.finish(&path)?;
        }
        Ok(self.manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{OutputFormat, TableLayout};
    use crate::tables::read_wide_matrix;
    use tempfile::{tempdir, TempDir};

    fn write_people(dir: &Path) {
        std::fs::write(
            dir.join("A0001_hg19.vcf"),
            "#CHROM POS ID REF ALT\nchr1 100 rs1 G A\nchr1 200 rs2 T C\nchr1 300 rs3 A 0\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("A0002_hg19.vcf"),
            "#CHROM POS ID REF ALT\nchr1 100 rs1 G A\nchr1 200 rs2 T G\n",
        )
        .unwrap();
        std::fs::write(dir.join("A0002_copy.vcf"), "chr1 100 rs1 G T\n").unwrap();
    }

    fn setup() -> (TempDir, RunConfig) {
        let dir = tempdir().unwrap();
        let vcf_dir = dir.path().join("vcfdata");
        std::fs::create_dir(&vcf_dir).unwrap();
        write_people(&vcf_dir);
        std::fs::write(
            dir.path().join("oddsratio.csv"),
            "dbSNP ID,OddsRatio,Risk Allele\nrs1,1.2,A\nrs2,1.1,C\n",
        )
        .unwrap();

        let config = RunConfig {
            input_dir: Some(vcf_dir),
            manifest_path: Some(dir.path().join("manifest.json")),
            ..Default::default()
        };
        (dir, config)
    }

    #[test]
    fn test_duplicate_person_keeps_first() {
        let (_dir, config) = setup();
        let mut processor = VariantComparisonProcessor::new(config, "test");
        let people = processor.load_people(None).unwrap();

        let ids: Vec<_> = people.iter().map(|p| p.person_id()).collect();
        assert_eq!(ids, vec!["A0001", "A0002"]);
        // "A0002_copy.vcf" sorts before "A0002_hg19.vcf"
        assert_eq!(people[1].records.len(), 1);
        assert_eq!(
            processor.manifest().events_of(RunEventType::DuplicatePerson).count(),
            1
        );
    }

    #[test]
    fn test_risk_table_and_co_occurrence() {
        let (dir, config) = setup();
        let table_path = dir.path().join("risksnptable.csv");
        let co_path = dir.path().join("cooccurrence.csv");

        let mut processor = VariantComparisonProcessor::new(config, "risk-table");
        let table = processor
            .risk_table(&dir.path().join("oddsratio.csv"), &table_path, true)
            .unwrap();
        assert_eq!(table.people().count(), 2);
        assert_eq!(table.len(), 7);

        let matrix = processor
            .co_occurrence(&table_path, &MatrixExporter::default(), &co_path)
            .unwrap();
        // A0001 scores 4 at rs1 and rs2; A0002 (the copy file) scores 2 at rs1
        assert_eq!(matrix.get_by_keys("rs1", "rs1"), Some(1));
        assert_eq!(matrix.get_by_keys("rs1", "rs2"), Some(1));
        assert_eq!(table.people().nth(1).unwrap().scores[0].value(), 2);

        let manifest = processor.finish().unwrap();
        assert_eq!(manifest.outputs.len(), 2);
        assert!(dir.path().join("manifest.json").is_file());
    }

    #[test]
    fn test_differences_round_trip() {
        let (dir, config) = setup();
        let output = dir.path().join("diffcounts.csv");

        let mut processor = VariantComparisonProcessor::new(config, "differences");
        let matrix = processor
            .differences(AbsencePolicy::Count, &MatrixExporter::default(), &output)
            .unwrap();

        // A0001: rs1 A, rs2 C, rs3 "0"; A0002 (copy): rs1 T
        assert_eq!(matrix.get_by_keys("A0001", "A0002"), Some(3));
        assert_eq!(read_wide_matrix(&output, PERSON_KEY_COLUMN).unwrap(), matrix);
    }

    #[test]
    fn test_tall_restricted_people() {
        let (dir, config) = setup();
        let output = dir.path().join("tallsomeppl.csv");

        let mut processor = VariantComparisonProcessor::new(config, "tall");
        let written = processor.tall(&output, &["A0001".to_string()]).unwrap();

        assert_eq!(written, 2);
        let contents = std::fs::read_to_string(&output).unwrap();
        assert_eq!(contents, "personid,snpid,allele\nA0001,rs1,A\nA0001,rs2,C\n");
    }

    #[test]
    fn test_tall_keeps_requested_order() {
        let (dir, config) = setup();
        let output = dir.path().join("tallsomeppl.csv");

        let mut processor = VariantComparisonProcessor::new(config, "tall");
        let people = ["A0002".to_string(), "A0001".to_string()];
        assert_eq!(processor.tall(&output, &people).unwrap(), 3);

        let contents = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            contents,
            "personid,snpid,allele\nA0002,rs1,T\nA0001,rs1,A\nA0001,rs2,C\n"
        );
    }

    #[test]
    fn test_risk_tall_keeps_short_person_ids() {
        let (dir, config) = setup();
        let vcf_dir = config.input_dir.clone().unwrap();
        std::fs::write(vcf_dir.join("P7_x.vcf"), "chr1 100 rs1 G A\n").unwrap();
        let output = dir.path().join("risksnptalltable.csv");

        let mut processor = VariantComparisonProcessor::new(config, "risk-tall");
        let written = processor
            .risk_tall(&dir.path().join("oddsratio.csv"), &output)
            .unwrap();

        assert_eq!(written, 4);
        let contents = std::fs::read_to_string(&output).unwrap();
        assert!(contents.ends_with("A0002,rs1,2\nP7,rs1,4\n"));
    }

    #[test]
    fn test_tall_co_occurrence_parquet() {
        let (dir, config) = setup();
        let table_path = dir.path().join("risksnptable.csv");
        let output = dir.path().join("cooccurrence.parquet");

        let mut processor = VariantComparisonProcessor::new(config, "co-occurrence");
        processor
            .risk_table(&dir.path().join("oddsratio.csv"), &table_path, false)
            .unwrap();
        let exporter = MatrixExporter::new(OutputFormat::Parquet, TableLayout::Tall);
        processor.co_occurrence(&table_path, &exporter, &output).unwrap();
        assert!(output.is_file());
    }

    #[test]
    fn test_missing_input_dir() {
        let mut processor = VariantComparisonProcessor::new(RunConfig::default(), "tall");
        assert!(processor.load_people(None).is_err());
    }
}
