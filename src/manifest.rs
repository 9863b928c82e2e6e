// ==============================================================================
// manifest.rs - Run Manifest
// ==============================================================================
// Description: JSON record of one run's inputs, outputs, and notable events
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::validator::ValidatedInput;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunEventType {
    InputValidated,
    InputRejected,
    DuplicatePerson,
    PanelLoaded,
    OutputWritten,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RunEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: RunEventType,
    pub resource: Option<String>,
    pub details: serde_json::Value,
}

/// Per-input summary
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InputSummary {
    pub path: PathBuf,
    pub person_id: String,
    pub size: u64,
    pub sha256: String,
    pub records: usize,
    pub malformed_lines: usize,
}

impl InputSummary {
    pub fn new(input: &ValidatedInput, records: usize, malformed_lines: usize) -> Self {
        Self {
            path: input.path.clone(),
            person_id: input.person_id.clone(),
            size: input.size,
            sha256: input.hash_sha256.clone(),
            records,
            malformed_lines,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub command: String,
    pub version: String,
    pub inputs: Vec<InputSummary>,
    pub outputs: Vec<PathBuf>,
    pub events: Vec<RunEvent>,
}

impl RunManifest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            command: command.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn record_event(
        &mut self,
        event_type: RunEventType,
        resource: Option<String>,
        details: serde_json::Value,
    ) {
        self.events.push(RunEvent {
            timestamp: Utc::now(),
            event_type,
            resource,
            details,
        });
    }

    pub fn add_input(&mut self, summary: InputSummary) {
        self.record_event(
            RunEventType::InputValidated,
            Some(summary.path.display().to_string()),
            serde_json::json!({ "person_id": summary.person_id, "sha256": summary.sha256 }),
        );
        self.inputs.push(summary);
    }

    pub fn add_output(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.record_event(
            RunEventType::OutputWritten,
            Some(path.display().to_string()),
            serde_json::Value::Null,
        );
        self.outputs.push(path);
    }

    pub fn events_of(&self, event_type: RunEventType) -> impl Iterator<Item = &RunEvent> {
        self.events.iter().filter(move |e| e.event_type == event_type)
    }

    /// Stamp the finish time and write pretty-printed JSON
    pub fn finish(&mut self, path: &Path) -> Result<()> {
        self.finished_at = Some(Utc::now());

        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create manifest {:?}", path))?;
        serde_json::to_writer_pretty(file, self).context("Failed to write manifest")?;

        info!(
            "Run {} manifest written to {:?} ({} inputs, {} outputs)",
            self.run_id,
            path,
            self.inputs.len(),
            self.outputs.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn input() -> ValidatedInput {
        ValidatedInput {
            path: PathBuf::from("/data/vcfdata/A0024_hg19.vcf"),
            person_id: "A0024".to_string(),
            size: 42,
            hash_sha256: "ab".repeat(32),
            gzipped: false,
            validated_at: Utc::now(),
        }
    }

    #[test]
    fn test_manifest_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.json");

        let mut manifest = RunManifest::new("differences");
        manifest.add_input(InputSummary::new(&input(), 10, 1));
        manifest.add_output(dir.path().join("diffcounts.csv"));
        manifest.finish(&path).unwrap();

        let reread: RunManifest =
            serde_json::from_reader(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(reread.run_id, manifest.run_id);
        assert_eq!(reread.command, "differences");
        assert_eq!(reread.inputs[0].records, 10);
        assert_eq!(reread.inputs[0].malformed_lines, 1);
        assert_eq!(reread.outputs.len(), 1);
        assert!(reread.finished_at.is_some());
    }

    #[test]
    fn test_event_type_serde() {
        let json = serde_json::to_string(&RunEventType::DuplicatePerson).unwrap();
        assert_eq!(json, "\"duplicate_person\"");
    }

    #[test]
    fn test_events_recorded() {
        let mut manifest = RunManifest::new("tall");
        manifest.add_input(InputSummary::new(&input(), 3, 0));
        manifest.record_event(
            RunEventType::DuplicatePerson,
            Some("A0024".to_string()),
            serde_json::Value::Null,
        );
        assert_eq!(manifest.events_of(RunEventType::InputValidated).count(), 1);
        assert_eq!(manifest.events_of(RunEventType::DuplicatePerson).count(), 1);
    }
}
