//! Structured per-run outcome report.
//!
//! Non-fatal failures are aggregated here instead of being appended to ad-hoc
//! comma-separated strings: the report maps each subject to its specific
//! failure reasons, is returned to the caller, and is surfaced at the end of
//! the run both as a tracing summary and as JSON in the logging directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use fets_common::{Error, Result};

use crate::types::Modality;

/// Filename of the JSON report written into the logging directory.
pub const REPORT_FILE_NAME: &str = "fets_run_report.json";

/// Aggregated non-fatal failures for one run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    /// Subject id → modalities absent from its directory. Incomplete subjects
    /// are excluded from inference and fusion entirely.
    pub missing_modalities: BTreeMap<String, Vec<Modality>>,
    /// Subject id → non-fatal dispatch failures (DeepMedic exits, missing
    /// per-architecture weights).
    pub subject_errors: BTreeMap<String, Vec<String>>,
    /// Subject id → per-method fusion failures.
    pub fusion_errors: BTreeMap<String, Vec<String>>,
    /// Subjects whose directories held no fusable segmentation outputs.
    pub fusion_skipped: Vec<String>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            missing_modalities: BTreeMap::new(),
            subject_errors: BTreeMap::new(),
            fusion_errors: BTreeMap::new(),
            fusion_skipped: Vec::new(),
        }
    }

    pub fn record_missing_modalities(&mut self, subject: &str, missing: Vec<Modality>) {
        self.missing_modalities.insert(subject.to_string(), missing);
    }

    pub fn record_subject_error(&mut self, subject: &str, message: impl Into<String>) {
        self.subject_errors
            .entry(subject.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn record_fusion_error(&mut self, subject: &str, message: impl Into<String>) {
        self.fusion_errors
            .entry(subject.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn record_fusion_skipped(&mut self, subject: &str) {
        self.fusion_skipped.push(subject.to_string());
    }

    /// True when nothing non-fatal was recorded.
    pub fn is_clean(&self) -> bool {
        self.missing_modalities.is_empty()
            && self.subject_errors.is_empty()
            && self.fusion_errors.is_empty()
            && self.fusion_skipped.is_empty()
    }

    /// Log a human-readable summary of everything non-fatal that went wrong.
    pub fn log_summary(&self) {
        if self.is_clean() {
            info!("All subjects processed without recorded errors");
            return;
        }

        for (subject, missing) in &self.missing_modalities {
            let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
            warn!(
                subject = %subject,
                missing = %names.join(","),
                "Subject skipped: missing modalities"
            );
        }
        for (subject, errors) in &self.subject_errors {
            for error in errors {
                warn!(subject = %subject, error = %error, "Dispatch error");
            }
        }
        for (subject, errors) in &self.fusion_errors {
            for error in errors {
                warn!(subject = %subject, error = %error, "Fusion error");
            }
        }
        for subject in &self.fusion_skipped {
            warn!(subject = %subject, "Fusion skipped: no candidate segmentation outputs");
        }
    }

    /// Write the report as pretty-printed JSON into the logging directory.
    pub fn write_json(&self, logging_dir: &Path) -> Result<PathBuf> {
        let path = logging_dir.join(REPORT_FILE_NAME);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Internal(format!("failed to serialize run report: {e}")))?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
