//! Run reports
//!
//! One JSON report is written per (municipality, profile) run. The record is
//! the externally observed artifact of a run, so its field names are part of
//! the tooling contract and stay camelCase.

use crate::discovery::{CandidateDocument, DiscoveryPhase};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome of one candidate file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Failed,
    Skipped,
}

/// Per-file entry in a run report
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub filename: String,
    pub status: FileStatus,
    /// Local path, skip reason, or error detail, depending on status
    pub detail: String,
}

/// The report record for one (municipality, profile) run
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub municipality: String,

    #[serde(rename = "formType")]
    pub form_type: String,

    pub timestamp: DateTime<Utc>,

    /// Hash of the configuration that produced this run
    #[serde(rename = "configHash")]
    pub config_hash: String,

    /// Phases the discovery cascade actually ran
    pub phases: Vec<DiscoveryPhase>,

    /// Network requests spent during discovery
    #[serde(rename = "pagesFetched")]
    pub pages_fetched: u32,

    /// Ranked candidates discovery surfaced, before selection
    pub candidates: Vec<CandidateDocument>,

    #[serde(rename = "perFile")]
    pub per_file: Vec<FileReport>,

    /// Non-fatal errors recorded during the run
    pub errors: Vec<String>,
}

impl RunReport {
    /// True when the run needs a human look: nothing was fetched cleanly
    pub fn is_flagged(&self) -> bool {
        !self
            .per_file
            .iter()
            .any(|f| matches!(f.status, FileStatus::Ok | FileStatus::Skipped))
    }

    /// Writes the report as pretty JSON under `reports_dir`
    ///
    /// The filename encodes the run: `<municipality>-<formType>-<timestamp>.json`.
    pub async fn write(&self, reports_dir: &Path) -> Result<PathBuf> {
        let filename = format!(
            "{}-{}-{}.json",
            self.municipality,
            self.form_type,
            self.timestamp.format("%Y%m%dT%H%M%SZ")
        );
        let path = reports_dir.join(filename);

        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::create_dir_all(reports_dir).await?;
        tokio::fs::write(&path, json).await?;

        tracing::info!(path = %path.display(), "wrote run report");
        Ok(path)
    }
}
