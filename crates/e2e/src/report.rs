//! Per-scenario outcomes and attachments for the whole run

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use cucumber::event::ScenarioFinished;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{error, info};

use crate::error::E2eResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Skipped,
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioStatus::Passed => f.write_str("passed"),
            ScenarioStatus::Failed => f.write_str("failed"),
            ScenarioStatus::Skipped => f.write_str("skipped"),
        }
    }
}

impl From<&ScenarioFinished> for ScenarioStatus {
    /// Failed steps and failed before hooks both count as failures
    fn from(finished: &ScenarioFinished) -> Self {
        match finished {
            ScenarioFinished::StepPassed => ScenarioStatus::Passed,
            ScenarioFinished::StepSkipped => ScenarioStatus::Skipped,
            _ => ScenarioStatus::Failed,
        }
    }
}

/// Evidence attached to a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub mime_type: String,
    pub path: PathBuf,
    pub sha256: String,
}

impl Attachment {
    pub fn png(path: impl Into<PathBuf>, bytes: &[u8]) -> Self {
        Self {
            mime_type: "image/png".to_string(),
            path: path.into(),
            sha256: hex::encode(Sha256::digest(bytes)),
        }
    }
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub feature: String,
    pub name: String,
    pub status: ScenarioStatus,
    pub attachments: Vec<Attachment>,
    /// Close failures during teardown; they never change `status`
    pub teardown_errors: Vec<String>,
    pub duration_ms: u64,
}

impl ScenarioRecord {
    pub fn new(
        feature: impl Into<String>,
        name: impl Into<String>,
        status: ScenarioStatus,
        duration_ms: u64,
    ) -> Self {
        Self {
            feature: feature.into(),
            name: name.into(),
            status,
            attachments: Vec::new(),
            teardown_errors: Vec::new(),
            duration_ms,
        }
    }
}

/// Result of the whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub scenarios: Vec<ScenarioRecord>,
}

/// Collects scenario records from concurrently running scenarios
#[derive(Debug)]
pub struct RunReport {
    started: Instant,
    records: Mutex<Vec<ScenarioRecord>>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, record: ScenarioRecord) {
        match record.status {
            ScenarioStatus::Failed => error!(
                "✗ {} ({} ms, {} attachment(s))",
                record.name,
                record.duration_ms,
                record.attachments.len()
            ),
            _ => info!("✓ {} ({} ms)", record.name, record.duration_ms),
        }
        self.records.lock().push(record);
    }

    pub fn records(&self) -> Vec<ScenarioRecord> {
        self.records.lock().clone()
    }

    pub fn summary(&self) -> RunSummary {
        let scenarios = self.records();
        let count = |status: ScenarioStatus| scenarios.iter().filter(|r| r.status == status).count();
        RunSummary {
            total: scenarios.len(),
            passed: count(ScenarioStatus::Passed),
            failed: count(ScenarioStatus::Failed),
            skipped: count(ScenarioStatus::Skipped),
            duration_ms: self.started.elapsed().as_millis() as u64,
            scenarios,
        }
    }

    /// Write `attachments.json` under `dir` and log the totals
    pub fn write(&self, dir: &Path) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let summary = self.summary();
        let path = dir.join("attachments.json");
        std::fs::write(&path, serde_json::to_string_pretty(&summary)?)?;

        info!(
            "Scenario results: {} passed, {} failed, {} skipped ({} ms)",
            summary.passed, summary.failed, summary.skipped, summary.duration_ms
        );
        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
