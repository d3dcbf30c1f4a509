//! The audit record every promotion attempt leaves behind.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{PromoteError, Result};

/// Report file name, relative to the output root.
pub const REPORT_FILE: &str = "PROMOTION_REPORT.json";

/// Stage of the gate that rejected a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStage {
    /// The draft root is missing, unreadable or empty.
    Discovery,
    Allowlist,
    RequiredFiles,
    Invariants,
    /// Staging, verification or the final rename failed.
    Commit,
}

impl fmt::Display for GateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GateStage::Discovery => "discovery",
            GateStage::Allowlist => "allowlist",
            GateStage::RequiredFiles => "required_files",
            GateStage::Invariants => "invariants",
            GateStage::Commit => "commit",
        };
        f.write_str(s)
    }
}

/// Outcome of one promotion attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionReport {
    pub ok: bool,
    pub draft_root: String,
    /// Relative paths copied into the output root.
    pub promoted: Vec<String>,
    /// Draft paths refused by the allowlist stage.
    pub rejected: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub report_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<GateStage>,
    /// SHA-256 hex of each promoted file.
    #[serde(default)]
    pub digests: BTreeMap<String, String>,
    pub generated_at: DateTime<Utc>,
}

impl PromotionReport {
    /// An empty, not-yet-decided report for `draft_root` writing to
    /// `output_root`.
    pub fn new(draft_root: &Path, output_root: &Path) -> Self {
        Self {
            ok: false,
            draft_root: draft_root.display().to_string(),
            promoted: Vec::new(),
            rejected: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            report_path: output_root.join(REPORT_FILE).display().to_string(),
            failed_stage: None,
            digests: BTreeMap::new(),
            generated_at: Utc::now(),
        }
    }

    /// Mark the report rejected at `stage`.
    pub fn reject(&mut self, stage: GateStage) {
        self.ok = false;
        self.failed_stage = Some(stage);
        self.promoted.clear();
        self.digests.clear();
    }

    /// Write the report as pretty JSON via a temp file and rename, creating
    /// `output_root` if needed.
    pub fn write_atomic(&self, output_root: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(output_root).map_err(|e| PromoteError::io(output_root, e))?;
        let path = output_root.join(REPORT_FILE);

        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');

        let mut tmp =
            NamedTempFile::new_in(output_root).map_err(|e| PromoteError::io(output_root, e))?;
        let tmp_path = tmp.path().to_path_buf();
        tmp.write_all(json.as_bytes())
            .map_err(|e| PromoteError::io(&tmp_path, e))?;
        tmp.persist(&path)
            .map_err(|e| PromoteError::io(&path, e.error))?;
        Ok(path)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PromoteError::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_report_reads_back() {
        let out = tempfile::tempdir().unwrap();
        let mut report = PromotionReport::new(&out.path().join(".llm_draft/latest"), out.path());
        report.errors.push("Missing required draft files: a".to_string());
        report.reject(GateStage::RequiredFiles);

        let path = report.write_atomic(out.path()).unwrap();
        assert_eq!(path, out.path().join(REPORT_FILE));
        assert_eq!(report.report_path, path.display().to_string());

        let back = PromotionReport::read(&path).unwrap();
        assert_eq!(back, report);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["failed_stage"], "required_files");
        assert_eq!(raw["ok"], false);
    }

    #[test]
    fn test_rewrite_replaces_previous_report() {
        let out = tempfile::tempdir().unwrap();
        let mut report = PromotionReport::new(out.path(), out.path());
        report.reject(GateStage::Discovery);
        report.write_atomic(out.path()).unwrap();

        let mut second = PromotionReport::new(out.path(), out.path());
        second.ok = true;
        second.write_atomic(out.path()).unwrap();

        let back = PromotionReport::read(&out.path().join(REPORT_FILE)).unwrap();
        assert!(back.ok);
        assert!(back.failed_stage.is_none());
        let leftovers = std::fs::read_dir(out.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_stage_display_matches_serde() {
        for stage in [
            GateStage::Discovery,
            GateStage::Allowlist,
            GateStage::RequiredFiles,
            GateStage::Invariants,
            GateStage::Commit,
        ] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }
}
