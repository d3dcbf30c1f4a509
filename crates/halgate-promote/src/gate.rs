//! The promotion gate.
//!
//! Stages run strictly in order (discovery, allowlist, required files,
//! invariants) and the first failing stage rejects the draft. Nothing is
//! written under the output root until every stage has passed; then the
//! required files are staged, verified by SHA-256 and renamed into place as
//! a unit. A report is written for every attempt.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use halgate_core::METRICS;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

use crate::error::{PromoteError, Result};
use crate::invariants::check_invariants;
use crate::paths::{collect_draft_files, resolve_under};
use crate::report::{GateStage, PromotionReport};
use crate::rules::RequiredFileSet;

/// Environment variable overriding the draft root.
pub const ENV_DRAFT_ROOT: &str = "DRAFT_ROOT";

/// How many offending paths the allowlist error quotes.
const QUOTED_PATHS: usize = 5;

/// `<output_root>/.llm_draft/latest`.
pub fn default_draft_root(output_root: &Path) -> PathBuf {
    output_root.join(".llm_draft").join("latest")
}

/// SHA-256 of `bytes` as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// A required file copied into the staging area and verified.
#[derive(Debug)]
struct StagedFile {
    rel: String,
    staged: PathBuf,
    dest: PathBuf,
    digest: String,
}

/// A staged file renamed into place, with whatever it displaced.
#[derive(Debug)]
struct InstalledFile {
    dest: PathBuf,
    backup: Option<PathBuf>,
}

/// Gates one module's draft tree into the output root.
#[derive(Debug, Clone)]
pub struct PromotionGate {
    output_root: PathBuf,
    draft_root: PathBuf,
    rules: RequiredFileSet,
}

impl PromotionGate {
    /// Gate with the built-in Vehicle-HAL rules and the default draft root.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        let output_root = output_root.into();
        Self {
            draft_root: default_draft_root(&output_root),
            output_root,
            rules: RequiredFileSet::vehicle_hal(),
        }
    }

    /// Like [`PromotionGate::new`], honouring `DRAFT_ROOT` when set.
    pub fn from_env(output_root: impl Into<PathBuf>) -> Self {
        let gate = Self::new(output_root);
        match std::env::var_os(ENV_DRAFT_ROOT) {
            Some(root) if !root.is_empty() => gate.with_draft_root(root),
            _ => gate,
        }
    }

    pub fn with_draft_root(mut self, draft_root: impl Into<PathBuf>) -> Self {
        self.draft_root = draft_root.into();
        self
    }

    pub fn with_rules(mut self, rules: RequiredFileSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn draft_root(&self) -> &Path {
        &self.draft_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn rules(&self) -> &RequiredFileSet {
        &self.rules
    }

    /// Run every stage, promote on success and persist the report.
    ///
    /// Gate violations come back as a report with `ok == false`; `Err` means
    /// the report itself could not be written.
    pub fn run(&self) -> Result<PromotionReport> {
        let mut report = PromotionReport::new(&self.draft_root, &self.output_root);
        info!(
            draft_root = %self.draft_root.display(),
            output_root = %self.output_root.display(),
            "promotion started"
        );

        match self.evaluate(&mut report) {
            Err(stage) => report.reject(stage),
            Ok(()) => match self.commit(&mut report) {
                Ok(()) => report.ok = true,
                Err(e) => {
                    error!(error = %e, "promotion commit failed, rolled back");
                    report.errors.push(e.to_string());
                    report.reject(GateStage::Commit);
                }
            },
        }

        METRICS.record_promotion(report.ok);
        if report.ok {
            info!(files = report.promoted.len(), "promotion accepted");
        } else {
            warn!(
                stage = ?report.failed_stage,
                errors = report.errors.len(),
                "promotion rejected"
            );
        }

        let path = report.write_atomic(&self.output_root)?;
        report.report_path = path.display().to_string();
        Ok(report)
    }

    /// The read-only stages. On failure, returns the stage that rejected.
    fn evaluate(&self, report: &mut PromotionReport) -> std::result::Result<(), GateStage> {
        if !self.draft_root.is_dir() {
            report
                .errors
                .push(format!("Draft root not found: {}", self.draft_root.display()));
            return Err(GateStage::Discovery);
        }
        let listing = match collect_draft_files(&self.draft_root) {
            Ok(listing) => listing,
            Err(e) => {
                report.errors.push(format!("Could not list draft root: {}", e));
                return Err(GateStage::Discovery);
            }
        };
        if listing.is_empty() {
            report.errors.push(format!(
                "No files found under draft root: {}",
                self.draft_root.display()
            ));
            return Err(GateStage::Discovery);
        }
        debug!(files = listing.files.len(), refused = listing.refused.len(), "draft listed");

        let mut rejected: Vec<String> = listing.refused.iter().map(|(p, _)| p.clone()).collect();
        rejected.extend(
            listing
                .files
                .iter()
                .filter(|f| !self.rules.is_allowed(f))
                .cloned(),
        );
        if !rejected.is_empty() {
            rejected.sort();
            report.errors.push(format!(
                "Draft contains files outside allowlisted prefixes; refusing promotion. Examples: {:?}",
                rejected.iter().take(QUOTED_PATHS).collect::<Vec<_>>()
            ));
            report.errors.extend(
                listing
                    .refused
                    .iter()
                    .map(|(p, reason)| format!("Refused draft entry '{}': {}", p, reason)),
            );
            report.rejected = rejected;
            return Err(GateStage::Allowlist);
        }

        let present: BTreeSet<&str> = listing.files.iter().map(String::as_str).collect();
        let missing: Vec<&str> = self
            .rules
            .required_files
            .iter()
            .map(String::as_str)
            .filter(|r| !present.contains(r))
            .collect();
        if !missing.is_empty() {
            report
                .errors
                .push(format!("Missing required draft files: {}", missing.join(", ")));
            return Err(GateStage::RequiredFiles);
        }

        match check_invariants(&self.draft_root, &self.rules) {
            Ok(findings) => {
                report.warnings.extend(findings.warnings);
                if !findings.errors.is_empty() {
                    report.errors.extend(findings.errors);
                    return Err(GateStage::Invariants);
                }
            }
            Err(e) => {
                report.errors.push(format!("Invariant check failed: {}", e));
                return Err(GateStage::Invariants);
            }
        }
        Ok(())
    }

    /// Stage, verify and install every required file, or none of them.
    fn commit(&self, report: &mut PromotionReport) -> Result<()> {
        fs::create_dir_all(&self.output_root).map_err(|e| PromoteError::io(&self.output_root, e))?;
        let staging = tempfile::Builder::new()
            .prefix(".halgate-staging-")
            .tempdir_in(&self.output_root)
            .map_err(|e| PromoteError::io(&self.output_root, e))?;

        let staged = self.stage(staging.path())?;

        let mut installed = Vec::with_capacity(staged.len());
        for (index, file) in staged.iter().enumerate() {
            match install(file, &staging, index) {
                Ok(done) => installed.push(done),
                Err(e) => {
                    rollback(&installed);
                    return Err(e);
                }
            }
        }

        for file in staged {
            report.digests.insert(file.rel.clone(), file.digest);
            report.promoted.push(file.rel);
        }
        Ok(())
    }

    fn stage(&self, staging: &Path) -> Result<Vec<StagedFile>> {
        let mut staged = Vec::with_capacity(self.rules.required_files.len());
        for rel in &self.rules.required_files {
            let src = resolve_under(&self.draft_root, rel)?;
            let target = resolve_under(staging, rel)?;
            let dest = resolve_under(&self.output_root, rel)?;

            let bytes = fs::read(&src).map_err(|e| PromoteError::io(&src, e))?;
            let expected = sha256_hex(&bytes);

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| PromoteError::io(parent, e))?;
            }
            fs::copy(&src, &target).map_err(|e| PromoteError::io(&target, e))?;
            let copied = fs::read(&target).map_err(|e| PromoteError::io(&target, e))?;
            let actual = sha256_hex(&copied);
            if actual != expected {
                return Err(PromoteError::DigestMismatch {
                    path: rel.clone(),
                    expected,
                    actual,
                });
            }

            staged.push(StagedFile {
                rel: rel.clone(),
                staged: target,
                dest,
                digest: expected,
            });
        }
        Ok(staged)
    }
}

/// Rename one staged file into place, parking any existing file in the
/// staging area so it can be restored.
fn install(file: &StagedFile, staging: &TempDir, index: usize) -> Result<InstalledFile> {
    if let Some(parent) = file.dest.parent() {
        fs::create_dir_all(parent).map_err(|e| PromoteError::io(parent, e))?;
    }

    let backup = if fs::symlink_metadata(&file.dest).is_ok() {
        let parked = staging.path().join(format!(".previous-{}", index));
        fs::rename(&file.dest, &parked).map_err(|e| PromoteError::io(&file.dest, e))?;
        Some(parked)
    } else {
        None
    };

    if let Err(e) = fs::rename(&file.staged, &file.dest) {
        if let Some(parked) = &backup {
            if let Err(restore) = fs::rename(parked, &file.dest) {
                error!(path = %file.dest.display(), error = %restore, "could not restore previous file");
            }
        }
        return Err(PromoteError::io(&file.dest, e));
    }

    Ok(InstalledFile {
        dest: file.dest.clone(),
        backup,
    })
}

/// Undo installed files, newest first.
fn rollback(installed: &[InstalledFile]) {
    for file in installed.iter().rev() {
        if let Err(e) = fs::remove_file(&file.dest) {
            warn!(path = %file.dest.display(), error = %e, "rollback could not remove file");
        }
        if let Some(parked) = &file.backup {
            if let Err(e) = fs::rename(parked, &file.dest) {
                error!(path = %file.dest.display(), error = %e, "rollback could not restore file");
            }
        }
    }
}
