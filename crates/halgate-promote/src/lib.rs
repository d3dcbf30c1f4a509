//! halgate-promote: all-or-nothing promotion of a generated draft tree.
//!
//! A draft lives under a staging directory (by default
//! `<output_root>/.llm_draft/latest`). [`PromotionGate::run`] checks it
//! against a [`RequiredFileSet`] and, only if every stage passes, copies the
//! required files into the output root. Each attempt writes a
//! [`PromotionReport`].

pub mod error;
pub mod gate;
pub mod invariants;
pub mod paths;
pub mod report;
pub mod rules;

pub use error::{PromoteError, Result};
pub use gate::{default_draft_root, sha256_hex, PromotionGate, ENV_DRAFT_ROOT};
pub use invariants::{check_invariants, first_forbidden, InvariantFindings};
pub use paths::{collect_draft_files, normalize_relative, resolve_under, DraftListing};
pub use report::{GateStage, PromotionReport, REPORT_FILE};
pub use rules::{CheckRule, FileCheck, RequiredFileSet, Severity};
