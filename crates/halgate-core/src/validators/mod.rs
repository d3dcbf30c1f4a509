//! Per-type validators.
//!
//! Every artifact type has a pure heuristic `fn(&str, accept_at) -> ValidatorResult`
//! that always works. Types with an authoritative host tool also expose a
//! [`NativeSpec`] describing how to drive that tool; the registry decides
//! which path runs.

pub mod blueprint;
pub mod common;
pub mod controller;
pub mod design;
pub mod diagram;
pub mod interface;
pub mod layout;
pub mod manifest;
pub mod native;
pub mod policy;
pub mod script;
pub mod xml;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::domain::ValidatorResult;
use crate::probe::ToolProbe;
use crate::runner::ToolOutput;

/// Heuristic validator: content and acceptance threshold in, result out.
pub type HeuristicFn = fn(&str, f64) -> ValidatorResult;

/// A resolved native tool invocation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeProgram {
    /// Executable to spawn.
    pub program: PathBuf,
    /// Secondary artifact the invocation needs (the PlantUML jar).
    pub extra: Option<PathBuf>,
}

impl NativeProgram {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: PathBuf) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// How to check one artifact type with a host tool.
pub struct NativeSpec {
    /// Label reported in `ValidatorResult::tool` for the native path.
    pub label: &'static str,
    /// Scratch file suffix, so the tool recognises the language.
    pub suffix: &'static str,
    pub locate: fn(&dyn ToolProbe) -> Option<NativeProgram>,
    /// Source handed to the tool (stub preludes are injected here).
    pub prepare: fn(&str) -> String,
    /// Arguments for `(program, scratch source, scratch dir)`.
    pub args: fn(&NativeProgram, &Path, &Path) -> Vec<OsString>,
    pub interpret: fn(&ToolOutput) -> ValidatorResult,
}

impl std::fmt::Debug for NativeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeSpec")
            .field("label", &self.label)
            .field("suffix", &self.suffix)
            .finish_non_exhaustive()
    }
}
