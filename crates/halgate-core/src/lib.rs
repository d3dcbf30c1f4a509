//! halgate core library
//!
//! Compile-aware validation and quality scoring for generated Vehicle-HAL
//! artifacts: host tool probing, the per-type validator registry, score
//! blending and batch evaluation.

pub mod config;
pub mod domain;
pub mod evaluate;
pub mod metrics;
pub mod probe;
pub mod registry;
pub mod runner;
pub mod scoring;
pub mod telemetry;
pub mod validators;

pub use config::{AcceptanceThresholds, HalgateConfig};

pub use domain::{
    clamp_unit, round_to, ArtifactType, HalgateError, Result, ScoreBreakdown, ValidatorResult,
    EMPTY_OUTPUT,
};

pub use evaluate::{ArtifactEvaluation, ArtifactInput, Evaluator};

pub use metrics::METRICS;

pub use probe::{HostToolProbe, StaticToolProbe, Tool, ToolAvailability, ToolProbe};

pub use registry::{ToolReport, ValidatorRegistry};

pub use runner::{ToolOutcome, ToolOutput, ToolRunner, MAX_TOOL_TIMEOUT};

pub use scoring::{
    blend, blend_scores, coverage_score, entities_from_property_listing, structural_score,
    BlendWeights,
};

pub use telemetry::{init_tracing, level_for_verbosity};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
