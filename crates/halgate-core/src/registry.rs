//! The validator dispatch table and the registry that drives it.
//!
//! Each artifact type maps to a flat [`ValidatorEntry`]: a heuristic
//! validator, a structural scorer, an optional native tool spec and the
//! blend weights. [`ValidatorRegistry`] picks the native path when its tool
//! is present and the heuristic path otherwise, and guarantees a
//! [`ValidatorResult`] comes back either way.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, warn};

use crate::config::{AcceptanceThresholds, HalgateConfig};
use crate::domain::{ArtifactType, ValidatorResult};
use crate::metrics::METRICS;
use crate::probe::{HostToolProbe, StaticToolProbe, ToolProbe};
use crate::runner::{scratch_source, ToolOutcome, ToolRunner};
use crate::scoring::structural;
use crate::scoring::BlendWeights;
use crate::validators::common::partial;
use crate::validators::{
    blueprint, controller, design, diagram, interface, layout, manifest, native, policy, script,
    HeuristicFn, NativeProgram, NativeSpec,
};

/// Credit kept when a validator itself panics.
pub const VALIDATOR_FAULT_SCORE: f64 = 0.15;

/// Everything the registry and the blender know about one artifact type.
pub struct ValidatorEntry {
    pub ty: ArtifactType,
    /// Label reported when the heuristic path runs.
    pub fallback_tool: &'static str,
    /// Decides the result before either path runs, when it returns `Some`.
    pub precheck: Option<fn(&str) -> Option<ValidatorResult>>,
    pub heuristic: HeuristicFn,
    pub structural: fn(&str) -> f64,
    /// Host tool that supersedes the heuristic when present.
    pub native: Option<&'static NativeSpec>,
    pub weights: BlendWeights,
    pub note: &'static str,
}

impl fmt::Debug for ValidatorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorEntry")
            .field("ty", &self.ty)
            .field("fallback_tool", &self.fallback_tool)
            .field("native", &self.native)
            .field("weights", &self.weights)
            .finish_non_exhaustive()
    }
}

/// In [`ArtifactType::ALL`] order.
static ENTRIES: [ValidatorEntry; 12] = [
    ValidatorEntry {
        ty: ArtifactType::InterfaceDefinition,
        fallback_tool: interface::TOOL,
        precheck: None,
        heuristic: interface::validate,
        structural: structural::interface,
        native: None,
        weights: BlendWeights::new(0.35, 0.45, 0.20),
        note: "host-native grammar check; the platform aidl compiler needs a full tree",
    },
    ValidatorEntry {
        ty: ArtifactType::NativeService,
        fallback_tool: native::FALLBACK_TOOL,
        precheck: None,
        heuristic: native::fallback,
        structural: structural::native_service,
        native: Some(&native::SPEC),
        weights: BlendWeights::new(0.30, 0.50, 0.20),
        note: "syntax only, VHAL headers stubbed in",
    },
    ValidatorEntry {
        ty: ArtifactType::SecurityPolicy,
        fallback_tool: policy::FALLBACK_TOOL,
        precheck: None,
        heuristic: policy::fallback,
        structural: structural::security_policy,
        native: Some(&policy::SPEC),
        weights: BlendWeights::new(0.25, 0.65, 0.10),
        note: "full policy compile, class/common prelude injected",
    },
    ValidatorEntry {
        ty: ArtifactType::BuildDescriptor,
        fallback_tool: blueprint::TOOL,
        precheck: None,
        heuristic: blueprint::validate,
        structural: structural::build_descriptor,
        native: None,
        weights: BlendWeights::new(0.35, 0.55, 0.10),
        note: "structural parser; Soong is not available on a bare host",
    },
    ValidatorEntry {
        ty: ArtifactType::ServiceManifest,
        fallback_tool: manifest::TOOL,
        precheck: None,
        heuristic: manifest::validate,
        structural: structural::service_manifest,
        native: None,
        weights: BlendWeights::new(0.35, 0.55, 0.10),
        note: "XML well-formedness plus VINTF and init.rc rules",
    },
    ValidatorEntry {
        ty: ArtifactType::DiagramSource,
        fallback_tool: diagram::FALLBACK_TOOL,
        precheck: Some(diagram::markers),
        heuristic: diagram::fallback,
        structural: structural::diagram,
        native: Some(&diagram::SPEC),
        weights: BlendWeights::new(0.40, 0.50, 0.10),
        note: "needs both java and plantuml.jar",
    },
    ValidatorEntry {
        ty: ArtifactType::UiController,
        fallback_tool: controller::FALLBACK_TOOL,
        precheck: None,
        heuristic: controller::fallback,
        structural: structural::ui_controller,
        native: Some(&controller::SPEC),
        weights: BlendWeights::new(0.35, 0.40, 0.25),
        note: "syntax only, platform SDK references filtered",
    },
    ValidatorEntry {
        ty: ArtifactType::UiLayout,
        fallback_tool: layout::TOOL,
        precheck: None,
        heuristic: layout::validate,
        structural: structural::ui_layout,
        native: None,
        weights: BlendWeights::new(0.40, 0.45, 0.15),
        note: "XML well-formedness plus layout rules",
    },
    ValidatorEntry {
        ty: ArtifactType::RestServer,
        fallback_tool: "tree-sitter-python[backend]",
        precheck: None,
        heuristic: script::validate_rest_server,
        structural: structural::rest_server,
        native: None,
        weights: BlendWeights::new(0.30, 0.50, 0.20),
        note: "full syntax tree plus route and async checks",
    },
    ValidatorEntry {
        ty: ArtifactType::DataModel,
        fallback_tool: "tree-sitter-python[backend_model]",
        precheck: None,
        heuristic: script::validate_data_model,
        structural: structural::data_model,
        native: None,
        weights: BlendWeights::new(0.30, 0.45, 0.25),
        note: "full syntax tree plus model and annotation checks",
    },
    ValidatorEntry {
        ty: ArtifactType::Simulator,
        fallback_tool: "tree-sitter-python[simulator]",
        precheck: None,
        heuristic: script::validate_simulator,
        structural: structural::simulator,
        native: None,
        weights: BlendWeights::new(0.30, 0.45, 0.25),
        note: "full syntax tree plus async and lifecycle checks",
    },
    ValidatorEntry {
        ty: ArtifactType::DesignDocument,
        fallback_tool: design::TOOL,
        precheck: None,
        heuristic: design::validate,
        structural: structural::design_document,
        native: None,
        weights: BlendWeights::new(0.50, 0.40, 0.10),
        note: "heading, section and length heuristics",
    },
];

/// The dispatch entry for `ty`.
pub fn entry(ty: ArtifactType) -> &'static ValidatorEntry {
    &ENTRIES[ty as usize]
}

/// The whole dispatch table.
pub fn entries() -> &'static [ValidatorEntry] {
    &ENTRIES
}

/// One row of `halgate tools`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolReport {
    pub artifact_type: ArtifactType,
    pub tool: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    pub note: String,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Run `f`, turning a panic into a failed result labelled `tool`.
pub fn guarded<F>(tool: &str, f: F) -> ValidatorResult
where
    F: FnOnce() -> ValidatorResult,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            error!(tool, panic = %msg, "validator fault");
            ValidatorResult::fail(
                VALIDATOR_FAULT_SCORE,
                vec![format!("validator fault: {}", msg)],
                tool,
            )
        }
    }
}

fn with_note(result: ValidatorResult, note: String) -> ValidatorResult {
    let detail = match &result.detail {
        Some(existing) => format!("{}; {}", existing, note),
        None => note,
    };
    result.with_detail(detail)
}

/// Validates artifacts, choosing native tools or heuristics per host.
#[derive(Debug, Clone)]
pub struct ValidatorRegistry {
    probe: Arc<dyn ToolProbe>,
    runner: ToolRunner,
    thresholds: AcceptanceThresholds,
}

impl ValidatorRegistry {
    pub fn new(
        probe: Arc<dyn ToolProbe>,
        runner: ToolRunner,
        thresholds: AcceptanceThresholds,
    ) -> Self {
        Self {
            probe,
            runner,
            thresholds,
        }
    }

    /// Registry with `probe` and the timeout and thresholds from `config`.
    pub fn from_config(config: &HalgateConfig, probe: Arc<dyn ToolProbe>) -> Self {
        Self::new(
            probe,
            ToolRunner::new(config.tool_timeout()),
            config.thresholds.clone(),
        )
    }

    /// Registry probing the real host.
    pub fn host(config: &HalgateConfig) -> Self {
        let probe = HostToolProbe::with_search_path(
            std::env::var_os("PATH"),
            config.plantuml_jar_paths.clone(),
        );
        Self::from_config(config, Arc::new(probe))
    }

    /// Registry that never runs a native tool.
    pub fn fallback_only(thresholds: AcceptanceThresholds) -> Self {
        Self::new(
            Arc::new(StaticToolProbe::none()),
            ToolRunner::default(),
            thresholds,
        )
    }

    pub fn probe(&self) -> &dyn ToolProbe {
        self.probe.as_ref()
    }

    pub fn thresholds(&self) -> &AcceptanceThresholds {
        &self.thresholds
    }

    fn locate_native(&self, ty: ArtifactType) -> Option<(&'static NativeSpec, NativeProgram)> {
        let spec = entry(ty).native?;
        (spec.locate)(self.probe.as_ref()).map(|program| (spec, program))
    }

    /// Whether `ty` would be checked by a native tool on this host.
    pub fn native_available(&self, ty: ArtifactType) -> bool {
        self.locate_native(ty).is_some()
    }

    /// Label of the path that would run for `ty`.
    pub fn tool_label(&self, ty: ArtifactType) -> &'static str {
        match self.locate_native(ty) {
            Some((spec, _)) => spec.label,
            None => entry(ty).fallback_tool,
        }
    }

    /// Validate `content` as `ty`. Never fails and never panics.
    pub async fn validate(&self, ty: ArtifactType, content: &str) -> ValidatorResult {
        METRICS.inc_validations();
        let entry = entry(ty);

        if content.trim().is_empty() {
            return ValidatorResult::empty(self.tool_label(ty));
        }

        if let Some(precheck) = entry.precheck {
            if let Ok(Some(result)) = catch_unwind(AssertUnwindSafe(|| precheck(content))) {
                debug!(artifact_type = %ty, "decided by precheck");
                return result;
            }
        }

        match self.locate_native(ty) {
            Some((spec, program)) => self.run_native(entry, spec, program, content).await,
            None => self.run_fallback(entry, content),
        }
    }

    /// The heuristic path only, whatever the host has installed.
    pub fn validate_fallback(&self, ty: ArtifactType, content: &str) -> ValidatorResult {
        let entry = entry(ty);
        if content.trim().is_empty() {
            return ValidatorResult::empty(entry.fallback_tool);
        }
        self.run_fallback(entry, content)
    }

    fn run_fallback(&self, entry: &ValidatorEntry, content: &str) -> ValidatorResult {
        METRICS.inc_fallbacks();
        debug!(artifact_type = %entry.ty, tool = entry.fallback_tool, "heuristic path");
        let accept_at = self.thresholds.for_type(entry.ty);
        guarded(entry.fallback_tool, || (entry.heuristic)(content, accept_at))
    }

    async fn run_native(
        &self,
        entry: &ValidatorEntry,
        spec: &'static NativeSpec,
        program: NativeProgram,
        content: &str,
    ) -> ValidatorResult {
        debug!(
            artifact_type = %entry.ty,
            tool = spec.label,
            program = %program.program.display(),
            "native path"
        );

        let prepared = (spec.prepare)(content);
        let source = match scratch_source(&prepared, spec.suffix) {
            Ok(file) => file,
            Err(e) => {
                warn!(error = %e, "could not write scratch source, using heuristic");
                return with_note(
                    self.run_fallback(entry, content),
                    format!("scratch file unavailable: {}", e),
                );
            }
        };
        let scratch_dir = match tempfile::Builder::new().prefix("halgate-out-").tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                warn!(error = %e, "could not create scratch dir, using heuristic");
                return with_note(
                    self.run_fallback(entry, content),
                    format!("scratch dir unavailable: {}", e),
                );
            }
        };

        let args = (spec.args)(&program, source.path(), scratch_dir.path());
        match self.runner.run(&program.program, &args).await {
            ToolOutcome::Completed(output) => guarded(spec.label, || (spec.interpret)(&output)),
            ToolOutcome::TimedOut { limit } => ValidatorResult::fail(
                partial(1),
                vec![format!("{} timed out after {}s", spec.label, limit.as_secs())],
                spec.label,
            ),
            ToolOutcome::SpawnFailed { reason } => {
                with_note(self.run_fallback(entry, content), reason)
            }
        }
    }

    /// Which path each artifact type takes on this host.
    pub fn availability_report(&self) -> Vec<ToolReport> {
        ENTRIES
            .iter()
            .map(|e| match e.native {
                Some(spec) => ToolReport {
                    artifact_type: e.ty,
                    tool: spec.label.to_string(),
                    available: self.native_available(e.ty),
                    fallback: Some(e.fallback_tool.to_string()),
                    note: e.note.to_string(),
                },
                None => ToolReport {
                    artifact_type: e.ty,
                    tool: e.fallback_tool.to_string(),
                    available: true,
                    fallback: None,
                    note: e.note.to_string(),
                },
            })
            .collect()
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::host(&HalgateConfig::default())
    }
}
