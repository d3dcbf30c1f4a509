//! PlantUML diagram sources.

use std::ffi::OsString;
use std::path::Path;

use super::common::{accepted, contains_any, partial};
use super::{NativeProgram, NativeSpec};
use crate::domain::ValidatorResult;
use crate::probe::{Tool, ToolProbe};
use crate::runner::ToolOutput;

pub const NATIVE_TOOL: &str = "plantuml.jar -syntax";
pub const FALLBACK_TOOL: &str = "puml-marker-fallback";

/// The jar prints fewer, longer lines than a compiler; keep fewer of them.
const MAX_DIAGRAM_ERRORS: usize = 4;

/// Fewer lines than this cannot hold a meaningful diagram.
const MIN_LINES: usize = 5;

pub static SPEC: NativeSpec = NativeSpec {
    label: NATIVE_TOOL,
    suffix: ".puml",
    locate,
    prepare: str::to_string,
    args,
    interpret,
};

/// Missing start/end markers are decided before any tool runs.
pub fn markers(puml: &str) -> Option<ValidatorResult> {
    if !puml.contains("@startuml") {
        return Some(ValidatorResult::fail(
            0.10,
            vec!["Missing @startuml".to_string()],
            FALLBACK_TOOL,
        ));
    }
    if !puml.contains("@enduml") {
        return Some(ValidatorResult::fail(
            0.15,
            vec!["Missing @enduml".to_string()],
            FALLBACK_TOOL,
        ));
    }
    None
}

fn locate(probe: &dyn ToolProbe) -> Option<NativeProgram> {
    let java = probe.locate(Tool::Java)?;
    let jar = probe.locate(Tool::PlantUmlJar)?;
    Some(NativeProgram::new(java).with_extra(jar))
}

fn args(program: &NativeProgram, source: &Path, _scratch: &Path) -> Vec<OsString> {
    let mut args = vec![OsString::from("-jar")];
    if let Some(jar) = &program.extra {
        args.push(jar.as_os_str().to_owned());
    }
    args.push(OsString::from("-syntax"));
    args.push(source.as_os_str().to_owned());
    args
}

fn interpret(output: &ToolOutput) -> ValidatorResult {
    let combined = output.combined();
    if output.succeeded() && !combined.to_lowercase().contains("error") {
        return ValidatorResult::pass(NATIVE_TOOL);
    }
    let errors: Vec<String> = combined
        .lines()
        .filter(|l| l.to_lowercase().contains("error"))
        .map(str::to_string)
        .collect();
    ValidatorResult::fail(
        partial(errors.len()),
        errors.into_iter().take(MAX_DIAGRAM_ERRORS).collect(),
        NATIVE_TOOL,
    )
}

pub fn fallback(puml: &str, accept_at: f64) -> ValidatorResult {
    let mut errors = Vec::new();
    let mut score = 0.0;

    if puml.contains("@startuml") {
        score += 0.30;
    }
    if puml.contains("@enduml") {
        score += 0.30;
    }
    if contains_any(puml, &["->", "-->", "=>"]) {
        score += 0.20;
    }
    if contains_any(puml, &["component", "package", "node", "class", "rectangle"]) {
        score += 0.20;
    }
    let lines = puml.lines().count();
    if lines < MIN_LINES {
        errors.push("Diagram too short, likely incomplete".to_string());
    }

    let ok = accepted(score, accept_at, &errors);
    ValidatorResult::new(ok, score, errors, FALLBACK_TOOL).with_detail(format!("{} lines", lines))
}
