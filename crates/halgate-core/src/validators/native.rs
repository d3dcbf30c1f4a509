//! C++ VHAL service sources.
//!
//! Preferred path: `clang++ --syntax-only` over the source with a stub prelude
//! of VHAL types prepended, so the file compiles without platform headers.
//! Diagnostics that land inside the prelude are dropped.

use std::ffi::OsString;
use std::path::Path;

use super::common::{contains_any, count_char, diagnostic_line, partial, MAX_REPORTED_ERRORS};
use super::{NativeProgram, NativeSpec};
use crate::domain::ValidatorResult;
use crate::probe::{Tool, ToolProbe};
use crate::runner::ToolOutput;

pub const NATIVE_TOOL: &str = "clang++ --syntax-only";
pub const FALLBACK_TOOL: &str = "cpp-keyword-fallback";

/// Minimal VHAL type stubs, enough for a syntax-only check.
pub const PRELUDE: &str = "\
// halgate: stub declarations injected for a host-side syntax check
#include <cstdint>
#include <string>
#include <vector>
#include <memory>
#include <functional>
#include <optional>

namespace android::hardware::automotive::vehicle {
    struct VehiclePropValue { int32_t prop = 0; int32_t areaId = 0; };
    struct VehiclePropConfig { int32_t prop = 0; };
    struct GetValueRequest  { VehiclePropValue value; };
    struct SetValueRequest  { VehiclePropValue value; };
    struct StatusCode       { static constexpr int OK = 0; };
    class  IVehicleHardware {
    public:
        virtual ~IVehicleHardware() = default;
        virtual std::vector<VehiclePropConfig> getAllPropertyConfigs() const = 0;
    };
}
using namespace android::hardware::automotive::vehicle;
";

/// Lines occupied by the prelude plus the separating newline.
pub fn prelude_lines() -> usize {
    PRELUDE.lines().count() + 1
}

pub static SPEC: NativeSpec = NativeSpec {
    label: NATIVE_TOOL,
    suffix: ".cpp",
    locate,
    prepare,
    args,
    interpret,
};

fn locate(probe: &dyn ToolProbe) -> Option<NativeProgram> {
    probe
        .locate(Tool::ClangPlusPlus)
        .or_else(|| probe.locate(Tool::Clang))
        .map(NativeProgram::new)
}

fn prepare(code: &str) -> String {
    format!("{}\n{}", PRELUDE, code)
}

fn args(_program: &NativeProgram, source: &Path, _scratch: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "--syntax-only",
        "-x",
        "c++",
        "-std=c++17",
        "-Wno-unknown-pragmas",
        "-Wno-unused-variable",
        "-Wno-unused-function",
        "-Wno-error",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.push(source.as_os_str().to_owned());
    args
}

/// Error lines that belong to the generated code, not to the prelude.
pub fn real_errors(stderr: &str) -> Vec<String> {
    let prelude = prelude_lines();
    stderr
        .lines()
        .filter(|line| line.to_lowercase().contains("error:"))
        .filter(|line| !matches!(diagnostic_line(line), Some(n) if n <= prelude))
        .filter(|line| !line.contains("halgate: stub declarations"))
        .map(str::to_string)
        .collect()
}

fn interpret(output: &ToolOutput) -> ValidatorResult {
    let errors = real_errors(&output.stderr);
    if errors.is_empty() {
        return ValidatorResult::pass(NATIVE_TOOL).with_detail("Syntax OK (VHAL stubs injected)");
    }
    let total = errors.len();
    ValidatorResult::fail(
        partial(total),
        errors.into_iter().take(MAX_REPORTED_ERRORS).collect(),
        NATIVE_TOOL,
    )
    .with_detail(format!("{} syntax error(s)", total))
}

pub fn fallback(code: &str, accept_at: f64) -> ValidatorResult {
    let mut errors = Vec::new();
    let mut score = 0.0;

    if code.contains("#include") {
        score += 0.15;
    }
    if code.contains("namespace") {
        score += 0.15;
    }
    if code.contains("class ") {
        score += 0.20;
    }
    if count_char(code, '{') == count_char(code, '}') {
        score += 0.15;
    } else {
        errors.push("Unbalanced braces".to_string());
    }
    if contains_any(code, &["getAllPropertyConfigs", "getValues", "setValues"]) {
        score += 0.25;
    } else {
        errors.push(
            "Missing key VHAL methods (getAllPropertyConfigs/getValues/setValues)".to_string(),
        );
    }
    if contains_any(code, &["int32_t", "VehiclePropValue", "float", "bool"]) {
        score += 0.10;
    }

    let ok = score >= accept_at && errors.is_empty();
    ValidatorResult::new(ok, score, errors, FALLBACK_TOOL)
}
