//! SELinux type-enforcement policy.

use std::ffi::OsString;
use std::path::Path;

use super::common::{accepted, contains_any, partial, MAX_REPORTED_ERRORS};
use super::{NativeProgram, NativeSpec};
use crate::domain::ValidatorResult;
use crate::probe::{Tool, ToolProbe};
use crate::runner::ToolOutput;

pub const NATIVE_TOOL: &str = "checkpolicy";
pub const FALLBACK_TOOL: &str = "selinux-keyword-fallback";

/// Class and common declarations a standalone `.te` fragment refers to.
pub const PRELUDE: &str = "\
class binder  { call set_context_mgr transfer impersonate }
class file    { read write open getattr }
class dir     { read open search }
class service_manager { add find list }
class hwservice_manager { add find list }
class property_service { set }
common file_class_set { ioctl read write create getattr setattr lock relabelfrom relabelto append unlink link rename execute }
class file inherits file_class_set { execute_no_trans entrypoint open }
";

pub static SPEC: NativeSpec = NativeSpec {
    label: NATIVE_TOOL,
    suffix: ".te",
    locate,
    prepare,
    args,
    interpret,
};

fn locate(probe: &dyn ToolProbe) -> Option<NativeProgram> {
    probe.locate(Tool::CheckPolicy).map(NativeProgram::new)
}

fn prepare(policy: &str) -> String {
    format!("{}\n{}", PRELUDE, policy)
}

fn args(_program: &NativeProgram, source: &Path, _scratch: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-M", "-C", "-o", "/dev/null"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(source.as_os_str().to_owned());
    args
}

fn interpret(output: &ToolOutput) -> ValidatorResult {
    let combined = output.combined();
    if output.succeeded() && !combined.to_lowercase().contains("error") {
        return ValidatorResult::pass(NATIVE_TOOL).with_detail("policy compiled");
    }
    let errors: Vec<String> = combined
        .lines()
        .filter(|l| {
            let lower = l.to_lowercase();
            lower.contains("error") || lower.contains("undefined")
        })
        .map(str::to_string)
        .collect();
    let total = errors.len();
    ValidatorResult::fail(
        partial(total),
        errors.into_iter().take(MAX_REPORTED_ERRORS).collect(),
        NATIVE_TOOL,
    )
    .with_detail(format!("exit {}, {} error line(s)", output.exit_code, total))
}

pub fn fallback(policy: &str, accept_at: f64) -> ValidatorResult {
    let mut errors = Vec::new();
    let mut score = 0.0;

    if policy.contains("type ") {
        score += 0.25;
    }
    if policy.contains("allow ") {
        score += 0.30;
    } else {
        errors.push("No 'allow' rules found".to_string());
    }
    if contains_any(policy, &["hal_vehicle", "vhal", "hal_attribute"]) {
        score += 0.25;
    } else {
        errors.push("No VHAL-specific type declarations".to_string());
    }
    if contains_any(policy, &["binder_call", "hwservice_use", "add_hwservice"]) {
        score += 0.20;
    }

    let ok = accepted(score, accept_at, &errors);
    ValidatorResult::new(ok, score, errors, FALLBACK_TOOL)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(exit_code: i32, stderr: &str) -> ToolOutput {
        ToolOutput {
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
            duration_ms: 3,
        }
    }

    #[test]
    fn test_clean_compile_passes() {
        let r = interpret(&output(0, "checkpolicy:  loading policy configuration\n"));
        assert!(r.ok);
        assert_eq!(r.score, 1.0);
    }

    #[test]
    fn test_error_and_undefined_lines_counted() {
        let r = interpret(&output(
            1,
            "x.te:12:ERROR 'syntax error' at token 'alow'\n\
             x.te:14: type vehiclehal_exec is not defined\n\
             x.te:15: undefined class hwbinder\n",
        ));
        assert!(!r.ok);
        assert_eq!(r.errors.len(), 2);
        assert_eq!(r.score, 0.61);
    }

    #[test]
    fn test_prelude_precedes_policy() {
        let combined = prepare("type vehiclehal, domain;");
        assert!(combined.starts_with("class binder"));
        assert!(combined.ends_with("type vehiclehal, domain;"));
    }

    #[test]
    fn test_fallback_full_policy() {
        let policy = "type hal_vehicle_default, domain;\n\
                      allow hal_vehicle_default hal_vehicle_service:service_manager add;\n\
                      binder_call(hal_vehicle_default, servicemanager)\n";
        let r = fallback(policy, 0.70);
        assert!(r.ok, "{:?}", r.errors);
        assert_eq!(r.score, 1.0);
        assert_eq!(r.tool, FALLBACK_TOOL);
    }

    #[test]
    fn test_fallback_without_allow() {
        let r = fallback("type hal_vehicle_default, domain;\n", 0.70);
        assert!(!r.ok);
        assert_eq!(r.errors, vec!["No 'allow' rules found".to_string()]);
        assert_eq!(r.score, 0.5);
    }
}
