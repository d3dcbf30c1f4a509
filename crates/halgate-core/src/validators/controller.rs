//! Kotlin UI controllers (fragments bound to vehicle properties).

use std::ffi::OsString;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::common::{accepted, braces_balanced, contains_any, partial, MAX_REPORTED_ERRORS};
use super::{NativeProgram, NativeSpec};
use crate::domain::ValidatorResult;
use crate::probe::{Tool, ToolProbe};
use crate::runner::ToolOutput;

pub const NATIVE_TOOL: &str = "kotlinc";
pub const FALLBACK_TOOL: &str = "kotlin-keyword-fallback";

/// Platform SDK names that never resolve on a host without the SDK.
pub const PLATFORM_NAMES: &[&str] = &[
    "CarPropertyManager",
    "Car",
    "Fragment",
    "Context",
    "Bundle",
    "View",
    "LayoutInflater",
    "ViewGroup",
    "CarPropertyEventCallback",
    "R",
    "ViewBinding",
    "ViewModel",
    "LiveData",
    "lifecycleScope",
];

pub static SPEC: NativeSpec = NativeSpec {
    label: NATIVE_TOOL,
    suffix: ".kt",
    locate,
    prepare: str::to_string,
    args,
    interpret,
};

fn unresolved_reference() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)unresolved reference:?\s*'?(\w+)").expect("static regex")
    })
}

fn locate(probe: &dyn ToolProbe) -> Option<NativeProgram> {
    probe.locate(Tool::Kotlinc).map(NativeProgram::new)
}

fn args(_program: &NativeProgram, source: &Path, scratch: &Path) -> Vec<OsString> {
    vec![
        OsString::from("-nowarn"),
        source.as_os_str().to_owned(),
        OsString::from("-d"),
        scratch.as_os_str().to_owned(),
    ]
}

/// Compiler errors minus unresolved platform SDK references.
pub fn real_errors(stderr: &str) -> Vec<String> {
    stderr
        .lines()
        .filter(|line| line.to_lowercase().contains("error:"))
        .filter(|line| {
            !unresolved_reference()
                .captures(line)
                .is_some_and(|caps| PLATFORM_NAMES.contains(&&caps[1]))
        })
        .map(str::to_string)
        .collect()
}

fn interpret(output: &ToolOutput) -> ValidatorResult {
    let errors = real_errors(&output.stderr);
    if errors.is_empty() {
        return ValidatorResult::pass(NATIVE_TOOL)
            .with_detail("Syntax OK (platform SDK references filtered)");
    }
    ValidatorResult::fail(
        partial(errors.len()),
        errors.into_iter().take(MAX_REPORTED_ERRORS).collect(),
        NATIVE_TOOL,
    )
}

pub fn fallback(code: &str, accept_at: f64) -> ValidatorResult {
    let mut errors = Vec::new();
    let mut score = 0.0;

    if contains_any(code, &["CarPropertyManager", "Car.createCar"]) {
        score += 0.25;
    }
    if code.contains("Fragment") {
        score += 0.15;
    }
    if code.contains("fun ") {
        score += 0.15;
    }
    if contains_any(code, &["onViewCreated", "onCreateView"]) {
        score += 0.15;
    }
    if contains_any(code, &["registerCallback", "CarPropertyEventCallback"]) {
        score += 0.15;
    }
    if braces_balanced(code) {
        score += 0.15;
    } else {
        errors.push("Unbalanced braces".to_string());
    }

    let ok = accepted(score, accept_at, &errors);
    ValidatorResult::new(ok, score, errors, FALLBACK_TOOL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_references_are_filtered() {
        let stderr = "\
Frag.kt:3:8: error: unresolved reference: CarPropertyManager
Frag.kt:9:20: error: unresolved reference: R
Frag.kt:12:5: error: unresolved reference: speedGauge
Frag.kt:14:1: error: expecting '}'
";
        let errors = real_errors(stderr);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("speedGauge"));
        assert!(errors[1].contains("expecting"));
    }

    #[test]
    fn test_quoted_reference_form() {
        let errors = real_errors("x.kt:1:1: error: Unresolved reference: 'Bundle'.\n");
        assert!(errors.is_empty());
    }

    #[test]
    fn test_k2_reference_form_is_filtered() {
        let stderr = "\
Frag.kt:3:8: error: unresolved reference 'CarPropertyManager'.
Frag.kt:9:20: error: unresolved reference 'R'.
";
        assert!(real_errors(stderr).is_empty());
        let errors = real_errors("Frag.kt:12:5: error: unresolved reference 'speedGauge'.\n");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_args_use_scratch_dir() {
        let a = args(
            &NativeProgram::new("/usr/bin/kotlinc".into()),
            Path::new("/tmp/F.kt"),
            Path::new("/tmp/out"),
        );
        assert_eq!(a[0], OsString::from("-nowarn"));
        assert_eq!(a[3], OsString::from("/tmp/out"));
    }

    #[test]
    fn test_fallback_complete_fragment() {
        let code = r#"
class HvacFragment : Fragment() {
    private lateinit var car: Car
    private lateinit var manager: CarPropertyManager

    override fun onViewCreated(view: View, savedInstanceState: Bundle?) {
        car = Car.createCar(requireContext())
        manager.registerCallback(callback, 0x1234, 1f)
    }
}
"#;
        let r = fallback(code, 0.75);
        assert!(r.ok, "{:?}", r.errors);
        assert_eq!(r.score, 1.0);
    }

    #[test]
    fn test_fallback_unbalanced() {
        let r = fallback("class A : Fragment() { fun x() {", 0.75);
        assert!(!r.ok);
        assert_eq!(r.errors, vec!["Unbalanced braces".to_string()]);
    }
}
