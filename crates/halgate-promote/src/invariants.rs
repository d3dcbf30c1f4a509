//! Content invariants over the required files of a draft tree.

use std::path::Path;

use tracing::debug;

use crate::error::{PromoteError, Result};
use crate::paths::resolve_under;
use crate::rules::{RequiredFileSet, Severity};

/// Blocking errors and advisory warnings from the invariant stage.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvariantFindings {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl InvariantFindings {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// First forbidden substring found in `content`, compared case-insensitively.
pub fn first_forbidden<'a>(content: &str, forbidden: &'a [String]) -> Option<&'a str> {
    let lower = content.to_lowercase();
    forbidden
        .iter()
        .find(|f| !f.is_empty() && lower.contains(&f.to_lowercase()))
        .map(String::as_str)
}

/// Run the forbidden-content scan and every file check over the required
/// files under `draft_root`.
///
/// Files are read as lossy UTF-8; the caller has already checked they exist.
pub fn check_invariants(draft_root: &Path, rules: &RequiredFileSet) -> Result<InvariantFindings> {
    let mut findings = InvariantFindings::default();

    for rel in &rules.required_files {
        let path = resolve_under(draft_root, rel)?;
        let bytes = std::fs::read(&path).map_err(|e| PromoteError::io(&path, e))?;
        let content = String::from_utf8_lossy(&bytes);

        if let Some(hit) = first_forbidden(&content, &rules.forbidden_substrings) {
            findings
                .errors
                .push(format!("Forbidden content '{}' found in {}", hit, rel));
        }

        for check in rules.checks_for(rel) {
            let holds = match check.rule.holds(&content) {
                Ok(holds) => holds,
                Err(e) => {
                    findings
                        .errors
                        .push(format!("{}: check '{}' could not run: {}", rel, check.message, e));
                    continue;
                }
            };
            if holds {
                continue;
            }
            let line = format!("{}: {}", rel, check.message);
            match check.severity {
                Severity::Error => findings.errors.push(line),
                Severity::Warning => findings.warnings.push(line),
            }
        }
    }

    debug!(
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "invariants checked"
    );
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{CheckRule, FileCheck};

    fn rules() -> RequiredFileSet {
        RequiredFileSet {
            allowlist_prefixes: vec!["vendor/".into()],
            required_files: vec!["vendor/svc.rc".into(), "vendor/svc.te".into()],
            forbidden_substrings: vec!["com.example".into()],
            checks: vec![
                FileCheck {
                    path: "vendor/svc.rc".into(),
                    rule: CheckRule::Contains {
                        token: "class hal".into(),
                    },
                    severity: Severity::Error,
                    message: "expected 'class hal'".into(),
                },
                FileCheck {
                    path: "*".into(),
                    rule: CheckRule::Absent {
                        pattern: r"\bTODO\b".into(),
                    },
                    severity: Severity::Warning,
                    message: "contains TODO markers".into(),
                },
            ],
        }
    }

    fn draft(rc: &str, te: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("vendor")).unwrap();
        std::fs::write(dir.path().join("vendor/svc.rc"), rc).unwrap();
        std::fs::write(dir.path().join("vendor/svc.te"), te).unwrap();
        dir
    }

    #[test]
    fn test_clean_tree_passes() {
        let dir = draft("service svc /vendor/bin/svc\n    class hal\n", "type svc, domain;\n");
        let findings = check_invariants(dir.path(), &rules()).unwrap();
        assert!(findings.passed());
        assert!(findings.warnings.is_empty());
    }

    #[test]
    fn test_forbidden_is_case_insensitive_and_named() {
        let dir = draft("class hal\n", "type svc, domain; # COM.EXAMPLE.app\n");
        let findings = check_invariants(dir.path(), &rules()).unwrap();
        assert_eq!(
            findings.errors,
            vec!["Forbidden content 'com.example' found in vendor/svc.te".to_string()]
        );
    }

    #[test]
    fn test_warnings_do_not_block() {
        let dir = draft("class hal\n# TODO: restart policy\n", "type svc, domain;\n");
        let findings = check_invariants(dir.path(), &rules()).unwrap();
        assert!(findings.passed());
        assert_eq!(
            findings.warnings,
            vec!["vendor/svc.rc: contains TODO markers".to_string()]
        );
    }

    #[test]
    fn test_failed_check_is_prefixed_with_path() {
        let dir = draft("service svc /vendor/bin/svc\n", "type svc, domain;\n");
        let findings = check_invariants(dir.path(), &rules()).unwrap();
        assert_eq!(findings.errors, vec!["vendor/svc.rc: expected 'class hal'".to_string()]);
    }

    #[test]
    fn test_first_forbidden() {
        let forbidden = vec!["AndroidManifest.xml".to_string(), "com.example".to_string()];
        assert_eq!(
            first_forbidden("see androidmanifest.xml and com.example", &forbidden),
            Some("AndroidManifest.xml")
        );
        assert_eq!(first_forbidden("clean", &forbidden), None);
    }
}
