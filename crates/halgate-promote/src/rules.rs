//! The static rule set a draft tree is gated against.
//!
//! [`RequiredFileSet::vehicle_hal`] is the built-in Vehicle-HAL module. A
//! different module can be described in TOML and loaded with
//! [`RequiredFileSet::load`].

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PromoteError, Result};
use crate::paths::normalize_relative;

/// Applies a check to every required file.
pub const EVERY_REQUIRED_FILE: &str = "*";

const AIDL_DIR: &str = "hardware/interfaces/automotive/vehicle/aidl";
const IMPL_DIR: &str = "hardware/interfaces/automotive/vehicle/impl";
const SEPOLICY_DIR: &str = "system/sepolicy/vendor";

pub const IVEHICLE_AIDL: &str =
    "hardware/interfaces/automotive/vehicle/aidl/android/hardware/automotive/vehicle/IVehicle.aidl";
pub const IVEHICLE_CALLBACK_AIDL: &str =
    "hardware/interfaces/automotive/vehicle/aidl/android/hardware/automotive/vehicle/IVehicleCallback.aidl";
pub const VEHICLE_PROP_VALUE_AIDL: &str =
    "hardware/interfaces/automotive/vehicle/aidl/android/hardware/automotive/vehicle/VehiclePropValue.aidl";
pub const AIDL_BP: &str = "hardware/interfaces/automotive/vehicle/aidl/Android.bp";
pub const SERVICE_CPP: &str = "hardware/interfaces/automotive/vehicle/impl/VehicleHalService.cpp";
pub const IMPL_BP: &str = "hardware/interfaces/automotive/vehicle/impl/Android.bp";
pub const SERVICE_RC: &str =
    "hardware/interfaces/automotive/vehicle/impl/android.hardware.automotive.vehicle-service.rc";
pub const SERVICE_XML: &str =
    "hardware/interfaces/automotive/vehicle/impl/android.hardware.automotive.vehicle-service.xml";
pub const VEHICLEHAL_TE: &str = "system/sepolicy/vendor/vehiclehal.te";
pub const VEHICLEHAL_SERVICE_TE: &str = "system/sepolicy/vendor/vehiclehal_service.te";
pub const FILE_CONTEXTS: &str = "system/sepolicy/vendor/file_contexts";

/// Whether a failed check blocks promotion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

/// A content predicate over one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckRule {
    /// Literal token must appear.
    Contains { token: String },
    /// At least one of the tokens must appear.
    ContainsAny { tokens: Vec<String> },
    /// Regex must match somewhere.
    Matches { pattern: String },
    /// Regex must not match anywhere.
    Absent { pattern: String },
    /// If `token` appears, `companion` must appear as well.
    Requires { token: String, companion: String },
}

impl CheckRule {
    /// Whether `content` satisfies the rule.
    pub fn holds(&self, content: &str) -> std::result::Result<bool, regex::Error> {
        Ok(match self {
            CheckRule::Contains { token } => content.contains(token.as_str()),
            CheckRule::ContainsAny { tokens } => tokens.iter().any(|t| content.contains(t.as_str())),
            CheckRule::Matches { pattern } => Regex::new(pattern)?.is_match(content),
            CheckRule::Absent { pattern } => !Regex::new(pattern)?.is_match(content),
            CheckRule::Requires { token, companion } => {
                !content.contains(token.as_str()) || content.contains(companion.as_str())
            }
        })
    }

    fn pattern(&self) -> Option<&str> {
        match self {
            CheckRule::Matches { pattern } | CheckRule::Absent { pattern } => Some(pattern),
            _ => None,
        }
    }
}

/// One invariant: a rule, the file it applies to and the message on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCheck {
    /// Required file the check applies to, or `*` for every required file.
    pub path: String,
    pub rule: CheckRule,
    #[serde(default)]
    pub severity: Severity,
    /// Reported as `<path>: <message>` when the rule does not hold.
    pub message: String,
}

impl FileCheck {
    fn error(path: &str, rule: CheckRule, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            rule,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn warning(path: &str, rule: CheckRule, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(path, rule, message)
        }
    }

    pub fn applies_to(&self, rel: &str) -> bool {
        self.path == EVERY_REQUIRED_FILE || self.path == rel
    }
}

fn contains(token: &str) -> CheckRule {
    CheckRule::Contains {
        token: token.to_string(),
    }
}

fn contains_any(tokens: &[&str]) -> CheckRule {
    CheckRule::ContainsAny {
        tokens: tokens.iter().map(|t| t.to_string()).collect(),
    }
}

fn matches(pattern: &str) -> CheckRule {
    CheckRule::Matches {
        pattern: pattern.to_string(),
    }
}

fn absent(pattern: &str) -> CheckRule {
    CheckRule::Absent {
        pattern: pattern.to_string(),
    }
}

/// Allowlist, required files, forbidden content and per-file invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredFileSet {
    /// Every draft file must start with one of these.
    pub allowlist_prefixes: Vec<String>,
    /// Exact relative paths that must exist; these are what gets promoted.
    pub required_files: Vec<String>,
    /// Case-insensitive substrings no required file may contain.
    pub forbidden_substrings: Vec<String>,
    #[serde(default)]
    pub checks: Vec<FileCheck>,
}

impl Default for RequiredFileSet {
    fn default() -> Self {
        Self::vehicle_hal()
    }
}

impl RequiredFileSet {
    /// The AIDL Vehicle HAL bring-up set.
    pub fn vehicle_hal() -> Self {
        let aidl_package = contains("package android.hardware.automotive.vehicle;");
        let package_msg = "missing package android.hardware.automotive.vehicle;";
        let blueprint_braces = matches(r"\{[\s\S]*\}");
        let braces_msg = "does not look like Blueprint (missing braces)";

        let mut checks = vec![
            FileCheck::error(IVEHICLE_AIDL, aidl_package.clone(), package_msg),
            FileCheck::error(IVEHICLE_CALLBACK_AIDL, aidl_package.clone(), package_msg),
            FileCheck::error(VEHICLE_PROP_VALUE_AIDL, aidl_package, package_msg),
            FileCheck::error(
                VEHICLE_PROP_VALUE_AIDL,
                matches(r"\bparcelable\s+VehiclePropValue\s*;"),
                "must declare 'parcelable VehiclePropValue;'",
            ),
            FileCheck::error(
                IVEHICLE_CALLBACK_AIDL,
                matches(r"\bvoid\s+onPropertyEvent\s*\(\s*in\s+VehiclePropValue\s+value\s*\)\s*;"),
                "missing required callback method onPropertyEvent(in VehiclePropValue value);",
            ),
        ];

        for (pattern, signature) in [
            (
                r"\bVehiclePropValue\s+get\s*\(\s*int\s+propId\s*,\s*int\s+areaId\s*\)\s*;",
                "VehiclePropValue get(int propId, int areaId);",
            ),
            (
                r"\bvoid\s+set\s*\(\s*in\s+VehiclePropValue\s+value\s*\)\s*;",
                "void set(in VehiclePropValue value);",
            ),
            (
                r"\bvoid\s+registerCallback\s*\(\s*in\s+IVehicleCallback\s+callback\s*\)\s*;",
                "void registerCallback(in IVehicleCallback callback);",
            ),
            (
                r"\bvoid\s+unregisterCallback\s*\(\s*in\s+IVehicleCallback\s+callback\s*\)\s*;",
                "void unregisterCallback(in IVehicleCallback callback);",
            ),
        ] {
            checks.push(FileCheck::error(
                IVEHICLE_AIDL,
                matches(pattern),
                format!("missing required method signature: {}", signature),
            ));
        }

        for token in [
            "BnIVehicle",
            "AServiceManager_addService",
            "android.hardware.automotive.vehicle.IVehicle/default",
            "registerCallback",
            "unregisterCallback",
        ] {
            checks.push(FileCheck::error(
                SERVICE_CPP,
                contains(token),
                format!("missing required token: {}", token),
            ));
        }
        checks.push(FileCheck::error(
            SERVICE_CPP,
            contains("<aidl/android/hardware/automotive/vehicle/BnIVehicle.h>"),
            "missing include <aidl/android/hardware/automotive/vehicle/BnIVehicle.h>",
        ));

        checks.extend([
            FileCheck::error(AIDL_BP, blueprint_braces.clone(), braces_msg),
            FileCheck::error(AIDL_BP, contains("aidl_interface"), "expected aidl_interface { ... }"),
            FileCheck::error(
                AIDL_BP,
                contains("android.hardware.automotive.vehicle"),
                "expected name android.hardware.automotive.vehicle",
            ),
            FileCheck::error(
                AIDL_BP,
                contains("backend"),
                "expected backend configuration for the AIDL interface",
            ),
            FileCheck::error(IMPL_BP, blueprint_braces, braces_msg),
            FileCheck::error(
                IMPL_BP,
                contains_any(&["cc_binary", "cc_defaults"]),
                "expected cc_binary (service) module",
            ),
            FileCheck::error(
                IMPL_BP,
                contains("VehicleHalService.cpp"),
                "expected VehicleHalService.cpp in srcs",
            ),
            FileCheck::error(
                SERVICE_RC,
                matches(r"(?m)^\s*service\s+android\.hardware\.automotive\.vehicle-service\b"),
                "expected 'service android.hardware.automotive.vehicle-service ...'",
            ),
            FileCheck::error(SERVICE_RC, contains("class hal"), "expected 'class hal'"),
            FileCheck::error(
                SERVICE_RC,
                CheckRule::Requires {
                    token: "disabled".to_string(),
                    companion: "oneshot".to_string(),
                },
                "service is disabled without oneshot and would never start",
            ),
            FileCheck::error(
                SERVICE_XML,
                matches(r"<manifest[\s>][\s\S]*</manifest>"),
                "not a manifest xml (missing <manifest> root)",
            ),
            FileCheck::error(
                SERVICE_XML,
                contains("android.hardware.automotive.vehicle"),
                "expected hal name android.hardware.automotive.vehicle",
            ),
            FileCheck::error(
                SERVICE_XML,
                matches(r"<interface>[\s\S]*IVehicle"),
                "expected interface IVehicle",
            ),
            FileCheck::error(SERVICE_XML, contains("default"), "expected instance 'default'"),
            FileCheck::warning(
                VEHICLEHAL_TE,
                contains_any(&["type vehiclehal", "type vehicle_hal"]),
                "no 'type vehiclehal' declaration (check naming)",
            ),
            FileCheck::warning(
                VEHICLEHAL_SERVICE_TE,
                contains_any(&["vehiclehal_service", "vehicle_hal_service"]),
                "no service domain type (check naming)",
            ),
            FileCheck::error(
                FILE_CONTEXTS,
                contains_any(&["/vendor/bin", "/system/bin"]),
                "missing any /vendor/bin or /system/bin mapping",
            ),
            FileCheck::warning(
                SERVICE_CPP,
                absent(r"while\s*\(\s*(true|1)\s*\)"),
                "blocking while(true) loop",
            ),
            FileCheck::warning(SERVICE_CPP, absent(r"\bsleep\s*\("), "sleep() call in service code"),
            FileCheck::warning(
                VEHICLEHAL_TE,
                absent(r"allow\s+\*\s+\*:\*\s+\*\s*;"),
                "over-permissive 'allow * *:* *;' rule",
            ),
            FileCheck::warning(
                VEHICLEHAL_SERVICE_TE,
                absent(r"allow\s+\*\s+\*:\*\s+\*\s*;"),
                "over-permissive 'allow * *:* *;' rule",
            ),
            FileCheck::warning(EVERY_REQUIRED_FILE, absent(r"\bTODO\b"), "contains TODO markers"),
        ]);

        Self {
            allowlist_prefixes: vec![
                format!("{}/", AIDL_DIR),
                format!("{}/", IMPL_DIR),
                format!("{}/", SEPOLICY_DIR),
            ],
            required_files: [
                IVEHICLE_AIDL,
                IVEHICLE_CALLBACK_AIDL,
                VEHICLE_PROP_VALUE_AIDL,
                AIDL_BP,
                SERVICE_CPP,
                IMPL_BP,
                SERVICE_RC,
                SERVICE_XML,
                VEHICLEHAL_TE,
                VEHICLEHAL_SERVICE_TE,
                FILE_CONTEXTS,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            // App manifests carry the android namespace on the root element;
            // the VINTF manifest never does.
            forbidden_substrings: vec![
                "com.example".to_string(),
                "AndroidManifest.xml".to_string(),
                "<manifest xmlns:android".to_string(),
            ],
            checks,
        }
    }

    /// Parse a TOML rule set and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let rules: RequiredFileSet = toml::from_str(content)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PromoteError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Whether `rel` falls under an allowlisted prefix.
    pub fn is_allowed(&self, rel: &str) -> bool {
        self.allowlist_prefixes.iter().any(|p| rel.starts_with(p.as_str()))
    }

    /// Checks that apply to `rel`, in declaration order.
    pub fn checks_for<'a>(&'a self, rel: &'a str) -> impl Iterator<Item = &'a FileCheck> + 'a {
        self.checks.iter().filter(move |c| c.applies_to(rel))
    }

    /// Required paths must be safe, unique and allowlisted; patterns must
    /// compile; checks must target a required file.
    pub fn validate(&self) -> Result<()> {
        if self.allowlist_prefixes.is_empty() {
            return Err(PromoteError::InvalidRules("allowlist_prefixes is empty".into()));
        }
        if self.required_files.is_empty() {
            return Err(PromoteError::InvalidRules("required_files is empty".into()));
        }
        for prefix in &self.allowlist_prefixes {
            normalize_relative(prefix)?;
        }

        let mut seen = std::collections::BTreeSet::new();
        for rel in &self.required_files {
            let safe = normalize_relative(rel)?;
            if &safe != rel {
                return Err(PromoteError::InvalidRules(format!(
                    "required file '{}' is not in normal form ('{}')",
                    rel, safe
                )));
            }
            if !self.is_allowed(rel) {
                return Err(PromoteError::InvalidRules(format!(
                    "required file '{}' is outside every allowlisted prefix",
                    rel
                )));
            }
            if !seen.insert(rel.as_str()) {
                return Err(PromoteError::InvalidRules(format!(
                    "required file '{}' listed twice",
                    rel
                )));
            }
        }

        for check in &self.checks {
            if check.path != EVERY_REQUIRED_FILE && !seen.contains(check.path.as_str()) {
                return Err(PromoteError::InvalidRules(format!(
                    "check '{}' targets '{}', which is not a required file",
                    check.message, check.path
                )));
            }
            if let Some(pattern) = check.rule.pattern() {
                Regex::new(pattern).map_err(|e| {
                    PromoteError::InvalidRules(format!("bad pattern '{}': {}", pattern, e))
                })?;
            }
        }
        Ok(())
    }
}
