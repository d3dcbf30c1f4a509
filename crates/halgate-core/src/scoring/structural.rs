//! Validator-independent structural heuristics.
//!
//! Each function is a weighted keyword/pattern checklist normalised to
//! `[0, 1]`. They never fail and never shell out, so every artifact gets a
//! structural score even when its validator faults.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{round_to, ArtifactType};
use crate::validators::common::{all_brackets_balanced, contains_any};
use crate::validators::design::SECTIONS;

/// Earned weight over total weight, rounded to 4 places.
pub fn weighted(checks: &[(bool, f64)]) -> f64 {
    let total: f64 = checks.iter().map(|(_, w)| w).sum();
    if total == 0.0 {
        return 0.0;
    }
    let earned: f64 = checks.iter().filter(|(ok, _)| *ok).map(|(_, w)| w).sum();
    round_to(earned / total, 4)
}

/// Structural score for `content` as `ty`; blank content scores 0.
pub fn structural_score(ty: ArtifactType, content: &str) -> f64 {
    let content = content.trim();
    if content.is_empty() {
        return 0.0;
    }
    match ty {
        ArtifactType::InterfaceDefinition => interface(content),
        ArtifactType::NativeService => native_service(content),
        ArtifactType::SecurityPolicy => security_policy(content),
        ArtifactType::BuildDescriptor => build_descriptor(content),
        ArtifactType::ServiceManifest => service_manifest(content),
        ArtifactType::DiagramSource => diagram(content),
        ArtifactType::UiController => ui_controller(content),
        ArtifactType::UiLayout => ui_layout(content),
        ArtifactType::RestServer => rest_server(content),
        ArtifactType::DataModel => data_model(content),
        ArtifactType::Simulator => simulator(content),
        ArtifactType::DesignDocument => design_document(content),
    }
}

pub fn interface(code: &str) -> f64 {
    weighted(&[
        (code.contains("package "), 0.20),
        (code.contains("interface "), 0.20),
        (all_brackets_balanced(code), 0.15),
        (contains_any(code, &["boolean", "int", "float", "String", "byte[]"]), 0.15),
        (contains_any(code, &["void ", "oneway ", "ParcelableHolder"]), 0.10),
        (contains_any(code, &["@VintfStability", "@JavaDerive"]), 0.05),
        (code.len() > 150, 0.15),
    ])
}

pub fn native_service(code: &str) -> f64 {
    weighted(&[
        (code.contains("#include"), 0.15),
        (code.contains("namespace"), 0.10),
        (code.contains("class "), 0.15),
        (all_brackets_balanced(code), 0.15),
        (contains_any(code, &["getAllPropertyConfigs", "getValues", "setValues"]), 0.25),
        (contains_any(code, &["int32_t", "float", "bool", "VehiclePropValue"]), 0.10),
        (code.len() > 300, 0.10),
    ])
}

pub fn security_policy(policy: &str) -> f64 {
    weighted(&[
        (policy.contains("type "), 0.20),
        (policy.contains("allow "), 0.25),
        (contains_any(policy, &["hal_vehicle", "vhal", "hal_attribute"]), 0.20),
        (contains_any(policy, &["binder_call", "hwservice_use", "add_hwservice"]), 0.20),
        (policy.lines().count() >= 5, 0.15),
    ])
}

pub fn build_descriptor(bp: &str) -> f64 {
    weighted(&[
        (
            contains_any(bp, &["aidl_interface", "cc_binary", "cc_library_shared", "cc_library"]),
            0.25,
        ),
        (bp.contains("name:"), 0.20),
        (bp.contains("srcs:"), 0.15),
        (bp.contains("vendor:"), 0.15),
        (all_brackets_balanced(bp), 0.15),
        (bp.len() > 80, 0.10),
    ])
}

pub fn service_manifest(manifest: &str) -> f64 {
    weighted(&[
        (manifest.contains("<hal"), 0.20),
        (manifest.contains("<name>"), 0.15),
        (manifest.contains("transport"), 0.15),
        (manifest.contains("version"), 0.10),
        (manifest.contains("service "), 0.15),
        (contains_any(manifest, &["class hal", "user "]), 0.10),
        (manifest.len() > 100, 0.15),
    ])
}

pub fn diagram(puml: &str) -> f64 {
    weighted(&[
        (puml.contains("@startuml"), 0.25),
        (puml.contains("@enduml"), 0.25),
        (contains_any(puml, &["->", "-->", "<--", "=>"]), 0.20),
        (contains_any(puml, &["component", "package", "node", "rectangle", "class"]), 0.15),
        (puml.lines().count() >= 8, 0.15),
    ])
}

pub fn ui_controller(code: &str) -> f64 {
    weighted(&[
        (contains_any(code, &["CarPropertyManager", "Car.createCar", "Car.CAR_"]), 0.25),
        (code.contains("Fragment"), 0.15),
        (contains_any(code, &["onViewCreated", "onCreateView", "onResume"]), 0.15),
        (
            contains_any(code, &["CarPropertyEventCallback", "onChangeEvent", "registerCallback"]),
            0.15,
        ),
        (code.contains("fun "), 0.10),
        (all_brackets_balanced(code), 0.10),
        (code.len() > 250, 0.10),
    ])
}

struct TagPatterns {
    open: Regex,
    close: Regex,
}

fn tag_patterns() -> &'static TagPatterns {
    static PATTERNS: OnceLock<TagPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| TagPatterns {
        open: Regex::new(r"<[A-Za-z]").expect("static regex"),
        close: Regex::new(r"</[A-Za-z]|/>").expect("static regex"),
    })
}

pub fn ui_layout(xml: &str) -> f64 {
    let p = tag_patterns();
    let open = p.open.find_iter(xml).count();
    let close = p.close.find_iter(xml).count();
    weighted(&[
        (
            contains_any(xml, &["LinearLayout", "ConstraintLayout", "RelativeLayout", "ScrollView"]),
            0.20,
        ),
        (xml.contains("android:id="), 0.20),
        (contains_any(xml, &["TextView", "Switch", "Button", "SeekBar", "CheckBox"]), 0.20),
        (open.abs_diff(close) <= 2, 0.20),
        (xml.len() > 150, 0.20),
    ])
}

pub fn rest_server(code: &str) -> f64 {
    weighted(&[
        (contains_any(code, &["FastAPI", "fastapi"]), 0.20),
        (code.contains("async def"), 0.15),
        (
            contains_any(code, &["@app.get", "@app.post", "@app.put", "@router.get", "@router.post"]),
            0.20,
        ),
        (contains_any(code, &["BaseModel", "pydantic"]), 0.10),
        (contains_any(code, &["/health", "/properties", "websocket"]), 0.15),
        (all_brackets_balanced(code), 0.10),
        (code.len() > 250, 0.10),
    ])
}

pub fn data_model(code: &str) -> f64 {
    weighted(&[
        (contains_any(code, &["BaseModel", "pydantic"]), 0.25),
        (code.contains("class "), 0.20),
        (contains_any(code, &["bool", "float", "int", "str", "Optional"]), 0.20),
        (contains_any(code, &["Field(", ": "]), 0.15),
        (code.len() > 80, 0.20),
    ])
}

pub fn simulator(code: &str) -> f64 {
    weighted(&[
        (code.contains("class "), 0.20),
        (code.contains("def "), 0.10),
        (contains_any(code, &["async def", "asyncio", "await"]), 0.20),
        (contains_any(code, &["random", "randint", "uniform", "choice"]), 0.20),
        (contains_any(code, &["start", "stop", "run"]), 0.15),
        (code.len() > 150, 0.15),
    ])
}

/// Half layout checklist, half section coverage.
pub fn design_document(doc: &str) -> f64 {
    let lower = doc.to_lowercase();
    let sections = SECTIONS.iter().filter(|s| lower.contains(*s)).count() as f64
        / SECTIONS.len() as f64;
    let layout = weighted(&[
        (doc.contains("## "), 0.20),
        (lower.contains("hal"), 0.10),
        (doc.contains('|'), 0.15),
        (doc.lines().count() >= 20, 0.20),
        (doc.len() >= 500, 0.15),
    ]);
    round_to(0.50 * layout + 0.50 * sections, 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_normalises() {
        assert_eq!(weighted(&[(true, 0.2), (false, 0.2)]), 0.5);
        assert_eq!(weighted(&[(true, 0.3), (true, 0.1)]), 1.0);
        assert_eq!(weighted(&[]), 0.0);
    }

    #[test]
    fn test_blank_content_scores_zero_for_every_type() {
        for ty in ArtifactType::ALL {
            assert_eq!(structural_score(ty, "  \n\t"), 0.0, "{ty}");
        }
    }

    #[test]
    fn test_policy_checklist() {
        let policy = "type vehiclehal, domain;\n\
                      type vehiclehal_exec, exec_type, vendor_file_type, file_type;\n\
                      hal_server_domain(vehiclehal, hal_vehicle)\n\
                      allow vehiclehal hal_vehicle_service:service_manager add;\n\
                      binder_call(vehiclehal, servicemanager)\n";
        assert_eq!(security_policy(policy), 1.0);
        assert_eq!(security_policy("allow a b:c d;"), 0.25);
    }

    #[test]
    fn test_layout_tag_balance() {
        let balanced = "<LinearLayout><TextView android:id=\"@+id/a\"/></LinearLayout>";
        let p = tag_patterns();
        assert_eq!(p.open.find_iter(balanced).count(), 2);
        assert_eq!(p.close.find_iter(balanced).count(), 2);
        assert!(ui_layout(balanced) >= 0.8);
    }

    #[test]
    fn test_design_document_mixes_sections() {
        let doc = "# Overview\n## Architecture\n";
        // layout: only "## " (0.20 of 0.80); sections: 2 of 6.
        let expected = round_to(0.5 * 0.25 + 0.5 * (2.0 / 6.0), 4);
        assert_eq!(design_document(doc), expected);
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        let junk = "{{{{ ((( <<<< @startuml class fun async def random";
        for ty in ArtifactType::ALL {
            let s = structural_score(ty, junk);
            assert!((0.0..=1.0).contains(&s), "{ty}: {s}");
        }
    }
}
