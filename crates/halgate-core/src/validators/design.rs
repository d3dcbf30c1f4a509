//! Markdown design documents.

use super::common::accepted;
use crate::domain::ValidatorResult;

pub const TOOL: &str = "markdown-structure";

/// Lower-cased section keywords; `propert` matches property/properties.
pub const SECTIONS: [&str; 6] = [
    "overview",
    "architecture",
    "propert",
    "security",
    "build",
    "data flow",
];

/// Documents shorter than this are treated as stubs.
pub const MIN_LENGTH: usize = 500;

/// Fewer recognised sections than this is reported as an error.
const MIN_SECTIONS: usize = 3;

pub fn sections_present(doc: &str) -> Vec<&'static str> {
    let lower = doc.to_lowercase();
    SECTIONS.iter().copied().filter(|s| lower.contains(s)).collect()
}

pub fn validate(doc: &str, accept_at: f64) -> ValidatorResult {
    let mut errors = Vec::new();
    let mut score = 0.0;

    if doc.contains("## ") || doc.contains("# ") {
        score += 0.30;
    } else {
        errors.push("No Markdown headings found".to_string());
    }

    let present = sections_present(doc);
    score += 0.10 * present.len() as f64;
    if present.len() < MIN_SECTIONS {
        let missing: Vec<&str> = SECTIONS
            .iter()
            .copied()
            .filter(|s| !present.contains(s))
            .collect();
        errors.push(format!(
            "Only {} of {} expected sections present (missing: {})",
            present.len(),
            SECTIONS.len(),
            missing.join(", ")
        ));
    }

    let length = doc.chars().count();
    if length >= MIN_LENGTH {
        score += 0.15;
    } else {
        errors.push(format!(
            "Document too short ({} chars, expected {}+)",
            length, MIN_LENGTH
        ));
    }

    if doc.contains('|') {
        score += 0.10;
    }

    let ok = accepted(score, accept_at, &errors);
    ValidatorResult::new(ok, score, errors, TOOL)
        .with_detail(format!("sections={}/{}", present.len(), SECTIONS.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_doc() -> String {
        let mut doc = String::from(
            "# Vehicle HAL Design\n\n## Overview\nSpeed and ADAS properties.\n\n\
             ## Architecture\nService, binder, car service.\n\n\
             ## Properties\n| Name | Type |\n|------|------|\n| SPEED | float |\n\n\
             ## Security\nSELinux domain vehiclehal.\n\n\
             ## Build\nSoong modules.\n\n## Data Flow\nSensor to app.\n",
        );
        while doc.len() < MIN_LENGTH {
            doc.push_str("Additional narrative about the module.\n");
        }
        doc
    }

    #[test]
    fn test_full_document() {
        let r = validate(&full_doc(), 0.75);
        assert!(r.ok, "{:?}", r.errors);
        assert_eq!(r.score, 1.0);
        assert_eq!(r.detail.as_deref(), Some("sections=6/6"));
    }

    #[test]
    fn test_short_document() {
        let r = validate("# Title\n\n## Overview\n## Architecture\n## Security\n", 0.75);
        assert!(!r.ok);
        assert!(r.errors[0].starts_with("Document too short"));
        assert_eq!(r.score, 0.6);
    }

    #[test]
    fn test_too_few_sections() {
        let r = validate("# Notes\n\nJust an overview.\n", 0.75);
        assert!(r.errors.iter().any(|e| e.starts_with("Only 1 of 6")));
    }
}
