//! Value types produced by a single validation call.

use serde::{Deserialize, Serialize};

/// Error text every validator reports for blank input.
pub const EMPTY_OUTPUT: &str = "empty output";

/// Round `value` to `places` decimal digits.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Clamp into `[0, 1]`, mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Outcome of validating one artifact.
///
/// Built fresh on every call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorResult {
    /// Whether the artifact passed validation.
    pub ok: bool,
    /// Partial credit in `[0, 1]`.
    pub score: f64,
    /// Human-readable error lines, in discovery order.
    pub errors: Vec<String>,
    /// Which backend actually ran (native tool or fallback label).
    pub tool: String,
    /// Free-form summary of what was checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ValidatorResult {
    /// Build a result; the score is clamped and rounded to 3 decimals.
    pub fn new(ok: bool, score: f64, errors: Vec<String>, tool: impl Into<String>) -> Self {
        Self {
            ok,
            score: round_to(clamp_unit(score), 3),
            errors,
            tool: tool.into(),
            detail: None,
        }
    }

    /// A clean pass with full credit.
    pub fn pass(tool: impl Into<String>) -> Self {
        Self::new(true, 1.0, Vec::new(), tool)
    }

    /// A failure with the given partial credit and errors.
    pub fn fail(score: f64, errors: Vec<String>, tool: impl Into<String>) -> Self {
        Self::new(false, score, errors, tool)
    }

    /// The canonical result for blank input.
    pub fn empty(tool: impl Into<String>) -> Self {
        Self::new(false, 0.0, vec![EMPTY_OUTPUT.to_string()], tool)
    }

    /// Attach a detail string.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Per-artifact score components and their fixed-weight blend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub structural: f64,
    pub syntax: f64,
    pub coverage: f64,
    pub blended: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_score() {
        assert_eq!(ValidatorResult::new(true, 1.7, vec![], "t").score, 1.0);
        assert_eq!(ValidatorResult::new(false, -0.2, vec![], "t").score, 0.0);
        assert_eq!(ValidatorResult::new(false, f64::NAN, vec![], "t").score, 0.0);
    }

    #[test]
    fn test_new_rounds_to_three_places() {
        let r = ValidatorResult::fail(0.123456, vec!["x".into()], "t");
        assert_eq!(r.score, 0.123);
    }

    #[test]
    fn test_empty_result_shape() {
        let r = ValidatorResult::empty("aidl-grammar-parser");
        assert!(!r.ok);
        assert_eq!(r.score, 0.0);
        assert_eq!(r.errors, vec![EMPTY_OUTPUT.to_string()]);
        assert_eq!(r.tool, "aidl-grammar-parser");
    }

    #[test]
    fn test_detail_skipped_when_absent() {
        let json = serde_json::to_value(ValidatorResult::pass("clang++")).unwrap();
        assert!(json.get("detail").is_none());
        let json = serde_json::to_value(ValidatorResult::pass("clang++").with_detail("d")).unwrap();
        assert_eq!(json["detail"], "d");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.12346, 4), 0.1235);
        assert_eq!(round_to(0.5, 0), 1.0);
    }
}
