//! Score blending: structural heuristic, validator syntax score and entity
//! coverage combined with fixed per-type weights.

pub mod structural;

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{clamp_unit, round_to, ArtifactType, ScoreBreakdown, ValidatorResult};
use crate::registry;

pub use structural::structural_score;

/// Weight triple for one artifact type; the three parts sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    pub structural: f64,
    pub syntax: f64,
    pub coverage: f64,
}

impl BlendWeights {
    pub const fn new(structural: f64, syntax: f64, coverage: f64) -> Self {
        Self {
            structural,
            syntax,
            coverage,
        }
    }

    /// The fixed weights registered for `ty`.
    pub fn for_type(ty: ArtifactType) -> Self {
        registry::entry(ty).weights
    }

    pub fn sum(&self) -> f64 {
        self.structural + self.syntax + self.coverage
    }

    /// Weighted sum of already-clamped components, rounded to 4 places.
    pub fn apply(&self, structural: f64, syntax: f64, coverage: f64) -> f64 {
        round_to(
            self.structural * structural + self.syntax * syntax + self.coverage * coverage,
            4,
        )
    }
}

/// Combine the three components for `ty`.
pub fn blend(
    ty: ArtifactType,
    structural: f64,
    validation: &ValidatorResult,
    coverage: f64,
) -> ScoreBreakdown {
    blend_scores(ty, structural, validation.score, coverage)
}

/// [`blend`] over a raw syntax score.
pub fn blend_scores(ty: ArtifactType, structural: f64, syntax: f64, coverage: f64) -> ScoreBreakdown {
    let (structural, syntax, coverage) =
        (clamp_unit(structural), clamp_unit(syntax), clamp_unit(coverage));
    let blended = BlendWeights::for_type(ty).apply(structural, syntax, coverage);
    ScoreBreakdown {
        structural,
        syntax,
        coverage,
        blended,
    }
}

/// Fraction of `expected` names found (case-insensitively) in `content`.
///
/// No list, or an empty one, means nothing to miss: 1.0.
pub fn coverage_score(content: &str, expected: Option<&[String]>) -> f64 {
    let names = match expected {
        Some(names) if !names.is_empty() => names,
        _ => return 1.0,
    };
    let haystack = content.to_lowercase();
    let covered = names
        .iter()
        .filter(|n| haystack.contains(&n.to_lowercase()))
        .count();
    round_to(covered as f64 / names.len() as f64, 4)
}

fn property_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Name:\s*\S+_(\w+)").expect("static regex"))
}

/// Short entity names from a property listing.
///
/// `Name: VEHICLE_ADAS_ABS_ISENABLED` yields `ISENABLED`.
pub fn entities_from_property_listing(text: &str) -> Vec<String> {
    property_name_pattern()
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_without_list_is_full() {
        assert_eq!(coverage_score("anything", None), 1.0);
        assert_eq!(coverage_score("anything", Some(&[] as &[String])), 1.0);
    }

    #[test]
    fn test_coverage_is_case_insensitive() {
        let names = vec!["IsEnabled".to_string(), "SPEED".to_string(), "gear".to_string()];
        let score = coverage_score("bool isenabled; float speed;", Some(names.as_slice()));
        assert_eq!(score, 0.6667);
    }

    #[test]
    fn test_entities_from_listing() {
        let listing = "- Name: VEHICLE_ADAS_ABS_ISENABLED\n  Type: boolean\n\
                       - Name: VEHICLE_SPEED_KMH\n";
        assert_eq!(
            entities_from_property_listing(listing),
            vec!["ISENABLED".to_string(), "KMH".to_string()]
        );
        assert!(entities_from_property_listing("no properties").is_empty());
    }

    #[test]
    fn test_blend_clamps_inputs() {
        let b = blend_scores(ArtifactType::SecurityPolicy, 1.7, -0.2, f64::NAN);
        assert_eq!(b.structural, 1.0);
        assert_eq!(b.syntax, 0.0);
        assert_eq!(b.coverage, 0.0);
        assert_eq!(b.blended, 0.25);
    }

    #[test]
    fn test_blend_uses_validator_score() {
        let v = ValidatorResult::pass("checkpolicy");
        let b = blend(ArtifactType::SecurityPolicy, 0.0, &v, 0.0);
        assert_eq!(b.blended, 0.65);
    }
}
