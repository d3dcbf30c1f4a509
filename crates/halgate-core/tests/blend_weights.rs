//! The blend formula holds exactly for every type's weight table.

use halgate_core::{
    blend, blend_scores, round_to, ArtifactType, BlendWeights, ValidatorResult,
};

/// Deterministic points spread over `[0, 1]`.
fn samples() -> Vec<f64> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    (0..40)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 10_001) as f64 / 10_000.0
        })
        .chain([0.0, 1.0, 0.5])
        .collect()
}

#[test]
fn weights_sum_to_one() {
    for ty in ArtifactType::ALL {
        let w = BlendWeights::for_type(ty);
        assert!((w.sum() - 1.0).abs() < 1e-9, "{ty}: {w:?}");
        assert!(w.structural > 0.0 && w.syntax > 0.0 && w.coverage > 0.0, "{ty}");
    }
}

#[test]
fn blended_matches_formula_exactly() {
    let points = samples();
    for ty in ArtifactType::ALL {
        let w = BlendWeights::for_type(ty);
        for (i, &s) in points.iter().enumerate() {
            let y = points[(i + 7) % points.len()];
            let c = points[(i + 19) % points.len()];
            let b = blend_scores(ty, s, y, c);
            let expected = round_to(w.structural * s + w.syntax * y + w.coverage * c, 4);
            assert_eq!(b.blended, expected, "{ty} ({s}, {y}, {c})");
            assert!((0.0..=1.0).contains(&b.blended));
        }
    }
}

#[test]
fn blend_reads_syntax_from_the_validator_result() {
    let result = ValidatorResult::fail(0.73, vec!["checkpolicy timed out after 60s".into()], "checkpolicy");
    let b = blend(ArtifactType::SecurityPolicy, 0.8, &result, 1.0);
    assert_eq!(b.syntax, 0.73);
    assert_eq!(b.blended, round_to(0.25 * 0.8 + 0.65 * 0.73 + 0.10 * 1.0, 4));
}

#[test]
fn out_of_range_inputs_are_clamped_before_blending() {
    let b = blend_scores(ArtifactType::DesignDocument, 1.4, -0.3, f64::NAN);
    assert_eq!((b.structural, b.syntax, b.coverage), (1.0, 0.0, 0.0));
    assert_eq!(b.blended, 0.5);
}

#[test]
fn high_fidelity_checks_dominate() {
    let policy = BlendWeights::for_type(ArtifactType::SecurityPolicy);
    assert_eq!(policy.syntax, 0.65);
    let controller = BlendWeights::for_type(ArtifactType::UiController);
    assert_eq!(controller.syntax, 0.40);
    for ty in ArtifactType::ALL {
        let w = BlendWeights::for_type(ty);
        assert!(w.coverage <= w.syntax.max(w.structural), "{ty}");
    }
}
