//! Per-artifact evaluation: validate, score structurally, measure coverage,
//! blend.

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::HalgateConfig;
use crate::domain::{ArtifactType, ScoreBreakdown, ValidatorResult};
use crate::registry::{ToolReport, ValidatorRegistry};
use crate::scoring::{blend, coverage_score, structural_score};

/// One artifact to evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactInput {
    pub artifact_type: ArtifactType,
    pub content: String,
    /// Entity names expected to appear; `None` means full coverage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Vec<String>>,
}

impl ArtifactInput {
    pub fn new(artifact_type: ArtifactType, content: impl Into<String>) -> Self {
        Self {
            artifact_type,
            content: content.into(),
            expected: None,
        }
    }

    pub fn with_expected(mut self, expected: Vec<String>) -> Self {
        self.expected = Some(expected);
        self
    }
}

/// Validator result plus the blended score breakdown for one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEvaluation {
    pub artifact_type: ArtifactType,
    pub validation: ValidatorResult,
    pub breakdown: ScoreBreakdown,
}

/// Runs the registry and the blender over artifacts.
#[derive(Debug, Clone)]
pub struct Evaluator {
    registry: ValidatorRegistry,
    concurrency: usize,
}

impl Evaluator {
    pub fn new(registry: ValidatorRegistry, concurrency: usize) -> Self {
        Self {
            registry,
            concurrency: concurrency.max(1),
        }
    }

    /// Evaluator over the real host, sized from `config`.
    pub fn from_config(config: &HalgateConfig) -> Self {
        Self::new(ValidatorRegistry::host(config), config.concurrency())
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Evaluate one artifact.
    pub async fn evaluate(
        &self,
        artifact_type: ArtifactType,
        content: &str,
        expected: Option<&[String]>,
    ) -> ArtifactEvaluation {
        let validation = self.registry.validate(artifact_type, content).await;
        let structural = structural_score(artifact_type, content);
        let coverage = coverage_score(content, expected);
        let breakdown = blend(artifact_type, structural, &validation, coverage);

        debug!(
            artifact_type = %artifact_type,
            tool = %validation.tool,
            ok = validation.ok,
            blended = breakdown.blended,
            "artifact evaluated"
        );

        ArtifactEvaluation {
            artifact_type,
            validation,
            breakdown,
        }
    }

    /// Evaluate many artifacts with bounded parallelism; output order
    /// follows input order.
    pub async fn evaluate_batch(&self, items: &[ArtifactInput]) -> Vec<ArtifactEvaluation> {
        let results: Vec<ArtifactEvaluation> = stream::iter(items.iter())
            .map(|item| self.evaluate(item.artifact_type, &item.content, item.expected.as_deref()))
            .buffered(self.concurrency)
            .collect()
            .await;

        let accepted = results.iter().filter(|r| r.validation.ok).count();
        info!(
            total = results.len(),
            accepted,
            concurrency = self.concurrency,
            "batch evaluated"
        );
        results
    }

    /// Blended score per artifact type.
    ///
    /// A type appearing more than once keeps its last score.
    pub async fn score_all(&self, items: &[ArtifactInput]) -> BTreeMap<ArtifactType, f64> {
        self.evaluate_batch(items)
            .await
            .into_iter()
            .map(|e| (e.artifact_type, e.breakdown.blended))
            .collect()
    }

    pub fn availability_report(&self) -> Vec<ToolReport> {
        self.registry.availability_report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AcceptanceThresholds;

    fn evaluator() -> Evaluator {
        Evaluator::new(
            ValidatorRegistry::fallback_only(AcceptanceThresholds::default()),
            2,
        )
    }

    const POLICY: &str = "type hal_vehicle_default, domain;\n\
                          allow hal_vehicle_default hal_vehicle_service:service_manager add;\n\
                          binder_call(hal_vehicle_default, servicemanager)\n";

    #[tokio::test]
    async fn test_evaluate_blends_components() {
        let eval = evaluator()
            .evaluate(ArtifactType::SecurityPolicy, POLICY, None)
            .await;
        let b = eval.breakdown;
        assert_eq!(b.coverage, 1.0);
        assert_eq!(b.syntax, eval.validation.score);
        let expected = crate::domain::round_to(0.25 * b.structural + 0.65 * b.syntax + 0.10, 4);
        assert_eq!(b.blended, expected);
    }

    #[tokio::test]
    async fn test_coverage_uses_expected_names() {
        let expected = vec!["hal_vehicle_default".to_string(), "GEAR_SELECTION".to_string()];
        let eval = evaluator()
            .evaluate(ArtifactType::SecurityPolicy, POLICY, Some(expected.as_slice()))
            .await;
        assert_eq!(eval.breakdown.coverage, 0.5);
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let items = vec![
            ArtifactInput::new(ArtifactType::DesignDocument, ""),
            ArtifactInput::new(ArtifactType::SecurityPolicy, POLICY),
            ArtifactInput::new(ArtifactType::DiagramSource, "A -> B"),
        ];
        let results = evaluator().evaluate_batch(&items).await;
        let types: Vec<_> = results.iter().map(|r| r.artifact_type).collect();
        assert_eq!(
            types,
            vec![
                ArtifactType::DesignDocument,
                ArtifactType::SecurityPolicy,
                ArtifactType::DiagramSource
            ]
        );
        assert_eq!(results[0].breakdown.blended, 0.1);
        assert_eq!(results[2].validation.score, 0.10);
    }

    #[tokio::test]
    async fn test_score_all_keys_by_type() {
        let items = vec![
            ArtifactInput::new(ArtifactType::SecurityPolicy, POLICY),
            ArtifactInput::new(ArtifactType::UiLayout, "").with_expected(vec!["x".into()]),
        ];
        let scores = evaluator().score_all(&items).await;
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[&ArtifactType::UiLayout], 0.0);
        assert!(scores[&ArtifactType::SecurityPolicy] > 0.7);
    }

    #[test]
    fn test_concurrency_is_at_least_one() {
        let e = Evaluator::new(
            ValidatorRegistry::fallback_only(AcceptanceThresholds::default()),
            0,
        );
        assert_eq!(e.concurrency(), 1);
    }
}
