//! Evidence collectors: pluggable sources of findings for a gate (§4.7).
//!
//! The static collector (pattern-based scanning) is always on and is driven
//! directly by [`super::engine`]; the other three are optional, disabled by
//! default, and exist so the engine's contract supports them without a
//! concrete external integration or LLM backend wired in. No collector
//! calls back into the engine (§7 REDESIGN FLAGS: one-way dependency).

use crate::core::model::{Confidence, Match, ValidationSource};
use crate::patterns::catalog::GateDefinition;

/// What a collector contributed to one gate's evaluation.
#[derive(Debug, Clone, Default)]
pub struct CollectorOutput {
    /// Matches this collector found, appended to the static collector's.
    pub matches: Vec<Match>,
    /// Recommendation text this collector proposes, if any.
    pub recommendation: Option<String>,
}

/// A pluggable source of evidence for a gate.
pub trait Collector: Send + Sync {
    /// Stable collector name, used as [`Match::source`] and in
    /// [`ValidationSource::collector`].
    fn name(&self) -> &'static str;

    /// Run this collector against `gate`, producing its contribution and a
    /// [`ValidationSource`] recording enablement/success/confidence.
    fn collect(&self, gate: &GateDefinition) -> (ValidationSource, CollectorOutput);
}

/// Always-on collector representing the pattern-based scan results already
/// computed by the scanner; recorded as a `ValidationSource` so it appears
/// alongside the optional collectors in the report.
pub struct StaticCollector;

impl Collector for StaticCollector {
    fn name(&self) -> &'static str {
        "static"
    }

    fn collect(&self, _gate: &GateDefinition) -> (ValidationSource, CollectorOutput) {
        (
            ValidationSource {
                collector: self.name().to_string(),
                enabled: true,
                succeeded: true,
                failure_cause: None,
                confidence: Confidence::High,
            },
            CollectorOutput::default(),
        )
    }
}

/// Queries an external system (registry, database) for a boolean per
/// required integration. Disabled unless a caller supplies a real
/// implementation via [`ExternalIntegrationCollector::with_check`].
pub struct ExternalIntegrationCollector {
    enabled: bool,
    check: Option<Box<dyn Fn(&str) -> bool + Send + Sync>>,
}

impl ExternalIntegrationCollector {
    /// A disabled collector: reports `enabled: false` and never blocks a gate.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            check: None,
        }
    }

    /// An enabled collector backed by `check`, called with the gate name.
    pub fn with_check(check: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            enabled: true,
            check: Some(Box::new(check)),
        }
    }
}

impl Collector for ExternalIntegrationCollector {
    fn name(&self) -> &'static str {
        "external_integration"
    }

    fn collect(&self, gate: &GateDefinition) -> (ValidationSource, CollectorOutput) {
        if !self.enabled {
            return (
                ValidationSource {
                    collector: self.name().to_string(),
                    enabled: false,
                    succeeded: false,
                    failure_cause: Some("no external integration configured".to_string()),
                    confidence: Confidence::Low,
                },
                CollectorOutput::default(),
            );
        }

        let Some(check) = &self.check else {
            unreachable!("enabled collector must carry a check");
        };
        let succeeded = check(gate.display_name.as_str());
        (
            ValidationSource {
                collector: self.name().to_string(),
                enabled: true,
                succeeded,
                failure_cause: (!succeeded).then(|| "external integration check failed".to_string()),
                confidence: Confidence::Medium,
            },
            CollectorOutput::default(),
        )
    }
}

/// Adds LLM-suggested patterns for this run. Disabled by default; this
/// implementation never calls out to a model, so it always reports
/// `enabled: false` unless a caller wires in an actual augmentation source.
pub struct LlmPatternAugmentationCollector {
    enabled: bool,
}

impl LlmPatternAugmentationCollector {
    /// A disabled collector.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }
}

impl Collector for LlmPatternAugmentationCollector {
    fn name(&self) -> &'static str {
        "llm_pattern_augmentation"
    }

    fn collect(&self, _gate: &GateDefinition) -> (ValidationSource, CollectorOutput) {
        (
            ValidationSource {
                collector: self.name().to_string(),
                enabled: self.enabled,
                succeeded: false,
                failure_cause: Some("no LLM augmentation backend configured".to_string()),
                confidence: Confidence::Low,
            },
            CollectorOutput::default(),
        )
    }
}

/// Produces recommendation text via an LLM. Disabled by default; the
/// Recommendation Formatter (§4.11/4.12) supplies the fallback text when
/// this collector doesn't contribute one.
pub struct LlmRecommendationCollector {
    enabled: bool,
}

impl LlmRecommendationCollector {
    /// A disabled collector.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }
}

impl Collector for LlmRecommendationCollector {
    fn name(&self) -> &'static str {
        "llm_recommendation"
    }

    fn collect(&self, _gate: &GateDefinition) -> (ValidationSource, CollectorOutput) {
        (
            ValidationSource {
                collector: self.name().to_string(),
                enabled: self.enabled,
                succeeded: false,
                failure_cause: Some("no LLM recommendation backend configured".to_string()),
                confidence: Confidence::Low,
            },
            CollectorOutput::default(),
        )
    }
}

/// Combine contributing collectors' confidence tags: the minimum, per §4.7.
pub fn combine_confidence(sources: &[ValidationSource]) -> Confidence {
    sources
        .iter()
        .filter(|s| s.enabled)
        .map(|s| s.confidence)
        .min()
        .unwrap_or(Confidence::Low)
}

/// True if any mandatory collector (named in `mandatory`) failed or was
/// disabled, which blocks the gate from reaching `PASS` regardless of score.
pub fn mandatory_collector_failed(sources: &[ValidationSource], mandatory: &[String]) -> bool {
    mandatory.iter().any(|name| {
        sources
            .iter()
            .find(|s| &s.collector == name)
            .map(|s| !s.enabled || !s.succeeded)
            .unwrap_or(true)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(collector: &str, enabled: bool, succeeded: bool, confidence: Confidence) -> ValidationSource {
        ValidationSource {
            collector: collector.to_string(),
            enabled,
            succeeded,
            failure_cause: None,
            confidence,
        }
    }

    #[test]
    fn static_collector_always_succeeds_with_high_confidence() {
        let gate = sample_gate();
        let (source, _) = StaticCollector.collect(&gate);
        assert!(source.enabled);
        assert!(source.succeeded);
        assert_eq!(source.confidence, Confidence::High);
    }

    #[test]
    fn disabled_external_integration_reports_disabled() {
        let gate = sample_gate();
        let (source, _) = ExternalIntegrationCollector::disabled().collect(&gate);
        assert!(!source.enabled);
    }

    #[test]
    fn enabled_external_integration_runs_the_check() {
        let gate = sample_gate();
        let collector = ExternalIntegrationCollector::with_check(|_| true);
        let (source, _) = collector.collect(&gate);
        assert!(source.enabled);
        assert!(source.succeeded);
    }

    #[test]
    fn combined_confidence_is_the_minimum_of_enabled_sources() {
        let sources = vec![
            source("static", true, true, Confidence::High),
            source("external_integration", true, true, Confidence::Medium),
            source("llm_pattern_augmentation", false, false, Confidence::Low),
        ];
        assert_eq!(combine_confidence(&sources), Confidence::Medium);
    }

    #[test]
    fn mandatory_failure_blocks_pass() {
        let sources = vec![source("external_integration", false, false, Confidence::Low)];
        assert!(mandatory_collector_failed(
            &sources,
            &["external_integration".to_string()]
        ));
    }

    #[test]
    fn no_mandatory_collectors_never_blocks() {
        let sources = vec![source("static", true, true, Confidence::High)];
        assert!(!mandatory_collector_failed(&sources, &[]));
    }

    fn sample_gate() -> GateDefinition {
        GateDefinition {
            display_name: "Structured Logs".to_string(),
            description: String::new(),
            category: "Logging".to_string(),
            priority: crate::patterns::catalog::Priority::Medium,
            weight: 1.0,
            patterns: Default::default(),
            scoring: Default::default(),
            expected_coverage: Default::default(),
            applicability: Default::default(),
            mandatory_evidence_collectors: Vec::new(),
        }
    }
}
