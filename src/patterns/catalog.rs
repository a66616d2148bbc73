//! Schema for the external pattern catalog document (§6).
//!
//! The catalog is a JSON or YAML document; unknown top-level and per-gate
//! fields are accepted and ignored with a warning rather than treated as a
//! hard parse failure, per §6: "Unknown fields are ignored with a warning."

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::config::{FileProcessingConfig, ScoringDefaults, TechnologyDetectionConfig};

/// Gate priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Highest priority; typically security gates.
    Critical,
    /// High priority.
    High,
    /// Medium priority.
    Medium,
    /// Low priority.
    Low,
}

/// A single pattern entry within a gate's per-language pattern list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternEntry {
    /// Regex source text.
    pub pattern: String,
    /// Weight this pattern contributes toward coverage credit.
    #[serde(default = "PatternEntry::default_weight")]
    pub weight: f64,
    /// Human-readable justification, surfaced in reports.
    #[serde(default)]
    pub rationale: String,
}

impl PatternEntry {
    /// Default weight applied to a pattern entry that omits one.
    pub const fn default_weight() -> f64 {
        1.0
    }
}

/// Expected coverage for a gate, used by the coverage-gate scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedCoverage {
    /// Expected coverage percentage, in [0, 100].
    #[serde(default = "ExpectedCoverage::default_percent")]
    pub percent: f64,
    /// Free-text justification for the expected percentage.
    #[serde(default)]
    pub reasoning: String,
    /// Confidence tag for this expectation.
    #[serde(default = "ExpectedCoverage::default_confidence")]
    pub confidence: String,
}

impl ExpectedCoverage {
    /// Default expected coverage percentage.
    pub const fn default_percent() -> f64 {
        10.0
    }
    /// Default confidence tag.
    pub fn default_confidence() -> String {
        "medium".to_string()
    }
}

impl Default for ExpectedCoverage {
    fn default() -> Self {
        Self {
            percent: Self::default_percent(),
            reasoning: String::new(),
            confidence: Self::default_confidence(),
        }
    }
}

/// Applicability rule for a gate (§4.5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicabilityRule {
    /// Technology categories that must all be present for the gate to apply.
    #[serde(default)]
    pub required_categories: Vec<String>,
    /// Technology categories that, if present, make the gate not applicable.
    #[serde(default)]
    pub excluded_categories: Vec<String>,
    /// Human-readable reason surfaced when the gate is not applicable.
    #[serde(default)]
    pub reason: String,
}

/// Per-gate scoring knob overrides. Any field left `None` falls back to
/// [`ScoringDefaults`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateScoringOverrides {
    /// See [`ScoringDefaults::base_score`].
    pub base_score: Option<f64>,
    /// See [`ScoringDefaults::violation_penalty`].
    pub violation_penalty: Option<f64>,
    /// See [`ScoringDefaults::max_penalty`].
    pub max_penalty: Option<f64>,
    /// See [`ScoringDefaults::bonus_for_clean`].
    pub bonus_for_clean: Option<f64>,
    /// See [`ScoringDefaults::bonus_threshold`].
    pub bonus_threshold: Option<f64>,
    /// See [`ScoringDefaults::bonus_multiplier`].
    pub bonus_multiplier: Option<f64>,
    /// See [`ScoringDefaults::penalty_threshold`].
    pub penalty_threshold: Option<f64>,
    /// See [`ScoringDefaults::penalty_multiplier`].
    pub penalty_multiplier: Option<f64>,
    /// Whether this gate should be scored with the security formula instead
    /// of the coverage formula.
    pub is_security_gate: Option<bool>,
}

impl GateScoringOverrides {
    /// Fold these overrides on top of a defaults baseline, producing a
    /// fully-resolved [`ScoringDefaults`] for one gate.
    pub fn resolve(&self, defaults: &ScoringDefaults) -> ScoringDefaults {
        ScoringDefaults {
            base_score: self.base_score.unwrap_or(defaults.base_score),
            violation_penalty: self.violation_penalty.unwrap_or(defaults.violation_penalty),
            max_penalty: self.max_penalty.unwrap_or(defaults.max_penalty),
            bonus_for_clean: self.bonus_for_clean.unwrap_or(defaults.bonus_for_clean),
            bonus_threshold: self.bonus_threshold.unwrap_or(defaults.bonus_threshold),
            bonus_multiplier: self.bonus_multiplier.unwrap_or(defaults.bonus_multiplier),
            penalty_threshold: self.penalty_threshold.unwrap_or(defaults.penalty_threshold),
            penalty_multiplier: self.penalty_multiplier.unwrap_or(defaults.penalty_multiplier),
            ..defaults.clone()
        }
    }
}

/// One gate's full definition, as loaded from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDefinition {
    /// Display name shown in reports.
    pub display_name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Category (e.g. "Logging", "Security", "Reliability").
    #[serde(default)]
    pub category: String,
    /// Priority tier.
    #[serde(default = "GateDefinition::default_priority")]
    pub priority: Priority,
    /// Weight used when folding this gate into the overall weighted score.
    #[serde(default = "GateDefinition::default_weight")]
    pub weight: f64,
    /// Per-language pattern lists, keyed by language/technology tag; the
    /// special key `"all_languages"` always contributes regardless of the
    /// repository's detected technologies.
    #[serde(default)]
    pub patterns: HashMap<String, Vec<PatternEntry>>,
    /// Scoring knob overrides for this gate.
    #[serde(default)]
    pub scoring: GateScoringOverrides,
    /// Expected coverage for coverage-mode gates.
    #[serde(default)]
    pub expected_coverage: ExpectedCoverage,
    /// Applicability rule.
    #[serde(default)]
    pub applicability: ApplicabilityRule,
    /// Names of collectors that must succeed for this gate to PASS.
    #[serde(default)]
    pub mandatory_evidence_collectors: Vec<String>,
}

impl GateDefinition {
    /// Default priority for a gate entry that omits one.
    pub const fn default_priority() -> Priority {
        Priority::Medium
    }
    /// Default weight for a gate entry that omits one.
    pub const fn default_weight() -> f64 {
        1.0
    }

    /// True if this gate should be scored with the security (fewer matches
    /// is better) formula rather than the coverage formula.
    pub fn is_security_gate(&self) -> bool {
        self.scoring.is_security_gate.unwrap_or(false)
    }
}

/// Catalog metadata block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogMetadata {
    /// Total number of gates declared, for a sanity cross-check on load.
    #[serde(default)]
    pub total_gates: Option<usize>,
    /// Total number of patterns declared, for a sanity cross-check on load.
    #[serde(default)]
    pub total_patterns: Option<usize>,
}

/// Status-classification thresholds (§4.6's "Status classification"),
/// duplicated here rather than folded into [`ScoringDefaults`] because the
/// catalog document models it as its own top-level `global` sub-block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDeterminationConfig {
    /// Minimum score for a non-security gate to PASS.
    #[serde(default = "StatusDeterminationConfig::default_pass_threshold")]
    pub pass_threshold: f64,
    /// Minimum score for a non-security gate to earn WARNING rather than FAIL.
    #[serde(default = "StatusDeterminationConfig::default_warning_threshold")]
    pub warning_threshold: f64,
    /// Below `warning_threshold`, a non-security gate FAILs; kept for
    /// documentation parity with the original config, not otherwise consulted.
    #[serde(default)]
    pub fail_threshold: f64,
    /// Minimum score for a security gate to PASS.
    #[serde(default = "StatusDeterminationConfig::default_security_pass_threshold")]
    pub security_pass_threshold: f64,
}

impl StatusDeterminationConfig {
    /// Default PASS threshold for non-security gates.
    pub const fn default_pass_threshold() -> f64 {
        80.0
    }
    /// Default WARNING threshold for non-security gates.
    pub const fn default_warning_threshold() -> f64 {
        60.0
    }
    /// Default PASS threshold for security gates.
    pub const fn default_security_pass_threshold() -> f64 {
        95.0
    }
}

impl Default for StatusDeterminationConfig {
    fn default() -> Self {
        Self {
            pass_threshold: Self::default_pass_threshold(),
            warning_threshold: Self::default_warning_threshold(),
            fail_threshold: 0.0,
            security_pass_threshold: Self::default_security_pass_threshold(),
        }
    }
}

/// Score-bucket thresholds used by report rendering to label a gate's score
/// as excellent/good/needs-attention, independent of PASS/WARNING/FAIL status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiThresholdsConfig {
    /// Minimum score labeled "excellent".
    #[serde(default = "UiThresholdsConfig::default_excellent_threshold")]
    pub excellent_threshold: f64,
    /// Minimum score labeled "good".
    #[serde(default = "UiThresholdsConfig::default_good_threshold")]
    pub good_threshold: f64,
    /// Label applied below `good_threshold`.
    #[serde(default = "UiThresholdsConfig::default_default_threshold")]
    pub default_threshold: f64,
}

impl UiThresholdsConfig {
    /// Default "excellent" score bucket floor.
    pub const fn default_excellent_threshold() -> f64 {
        90.0
    }
    /// Default "good" score bucket floor.
    pub const fn default_good_threshold() -> f64 {
        75.0
    }
    /// Default floor below which a gate gets no special label.
    pub const fn default_default_threshold() -> f64 {
        50.0
    }
}

impl Default for UiThresholdsConfig {
    fn default() -> Self {
        Self {
            excellent_threshold: Self::default_excellent_threshold(),
            good_threshold: Self::default_good_threshold(),
            default_threshold: Self::default_default_threshold(),
        }
    }
}

/// Global, catalog-wide configuration block (§6: `global.{scoring,
/// technology_detection, file_processing, status_determination, ui}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalCatalogConfig {
    /// Scoring defaults applied to every gate unless overridden.
    #[serde(default)]
    pub scoring: ScoringDefaults,
    /// Technology-detection thresholds as declared by the catalog document.
    /// `HardGatesConfig::technology_detection` remains the value actually
    /// consulted by the inventory stage; see DESIGN.md for why these two
    /// sources aren't yet unified.
    #[serde(default)]
    pub technology_detection: TechnologyDetectionConfig,
    /// File-processing thresholds as declared by the catalog document; same
    /// caveat as `technology_detection` above.
    #[serde(default)]
    pub file_processing: FileProcessingConfig,
    /// Status-classification thresholds (§4.6).
    #[serde(default)]
    pub status_determination: StatusDeterminationConfig,
    /// Report score-bucket labels.
    #[serde(default)]
    pub ui: UiThresholdsConfig,
}

/// Top-level pattern catalog document (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternCatalog {
    /// Catalog schema version.
    #[serde(default = "PatternCatalog::default_version")]
    pub version: String,
    /// Metadata block.
    #[serde(default)]
    pub metadata: CatalogMetadata,
    /// Global scoring/technology/status/UI configuration.
    #[serde(default)]
    pub global: GlobalCatalogConfig,
    /// Gate definitions, keyed by stable gate name.
    pub gates: HashMap<String, GateDefinition>,
}

impl PatternCatalog {
    /// Default catalog version for documents that omit one.
    pub fn default_version() -> String {
        "1.0".to_string()
    }
}
