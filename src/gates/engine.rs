//! Gate Engine: orchestrates applicability, the shared file scan, scoring,
//! and recommendation formatting into one [`GateResult`] per catalog gate
//! (§4.7).
//!
//! One-way dependency, per the REDESIGN FLAGS resolution: the engine
//! depends on the pattern library and the collectors; neither depends back
//! on the engine.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use tracing::instrument;

use crate::core::config::HardGatesConfig;
use crate::core::errors::Result;
use crate::core::model::{GateCounts, GateResult, GateStatus, Match};
use crate::core::pipeline::context::StopSignal;
use crate::gates::applicability::{self, Applicability};
use crate::gates::collectors::{
    self, Collector, ExternalIntegrationCollector, LlmPatternAugmentationCollector,
    LlmRecommendationCollector, StaticCollector,
};
use crate::gates::recommendation::format_recommendation;
use crate::gates::scorer::{self, ScoringInput};
use crate::inventory::Inventory;
use crate::patterns::{PatternLibrary, ResolvedPattern};
use crate::scanner;

/// Evaluates every gate in the catalog against one repository inventory.
pub struct GateEngine {
    library: Arc<PatternLibrary>,
}

impl GateEngine {
    /// Build an engine over a shared pattern library.
    pub fn new(library: Arc<PatternLibrary>) -> Self {
        Self { library }
    }

    /// Evaluate every gate in catalog order, split into applicable and
    /// non-applicable results.
    ///
    /// The file scan itself runs exactly once across every applicable
    /// gate's pooled, deduplicated patterns (§4.4, §4.7 step 3): every
    /// file is opened and resident at most once, and the resulting matches
    /// are partitioned back out per gate by which gate's pattern set
    /// produced each match.
    #[instrument(skip(self, root, inventory, config, stop))]
    pub fn evaluate_all(
        &self,
        root: &Path,
        inventory: &Inventory,
        config: &HardGatesConfig,
        stop: &StopSignal,
    ) -> Result<(Vec<GateResult>, Vec<GateResult>)> {
        let mut gate_names = self.library.gate_names();
        gate_names.sort();

        let mut applicable_defs: Vec<(String, Vec<ResolvedPattern>)> = Vec::new();
        let mut non_applicable = Vec::new();

        for name in gate_names {
            if stop.should_stop() {
                break;
            }
            let Some(gate_def) = self.library.gate(&name) else {
                continue;
            };

            match applicability::evaluate(&gate_def.applicability, &inventory.metadata.detected_categories)
            {
                Applicability::NotApplicable(reason) => {
                    non_applicable.push(GateResult {
                        gate_name: name.clone(),
                        display_name: gate_def.display_name.clone(),
                        category: gate_def.category.clone(),
                        priority: format!("{:?}", gate_def.priority).to_lowercase(),
                        status: GateStatus::NotApplicable,
                        score: 0.0,
                        weight: gate_def.weight,
                        matches: Vec::new(),
                        counts: GateCounts::default(),
                        validation_sources: Vec::new(),
                        recommendation: format_recommendation(
                            "",
                            &gate_def.category,
                            GateStatus::NotApplicable,
                            gate_def.is_security_gate(),
                            config.recommendation_max_chars,
                        ),
                        not_applicable_reason: reason,
                        partial: false,
                    });
                }
                Applicability::Applicable => {
                    let patterns =
                        self.library.patterns_for(&name, &inventory.metadata.primary_technologies)?;
                    applicable_defs.push((name, patterns));
                }
            }
        }

        let mut pooled: Vec<ResolvedPattern> = Vec::new();
        let mut pooled_sources: HashSet<String> = HashSet::new();
        for (_, patterns) in &applicable_defs {
            for p in patterns {
                if pooled_sources.insert(p.compiled.source.clone()) {
                    pooled.push(p.clone());
                }
            }
        }

        let all_matches = scanner::scan_files(root, &inventory.files, &pooled, &config.file_processing, stop);
        let matches_by_gate = partition_matches_by_gate(&applicable_defs, all_matches);

        let mut applicable = Vec::new();
        for (name, patterns) in applicable_defs {
            let matches = matches_by_gate.get(&name).cloned().unwrap_or_default();
            let result = self.evaluate_one(&name, matches, patterns, inventory, config, stop)?;
            applicable.push(result);
        }

        Ok((applicable, non_applicable))
    }

    fn evaluate_one(
        &self,
        name: &str,
        mut matches: Vec<Match>,
        patterns: Vec<ResolvedPattern>,
        inventory: &Inventory,
        config: &HardGatesConfig,
        stop: &StopSignal,
    ) -> Result<GateResult> {
        let gate_def = self
            .library
            .gate(name)
            .expect("gate name came from the same library's gate_names()");

        let relevant_files = inventory
            .files
            .iter()
            .filter(|f| !f.is_binary && f.language.is_some())
            .count();

        matches.sort_by(|a, b| a.file_path.cmp(&b.file_path).then(a.line_number.cmp(&b.line_number)));

        let static_collector = StaticCollector;
        let external_collector = ExternalIntegrationCollector::disabled();
        let llm_pattern_collector = LlmPatternAugmentationCollector::disabled();
        let llm_recommendation_collector = LlmRecommendationCollector::disabled();

        let (static_source, _) = static_collector.collect(gate_def);
        let (external_source, external_output) = external_collector.collect(gate_def);
        let (llm_pattern_source, llm_pattern_output) = llm_pattern_collector.collect(gate_def);
        let (llm_recommendation_source, llm_recommendation_output) =
            llm_recommendation_collector.collect(gate_def);

        matches.extend(external_output.matches);
        matches.extend(llm_pattern_output.matches);
        matches.sort_by(|a, b| a.file_path.cmp(&b.file_path).then(a.line_number.cmp(&b.line_number)));

        let validation_sources = vec![
            static_source,
            external_source,
            llm_pattern_source,
            llm_recommendation_source,
        ];

        let files_with_matches = {
            let mut paths: Vec<&Path> = matches.iter().map(|m| m.file_path.as_path()).collect();
            paths.sort();
            paths.dedup();
            paths.len()
        };

        let knobs = gate_def
            .scoring
            .resolve(&self.library.global_config().scoring);

        let is_security = gate_def.is_security_gate();
        let outcome = if is_security {
            scorer::score_security_gate(matches.len(), &knobs)
        } else {
            let input = ScoringInput {
                matches: &matches,
                patterns: &patterns,
                relevant_files,
            };
            scorer::score_coverage_gate(&input, gate_def.expected_coverage.percent, &knobs)
        };

        let mut status = scorer::classify_status(outcome.score, is_security, &knobs);
        if status == GateStatus::Pass
            && collectors::mandatory_collector_failed(
                &validation_sources,
                &gate_def.mandatory_evidence_collectors,
            )
        {
            status = GateStatus::Fail;
        }

        let recommendation = llm_recommendation_output.recommendation.unwrap_or_else(|| {
            format_recommendation(
                &gate_def.description,
                &gate_def.category,
                status,
                is_security,
                config.recommendation_max_chars,
            )
        });

        let matches_found = matches.len();
        let report_cap = config.file_processing.max_matches_per_file;
        matches.truncate(report_cap);

        Ok(GateResult {
            gate_name: name.to_string(),
            display_name: gate_def.display_name.clone(),
            category: gate_def.category.clone(),
            priority: format!("{:?}", gate_def.priority).to_lowercase(),
            status,
            score: outcome.score,
            weight: gate_def.weight,
            matches,
            counts: GateCounts {
                patterns_used: patterns.len(),
                matches_found,
                relevant_files,
                files_with_matches,
            },
            validation_sources,
            recommendation,
            not_applicable_reason: String::new(),
            partial: stop.should_stop(),
        })
    }
}

/// Split one pooled scan's matches back out per gate, by which gate's
/// resolved pattern set contains the match's originating pattern source.
/// A pattern shared verbatim by two gates attributes a match to both, same
/// as if each gate had scanned independently.
fn partition_matches_by_gate(
    applicable_defs: &[(String, Vec<ResolvedPattern>)],
    all_matches: Vec<Match>,
) -> HashMap<String, Vec<Match>> {
    let sources_by_gate: Vec<(&str, HashSet<&str>)> = applicable_defs
        .iter()
        .map(|(name, patterns)| {
            (
                name.as_str(),
                patterns.iter().map(|p| p.compiled.source.as_str()).collect(),
            )
        })
        .collect();

    let mut out: HashMap<String, Vec<Match>> = HashMap::new();
    for m in all_matches {
        for (name, sources) in &sources_by_gate {
            if sources.contains(m.pattern.as_str()) {
                out.entry(name.to_string()).or_default().push(m.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TechnologyDetectionConfig;
    use crate::core::pipeline::context::{Deadline, StopSignal};
    use crate::patterns::cache::PatternCache;
    use std::fs;
    use std::time::Duration;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn evaluates_default_catalog_against_a_small_python_repo() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "src/app.py",
            "import logging\nlogger = logging.getLogger(__name__)\nlogger.info('started')\n",
        );
        write(dir.path(), "tests/test_app.py", "def test_ok(): pass\n");

        let inventory = crate::inventory::build_inventory(
            dir.path(),
            1000,
            &TechnologyDetectionConfig::default(),
        )
        .unwrap();

        let cache = Arc::new(PatternCache::new(Default::default()));
        let library = Arc::new(PatternLibrary::load_default(cache).unwrap());
        let engine = GateEngine::new(library);
        let config = HardGatesConfig::default();
        let stop = StopSignal::new(Deadline::after(Duration::from_secs(60)));

        let (applicable, non_applicable) = engine
            .evaluate_all(dir.path(), &inventory, &config, &stop)
            .unwrap();

        assert!(!applicable.is_empty());
        assert!(applicable.iter().any(|g| g.gate_name == "STRUCTURED_LOGS"));
        let frontend_only_gates: Vec<_> = non_applicable
            .iter()
            .filter(|g| g.gate_name == "UI_ERRORS")
            .collect();
        assert_eq!(frontend_only_gates.len(), 1);
        assert_eq!(frontend_only_gates[0].status, GateStatus::NotApplicable);
    }

    #[test]
    fn security_gate_with_secrets_fails() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "src/app.py",
            "logger.info(f\"password={user_password}\")\n",
        );

        let inventory = crate::inventory::build_inventory(
            dir.path(),
            1000,
            &TechnologyDetectionConfig::default(),
        )
        .unwrap();

        let cache = Arc::new(PatternCache::new(Default::default()));
        let library = Arc::new(PatternLibrary::load_default(cache).unwrap());
        let engine = GateEngine::new(library);
        let config = HardGatesConfig::default();
        let stop = StopSignal::new(Deadline::after(Duration::from_secs(60)));

        let (applicable, _) = engine
            .evaluate_all(dir.path(), &inventory, &config, &stop)
            .unwrap();

        let secrets_gate = applicable
            .iter()
            .find(|g| g.gate_name == "AVOID_LOGGING_SECRETS")
            .expect("AVOID_LOGGING_SECRETS should be applicable");
        assert_eq!(secrets_gate.status, GateStatus::Fail);
    }
}
