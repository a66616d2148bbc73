//! Scoring formulas: security gates penalize violations, coverage gates
//! reward presence of desired patterns (§4.6).

use std::collections::HashMap;
use std::path::Path;

use crate::core::config::ScoringDefaults;
use crate::core::model::{GateStatus, Match};
use crate::patterns::ResolvedPattern;

/// Inputs the scorer needs beyond the matches themselves: the full
/// resolved pattern set for the gate (not just the ones that matched), so
/// coverage can be measured against every pattern weight, not only hits.
pub struct ScoringInput<'a> {
    /// Matches found for this gate across the whole repository.
    pub matches: &'a [Match],
    /// The gate's full resolved pattern set.
    pub patterns: &'a [ResolvedPattern],
    /// Number of files the gate's patterns applied to (its language mix).
    pub relevant_files: usize,
}

/// A scored gate result, before status classification is attached.
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    /// Final score, clamped to `[0, 100]`.
    pub score: f64,
    /// Raw coverage ratio (coverage gates only; `0.0` for security gates).
    pub raw_coverage: f64,
}

/// Score a security gate: fewer matches is better, bonus for zero.
pub fn score_security_gate(violation_count: usize, knobs: &ScoringDefaults) -> ScoreOutcome {
    let penalty = (violation_count as f64 * knobs.violation_penalty).min(knobs.max_penalty);
    let score = if violation_count == 0 {
        (knobs.base_score + knobs.bonus_for_clean).min(100.0)
    } else {
        (knobs.base_score - penalty).max(0.0)
    };
    ScoreOutcome {
        score: score.clamp(0.0, 100.0),
        raw_coverage: 0.0,
    }
}

/// Score a coverage gate: presence of desired patterns across files, scaled
/// against an expected coverage target.
pub fn score_coverage_gate(
    input: &ScoringInput,
    expected_percent: f64,
    knobs: &ScoringDefaults,
) -> ScoreOutcome {
    let total_weight: f64 = input.patterns.iter().map(|p| p.compiled.weight).sum();

    let raw_coverage = if total_weight <= 0.0 {
        0.0
    } else {
        let credit_by_file = file_credits(input.matches, input.patterns);
        let sum_credits: f64 = credit_by_file.values().sum();
        sum_credits / total_weight
    };

    let mut base_percent = raw_coverage * 100.0;

    let expected_ratio = (expected_percent / 100.0).max(f64::EPSILON);
    if raw_coverage > expected_ratio {
        let excess = raw_coverage - expected_ratio;
        let excess_ratio = (excess / expected_ratio).min(knobs.excess_ratio_cap);
        base_percent += excess_ratio * knobs.excess_bonus_scale;
    }

    let unit = base_percent / 100.0;
    if unit >= knobs.bonus_threshold {
        base_percent *= knobs.bonus_multiplier;
    } else if unit <= knobs.penalty_threshold {
        base_percent *= knobs.penalty_multiplier;
    }

    ScoreOutcome {
        score: base_percent.clamp(0.0, 100.0),
        raw_coverage,
    }
}

/// For each file with at least one match, credit the maximum per-pattern
/// weight observed among the patterns that matched in that file.
fn file_credits<'a>(
    matches: &'a [Match],
    patterns: &[ResolvedPattern],
) -> HashMap<&'a Path, f64> {
    let weight_by_source: HashMap<&str, f64> = patterns
        .iter()
        .map(|p| (p.compiled.source.as_str(), p.compiled.weight))
        .collect();

    let mut credits: HashMap<&Path, f64> = HashMap::new();
    for m in matches {
        let weight = weight_by_source.get(m.pattern.as_str()).copied().unwrap_or(0.0);
        let entry = credits.entry(m.file_path.as_path()).or_insert(0.0);
        if weight > *entry {
            *entry = weight;
        }
    }
    credits
}

/// Classify a score into a status, per §4.6's threshold table.
pub fn classify_status(score: f64, is_security_gate: bool, knobs: &ScoringDefaults) -> GateStatus {
    if is_security_gate {
        if score >= knobs.security_pass_threshold {
            GateStatus::Pass
        } else {
            GateStatus::Fail
        }
    } else if score >= knobs.pass_threshold {
        GateStatus::Pass
    } else if score >= knobs.warning_threshold {
        GateStatus::Warning
    } else {
        GateStatus::Fail
    }
}

/// Weight-normalized mean of applicable gates' scores (§4.6). Gates with
/// zero total weight contribute nothing to either sum.
pub fn overall_weighted_score(applicable: &[(f64, f64)]) -> f64 {
    let weight_sum: f64 = applicable.iter().map(|(_, w)| w).sum();
    if weight_sum <= 0.0 {
        return 0.0;
    }
    let score_sum: f64 = applicable.iter().map(|(s, w)| s * w).sum();
    score_sum / weight_sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::cache::{CompileFlags, CompiledPattern, PatternCache};
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn pattern(source: &str, weight: f64) -> ResolvedPattern {
        let cache = PatternCache::new(Default::default());
        let regex = cache.get_or_compile(source, CompileFlags::default()).unwrap();
        ResolvedPattern {
            compiled: CompiledPattern {
                source: source.to_string(),
                regex,
                weight,
            },
            rationale: String::new(),
        }
    }

    fn one_match(path: &str, pattern_source: &str) -> Match {
        Match {
            file_path: PathBuf::from(path),
            line_number: 1,
            pattern: pattern_source.to_string(),
            matched_text: "x".to_string(),
            source: "static".to_string(),
            context_line: "x".to_string(),
        }
    }

    #[test]
    fn clean_security_gate_gets_the_bonus() {
        let outcome = score_security_gate(0, &ScoringDefaults::default());
        assert_eq!(outcome.score, 100.0);
    }

    #[test]
    fn security_gate_penalizes_each_violation() {
        let outcome = score_security_gate(3, &ScoringDefaults::default());
        assert_eq!(outcome.score, 40.0);
    }

    #[test]
    fn security_gate_penalty_is_capped() {
        let outcome = score_security_gate(100, &ScoringDefaults::default());
        assert_eq!(outcome.score, 0.0);
    }

    #[test]
    fn coverage_gate_with_no_matches_scores_zero() {
        let patterns = vec![pattern("a", 1.0)];
        let input = ScoringInput {
            matches: &[],
            patterns: &patterns,
            relevant_files: 10,
        };
        let outcome = score_coverage_gate(&input, 10.0, &ScoringDefaults::default());
        assert_eq!(outcome.score, 0.0);
    }

    #[test]
    fn coverage_gate_rewards_high_coverage_with_a_bonus() {
        let patterns = vec![pattern("logger", 1.0)];
        let matches: Vec<Match> = (0..8).map(|i| one_match(&format!("f{i}.py"), "logger")).collect();
        let input = ScoringInput {
            matches: &matches,
            patterns: &patterns,
            relevant_files: 10,
        };
        let outcome = score_coverage_gate(&input, 10.0, &ScoringDefaults::default());
        assert!(outcome.raw_coverage > 0.5);
        assert!(outcome.score > 80.0);
    }

    #[test]
    fn status_classification_follows_thresholds() {
        let knobs = ScoringDefaults::default();
        assert_eq!(classify_status(90.0, false, &knobs), GateStatus::Pass);
        assert_eq!(classify_status(70.0, false, &knobs), GateStatus::Warning);
        assert_eq!(classify_status(10.0, false, &knobs), GateStatus::Fail);
        assert_eq!(classify_status(96.0, true, &knobs), GateStatus::Pass);
        assert_eq!(classify_status(80.0, true, &knobs), GateStatus::Fail);
    }

    #[test]
    fn overall_score_ignores_zero_weight_total() {
        assert_eq!(overall_weighted_score(&[]), 0.0);
    }

    #[test]
    fn overall_score_is_weight_normalized() {
        let score = overall_weighted_score(&[(100.0, 1.0), (0.0, 1.0)]);
        assert_eq!(score, 50.0);
    }

    proptest! {
        #[test]
        fn security_score_always_in_range(violations in 0usize..10_000) {
            let outcome = score_security_gate(violations, &ScoringDefaults::default());
            prop_assert!((0.0..=100.0).contains(&outcome.score));
        }

        #[test]
        fn security_score_is_monotonically_non_increasing(a in 0usize..500, b in 0usize..500) {
            let knobs = ScoringDefaults::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let score_lo = score_security_gate(lo, &knobs).score;
            let score_hi = score_security_gate(hi, &knobs).score;
            prop_assert!(score_lo >= score_hi);
        }

        #[test]
        fn coverage_score_always_in_range(expected in 1.0f64..100.0, weight in 0.1f64..50.0, hits in 0usize..20) {
            let patterns = vec![pattern("p", weight)];
            let matches: Vec<Match> = (0..hits).map(|i| one_match(&format!("f{i}.py"), "p")).collect();
            let input = ScoringInput { matches: &matches, patterns: &patterns, relevant_files: 20 };
            let outcome = score_coverage_gate(&input, expected, &ScoringDefaults::default());
            prop_assert!((0.0..=100.0).contains(&outcome.score));
            prop_assert!(outcome.raw_coverage >= 0.0);
        }

        #[test]
        fn overall_score_stays_within_component_bounds(scores in proptest::collection::vec(0.0f64..100.0, 1..10)) {
            let pairs: Vec<(f64, f64)> = scores.iter().map(|&s| (s, 1.0)).collect();
            let result = overall_weighted_score(&pairs);
            let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(result >= min - 1e-9 && result <= max + 1e-9);
        }
    }
}
