//! Applicability Analyzer: decides, once per scan, which gates apply to a
//! repository's detected technology mix (§4.5).

use crate::core::model::DetectedCategories;
use crate::patterns::catalog::ApplicabilityRule;

/// Outcome of evaluating one gate's applicability rule.
#[derive(Debug, Clone)]
pub enum Applicability {
    /// The gate applies; scanning should proceed.
    Applicable,
    /// The gate does not apply, with a human-readable reason.
    NotApplicable(String),
}

/// Evaluate `rule` against the repository's derived `categories`.
///
/// A gate is applicable iff every required category is present and no
/// excluded category is present.
pub fn evaluate(rule: &ApplicabilityRule, categories: &DetectedCategories) -> Applicability {
    for required in &rule.required_categories {
        if !category_present(categories, required) {
            return Applicability::NotApplicable(not_applicable_reason(rule, required, true));
        }
    }
    for excluded in &rule.excluded_categories {
        if category_present(categories, excluded) {
            return Applicability::NotApplicable(not_applicable_reason(rule, excluded, false));
        }
    }
    Applicability::Applicable
}

fn category_present(categories: &DetectedCategories, name: &str) -> bool {
    match name.to_lowercase().as_str() {
        "frontend" => categories.frontend,
        "backend" => categories.backend,
        "api" => categories.api,
        "mobile" => categories.mobile,
        _ => false,
    }
}

fn not_applicable_reason(rule: &ApplicabilityRule, category: &str, missing_required: bool) -> String {
    if !rule.reason.trim().is_empty() {
        return rule.reason.clone();
    }
    if missing_required {
        format!("repository does not exhibit the required '{category}' technology category")
    } else {
        format!("repository exhibits the excluded '{category}' technology category")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(frontend: bool, backend: bool, api: bool, mobile: bool) -> DetectedCategories {
        DetectedCategories {
            frontend,
            backend,
            api,
            mobile,
        }
    }

    #[test]
    fn gate_with_no_rule_is_always_applicable() {
        let rule = ApplicabilityRule::default();
        let categories = categories(false, false, false, false);
        assert!(matches!(evaluate(&rule, &categories), Applicability::Applicable));
    }

    #[test]
    fn required_category_missing_is_not_applicable() {
        let rule = ApplicabilityRule {
            required_categories: vec!["frontend".to_string()],
            ..Default::default()
        };
        let categories = categories(false, true, false, false);
        assert!(matches!(
            evaluate(&rule, &categories),
            Applicability::NotApplicable(_)
        ));
    }

    #[test]
    fn required_category_present_is_applicable() {
        let rule = ApplicabilityRule {
            required_categories: vec!["api".to_string()],
            ..Default::default()
        };
        let categories = categories(false, true, true, false);
        assert!(matches!(evaluate(&rule, &categories), Applicability::Applicable));
    }

    #[test]
    fn excluded_category_present_is_not_applicable() {
        let rule = ApplicabilityRule {
            excluded_categories: vec!["mobile".to_string()],
            ..Default::default()
        };
        let categories = categories(false, true, false, true);
        assert!(matches!(
            evaluate(&rule, &categories),
            Applicability::NotApplicable(_)
        ));
    }

    #[test]
    fn custom_reason_is_preserved() {
        let rule = ApplicabilityRule {
            required_categories: vec!["frontend".to_string()],
            reason: "only relevant to browser-facing UIs".to_string(),
            ..Default::default()
        };
        let categories = categories(false, true, false, false);
        match evaluate(&rule, &categories) {
            Applicability::NotApplicable(reason) => {
                assert_eq!(reason, "only relevant to browser-facing UIs")
            }
            _ => panic!("expected NotApplicable"),
        }
    }
}
