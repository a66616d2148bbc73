//! Pattern library: loads the external catalog and resolves per-gate,
//! per-technology pattern lists deterministically (§4.2).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::warn;

use crate::core::errors::{HardGatesError, Result};
use crate::patterns::cache::{CompileFlags, CompiledPattern, PatternCache};
use crate::patterns::catalog::{GateDefinition, PatternCatalog};

/// Bundled default catalog, used when no external catalog path is configured.
pub const DEFAULT_CATALOG_YAML: &str = include_str!("../../config/gate_definitions.yml");

/// Technology alias table: canonical technology name -> recognized variations.
/// Grounded verbatim in the original `pattern_loader.py`'s `tech_mapping`.
static TECHNOLOGY_ALIASES: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    HashMap::from([
        ("java", ["java", "spring", "kotlin", "scala"].as_slice()),
        (
            "python",
            ["python", "django", "flask", "fastapi"].as_slice(),
        ),
        (
            "javascript",
            [
                "javascript",
                "js",
                "node",
                "nodejs",
                "react",
                "angular",
                "vue",
            ]
            .as_slice(),
        ),
        (
            "typescript",
            ["typescript", "ts", "angular", "nest", "nestjs"].as_slice(),
        ),
        (
            "csharp",
            ["csharp", "c#", "dotnet", ".net", "aspnet"].as_slice(),
        ),
        ("go", ["go", "golang"].as_slice()),
        ("rust", ["rust"].as_slice()),
        ("php", ["php", "laravel", "symfony"].as_slice()),
        ("ruby", ["ruby", "rails"].as_slice()),
        ("swift", ["swift", "ios"].as_slice()),
        ("kotlin", ["kotlin", "android"].as_slice()),
    ])
});

/// The special pattern-list key that always contributes, regardless of the
/// repository's detected technologies.
pub const ALL_LANGUAGES_KEY: &str = "all_languages";

/// Resolve a repository's detected language/technology names into the
/// catalog's canonical technology keys, following the alias table above.
pub fn resolve_technology_keys(technologies: &[String]) -> Vec<String> {
    let normalized: Vec<String> = technologies.iter().map(|t| t.to_lowercase()).collect();
    let mut matched: Vec<String> = Vec::new();

    for tech in &normalized {
        for (canonical, variations) in TECHNOLOGY_ALIASES.iter() {
            let is_match = variations.contains(&tech.as_str())
                || variations.iter().any(|v| tech.contains(v));
            if is_match && !matched.iter().any(|m| m == canonical) {
                matched.push((*canonical).to_string());
            }
        }
    }
    matched
}

/// A pattern resolved for use in one scan: compiled matcher plus metadata
/// needed by the scorer.
#[derive(Debug, Clone)]
pub struct ResolvedPattern {
    /// Compiled regex and its declared weight.
    pub compiled: CompiledPattern,
    /// Rationale text, surfaced in reports.
    pub rationale: String,
}

/// Loads and validates the external pattern catalog; exposes deterministic
/// lookups used by the gate engine.
pub struct PatternLibrary {
    catalog: PatternCatalog,
    cache: Arc<PatternCache>,
}

impl PatternLibrary {
    /// Load the bundled default catalog.
    pub fn load_default(cache: Arc<PatternCache>) -> Result<Self> {
        let catalog = Self::parse_and_validate(DEFAULT_CATALOG_YAML)?;
        Ok(Self { catalog, cache })
    }

    /// Load a catalog document from an external path (JSON or YAML,
    /// selected by extension).
    pub fn load_from_path(path: impl AsRef<Path>, cache: Arc<PatternCache>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HardGatesError::pattern_library_load(format!("reading {}: {e}", path.display()))
        })?;

        let catalog = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str::<PatternCatalog>(&content)
                .map_err(|e| HardGatesError::pattern_library_load(e.to_string()))?
        } else {
            Self::parse_and_validate(&content)?
        };

        Ok(Self { catalog, cache })
    }

    /// Reload the catalog from the same external path, if one was given, or
    /// re-parse the bundled default otherwise.
    pub fn reload(&mut self, path: Option<&Path>) -> Result<()> {
        let replacement = match path {
            Some(p) => Self::load_from_path(p, self.cache.clone())?,
            None => Self::load_default(self.cache.clone())?,
        };
        self.catalog = replacement.catalog;
        Ok(())
    }

    fn parse_and_validate(content: &str) -> Result<PatternCatalog> {
        let catalog: PatternCatalog = serde_yaml::from_str(content)?;
        for (name, gate) in &catalog.gates {
            if gate.display_name.trim().is_empty() {
                warn!(gate = %name, "gate is missing a display_name; using the gate name as a fallback");
            }
            for (lang, entries) in &gate.patterns {
                for entry in entries {
                    if let Err(e) = regex::Regex::new(&entry.pattern) {
                        warn!(gate = %name, language = %lang, pattern = %entry.pattern, error = %e, "pattern failed to compile and will be excluded from the active set");
                    }
                }
            }
        }
        Ok(catalog)
    }

    /// Look up a gate's definition by stable name.
    pub fn gate(&self, name: &str) -> Option<&GateDefinition> {
        self.catalog.gates.get(name)
    }

    /// Every gate name in the catalog, in catalog (insertion) order.
    pub fn gate_names(&self) -> Vec<String> {
        self.catalog.gates.keys().cloned().collect()
    }

    /// The global, catalog-wide configuration block.
    pub fn global_config(&self) -> &crate::patterns::catalog::GlobalCatalogConfig {
        &self.catalog.global
    }

    /// Resolve and compile the patterns applicable to `gate` for the given
    /// detected `technologies`. Deterministic: the same inputs always
    /// produce the same ordered list (sorted by technology key, then by
    /// catalog declaration order within each list; `all_languages` last).
    pub fn patterns_for(&self, gate: &str, technologies: &[String]) -> Result<Vec<ResolvedPattern>> {
        let Some(gate_def) = self.gate(gate) else {
            return Ok(Vec::new());
        };

        let matched_keys = resolve_technology_keys(technologies);
        let mut ordered_keys = matched_keys.clone();
        ordered_keys.sort();

        let mut resolved = Vec::new();
        for key in &ordered_keys {
            if let Some(entries) = gate_def.patterns.get(key) {
                self.compile_entries(entries, &mut resolved)?;
            }
        }
        if let Some(entries) = gate_def.patterns.get(ALL_LANGUAGES_KEY) {
            self.compile_entries(entries, &mut resolved)?;
        }

        Ok(resolved)
    }

    fn compile_entries(
        &self,
        entries: &[crate::patterns::catalog::PatternEntry],
        out: &mut Vec<ResolvedPattern>,
    ) -> Result<()> {
        for entry in entries {
            match self
                .cache
                .get_or_compile(&entry.pattern, CompileFlags::default())
            {
                Ok(regex) => out.push(ResolvedPattern {
                    compiled: CompiledPattern {
                        source: entry.pattern.clone(),
                        regex,
                        weight: entry.weight,
                    },
                    rationale: entry.rationale.clone(),
                }),
                Err(e) => {
                    warn!(pattern = %entry.pattern, error = %e, "excluding invalid pattern from the active set");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_loads_and_validates() {
        let cache = Arc::new(PatternCache::new(Default::default()));
        let library = PatternLibrary::load_default(cache).expect("default catalog should parse");
        assert!(library.gate("STRUCTURED_LOGS").is_some());
        assert!(library.gate("AVOID_LOGGING_SECRETS").is_some());
    }

    #[test]
    fn technology_alias_resolution_matches_original_mapping() {
        let resolved = resolve_technology_keys(&["Python".to_string()]);
        assert!(resolved.contains(&"python".to_string()));

        let resolved = resolve_technology_keys(&["React".to_string()]);
        assert!(resolved.contains(&"javascript".to_string()));
    }

    #[test]
    fn patterns_for_is_deterministic() {
        let cache = Arc::new(PatternCache::new(Default::default()));
        let library = PatternLibrary::load_default(cache).unwrap();
        let techs = vec!["python".to_string()];
        let a: Vec<String> = library
            .patterns_for("STRUCTURED_LOGS", &techs)
            .unwrap()
            .into_iter()
            .map(|p| p.compiled.source)
            .collect();
        let b: Vec<String> = library
            .patterns_for("STRUCTURED_LOGS", &techs)
            .unwrap()
            .into_iter()
            .map(|p| p.compiled.source)
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_gate_yields_empty_patterns() {
        let cache = Arc::new(PatternCache::new(Default::default()));
        let library = PatternLibrary::load_default(cache).unwrap();
        let patterns = library.patterns_for("NOT_A_REAL_GATE", &[]).unwrap();
        assert!(patterns.is_empty());
    }
}
