//! Repository inventory: walks a working tree once, classifies every kept
//! file, and derives the repository-level facts every gate reuses (§4.2).

pub mod classify;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{instrument, warn};

use crate::core::config::TechnologyDetectionConfig;
use crate::core::errors::Result;
use crate::core::model::{DetectedCategories, FileEntry, FileRole, LanguageStats, RepoMetadata};
use classify::{classify_language, classify_role, is_binary_sample, DENIED_DIRECTORIES};

const SAMPLE_BYTES: usize = 4096;

/// Manifest/config filenames mapped to the build tool they imply.
const BUILD_TOOL_FILES: &[(&str, &str)] = &[
    ("Cargo.toml", "cargo"),
    ("package.json", "npm"),
    ("pom.xml", "maven"),
    ("build.gradle", "gradle"),
    ("build.gradle.kts", "gradle"),
    ("requirements.txt", "pip"),
    ("Pipfile", "pipenv"),
    ("go.mod", "go modules"),
    ("Makefile", "make"),
    ("Dockerfile", "docker"),
];

/// Filenames/path substrings implying a deployment platform.
const DEPLOYMENT_MARKERS: &[(&str, &str)] = &[
    ("Dockerfile", "docker"),
    ("docker-compose.yml", "docker-compose"),
    ("docker-compose.yaml", "docker-compose"),
    (".github/workflows", "github-actions"),
    ("serverless.yml", "serverless"),
    ("kubernetes", "kubernetes"),
    ("k8s", "kubernetes"),
    ("helm", "kubernetes"),
];

/// Framework names looked for inside manifest/config file contents.
const FRAMEWORK_MARKERS: &[&str] = &[
    "django", "flask", "fastapi", "express", "spring", "springboot", "rails", "laravel",
    "symfony", "react", "angular", "vue", "nestjs", "aspnet",
];

/// OpenAPI/Swagger document filenames treated as API evidence on their own,
/// for schema-first and gRPC-gateway-style services that carry no literal
/// route decorator in source, grounded in `_has_api_characteristics` from
/// the original prototype.
const API_SPEC_FILENAMES: &[&str] = &[
    "openapi.yaml",
    "openapi.yml",
    "openapi.json",
    "swagger.yaml",
    "swagger.yml",
    "swagger.json",
];

/// Route-decorator patterns treated as API evidence alongside manifest
/// detection, grounded in `_has_api_characteristics` from the original
/// prototype.
static API_ROUTE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"@app\.route",
        r"@RestController",
        r"express\s*\(",
        r"router\.(get|post|put|delete|patch)\s*\(",
        r"@(Get|Post|Put|Delete|Patch)Mapping",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static API route pattern must compile"))
    .collect()
});

/// Languages treated as frontend-implying for `DetectedCategories`.
const FRONTEND_LANGUAGES: &[&str] = &["javascript", "typescript", "html", "css"];
/// Languages treated as backend-implying.
const BACKEND_LANGUAGES: &[&str] = &[
    "python", "java", "go", "rust", "csharp", "php", "ruby", "kotlin", "scala",
];
/// Languages treated as mobile-implying.
const MOBILE_LANGUAGES: &[&str] = &["swift", "kotlin"];

/// Result of walking and classifying a working tree.
#[derive(Debug, Clone)]
pub struct Inventory {
    /// Repository-level facts.
    pub metadata: RepoMetadata,
    /// Every file kept after filtering, in walk order.
    pub files: Vec<FileEntry>,
}

/// Walk `root`, classify every kept file, and derive repository-level facts.
///
/// Honors `.gitignore` via the `ignore` crate in addition to the fixed
/// [`DENIED_DIRECTORIES`]/[`classify::DENIED_EXTENSIONS`] deny-lists. Caps
/// the kept file count at `max_files`; files beyond the cap are counted but
/// not retained, and the truncation is logged.
#[instrument(skip(root), fields(root = %root.display()))]
pub fn build_inventory(
    root: &Path,
    max_files: usize,
    tech_config: &TechnologyDetectionConfig,
) -> Result<Inventory> {
    let mut files = Vec::new();
    let mut truncated = 0usize;

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| !DENIED_DIRECTORIES.contains(&name))
                .unwrap_or(true)
        })
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry during inventory walk");
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let abs_path = entry.path().to_path_buf();
        let rel_path = abs_path.strip_prefix(root).unwrap_or(&abs_path).to_path_buf();

        if let Some(ext) = rel_path.extension().and_then(|e| e.to_str()) {
            if classify::DENIED_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
                continue;
            }
        }

        if files.len() >= max_files {
            truncated += 1;
            continue;
        }

        match classify_file(&abs_path, &rel_path) {
            Ok(entry) => files.push(entry),
            Err(e) => {
                warn!(path = %rel_path.display(), error = %e, "skipping file that could not be read during inventory");
            }
        }
    }

    if truncated > 0 {
        warn!(truncated, max_files, "inventory truncated at max_files_per_scan");
    }

    let metadata = derive_metadata(root, &files, tech_config);
    Ok(Inventory { metadata, files })
}

fn classify_file(abs_path: &Path, rel_path: &Path) -> Result<FileEntry> {
    let meta = std::fs::metadata(abs_path)?;
    let size = meta.len();

    let sample = read_sample(abs_path)?;
    let is_binary = is_binary_sample(&sample);

    let line_count = if is_binary {
        0
    } else {
        count_lines(abs_path)?
    };

    Ok(FileEntry {
        path: rel_path.to_path_buf(),
        language: classify_language(rel_path),
        role: classify_role(rel_path),
        size,
        line_count,
        is_binary,
    })
}

fn read_sample(path: &Path) -> Result<Vec<u8>> {
    use std::io::Read;
    let mut file = std::fs::File::open(path)?;
    let mut buf = vec![0u8; SAMPLE_BYTES];
    let n = file.read(&mut buf)?;
    buf.truncate(n);
    Ok(buf)
}

fn count_lines(path: &Path) -> Result<usize> {
    use std::io::Read;
    let mut file = std::fs::File::open(path)?;
    let mut buf = [0u8; 64 * 1024];
    let mut count = 0usize;
    let mut saw_any_byte = false;
    let mut ended_with_newline = true;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        saw_any_byte = true;
        for &byte in &buf[..n] {
            if byte == b'\n' {
                count += 1;
            }
        }
        ended_with_newline = buf[n - 1] == b'\n';
    }
    if saw_any_byte && !ended_with_newline {
        count += 1;
    }
    Ok(count)
}

fn derive_metadata(
    root: &Path,
    files: &[FileEntry],
    tech_config: &TechnologyDetectionConfig,
) -> RepoMetadata {
    let mut language_stats: HashMap<String, LanguageStats> = HashMap::new();
    let mut total_lines = 0usize;
    let mut build_tools = Vec::new();
    let mut deployment_platforms = Vec::new();
    let mut frameworks = Vec::new();
    let mut has_api_evidence = false;

    for file in files {
        total_lines += file.line_count;
        if let Some(lang) = &file.language {
            let stats = language_stats.entry(lang.clone()).or_default();
            stats.files += 1;
            stats.lines += file.line_count;
        }

        let rel_str = file.path.to_string_lossy();
        let file_name = file
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        for (marker, tool) in BUILD_TOOL_FILES {
            if file_name == *marker && !build_tools.contains(&tool.to_string()) {
                build_tools.push(tool.to_string());
            }
        }
        for (marker, platform) in DEPLOYMENT_MARKERS {
            if rel_str.contains(marker) && !deployment_platforms.contains(&platform.to_string()) {
                deployment_platforms.push(platform.to_string());
            }
        }

        if !has_api_evidence && API_SPEC_FILENAMES.iter().any(|name| name.eq_ignore_ascii_case(file_name)) {
            has_api_evidence = true;
        }

        if matches!(file.role, FileRole::Config | FileRole::Build | FileRole::SourceCode) {
            if let Ok(content) = std::fs::read_to_string(root.join(&file.path)) {
                let lowered = content.to_lowercase();
                for marker in FRAMEWORK_MARKERS {
                    if lowered.contains(marker) && !frameworks.contains(&marker.to_string()) {
                        frameworks.push(marker.to_string());
                    }
                }
                if !has_api_evidence
                    && API_ROUTE_PATTERNS.iter().any(|re| re.is_match(&content))
                {
                    has_api_evidence = true;
                }
            }
        }
    }

    let total_files = files.len().max(1);
    let mut shares: Vec<(String, f64)> = language_stats
        .iter()
        .map(|(lang, stats)| (lang.clone(), stats.files as f64 / total_files as f64))
        .collect();
    shares.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let primary_technologies: Vec<String> = shares
        .iter()
        .enumerate()
        .filter(|(i, (_, share))| {
            if *i == 0 {
                *share >= tech_config.secondary_threshold
            } else {
                *share >= tech_config.primary_threshold
            }
        })
        .map(|(_, (lang, _))| lang.clone())
        .collect();

    let detected_categories = DetectedCategories {
        frontend: language_stats.keys().any(|l| FRONTEND_LANGUAGES.contains(&l.as_str())),
        backend: language_stats.keys().any(|l| BACKEND_LANGUAGES.contains(&l.as_str())),
        api: has_api_evidence || frameworks.iter().any(|f| f == "express" || f == "fastapi" || f == "spring"),
        mobile: language_stats.keys().any(|l| MOBILE_LANGUAGES.contains(&l.as_str())),
    };

    let (commit_hash, last_commit_date) = read_git_head(root);

    RepoMetadata {
        working_tree_path: root.to_path_buf(),
        file_count: files.len(),
        total_lines,
        language_stats,
        build_tools,
        frameworks,
        deployment_platforms,
        commit_hash,
        last_commit_date,
        primary_technologies,
        detected_categories,
    }
}

fn read_git_head(root: &Path) -> (Option<String>, Option<chrono::DateTime<chrono::Utc>>) {
    match git2::Repository::open(root) {
        Ok(repo) => match repo.head().and_then(|h| h.peel_to_commit()) {
            Ok(commit) => {
                let hash = commit.id().to_string();
                let time = commit.time();
                let date = chrono::DateTime::from_timestamp(time.seconds(), 0)
                    .map(|dt| dt.with_timezone(&chrono::Utc));
                (Some(hash), date)
            }
            Err(_) => (None, None),
        },
        Err(_) => (None, None),
    }
}

/// Resolve a list of working-tree-relative paths (e.g. `"path/to/file.py"`)
/// into `(path, PathBuf)` pairs for callers that need an absolute path.
pub fn resolve_absolute(root: &Path, entries: &[FileEntry]) -> Vec<PathBuf> {
    entries.iter().map(|e| root.join(&e.path)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn walks_and_classifies_a_small_tree() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/main.py", "import logging\nlogging.info('hi')\n");
        write(dir.path(), "tests/test_main.py", "def test_x(): pass\n");
        write(dir.path(), "README.md", "# hello\n");
        write(dir.path(), "requirements.txt", "flask==2.0\n");

        let inventory =
            build_inventory(dir.path(), 1000, &TechnologyDetectionConfig::default()).unwrap();

        assert_eq!(inventory.files.len(), 4);
        assert!(inventory.metadata.build_tools.contains(&"pip".to_string()));
        assert!(inventory.metadata.frameworks.contains(&"flask".to_string()));
        assert!(inventory.metadata.language_stats.contains_key("python"));
    }

    #[test]
    fn prunes_denied_directories() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "node_modules/dep/index.js", "module.exports = {};\n");
        write(dir.path(), "src/app.js", "console.log('hi');\n");

        let inventory =
            build_inventory(dir.path(), 1000, &TechnologyDetectionConfig::default()).unwrap();

        assert_eq!(inventory.files.len(), 1);
        assert_eq!(inventory.files[0].path, PathBuf::from("src/app.js"));
    }

    #[test]
    fn truncates_at_max_files() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            write(dir.path(), &format!("src/file_{i}.py"), "x = 1\n");
        }

        let inventory =
            build_inventory(dir.path(), 3, &TechnologyDetectionConfig::default()).unwrap();

        assert_eq!(inventory.files.len(), 3);
    }

    #[test]
    fn counts_lines_including_a_final_unterminated_line() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.py", "one\ntwo\nthree");
        let inventory =
            build_inventory(dir.path(), 10, &TechnologyDetectionConfig::default()).unwrap();
        assert_eq!(inventory.files[0].line_count, 3);
    }
}
