//! File classification: language, role, and binary detection (§4.3).

use std::path::Path;

use crate::core::model::FileRole;

/// Directory names pruned without descent during the inventory walk.
pub const DENIED_DIRECTORIES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "vendor",
    "venv",
    ".venv",
    "env",
    "__pycache__",
    "target",
    "build",
    "dist",
    "out",
    ".idea",
    ".vscode",
    "coverage",
    ".pytest_cache",
    ".mypy_cache",
    ".tox",
    "bower_components",
];

/// File extensions skipped outright (binary/archival/generated by nature).
pub const DENIED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "svg", "tiff", "zip", "tar", "gz", "bz2",
    "7z", "rar", "jar", "war", "class", "so", "dll", "dylib", "exe", "bin", "pdf", "woff",
    "woff2", "ttf", "eot", "mp3", "mp4", "mov", "avi", "lock",
];

/// Extension-to-language table. First match wins; unrecognized extensions
/// leave `language` as `None`.
const LANGUAGE_TABLE: &[(&str, &str)] = &[
    ("py", "python"),
    ("pyi", "python"),
    ("js", "javascript"),
    ("mjs", "javascript"),
    ("cjs", "javascript"),
    ("jsx", "javascript"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("java", "java"),
    ("kt", "kotlin"),
    ("kts", "kotlin"),
    ("scala", "scala"),
    ("go", "go"),
    ("rs", "rust"),
    ("cs", "csharp"),
    ("cpp", "cpp"),
    ("cc", "cpp"),
    ("cxx", "cpp"),
    ("c", "c"),
    ("h", "c"),
    ("hpp", "cpp"),
    ("php", "php"),
    ("rb", "ruby"),
    ("swift", "swift"),
    ("html", "html"),
    ("htm", "html"),
    ("css", "css"),
    ("scss", "css"),
    ("sass", "css"),
    ("vue", "javascript"),
];

/// Extensions classified as `Config` regardless of path.
const CONFIG_EXTENSIONS: &[&str] = &[
    "yml", "yaml", "toml", "ini", "cfg", "conf", "properties", "env",
];

/// Extensions classified as `Doc`.
const DOC_EXTENSIONS: &[&str] = &["md", "rst", "txt", "adoc"];

/// Path substrings that mark a file as test code regardless of language.
const TEST_MARKERS: &[&str] = &[
    "test_", "_test", "/test/", "/tests/", ".test.", ".spec.", "Test.java", "spec/",
];

/// Filenames that mark build tooling regardless of extension.
const BUILD_FILENAMES: &[&str] = &[
    "Makefile",
    "Dockerfile",
    "Cargo.toml",
    "Cargo.lock",
    "package.json",
    "pom.xml",
    "build.gradle",
    "requirements.txt",
    "Pipfile",
    "go.mod",
];

/// Classify a file's language from its extension.
pub fn classify_language(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    LANGUAGE_TABLE
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| (*lang).to_string())
}

/// Classify a file's role from its path and extension.
pub fn classify_role(path: &Path) -> FileRole {
    let path_str = path.to_string_lossy();
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    if BUILD_FILENAMES.iter().any(|b| file_name == *b) {
        return FileRole::Build;
    }
    if TEST_MARKERS.iter().any(|m| path_str.contains(m)) {
        return FileRole::TestCode;
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    if let Some(ext) = &ext {
        if CONFIG_EXTENSIONS.contains(&ext.as_str()) {
            return FileRole::Config;
        }
        if DOC_EXTENSIONS.contains(&ext.as_str()) {
            return FileRole::Doc;
        }
    }

    if classify_language(path).is_some() {
        return FileRole::SourceCode;
    }

    FileRole::Other
}

/// Threshold, as a fraction, of invalid-UTF8 byte density above which a
/// non-NUL-containing sample is still judged binary.
const INVALID_UTF8_DENSITY_THRESHOLD: f64 = 0.3;

/// Decide whether a file is binary by inspecting its first 4 KiB.
pub fn is_binary_sample(sample: &[u8]) -> bool {
    if sample.contains(&0) {
        return true;
    }
    if sample.is_empty() {
        return false;
    }

    let mut invalid_bytes = 0usize;
    let mut remaining = sample;
    while !remaining.is_empty() {
        match std::str::from_utf8(remaining) {
            Ok(_) => break,
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                if valid_up_to == 0 {
                    invalid_bytes += 1;
                    remaining = &remaining[1..];
                } else {
                    remaining = &remaining[valid_up_to..];
                }
            }
        }
    }

    (invalid_bytes as f64 / sample.len() as f64) > INVALID_UTF8_DENSITY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn classifies_known_languages() {
        assert_eq!(
            classify_language(&PathBuf::from("src/app.py")),
            Some("python".to_string())
        );
        assert_eq!(
            classify_language(&PathBuf::from("src/App.tsx")),
            Some("typescript".to_string())
        );
        assert_eq!(classify_language(&PathBuf::from("README")), None);
    }

    #[test]
    fn classifies_test_code_by_path_marker() {
        assert_eq!(
            classify_role(&PathBuf::from("tests/test_app.py")),
            FileRole::TestCode
        );
        assert_eq!(
            classify_role(&PathBuf::from("src/app.spec.ts")),
            FileRole::TestCode
        );
    }

    #[test]
    fn classifies_build_files_by_name() {
        assert_eq!(
            classify_role(&PathBuf::from("Cargo.toml")),
            FileRole::Build
        );
    }

    #[test]
    fn classifies_source_code_by_default() {
        assert_eq!(
            classify_role(&PathBuf::from("src/main.rs")),
            FileRole::SourceCode
        );
    }

    #[test]
    fn detects_binary_via_nul_byte() {
        assert!(is_binary_sample(&[0x00, 0x01, 0x02]));
    }

    #[test]
    fn text_sample_is_not_binary() {
        assert!(!is_binary_sample(b"hello world\n"));
    }
}
