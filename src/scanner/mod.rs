//! File-centric scanner: reads each kept file with the strategy its size
//! implies, runs the gate's resolved patterns line-by-line, and returns
//! bounded, line-addressed matches (§4.4).

pub mod strategy;

use std::io::Read;
use std::path::Path;

use rayon::prelude::*;
use tracing::warn;

use crate::core::config::FileProcessingConfig;
use crate::core::errors::{HardGatesError, Result};
use crate::core::model::{FileEntry, Match};
use crate::core::pipeline::context::StopSignal;
use crate::patterns::ResolvedPattern;
use strategy::{select_strategy, ScanStrategy};

/// Length, in characters, a recorded context line is truncated to.
const CONTEXT_LINE_MAX_CHARS: usize = 240;

/// Scan every kept, non-binary file in `files` against `patterns`, using a
/// worker pool sized by `config.max_parallel_files`. Stops admitting new
/// file scans once `stop` reports cancellation or deadline expiry; files
/// already in flight still finish their current file.
pub fn scan_files(
    root: &Path,
    files: &[FileEntry],
    patterns: &[ResolvedPattern],
    config: &FileProcessingConfig,
    stop: &StopSignal,
) -> Vec<Match> {
    if patterns.is_empty() {
        return Vec::new();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.max_parallel_files.max(1))
        .build();

    let scan_all = || {
        files
            .par_iter()
            .filter(|entry| !entry.is_binary)
            .flat_map_iter(|entry| {
                if stop.should_stop() {
                    return Vec::new().into_iter();
                }
                match scan_one_file(root, entry, patterns, config) {
                    Ok(matches) => matches.into_iter(),
                    Err(e) => {
                        warn!(path = %entry.path.display(), error = %e, "skipping file during scan");
                        Vec::new().into_iter()
                    }
                }
            })
            .collect()
    };

    match pool {
        Ok(pool) => pool.install(scan_all),
        Err(e) => {
            warn!(error = %e, "failed to build scanner thread pool; scanning on the caller's pool");
            scan_all()
        }
    }
}

/// Scan a single file against `patterns`, capped at
/// `config.max_matches_per_file` matches.
fn scan_one_file(
    root: &Path,
    entry: &FileEntry,
    patterns: &[ResolvedPattern],
    config: &FileProcessingConfig,
) -> Result<Vec<Match>> {
    let abs_path = root.join(&entry.path);

    match select_strategy(entry.size, config) {
        ScanStrategy::Skip => {
            return Err(HardGatesError::FileTooLarge {
                path: entry.path.display().to_string(),
                size: entry.size,
            });
        }
        ScanStrategy::FullRead => {
            let content = read_full(&abs_path)?;
            Ok(scan_text(&entry.path, &content, patterns, config.max_matches_per_file))
        }
        ScanStrategy::Mmap => {
            let content = read_mmap(&abs_path)?;
            Ok(scan_text(&entry.path, &content, patterns, config.max_matches_per_file))
        }
        ScanStrategy::Stream => {
            scan_streamed(&abs_path, &entry.path, patterns, config)
        }
    }
}

fn read_full(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| HardGatesError::file_read_error(path.display().to_string(), e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_mmap(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)
        .map_err(|e| HardGatesError::file_read_error(path.display().to_string(), e.to_string()))?;
    // SAFETY: the file is opened read-only for the lifetime of this call and
    // not concurrently truncated by this process; a racing external writer
    // can at worst produce a torn read, which only affects match accuracy.
    let mmap = unsafe { memmap2::Mmap::map(&file) }
        .map_err(|e| HardGatesError::file_read_error(path.display().to_string(), e.to_string()))?;
    Ok(String::from_utf8_lossy(&mmap).into_owned())
}

/// Stream a file in overlapping chunks so a line split across a chunk
/// boundary is never lost, without holding the whole file in memory.
fn scan_streamed(
    abs_path: &Path,
    rel_path: &Path,
    patterns: &[ResolvedPattern],
    config: &FileProcessingConfig,
) -> Result<Vec<Match>> {
    let mut file = std::fs::File::open(abs_path).map_err(|e| {
        HardGatesError::file_read_error(rel_path.display().to_string(), e.to_string())
    })?;

    let chunk_size = config.overlap_window_bytes.max(4096) * 16;
    let mut buf = vec![0u8; chunk_size];
    let mut carry: Vec<u8> = Vec::new();
    let mut line_number = 0usize;
    let mut matches = Vec::new();

    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| HardGatesError::file_read_error(rel_path.display().to_string(), e.to_string()))?;
        let is_last_chunk = n == 0;
        let mut working = std::mem::take(&mut carry);
        working.extend_from_slice(&buf[..n]);

        let split_at = if is_last_chunk {
            working.len()
        } else {
            working.iter().rposition(|&b| b == b'\n').map(|i| i + 1).unwrap_or(0)
        };
        carry = working[split_at..].to_vec();

        let text = String::from_utf8_lossy(&working[..split_at]);
        let text = text.strip_suffix('\n').unwrap_or(&text);
        if !text.is_empty() || split_at > 0 {
            for line in text.split('\n') {
                line_number += 1;
                scan_line(rel_path, line_number, line, patterns, &mut matches, config.max_matches_per_file);
                if matches.len() >= config.max_matches_per_file {
                    return Ok(matches);
                }
            }
        }

        if is_last_chunk {
            break;
        }
    }

    Ok(matches)
}

fn scan_text(
    rel_path: &Path,
    content: &str,
    patterns: &[ResolvedPattern],
    max_matches: usize,
) -> Vec<Match> {
    let mut matches = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        scan_line(rel_path, idx + 1, line, patterns, &mut matches, max_matches);
        if matches.len() >= max_matches {
            break;
        }
    }
    matches
}

fn scan_line(
    rel_path: &Path,
    line_number: usize,
    line: &str,
    patterns: &[ResolvedPattern],
    out: &mut Vec<Match>,
    max_matches: usize,
) {
    for pattern in patterns {
        if let Some(m) = pattern.compiled.regex.find(line) {
            out.push(Match {
                file_path: rel_path.to_path_buf(),
                line_number,
                pattern: pattern.compiled.source.clone(),
                matched_text: m.as_str().to_string(),
                source: "static".to_string(),
                context_line: truncate_chars(line, CONTEXT_LINE_MAX_CHARS),
            });
            if out.len() >= max_matches {
                return;
            }
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::cache::{CompileFlags, CompiledPattern, PatternCache};
    use std::sync::Arc;

    fn pattern(source: &str) -> ResolvedPattern {
        let cache = PatternCache::new(Default::default());
        let regex = cache.get_or_compile(source, CompileFlags::default()).unwrap();
        ResolvedPattern {
            compiled: CompiledPattern {
                source: source.to_string(),
                regex,
                weight: 1.0,
            },
            rationale: "test".to_string(),
        }
    }

    #[test]
    fn finds_matches_with_line_numbers() {
        let content = "line one\npassword = \"hunter2\"\nline three\n";
        let matches = scan_text(Path::new("a.py"), content, &[pattern("password")], 100);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].line_number, 2);
    }

    #[test]
    fn stops_at_the_per_file_match_cap() {
        let content = "token\ntoken\ntoken\n";
        let matches = scan_text(Path::new("a.py"), content, &[pattern("token")], 2);
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn truncates_long_context_lines() {
        let long_line = "x".repeat(500);
        let truncated = truncate_chars(&long_line, CONTEXT_LINE_MAX_CHARS);
        assert!(truncated.chars().count() <= CONTEXT_LINE_MAX_CHARS + 1);
    }

    #[test]
    fn streamed_scan_matches_full_read_scan_for_the_same_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.py");
        let mut content = String::new();
        for i in 0..5000 {
            content.push_str(&format!("line {i}\n"));
        }
        content.push_str("secret_key = \"abc123\"\n");
        std::fs::write(&path, &content).unwrap();

        let config = FileProcessingConfig {
            medium_threshold_bytes: 10,
            ..Default::default()
        };
        let matches = scan_streamed(&path, Path::new("big.py"), &[pattern("secret_key")], &config)
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].line_number, 5001);
    }
}
