//! Configuration types for the hard-gates auditor.
//!
//! Mirrors the teacher crate's configuration layering: a top-level struct
//! with `serde`-derived defaults, YAML load/save, and field-level validation.

pub mod validation;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::errors::{HardGatesError, Result};

/// Scoring knobs shared by every gate unless overridden in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringDefaults {
    /// Base score security gates start from before penalties.
    #[serde(default = "ScoringDefaults::default_base_score")]
    pub base_score: f64,
    /// Penalty applied per violation for security gates.
    #[serde(default = "ScoringDefaults::default_violation_penalty")]
    pub violation_penalty: f64,
    /// Ceiling on the total penalty a security gate can accrue.
    #[serde(default = "ScoringDefaults::default_max_penalty")]
    pub max_penalty: f64,
    /// Bonus added to a security gate's score when zero violations are found.
    #[serde(default = "ScoringDefaults::default_bonus_for_clean")]
    pub bonus_for_clean: f64,
    /// Coverage ratio at or above which the bonus multiplier applies.
    #[serde(default = "ScoringDefaults::default_bonus_threshold")]
    pub bonus_threshold: f64,
    /// Multiplier applied to coverage gates at/above `bonus_threshold`.
    #[serde(default = "ScoringDefaults::default_bonus_multiplier")]
    pub bonus_multiplier: f64,
    /// Coverage ratio at or below which the penalty multiplier applies.
    #[serde(default = "ScoringDefaults::default_penalty_threshold")]
    pub penalty_threshold: f64,
    /// Multiplier applied to coverage gates at/below `penalty_threshold`.
    #[serde(default = "ScoringDefaults::default_penalty_multiplier")]
    pub penalty_multiplier: f64,
    /// Cap, as a fraction of `expected_percentage`, on the excess-coverage bonus.
    #[serde(default = "ScoringDefaults::default_excess_ratio_cap")]
    pub excess_ratio_cap: f64,
    /// Magnitude multiplier applied to the excess-coverage bonus.
    #[serde(default = "ScoringDefaults::default_excess_bonus_scale")]
    pub excess_bonus_scale: f64,
    /// Score at/above which a non-security gate is PASS.
    #[serde(default = "ScoringDefaults::default_pass_threshold")]
    pub pass_threshold: f64,
    /// Score at/above which a non-security gate is WARNING (else FAIL).
    #[serde(default = "ScoringDefaults::default_warning_threshold")]
    pub warning_threshold: f64,
    /// Score at/above which a security gate is PASS (else FAIL).
    #[serde(default = "ScoringDefaults::default_security_pass_threshold")]
    pub security_pass_threshold: f64,
}

impl ScoringDefaults {
    /// Default base score security gates start from. Grounded in the
    /// original `pattern_loader.py`'s `scoring_config.get("base_score", 100)`.
    pub const fn default_base_score() -> f64 {
        100.0
    }
    /// Default per-violation penalty.
    pub const fn default_violation_penalty() -> f64 {
        20.0
    }
    /// Default penalty ceiling.
    pub const fn default_max_penalty() -> f64 {
        100.0
    }
    /// Default clean bonus.
    pub const fn default_bonus_for_clean() -> f64 {
        10.0
    }
    /// Default bonus threshold.
    pub const fn default_bonus_threshold() -> f64 {
        0.8
    }
    /// Default bonus multiplier.
    pub const fn default_bonus_multiplier() -> f64 {
        1.1
    }
    /// Default penalty threshold.
    pub const fn default_penalty_threshold() -> f64 {
        0.3
    }
    /// Default penalty multiplier.
    pub const fn default_penalty_multiplier() -> f64 {
        0.8
    }
    /// Default excess-coverage ratio cap (20% of expected, per the original's `min(..., 0.2)`).
    pub const fn default_excess_ratio_cap() -> f64 {
        0.2
    }
    /// Default excess-coverage bonus scale.
    pub const fn default_excess_bonus_scale() -> f64 {
        20.0
    }
    /// Default pass threshold.
    pub const fn default_pass_threshold() -> f64 {
        80.0
    }
    /// Default warning threshold.
    pub const fn default_warning_threshold() -> f64 {
        60.0
    }
    /// Default security pass threshold.
    pub const fn default_security_pass_threshold() -> f64 {
        95.0
    }
}

impl Default for ScoringDefaults {
    fn default() -> Self {
        Self {
            base_score: Self::default_base_score(),
            violation_penalty: Self::default_violation_penalty(),
            max_penalty: Self::default_max_penalty(),
            bonus_for_clean: Self::default_bonus_for_clean(),
            bonus_threshold: Self::default_bonus_threshold(),
            bonus_multiplier: Self::default_bonus_multiplier(),
            penalty_threshold: Self::default_penalty_threshold(),
            penalty_multiplier: Self::default_penalty_multiplier(),
            excess_ratio_cap: Self::default_excess_ratio_cap(),
            excess_bonus_scale: Self::default_excess_bonus_scale(),
            pass_threshold: Self::default_pass_threshold(),
            warning_threshold: Self::default_warning_threshold(),
            security_pass_threshold: Self::default_security_pass_threshold(),
        }
    }
}

/// Technology detection thresholds (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnologyDetectionConfig {
    /// Minimum file-share for a language to count as a primary technology.
    #[serde(default = "TechnologyDetectionConfig::default_primary_threshold")]
    pub primary_threshold: f64,
    /// Minimum file-share for the most-populous language to count as secondary.
    #[serde(default = "TechnologyDetectionConfig::default_secondary_threshold")]
    pub secondary_threshold: f64,
}

impl TechnologyDetectionConfig {
    /// Default primary-technology file-share threshold (20%).
    pub const fn default_primary_threshold() -> f64 {
        0.20
    }
    /// Default secondary-technology file-share threshold (10%).
    pub const fn default_secondary_threshold() -> f64 {
        0.10
    }
}

impl Default for TechnologyDetectionConfig {
    fn default() -> Self {
        Self {
            primary_threshold: Self::default_primary_threshold(),
            secondary_threshold: Self::default_secondary_threshold(),
        }
    }
}

/// File-processing thresholds driving scanner strategy selection (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileProcessingConfig {
    /// Files at or below this size are read fully. Default 64 KiB.
    #[serde(default = "FileProcessingConfig::default_small_threshold")]
    pub small_threshold_bytes: u64,
    /// Files at or below this size (and above `small_threshold_bytes`) are mmap'd. Default 4 MiB.
    #[serde(default = "FileProcessingConfig::default_medium_threshold")]
    pub medium_threshold_bytes: u64,
    /// Files above `medium_threshold_bytes` and at or below this are streamed. Default 20 MiB.
    #[serde(default = "FileProcessingConfig::default_hard_cap")]
    pub hard_cap_bytes: u64,
    /// Overlap window used when streaming, to avoid splitting a match across chunks.
    #[serde(default = "FileProcessingConfig::default_overlap_window")]
    pub overlap_window_bytes: usize,
    /// Maximum matches recorded per gate per file.
    #[serde(default = "FileProcessingConfig::default_max_matches_per_file")]
    pub max_matches_per_file: usize,
    /// Worker pool size for the file scanner.
    #[serde(default = "FileProcessingConfig::default_max_parallel_files")]
    pub max_parallel_files: usize,
}

impl FileProcessingConfig {
    /// Default small-file threshold: 64 KiB.
    pub const fn default_small_threshold() -> u64 {
        64 * 1024
    }
    /// Default medium-file threshold: 4 MiB.
    pub const fn default_medium_threshold() -> u64 {
        4 * 1024 * 1024
    }
    /// Default hard cap: 20 MiB.
    pub const fn default_hard_cap() -> u64 {
        20 * 1024 * 1024
    }
    /// Default streaming overlap window: 4 KiB.
    pub const fn default_overlap_window() -> usize {
        4 * 1024
    }
    /// Default per-file match cap.
    pub const fn default_max_matches_per_file() -> usize {
        100
    }
    /// Default scanner worker pool size.
    pub const fn default_max_parallel_files() -> usize {
        4
    }
}

impl Default for FileProcessingConfig {
    fn default() -> Self {
        Self {
            small_threshold_bytes: Self::default_small_threshold(),
            medium_threshold_bytes: Self::default_medium_threshold(),
            hard_cap_bytes: Self::default_hard_cap(),
            overlap_window_bytes: Self::default_overlap_window(),
            max_matches_per_file: Self::default_max_matches_per_file(),
            max_parallel_files: Self::default_max_parallel_files(),
        }
    }
}

/// Pattern cache sizing (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternCacheConfig {
    /// Maximum number of compiled-pattern entries retained.
    #[serde(default = "PatternCacheConfig::default_max_entries")]
    pub max_entries: usize,
    /// Approximate memory budget, in bytes, used for eviction heuristics.
    #[serde(default = "PatternCacheConfig::default_max_memory_bytes")]
    pub max_memory_bytes: usize,
}

impl PatternCacheConfig {
    /// Default entry cap: ~10k patterns.
    pub const fn default_max_entries() -> usize {
        10_000
    }
    /// Default memory budget: ~64 MiB.
    pub const fn default_max_memory_bytes() -> usize {
        64 * 1024 * 1024
    }
}

impl Default for PatternCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: Self::default_max_entries(),
            max_memory_bytes: Self::default_max_memory_bytes(),
        }
    }
}

/// Storage backend selector (§6 `HARDGATES_STORAGE_BACKEND`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// Embedded single-file database (sqlite via `sqlx`). Preferred default.
    Kv,
    /// Networked relational database (postgres via `sqlx`).
    Sql,
    /// One document per scan, sharded by status, under a directory tree.
    File,
    /// In-memory only; not durable. Used for tests.
    Memory,
}

impl Default for StorageBackendKind {
    fn default() -> Self {
        Self::Kv
    }
}

/// I/O, storage, and retention configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Which backend implementation to use.
    #[serde(default)]
    pub backend: StorageBackendKind,
    /// Connection string or filesystem path for the chosen backend.
    #[serde(default = "StorageConfig::default_connection_string")]
    pub connection_string: String,
    /// Days to keep terminal jobs before the retention sweeper deletes them.
    #[serde(default = "StorageConfig::default_retention_days")]
    pub retention_days: i64,
}

impl StorageConfig {
    /// Default connection string: a local sqlite file under the working directory.
    pub fn default_connection_string() -> String {
        "./hardgates-data/scans.db".to_string()
    }
    /// Default retention window: 24 hours' worth of days (1).
    pub const fn default_retention_days() -> i64 {
        1
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::default(),
            connection_string: Self::default_connection_string(),
            retention_days: Self::default_retention_days(),
        }
    }
}

/// Concurrency and deadline configuration (§5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Global semaphore bound on concurrently-running scans.
    #[serde(default = "PerformanceConfig::default_max_concurrent_scans")]
    pub max_concurrent_scans: usize,
    /// Per-scan hard deadline, in seconds. Supersedes any stage deadline.
    #[serde(default = "PerformanceConfig::default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,
    /// Maximum files accepted into a single scan before truncation.
    #[serde(default = "PerformanceConfig::default_max_files_per_scan")]
    pub max_files_per_scan: usize,
}

impl PerformanceConfig {
    /// Default concurrent-scan admission bound.
    pub const fn default_max_concurrent_scans() -> usize {
        4
    }
    /// Default scan deadline: 15 minutes.
    pub const fn default_scan_timeout_secs() -> u64 {
        15 * 60
    }
    /// Default per-scan file cap.
    pub const fn default_max_files_per_scan() -> usize {
        50_000
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_concurrent_scans: Self::default_max_concurrent_scans(),
            scan_timeout_secs: Self::default_scan_timeout_secs(),
            max_files_per_scan: Self::default_max_files_per_scan(),
        }
    }
}

/// HTTP server binding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host.
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// Default bind host.
    pub fn default_host() -> String {
        "0.0.0.0".to_string()
    }
    /// Default bind port.
    pub const fn default_port() -> u16 {
        8080
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

/// Top-level configuration for the hard-gates auditor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HardGatesConfig {
    /// HTTP server binding.
    #[serde(default)]
    pub server: ServerConfig,
    /// Pattern cache sizing.
    #[serde(default)]
    pub pattern_cache: PatternCacheConfig,
    /// File-processing thresholds.
    #[serde(default)]
    pub file_processing: FileProcessingConfig,
    /// Technology detection thresholds.
    #[serde(default)]
    pub technology_detection: TechnologyDetectionConfig,
    /// Default scoring knobs (catalog entries may override per-gate).
    #[serde(default)]
    pub scoring: ScoringDefaults,
    /// Storage backend and retention.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Concurrency and deadlines.
    #[serde(default)]
    pub performance: PerformanceConfig,
    /// Path to the external pattern catalog document. `None` uses the
    /// bundled default catalog (`config/gate_definitions.yml`).
    #[serde(default)]
    pub pattern_catalog_path: Option<PathBuf>,
    /// Maximum length, in characters, of a formatted recommendation (§4.11).
    #[serde(default = "HardGatesConfig::default_recommendation_max_chars")]
    pub recommendation_max_chars: usize,
}

impl HardGatesConfig {
    /// Default recommendation length cap.
    pub const fn default_recommendation_max_chars() -> usize {
        600
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| HardGatesError::internal(format!("reading {}: {e}", path.display())))?;
        serde_yaml::from_str(&content).map_err(Into::into)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let content = serde_yaml::to_string(self)
            .map_err(|e| HardGatesError::internal(format!("serializing config: {e}")))?;
        std::fs::write(&path, content)
            .map_err(|e| HardGatesError::internal(format!("writing {}: {e}", path.display())))?;
        Ok(())
    }

    /// Build a configuration from environment variables layered over
    /// defaults, following the names listed in §6.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("HARDGATES_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("HARDGATES_PORT") {
            if let Ok(port) = port.parse() {
                config.server.port = port;
            }
        }
        if let Ok(n) = std::env::var("HARDGATES_MAX_CONCURRENT_SCANS") {
            if let Ok(n) = n.parse() {
                config.performance.max_concurrent_scans = n;
            }
        }
        if let Ok(secs) = std::env::var("HARDGATES_SCAN_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.performance.scan_timeout_secs = secs;
            }
        }
        if let Ok(n) = std::env::var("HARDGATES_MAX_FILES_PER_SCAN") {
            if let Ok(n) = n.parse() {
                config.performance.max_files_per_scan = n;
            }
        }
        if let Ok(backend) = std::env::var("HARDGATES_STORAGE_BACKEND") {
            config.storage.backend = match backend.as_str() {
                "sql" => StorageBackendKind::Sql,
                "file" => StorageBackendKind::File,
                "memory" => StorageBackendKind::Memory,
                _ => StorageBackendKind::Kv,
            };
        }
        if let Ok(url) = std::env::var("HARDGATES_STORAGE_URL") {
            config.storage.connection_string = url;
        }
        if let Ok(days) = std::env::var("HARDGATES_RETENTION_DAYS") {
            if let Ok(days) = days.parse() {
                config.storage.retention_days = days;
            }
        }

        config
    }

    /// Validate cross-field invariants not expressible through `serde` defaults alone.
    pub fn validate(&self) -> Result<()> {
        validation::validate_unit_range(
            self.technology_detection.primary_threshold,
            "technology_detection.primary_threshold",
        )?;
        validation::validate_unit_range(
            self.technology_detection.secondary_threshold,
            "technology_detection.secondary_threshold",
        )?;
        if self.file_processing.small_threshold_bytes >= self.file_processing.medium_threshold_bytes
        {
            return Err(HardGatesError::internal(
                "file_processing.small_threshold_bytes must be < medium_threshold_bytes",
            ));
        }
        if self.file_processing.medium_threshold_bytes > self.file_processing.hard_cap_bytes {
            return Err(HardGatesError::internal(
                "file_processing.medium_threshold_bytes must be <= hard_cap_bytes",
            ));
        }
        validation::validate_positive_usize(
            self.performance.max_concurrent_scans,
            "performance.max_concurrent_scans",
        )?;
        Ok(())
    }
}
