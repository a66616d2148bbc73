//! Error types for the hard-gates auditor.
//!
//! A single [`HardGatesError`] enum carries one variant per error kind
//! recognized by the propagation policy: request-validation failures fail
//! synchronously, per-file and per-pattern failures are captured and the
//! scan continues, and a small set of fatal kinds terminate the owning job.

use std::io;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HardGatesError>;

/// Every error kind the pipeline, pattern engine, and storage layer can raise.
#[derive(Error, Debug)]
pub enum HardGatesError {
    /// A scan request failed synchronous validation (bad URL, unknown format, ...).
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Human-readable description.
        message: String,
    },

    /// Cloning or otherwise materializing the repository failed.
    #[error("repository fetch failed: {message}")]
    RepoFetchFailed {
        /// Human-readable description.
        message: String,
        /// Underlying I/O or git error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The repository exceeded the configured size limits before inventory.
    #[error("repository too large: {message}")]
    RepoTooLarge {
        /// Human-readable description.
        message: String,
    },

    /// A catalog pattern failed to compile as a regular expression.
    #[error("invalid pattern `{pattern}`: {message}")]
    InvalidPattern {
        /// The offending pattern source text.
        pattern: String,
        /// Message from the regex compiler.
        message: String,
    },

    /// The external pattern catalog document could not be loaded.
    #[error("pattern library load failed: {message}")]
    PatternLibraryLoad {
        /// Human-readable description.
        message: String,
    },

    /// A single file could not be read during scanning.
    #[error("file read error for {path}: {message}")]
    FileReadError {
        /// Path of the offending file, relative to the working tree.
        path: String,
        /// Human-readable description.
        message: String,
    },

    /// A file exceeded the scanner's hard size cap and was skipped.
    #[error("file too large: {path} ({size} bytes)")]
    FileTooLarge {
        /// Path of the offending file, relative to the working tree.
        path: String,
        /// Observed size in bytes.
        size: u64,
    },

    /// A deadline elapsed before the operation completed.
    #[error("deadline exceeded: {context}")]
    DeadlineExceeded {
        /// What was in flight when the deadline fired.
        context: String,
    },

    /// The operation was cancelled cooperatively.
    #[error("cancelled: {context}")]
    Cancelled {
        /// What was in flight when cancellation was observed.
        context: String,
    },

    /// An evidence collector (database lookup, LLM call, ...) failed.
    #[error("collector `{collector}` failed: {message}")]
    CollectorFailed {
        /// Name of the failing collector.
        collector: String,
        /// Human-readable description.
        message: String,
    },

    /// The result store backend is unreachable or refused the operation.
    #[error("storage unavailable: {message}")]
    StorageUnavailable {
        /// Human-readable description.
        message: String,
        /// Underlying storage error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A requested feature is intentionally out of scope (e.g. PDF report
    /// generation, an external collaborator per the Non-goals).
    #[error("feature unavailable: {feature}")]
    FeatureUnavailable {
        /// Name of the unavailable feature.
        feature: String,
    },

    /// No job or stored result exists for the given scan ID.
    #[error("scan not found: {scan_id}")]
    ScanNotFound {
        /// The scan ID that was looked up.
        scan_id: String,
    },

    /// Any other unrecoverable condition.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable description.
        message: String,
    },
}

impl HardGatesError {
    /// Build an [`HardGatesError::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Build an [`HardGatesError::RepoFetchFailed`] with no underlying source.
    pub fn repo_fetch_failed(message: impl Into<String>) -> Self {
        Self::RepoFetchFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Build an [`HardGatesError::RepoFetchFailed`] wrapping an underlying error.
    pub fn repo_fetch_failed_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::RepoFetchFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build an [`HardGatesError::InvalidPattern`].
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Build an [`HardGatesError::PatternLibraryLoad`].
    pub fn pattern_library_load(message: impl Into<String>) -> Self {
        Self::PatternLibraryLoad {
            message: message.into(),
        }
    }

    /// Build an [`HardGatesError::FileReadError`].
    pub fn file_read_error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileReadError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Build an [`HardGatesError::DeadlineExceeded`].
    pub fn deadline_exceeded(context: impl Into<String>) -> Self {
        Self::DeadlineExceeded {
            context: context.into(),
        }
    }

    /// Build an [`HardGatesError::Cancelled`].
    pub fn cancelled(context: impl Into<String>) -> Self {
        Self::Cancelled {
            context: context.into(),
        }
    }

    /// Build an [`HardGatesError::CollectorFailed`].
    pub fn collector_failed(collector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CollectorFailed {
            collector: collector.into(),
            message: message.into(),
        }
    }

    /// Build an [`HardGatesError::StorageUnavailable`] with no underlying source.
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Build an [`HardGatesError::FeatureUnavailable`].
    pub fn feature_unavailable(feature: impl Into<String>) -> Self {
        Self::FeatureUnavailable {
            feature: feature.into(),
        }
    }

    /// Build an [`HardGatesError::ScanNotFound`].
    pub fn scan_not_found(scan_id: impl std::fmt::Display) -> Self {
        Self::ScanNotFound {
            scan_id: scan_id.to_string(),
        }
    }

    /// Build an [`HardGatesError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for errors that should fail a single file/pattern but never the
    /// owning job (propagation policy, §7).
    pub fn is_recoverable_per_item(&self) -> bool {
        matches!(
            self,
            Self::FileReadError { .. } | Self::FileTooLarge { .. } | Self::InvalidPattern { .. }
        )
    }
}

impl From<io::Error> for HardGatesError {
    fn from(source: io::Error) -> Self {
        Self::Internal {
            message: source.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for HardGatesError {
    fn from(source: serde_yaml::Error) -> Self {
        Self::PatternLibraryLoad {
            message: source.to_string(),
        }
    }
}

impl From<serde_json::Error> for HardGatesError {
    fn from(source: serde_json::Error) -> Self {
        Self::Internal {
            message: source.to_string(),
        }
    }
}

impl From<regex::Error> for HardGatesError {
    fn from(source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: String::new(),
            message: source.to_string(),
        }
    }
}
