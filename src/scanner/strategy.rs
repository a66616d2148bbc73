//! Per-file scan strategy selection by size (§4.4).

use crate::core::config::FileProcessingConfig;

/// How a file's bytes should be obtained for pattern matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStrategy {
    /// Read the whole file into memory. Files at or below `small_threshold_bytes`.
    FullRead,
    /// Memory-map the file. Files above `small_threshold_bytes`, at or below
    /// `medium_threshold_bytes`.
    Mmap,
    /// Stream the file in overlapping chunks. Files above
    /// `medium_threshold_bytes`, at or below `hard_cap_bytes`.
    Stream,
    /// Skip the file entirely; it exceeds `hard_cap_bytes`.
    Skip,
}

/// Select the strategy for a file of the given size under `config`.
pub fn select_strategy(size_bytes: u64, config: &FileProcessingConfig) -> ScanStrategy {
    if size_bytes <= config.small_threshold_bytes {
        ScanStrategy::FullRead
    } else if size_bytes <= config.medium_threshold_bytes {
        ScanStrategy::Mmap
    } else if size_bytes <= config.hard_cap_bytes {
        ScanStrategy::Stream
    } else {
        ScanStrategy::Skip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_full_read_for_small_files() {
        let config = FileProcessingConfig::default();
        assert_eq!(select_strategy(100, &config), ScanStrategy::FullRead);
        assert_eq!(
            select_strategy(config.small_threshold_bytes, &config),
            ScanStrategy::FullRead
        );
    }

    #[test]
    fn selects_mmap_for_medium_files() {
        let config = FileProcessingConfig::default();
        assert_eq!(
            select_strategy(config.small_threshold_bytes + 1, &config),
            ScanStrategy::Mmap
        );
        assert_eq!(
            select_strategy(config.medium_threshold_bytes, &config),
            ScanStrategy::Mmap
        );
    }

    #[test]
    fn selects_stream_for_large_files() {
        let config = FileProcessingConfig::default();
        assert_eq!(
            select_strategy(config.medium_threshold_bytes + 1, &config),
            ScanStrategy::Stream
        );
        assert_eq!(
            select_strategy(config.hard_cap_bytes, &config),
            ScanStrategy::Stream
        );
    }

    #[test]
    fn skips_files_beyond_the_hard_cap() {
        let config = FileProcessingConfig::default();
        assert_eq!(
            select_strategy(config.hard_cap_bytes + 1, &config),
            ScanStrategy::Skip
        );
    }
}
