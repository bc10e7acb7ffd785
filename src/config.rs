//! Tier Configuration
//!
//! Configuration structures for the cache tiers. Like the rest of the crate,
//! configs are plain structs with public fields plus a couple of builder
//! helpers for the optional parameters.
//!
//! # Examples
//!
//! ```
//! use tiered_cache::config::MemoryLayerConfig;
//! use core::num::NonZeroUsize;
//!
//! let config = MemoryLayerConfig::new("l1", NonZeroUsize::new(1000).unwrap()).with_segments(8);
//! assert_eq!(config.segments, 8);
//! ```

use core::fmt;
use core::num::NonZeroUsize;
use std::path::PathBuf;

/// Returns the default number of segments based on available parallelism.
pub fn default_segment_count() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(16)
        .clamp(4, 64)
}

/// Configuration for a segmented in-memory tier.
///
/// `capacity` is the total entry budget, split evenly across `segments`
/// (each segment keeps at least one slot).
#[derive(Clone)]
pub struct MemoryLayerConfig {
    /// Tier name used in metrics and errors
    pub name: String,
    /// Total maximum number of entries across all segments
    pub capacity: NonZeroUsize,
    /// Number of independently locked segments
    pub segments: usize,
}

impl MemoryLayerConfig {
    /// Creates a config with the default segment count.
    pub fn new(name: impl Into<String>, capacity: NonZeroUsize) -> Self {
        Self {
            name: name.into(),
            capacity,
            segments: default_segment_count(),
        }
    }

    /// Overrides the segment count. Zero is bumped to one.
    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = segments.max(1);
        self
    }
}

impl fmt::Debug for MemoryLayerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLayerConfig")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("segments", &self.segments)
            .finish()
    }
}

/// Configuration for the directory-backed terminal tier.
#[derive(Debug, Clone)]
pub struct DirectoryLayerConfig {
    /// Tier name used in metrics and errors
    pub name: String,
    /// Root directory; created on open if missing
    pub root: PathBuf,
}

impl DirectoryLayerConfig {
    /// Creates a config rooted at `root`.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }
}
