//! core::config
//!
//! Tunable thresholds and limits.
//!
//! All components take a [`CoreConfig`] at construction. There is no file
//! loading here: configuration surfaces (files, env, flags) belong to the
//! embedding application, which constructs this struct however it likes.

use std::time::Duration;

/// Configuration for the version control core.
///
/// # Example
///
/// ```
/// use credence::core::config::CoreConfig;
///
/// let config = CoreConfig::default();
/// assert!(config.patch_similarity > config.minor_similarity);
/// ```
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Similarity strictly above this ratio classifies as a patch.
    pub patch_similarity: f64,

    /// Similarity strictly above this ratio (and at or below
    /// `patch_similarity`) classifies as minor; at or below it, major.
    pub minor_similarity: f64,

    /// Default TTL for leases acquired without an explicit TTL.
    pub default_lease_ttl: Duration,

    /// Maximum number of keywords extracted per belief during impact analysis.
    pub max_impact_keywords: usize,

    /// Minimum token length for impact keywords.
    pub min_keyword_length: usize,

    /// Context lines around each hunk in unified diffs.
    pub diff_context_radius: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            patch_similarity: 0.9,
            minor_similarity: 0.7,
            default_lease_ttl: Duration::from_secs(300),
            max_impact_keywords: 10,
            min_keyword_length: 3,
            diff_context_radius: 3,
        }
    }
}
