//! core::classify
//!
//! Similarity-based change classification.
//!
//! # Design
//!
//! Classification is a lexical heuristic, not semantic understanding. The
//! normalized character-level similarity ratio between the old and new
//! text decides the change type:
//!
//! - `similarity > patch_similarity` (default 0.9) → [`ChangeType::Patch`]
//! - `similarity > minor_similarity` (default 0.7) → [`ChangeType::Minor`]
//! - otherwise → [`ChangeType::Major`]
//!
//! The summary is derived from the line-level diff: pure additions report
//! "Added N lines", pure removals "Removed N lines", and mixed edits
//! "Modified X lines and added Y new lines" (X counts removed lines, which
//! in a mixed edit are replacements).
//!
//! # Example
//!
//! ```
//! use credence::core::classify::ChangeClassifier;
//! use credence::core::config::CoreConfig;
//! use credence::core::types::ChangeType;
//!
//! let classifier = ChangeClassifier::new(&CoreConfig::default());
//!
//! let result = classifier.classify("Hello world", "Hello world");
//! assert_eq!(result.change_type, ChangeType::Patch);
//!
//! let result = classifier.classify("Hello world", "Completely unrelated content here");
//! assert_eq!(result.change_type, ChangeType::Major);
//! ```

use similar::{ChangeTag, TextDiff};

use super::config::CoreConfig;
use super::types::ChangeType;

/// Result of classifying a text change.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Patch, minor, or major.
    pub change_type: ChangeType,
    /// Human-readable description of the line-level edit.
    pub summary: String,
    /// Normalized similarity ratio in [0, 1].
    pub similarity: f64,
}

/// Classifies text changes by lexical similarity.
#[derive(Debug, Clone)]
pub struct ChangeClassifier {
    patch_similarity: f64,
    minor_similarity: f64,
}

impl ChangeClassifier {
    /// Create a classifier with thresholds from the given config.
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            patch_similarity: config.patch_similarity,
            minor_similarity: config.minor_similarity,
        }
    }

    /// Classify the change from `old_text` to `new_text`.
    ///
    /// Classification quality is bounded by lexical similarity only; two
    /// texts that mean the same thing but share few words classify as major.
    pub fn classify(&self, old_text: &str, new_text: &str) -> Classification {
        let similarity = Self::similarity(old_text, new_text);

        let change_type = if similarity > self.patch_similarity {
            ChangeType::Patch
        } else if similarity > self.minor_similarity {
            ChangeType::Minor
        } else {
            ChangeType::Major
        };

        let line_diff = TextDiff::from_lines(old_text, new_text);
        let (mut added, mut removed) = (0usize, 0usize);
        for change in line_diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => added += 1,
                ChangeTag::Delete => removed += 1,
                ChangeTag::Equal => {}
            }
        }

        let summary = match (added, removed) {
            (0, 0) => "No changes detected".to_string(),
            (a, 0) => format!("Added {a} lines"),
            (0, r) => format!("Removed {r} lines"),
            (a, r) => format!("Modified {r} lines and added {a} new lines"),
        };

        Classification {
            change_type,
            summary,
            similarity,
        }
    }

    /// The character-level similarity ratio between two texts.
    pub fn similarity(old_text: &str, new_text: &str) -> f64 {
        f64::from(TextDiff::from_chars(old_text, new_text).ratio())
    }
}
