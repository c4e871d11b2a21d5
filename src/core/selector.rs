//! core::selector
//!
//! Version lookup selectors.
//!
//! A version inside a (belief, branch) history can be addressed either by
//! its ordinal (`"3"`) or by its semantic version (`"1.2.0"`). Parsing is
//! strict: anything that is neither a positive integer nor a full
//! `major.minor.patch` triple is rejected, never coerced.
//!
//! # Example
//!
//! ```
//! use credence::core::selector::VersionSelector;
//! use credence::core::types::SemanticVersion;
//!
//! let by_ordinal: VersionSelector = "3".parse().unwrap();
//! assert_eq!(by_ordinal, VersionSelector::Ordinal(3));
//!
//! let by_version: VersionSelector = "1.2.0".parse().unwrap();
//! assert_eq!(by_version, VersionSelector::Semantic(SemanticVersion::new(1, 2, 0)));
//!
//! assert!("abc".parse::<VersionSelector>().is_err());
//! assert!("1.2".parse::<VersionSelector>().is_err());
//! ```

use thiserror::Error;

use super::types::SemanticVersion;

/// Errors from selector parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    /// The input is neither an ordinal nor a semantic version.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),
}

/// Addresses a single version within a (belief, branch) history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    /// 1-based position in the history.
    Ordinal(u64),
    /// Structural match on (major, minor, patch).
    Semantic(SemanticVersion),
}

impl VersionSelector {
    /// Parse a semantic version string (`"1.2.0"`).
    ///
    /// # Errors
    ///
    /// Returns `SelectorError::InvalidSelector` unless the input is exactly
    /// three dot-separated non-negative integers.
    pub fn parse_semantic(s: &str) -> Result<SemanticVersion, SelectorError> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(SelectorError::InvalidSelector(s.to_string()));
        }
        let mut nums = [0u64; 3];
        for (i, part) in parts.iter().enumerate() {
            nums[i] = part
                .parse::<u64>()
                .map_err(|_| SelectorError::InvalidSelector(s.to_string()))?;
        }
        Ok(SemanticVersion::new(nums[0], nums[1], nums[2]))
    }
}

impl std::str::FromStr for VersionSelector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(ordinal) = s.parse::<u64>() {
            if ordinal == 0 {
                return Err(SelectorError::InvalidSelector(
                    "ordinals are 1-based".to_string(),
                ));
            }
            return Ok(VersionSelector::Ordinal(ordinal));
        }
        Self::parse_semantic(s).map(VersionSelector::Semantic)
    }
}

impl From<u64> for VersionSelector {
    fn from(ordinal: u64) -> Self {
        VersionSelector::Ordinal(ordinal)
    }
}

impl From<SemanticVersion> for VersionSelector {
    fn from(version: SemanticVersion) -> Self {
        VersionSelector::Semantic(version)
    }
}

impl std::fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionSelector::Ordinal(n) => write!(f, "{n}"),
            VersionSelector::Semantic(v) => write!(f, "{v}"),
        }
    }
}
