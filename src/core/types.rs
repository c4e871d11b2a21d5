//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BeliefId`] - Validated opaque belief identifier
//! - [`BranchName`] - Validated branch name
//! - [`SemanticVersion`] - (major, minor, patch) triple with bump rules
//! - [`ChangeType`] - Exhaustive classification of a committed change
//! - [`LeaseKind`] - Exclusive or shared lease
//! - [`UtcTimestamp`] - RFC3339 timestamp
//! - [`Fingerprint`] - Content hash for cheap identical-text detection
//!
//! # Validation
//!
//! Identifier types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use credence::core::types::{BeliefId, BranchName, SemanticVersion, ChangeType};
//!
//! let belief = BeliefId::new("climate-model").unwrap();
//! let branch = BranchName::new("experiment/colder-runs").unwrap();
//!
//! let v1 = SemanticVersion::bump(None, ChangeType::Creation);
//! assert_eq!(v1.to_string(), "1.0.0");
//!
//! let v2 = SemanticVersion::bump(Some(&v1), ChangeType::Minor);
//! assert_eq!(v2.to_string(), "1.1.0");
//!
//! // Invalid constructions fail at creation time
//! assert!(BeliefId::new("").is_err());
//! assert!(BranchName::new("has space").is_err());
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid belief id: {0}")]
    InvalidBeliefId(String),

    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),
}

/// A validated belief identifier.
///
/// Belief ids are opaque to the core, but a minimal shape is enforced so
/// that ids can be embedded in storage keys without escaping:
/// - Cannot be empty
/// - Cannot contain whitespace or ASCII control characters
/// - Cannot contain `/` (reserved as the storage key separator)
///
/// # Example
///
/// ```
/// use credence::core::types::BeliefId;
///
/// let id = BeliefId::new("market-outlook").unwrap();
/// assert_eq!(id.as_str(), "market-outlook");
///
/// assert!(BeliefId::new("").is_err());
/// assert!(BeliefId::new("a/b").is_err());
/// assert!(BeliefId::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BeliefId(String);

impl BeliefId {
    /// Create a new validated belief id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBeliefId` if the id is empty or contains
    /// whitespace, control characters, or `/`.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    fn validate(id: &str) -> Result<(), TypeError> {
        if id.is_empty() {
            return Err(TypeError::InvalidBeliefId(
                "belief id cannot be empty".into(),
            ));
        }
        if id.contains('/') {
            return Err(TypeError::InvalidBeliefId(
                "belief id cannot contain '/'".into(),
            ));
        }
        for c in id.chars() {
            if c.is_whitespace() {
                return Err(TypeError::InvalidBeliefId(
                    "belief id cannot contain whitespace".into(),
                ));
            }
            if c.is_ascii_control() {
                return Err(TypeError::InvalidBeliefId(
                    "belief id cannot contain control characters".into(),
                ));
            }
        }
        Ok(())
    }

    /// Get the belief id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BeliefId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BeliefId> for String {
    fn from(id: BeliefId) -> Self {
        id.0
    }
}

impl AsRef<str> for BeliefId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BeliefId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated branch name.
///
/// Branch names follow the same shape as belief ids, except that `/` is
/// allowed as a namespace separator (e.g. `experiment/run-2`):
/// - Cannot be empty
/// - Cannot start with `-` or `.`
/// - Cannot end with `/`
/// - Cannot contain `..`, `//`, whitespace, or control characters
///
/// # Example
///
/// ```
/// use credence::core::types::BranchName;
///
/// let name = BranchName::new("experiment/run-2").unwrap();
/// assert_eq!(name.as_str(), "experiment/run-2");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("bad..name").is_err());
/// assert!(BranchName::new("-flag").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// The default branch every belief gets on first commit.
    pub const MAIN: &'static str = "main";

    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates the rules above.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// The `main` branch name.
    pub fn main() -> Self {
        Self(Self::MAIN.to_string())
    }

    /// Check whether this is the `main` branch.
    pub fn is_main(&self) -> bool {
        self.0 == Self::MAIN
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be empty".into(),
            ));
        }
        if name.starts_with('.') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '.'".into(),
            ));
        }
        if name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '-'".into(),
            ));
        }
        if name.ends_with('/') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot end with '/'".into(),
            ));
        }
        if name.contains("..") {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot contain '..'".into(),
            ));
        }
        if name.contains("//") {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot contain '//'".into(),
            ));
        }
        for c in name.chars() {
            if c.is_whitespace() {
                return Err(TypeError::InvalidBranchName(
                    "branch name cannot contain whitespace".into(),
                ));
            }
            if c.is_ascii_control() {
                return Err(TypeError::InvalidBranchName(
                    "branch name cannot contain control characters".into(),
                ));
            }
        }
        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification of a committed change.
///
/// `Creation`, `Rollback`, and `Merge` are assigned by the version store;
/// `Patch`/`Minor`/`Major` come from the classifier or the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// First version of a (belief, branch) history.
    Creation,
    /// Small textual revision.
    Patch,
    /// Moderate revision.
    Minor,
    /// Substantial rewrite.
    Major,
    /// Re-commit of an earlier version's content.
    Rollback,
    /// Result of merging another branch's head.
    Merge,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChangeType::Creation => "creation",
            ChangeType::Patch => "patch",
            ChangeType::Minor => "minor",
            ChangeType::Major => "major",
            ChangeType::Rollback => "rollback",
            ChangeType::Merge => "merge",
        };
        write!(f, "{s}")
    }
}

/// Kind of write lease on a belief.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaseKind {
    /// Excludes all other leases on the belief.
    Exclusive,
    /// Coexists with other shared leases; excluded by an exclusive lease.
    Shared,
}

impl std::fmt::Display for LeaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeaseKind::Exclusive => write!(f, "exclusive"),
            LeaseKind::Shared => write!(f, "shared"),
        }
    }
}

/// A semantic version triple.
///
/// Ordering is lexicographic over (major, minor, patch). Versions along a
/// branch are non-decreasing because [`SemanticVersion::bump`] only ever
/// increments.
///
/// # Example
///
/// ```
/// use credence::core::types::{ChangeType, SemanticVersion};
///
/// let v = SemanticVersion::new(1, 2, 3);
/// assert_eq!(SemanticVersion::bump(Some(&v), ChangeType::Major), SemanticVersion::new(2, 0, 0));
/// assert_eq!(SemanticVersion::bump(Some(&v), ChangeType::Minor), SemanticVersion::new(1, 3, 0));
/// assert_eq!(SemanticVersion::bump(Some(&v), ChangeType::Patch), SemanticVersion::new(1, 2, 4));
///
/// assert!(SemanticVersion::new(2, 0, 0) > SemanticVersion::new(1, 9, 9));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemanticVersion {
    /// Create a version from its components.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The initial version assigned to every new history.
    pub fn initial() -> Self {
        Self::new(1, 0, 0)
    }

    /// Compute the next version after a change.
    ///
    /// With no previous version the result is always `1.0.0`, regardless of
    /// the change type. Otherwise `Major` bumps the major component and
    /// zeroes the rest, `Minor` bumps the minor component and zeroes patch,
    /// and every other change type bumps patch.
    pub fn bump(previous: Option<&SemanticVersion>, change: ChangeType) -> Self {
        let Some(prev) = previous else {
            return Self::initial();
        };
        match change {
            ChangeType::Major => Self::new(prev.major + 1, 0, 0),
            ChangeType::Minor => Self::new(prev.major, prev.minor + 1, 0),
            _ => Self::new(prev.major, prev.minor, prev.patch + 1),
        }
    }
}

impl std::fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A UTC timestamp in RFC3339 format.
///
/// # Example
///
/// ```
/// use credence::core::types::UtcTimestamp;
///
/// let now = UtcTimestamp::now();
/// println!("Current time: {}", now);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Create a timestamp from a chrono DateTime.
    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self(dt)
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// A stable SHA-256 hash over version content.
///
/// Used to detect identical texts without comparing full contents: the
/// merge engine short-circuits to a no-op when both heads carry the same
/// fingerprint.
///
/// # Example
///
/// ```
/// use credence::core::types::Fingerprint;
///
/// let a = Fingerprint::of_text("Hello world");
/// let b = Fingerprint::of_text("Hello world");
/// let c = Fingerprint::of_text("Hello world!");
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute a fingerprint over a text body.
    pub fn of_text(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Get the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod belief_id {
        use super::*;

        #[test]
        fn valid_ids() {
            assert!(BeliefId::new("b1").is_ok());
            assert!(BeliefId::new("market-outlook").is_ok());
            assert!(BeliefId::new("belief_42").is_ok());
            assert!(BeliefId::new("UPPER.lower").is_ok());
        }

        #[test]
        fn empty_rejected() {
            assert!(BeliefId::new("").is_err());
        }

        #[test]
        fn slash_rejected() {
            assert!(BeliefId::new("a/b").is_err());
        }

        #[test]
        fn whitespace_rejected() {
            assert!(BeliefId::new("has space").is_err());
            assert!(BeliefId::new("has\ttab").is_err());
        }

        #[test]
        fn control_chars_rejected() {
            assert!(BeliefId::new("has\x07bell").is_err());
        }

        #[test]
        fn serde_roundtrip() {
            let id = BeliefId::new("b1").unwrap();
            let json = serde_json::to_string(&id).unwrap();
            let parsed: BeliefId = serde_json::from_str(&json).unwrap();
            assert_eq!(id, parsed);
        }

        #[test]
        fn serde_rejects_invalid() {
            let result: Result<BeliefId, _> = serde_json::from_str("\"a/b\"");
            assert!(result.is_err());
        }
    }

    mod branch_name {
        use super::*;

        #[test]
        fn valid_names() {
            assert!(BranchName::new("main").is_ok());
            assert!(BranchName::new("experiment/run-2").is_ok());
            assert!(BranchName::new("fix-123").is_ok());
            assert!(BranchName::new("with.dot").is_ok());
        }

        #[test]
        fn empty_rejected() {
            assert!(BranchName::new("").is_err());
        }

        #[test]
        fn starts_with_dot_rejected() {
            assert!(BranchName::new(".hidden").is_err());
        }

        #[test]
        fn starts_with_dash_rejected() {
            assert!(BranchName::new("-flag").is_err());
        }

        #[test]
        fn ends_with_slash_rejected() {
            assert!(BranchName::new("branch/").is_err());
        }

        #[test]
        fn double_dot_rejected() {
            assert!(BranchName::new("bad..name").is_err());
        }

        #[test]
        fn double_slash_rejected() {
            assert!(BranchName::new("foo//bar").is_err());
        }

        #[test]
        fn whitespace_rejected() {
            assert!(BranchName::new("has space").is_err());
            assert!(BranchName::new("has\nnewline").is_err());
        }

        #[test]
        fn main_helper() {
            assert!(BranchName::main().is_main());
            assert!(!BranchName::new("exp").unwrap().is_main());
        }

        #[test]
        fn serde_roundtrip() {
            let name = BranchName::new("experiment/run-2").unwrap();
            let json = serde_json::to_string(&name).unwrap();
            let parsed: BranchName = serde_json::from_str(&json).unwrap();
            assert_eq!(name, parsed);
        }
    }

    mod semantic_version {
        use super::*;

        #[test]
        fn no_previous_is_initial() {
            for change in [
                ChangeType::Creation,
                ChangeType::Patch,
                ChangeType::Minor,
                ChangeType::Major,
                ChangeType::Rollback,
                ChangeType::Merge,
            ] {
                assert_eq!(
                    SemanticVersion::bump(None, change),
                    SemanticVersion::new(1, 0, 0)
                );
            }
        }

        #[test]
        fn major_resets_lower_components() {
            let v = SemanticVersion::new(1, 4, 7);
            assert_eq!(
                SemanticVersion::bump(Some(&v), ChangeType::Major),
                SemanticVersion::new(2, 0, 0)
            );
        }

        #[test]
        fn minor_resets_patch() {
            let v = SemanticVersion::new(1, 4, 7);
            assert_eq!(
                SemanticVersion::bump(Some(&v), ChangeType::Minor),
                SemanticVersion::new(1, 5, 0)
            );
        }

        #[test]
        fn other_change_types_bump_patch() {
            let v = SemanticVersion::new(1, 4, 7);
            for change in [
                ChangeType::Patch,
                ChangeType::Creation,
                ChangeType::Rollback,
                ChangeType::Merge,
            ] {
                assert_eq!(
                    SemanticVersion::bump(Some(&v), change),
                    SemanticVersion::new(1, 4, 8)
                );
            }
        }

        #[test]
        fn ordering_is_lexicographic() {
            assert!(SemanticVersion::new(2, 0, 0) > SemanticVersion::new(1, 9, 9));
            assert!(SemanticVersion::new(1, 2, 0) > SemanticVersion::new(1, 1, 9));
            assert!(SemanticVersion::new(1, 1, 2) > SemanticVersion::new(1, 1, 1));
        }

        #[test]
        fn display_format() {
            assert_eq!(SemanticVersion::new(1, 2, 3).to_string(), "1.2.3");
        }
    }

    mod change_type {
        use super::*;

        #[test]
        fn display_is_lowercase() {
            assert_eq!(ChangeType::Creation.to_string(), "creation");
            assert_eq!(ChangeType::Major.to_string(), "major");
            assert_eq!(ChangeType::Rollback.to_string(), "rollback");
        }

        #[test]
        fn serde_uses_lowercase() {
            assert_eq!(
                serde_json::to_string(&ChangeType::Merge).unwrap(),
                "\"merge\""
            );
            let parsed: ChangeType = serde_json::from_str("\"minor\"").unwrap();
            assert_eq!(parsed, ChangeType::Minor);
        }
    }

    mod fingerprint {
        use super::*;

        #[test]
        fn deterministic() {
            assert_eq!(Fingerprint::of_text("abc"), Fingerprint::of_text("abc"));
        }

        #[test]
        fn different_text_different_fingerprint() {
            assert_ne!(Fingerprint::of_text("abc"), Fingerprint::of_text("abd"));
        }

        #[test]
        fn empty_text_has_fingerprint() {
            assert!(!Fingerprint::of_text("").as_str().is_empty());
        }
    }

    mod utc_timestamp {
        use super::*;

        #[test]
        fn now_works() {
            let ts = UtcTimestamp::now();
            assert!(ts.to_string().contains('T'));
        }

        #[test]
        fn serde_roundtrip() {
            let ts = UtcTimestamp::now();
            let json = serde_json::to_string(&ts).unwrap();
            let parsed: UtcTimestamp = serde_json::from_str(&json).unwrap();
            assert_eq!(ts, parsed);
        }
    }
}
