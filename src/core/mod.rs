//! core
//!
//! Domain types and pure computation for the belief version control core.
//!
//! # Modules
//!
//! - [`types`] - Validated identifiers, semantic versions, change types
//! - [`selector`] - Version lookup selectors (ordinal or semantic version)
//! - [`classify`] - Similarity-based change classification
//! - [`config`] - Tunable thresholds and limits

pub mod classify;
pub mod config;
pub mod selector;
pub mod types;

pub use classify::{ChangeClassifier, Classification};
pub use config::CoreConfig;
pub use selector::{SelectorError, VersionSelector};
pub use types::{
    BeliefId, BranchName, ChangeType, Fingerprint, LeaseKind, SemanticVersion, TypeError,
    UtcTimestamp,
};
