//! store::record
//!
//! The immutable version record.

use serde::{Deserialize, Serialize};

use crate::core::types::{
    BeliefId, BranchName, ChangeType, Fingerprint, SemanticVersion, UtcTimestamp,
};

/// One entry in a (belief, branch) history.
///
/// Records are created by the version store on every successful write and
/// never mutated or deleted afterwards. The full text is stored, not a
/// diff; histories are cheap to read at any point without replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Belief this version belongs to.
    pub belief_id: BeliefId,
    /// 1-based position in the branch history. Contiguous per branch.
    pub ordinal: u64,
    /// Semantic version; non-decreasing along the branch.
    pub semantic_version: SemanticVersion,
    /// Full content at this version.
    pub text: String,
    /// Who committed it.
    pub author: String,
    /// When it was committed.
    pub timestamp: UtcTimestamp,
    /// Ordinal of the version this one was built on, if any.
    pub previous_ordinal: Option<u64>,
    /// How this version came to be.
    pub change_type: ChangeType,
    /// Human-readable description of the change.
    pub change_summary: String,
    /// Branch this record lives on.
    pub branch: BranchName,
    /// Content hash for cheap identical-text checks.
    pub fingerprint: Fingerprint,
    /// Provenance of a merge commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_source: Option<MergeSource>,
    /// Ordinal this rollback restored, for rollback commits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_of: Option<u64>,
}

/// Where a merge commit's incoming content came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSource {
    /// Source branch that was merged in.
    pub branch: BranchName,
    /// Head ordinal of the source at merge time.
    pub ordinal: u64,
    /// Head semantic version of the source at merge time.
    pub semantic_version: SemanticVersion,
}
