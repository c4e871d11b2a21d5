//! merge
//!
//! Merge strategies across branch heads.
//!
//! # Design
//!
//! Merging works over the current heads of a source and target branch and
//! writes its result back through the version store as a `Merge` commit
//! with full provenance. Four strategies:
//!
//! - `Ours`: keep the target head's text, discarding the source
//! - `Theirs`: take the source head's text
//! - `Auto`: two-way heuristic; aborts with a conflict on divergence
//! - `Manual`: two-way heuristic; commits conflict-marked text on
//!   divergence for downstream human resolution
//!
//! # Known Limitation
//!
//! The heuristic is a base-less two-way merge: if one text literally
//! contains the other, the longer text wins; anything else is a conflict.
//! It cannot combine two divergent, non-overlapping edits the way a true
//! three-way diff against a common ancestor could. This is deliberate -
//! branch points do not retain the cross-branch ancestry a three-way
//! merge would need, and callers rely on `Auto` failing loudly rather
//! than merging creatively.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use credence::core::config::CoreConfig;
//! use credence::core::types::{BeliefId, BranchName};
//! use credence::merge::{MergeEngine, MergeStrategy};
//! use credence::storage::MemoryStorage;
//! use credence::store::VersionStore;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(VersionStore::new(
//!     Arc::new(MemoryStorage::new()),
//!     CoreConfig::default(),
//! ));
//! let engine = MergeEngine::new(store.clone());
//! let belief = BeliefId::new("b1").unwrap();
//! let main = BranchName::main();
//! let exp = BranchName::new("exp").unwrap();
//!
//! store.commit(&belief, &main, "Hello", "u1", None).await.unwrap();
//! store.branches().create(&belief, &exp, &main, None).await.unwrap();
//! store.commit(&belief, &exp, "Hello world", "u1", None).await.unwrap();
//!
//! // "Hello" is contained in "Hello world": the longer text wins.
//! let outcome = engine
//!     .merge(&belief, &exp, &main, "u1", MergeStrategy::Auto)
//!     .await
//!     .unwrap();
//! assert!(!outcome.no_changes);
//! assert_eq!(outcome.record.unwrap().text, "Hello world");
//! # });
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::core::types::{BeliefId, BranchName, ChangeType};
use crate::store::{CommitOptions, MergeSource, StoreError, VersionRecord, VersionStore};

/// Errors from merge operations.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A branch involved in the merge has no head.
    #[error("branch head not found: {0}")]
    HeadNotFound(String),

    /// The texts diverge and the strategy refuses to guess.
    #[error("merge conflict on {belief_id}: {source_branch} and {target} have diverged")]
    Conflict {
        /// Belief being merged
        belief_id: BeliefId,
        /// Source branch
        source_branch: BranchName,
        /// Target branch
        target: BranchName,
    },

    /// Version store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How to resolve the two branch heads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Keep the target head's text.
    Ours,
    /// Take the source head's text.
    Theirs,
    /// Two-way heuristic; conflict aborts without writing.
    Auto,
    /// Two-way heuristic; conflict commits marked text for human resolution.
    Manual,
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeStrategy::Ours => write!(f, "ours"),
            MergeStrategy::Theirs => write!(f, "theirs"),
            MergeStrategy::Auto => write!(f, "auto"),
            MergeStrategy::Manual => write!(f, "manual"),
        }
    }
}

/// Result of a merge call.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Belief that was merged.
    pub belief_id: BeliefId,
    /// Branch the content came from.
    pub source_branch: BranchName,
    /// Branch the result was written to.
    pub target_branch: BranchName,
    /// Strategy that produced the result.
    pub strategy: MergeStrategy,
    /// True when both heads already carried identical text and nothing
    /// was written.
    pub no_changes: bool,
    /// The merge commit, absent for no-op merges.
    pub record: Option<VersionRecord>,
    /// True when a `Manual` merge committed conflict markers.
    pub conflict_markers: bool,
}

/// Merges branch heads through the version store.
pub struct MergeEngine {
    store: Arc<VersionStore>,
}

impl MergeEngine {
    /// Create a merge engine over the given store.
    pub fn new(store: Arc<VersionStore>) -> Self {
        Self { store }
    }

    /// Merge `source_branch`'s head into `target_branch`.
    ///
    /// Identical head texts short-circuit to a no-op: nothing is written
    /// and the outcome reports `no_changes`. Otherwise the strategy picks
    /// the result text and it is committed to the target branch as a
    /// `Merge` version carrying [`MergeSource`] provenance.
    ///
    /// # Errors
    ///
    /// - [`MergeError::HeadNotFound`] if either branch has no head
    /// - [`MergeError::Conflict`] under `Auto` when the texts diverge;
    ///   the target branch is left untouched
    pub async fn merge(
        &self,
        belief_id: &BeliefId,
        source_branch: &BranchName,
        target_branch: &BranchName,
        author: &str,
        strategy: MergeStrategy,
    ) -> Result<MergeOutcome, MergeError> {
        let source = self
            .store
            .head(belief_id, source_branch)
            .await?
            .ok_or_else(|| MergeError::HeadNotFound(source_branch.to_string()))?;
        let target = self
            .store
            .head(belief_id, target_branch)
            .await?
            .ok_or_else(|| MergeError::HeadNotFound(target_branch.to_string()))?;

        if source.fingerprint == target.fingerprint {
            return Ok(MergeOutcome {
                belief_id: belief_id.clone(),
                source_branch: source_branch.clone(),
                target_branch: target_branch.clone(),
                strategy,
                no_changes: true,
                record: None,
                conflict_markers: false,
            });
        }

        let mut conflict_markers = false;
        let merged_text = match strategy {
            MergeStrategy::Ours => target.text.clone(),
            MergeStrategy::Theirs => source.text.clone(),
            MergeStrategy::Auto | MergeStrategy::Manual => {
                match two_way_merge(&target.text, &source.text) {
                    Some(text) => text,
                    None if strategy == MergeStrategy::Auto => {
                        warn!(
                            belief = %belief_id,
                            source = %source_branch,
                            target = %target_branch,
                            "auto merge aborted on divergent texts"
                        );
                        return Err(MergeError::Conflict {
                            belief_id: belief_id.clone(),
                            source_branch: source_branch.clone(),
                            target: target_branch.clone(),
                        });
                    }
                    None => {
                        conflict_markers = true;
                        conflict_marked(
                            target_branch,
                            &target.text,
                            source_branch,
                            &source.text,
                        )
                    }
                }
            }
        };

        let record = self
            .store
            .commit_with(
                belief_id,
                target_branch,
                &merged_text,
                author,
                CommitOptions {
                    change_type: Some(ChangeType::Merge),
                    summary: Some(format!(
                        "Merged {source_branch}@{} into {target_branch} ({strategy})",
                        source.ordinal
                    )),
                    merge_source: Some(MergeSource {
                        branch: source_branch.clone(),
                        ordinal: source.ordinal,
                        semantic_version: source.semantic_version,
                    }),
                    ..CommitOptions::default()
                },
            )
            .await?;

        info!(
            belief = %belief_id,
            source = %source_branch,
            target = %target_branch,
            %strategy,
            ordinal = record.ordinal,
            conflict_markers,
            "branches merged"
        );
        Ok(MergeOutcome {
            belief_id: belief_id.clone(),
            source_branch: source_branch.clone(),
            target_branch: target_branch.clone(),
            strategy,
            no_changes: false,
            record: Some(record),
            conflict_markers,
        })
    }
}

/// Base-less two-way merge: containment picks the longer text, anything
/// else is a conflict (`None`).
fn two_way_merge(ours: &str, theirs: &str) -> Option<String> {
    if ours.contains(theirs) {
        return Some(ours.to_string());
    }
    if theirs.contains(ours) {
        return Some(theirs.to_string());
    }
    None
}

/// Render git-style conflict markers with the target text first.
fn conflict_marked(
    target_branch: &BranchName,
    target_text: &str,
    source_branch: &BranchName,
    source_text: &str,
) -> String {
    format!(
        "<<<<<<< {target_branch}\n{target_text}\n=======\n{source_text}\n>>>>>>> {source_branch}\n"
    )
}
