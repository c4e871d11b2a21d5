//! store
//!
//! The version store: append-only per-(belief, branch) histories.
//!
//! # Architecture
//!
//! Each (belief, branch) pair owns one history blob keyed
//! `belief/<id>/version/<branch>`, a JSON array of [`VersionRecord`]s in
//! ordinal order. The store reads the whole history, appends, and writes
//! it back; the branch manager's head pointer is advanced inside the same
//! guarded section.
//!
//! # Concurrency
//!
//! Commits to the same (belief, branch) are serialized through an internal
//! keyed mutex, so two concurrent commits can never both observe the same
//! head and claim the same ordinal. This guarantee is independent of
//! leases, which remain advisory (see [`crate::lease`]).
//!
//! # Invariants
//!
//! - Ordinals are contiguous from 1 per (belief, branch)
//! - Histories are append-only: rollback commits forward, nothing truncates
//! - Semantic versions never decrease along a branch
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use credence::core::config::CoreConfig;
//! use credence::core::types::{BeliefId, BranchName};
//! use credence::storage::MemoryStorage;
//! use credence::store::VersionStore;
//!
//! # tokio_test::block_on(async {
//! let store = VersionStore::new(Arc::new(MemoryStorage::new()), CoreConfig::default());
//! let belief = BeliefId::new("b1").unwrap();
//! let main = BranchName::main();
//!
//! let v1 = store
//!     .commit(&belief, &main, "Hello world", "u1", None)
//!     .await
//!     .unwrap();
//! assert_eq!(v1.ordinal, 1);
//! assert_eq!(v1.semantic_version.to_string(), "1.0.0");
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use similar::TextDiff;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

pub mod branch;
pub mod record;

pub use branch::{BranchManager, BranchPoint, BranchRecord};
pub use record::{MergeSource, VersionRecord};

use crate::core::classify::ChangeClassifier;
use crate::core::config::CoreConfig;
use crate::core::selector::{SelectorError, VersionSelector};
use crate::core::types::{
    BeliefId, BranchName, ChangeType, Fingerprint, SemanticVersion, UtcTimestamp,
};
use crate::storage::{Storage, StorageError};

/// Errors from version store and branch operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No version matched the selector.
    #[error("version not found: {0}")]
    VersionNotFound(String),

    /// The branch has no record or no history.
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// A branch with this name already exists for the belief.
    #[error("branch already exists: {0}")]
    BranchExists(String),

    /// The branch is locked against commits.
    #[error("branch is locked: {0}")]
    BranchLocked(String),

    /// Malformed ordinal or semantic-version selector.
    #[error(transparent)]
    InvalidSelector(#[from] SelectorError),

    /// Storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Failed to parse a stored record.
    #[error("failed to parse stored record: {0}")]
    ParseError(String),

    /// Failed to serialize a record.
    #[error("failed to serialize record: {0}")]
    SerializeError(String),
}

/// History blob access shared by the version store and branch manager.
pub(crate) mod history {
    use super::*;

    fn key(belief_id: &BeliefId, branch: &BranchName) -> String {
        format!("belief/{belief_id}/version/{branch}")
    }

    pub(crate) async fn load(
        storage: &dyn Storage,
        belief_id: &BeliefId,
        branch: &BranchName,
    ) -> Result<Vec<VersionRecord>, StoreError> {
        match storage.get(&key(belief_id, branch)).await? {
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StoreError::ParseError(e.to_string()))
            }
            None => Ok(Vec::new()),
        }
    }

    pub(crate) async fn save(
        storage: &dyn Storage,
        belief_id: &BeliefId,
        branch: &BranchName,
        records: &[VersionRecord],
    ) -> Result<(), StoreError> {
        let bytes =
            serde_json::to_vec(records).map_err(|e| StoreError::SerializeError(e.to_string()))?;
        storage.put(&key(belief_id, branch), bytes).await?;
        Ok(())
    }

    /// Resolve a selector against an ordinal-ordered history.
    pub(crate) fn resolve(
        records: &[VersionRecord],
        selector: VersionSelector,
    ) -> Option<&VersionRecord> {
        match selector {
            VersionSelector::Ordinal(n) => {
                let index = usize::try_from(n).ok()?.checked_sub(1)?;
                records.get(index).filter(|r| r.ordinal == n)
            }
            VersionSelector::Semantic(v) => {
                records.iter().find(|r| r.semantic_version == v)
            }
        }
    }
}

/// Options for internal commits carrying provenance.
#[derive(Debug, Default)]
pub(crate) struct CommitOptions {
    pub change_type: Option<ChangeType>,
    pub summary: Option<String>,
    pub merge_source: Option<MergeSource>,
    pub rollback_of: Option<u64>,
}

/// Metadata for one side of a diff.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionMeta {
    pub ordinal: u64,
    pub semantic_version: SemanticVersion,
    pub author: String,
    pub timestamp: UtcTimestamp,
}

impl From<&VersionRecord> for VersionMeta {
    fn from(record: &VersionRecord) -> Self {
        Self {
            ordinal: record.ordinal,
            semantic_version: record.semantic_version,
            author: record.author.clone(),
            timestamp: record.timestamp,
        }
    }
}

/// Line-level comparison of two versions.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffReport {
    /// Belief the versions belong to.
    pub belief_id: BeliefId,
    /// Branch both versions live on.
    pub branch: BranchName,
    /// Older side of the comparison, as selected.
    pub from: VersionMeta,
    /// Newer side of the comparison, as selected.
    pub to: VersionMeta,
    /// Unified diff of the two texts.
    pub unified_diff: String,
    /// Normalized similarity ratio in [0, 1].
    pub similarity: f64,
}

/// Append-only version store for belief documents.
///
/// Constructed explicitly with an injected storage backend; there is no
/// process-wide instance. Cheap to share behind an `Arc`.
pub struct VersionStore {
    storage: Arc<dyn Storage>,
    branches: BranchManager,
    classifier: ChangeClassifier,
    config: CoreConfig,
    commit_locks: StdMutex<HashMap<(BeliefId, BranchName), Arc<Mutex<()>>>>,
}

impl VersionStore {
    /// Create a version store over the given storage.
    pub fn new(storage: Arc<dyn Storage>, config: CoreConfig) -> Self {
        Self {
            branches: BranchManager::new(storage.clone()),
            classifier: ChangeClassifier::new(&config),
            storage,
            config,
            commit_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// The branch manager for this store.
    pub fn branches(&self) -> &BranchManager {
        &self.branches
    }

    /// Commit a new version of a belief.
    ///
    /// The first commit on a branch with no history creates ordinal 1 with
    /// `ChangeType::Creation` and version 1.0.0, ignoring any supplied
    /// change type. Later commits derive the change type from the
    /// classifier when the caller does not supply one, and bump the
    /// semantic version accordingly. The branch head is advanced as part
    /// of the same serialized operation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BranchLocked`] if the branch is locked;
    /// storage and codec failures propagate.
    pub async fn commit(
        &self,
        belief_id: &BeliefId,
        branch: &BranchName,
        text: &str,
        author: &str,
        change_type: Option<ChangeType>,
    ) -> Result<VersionRecord, StoreError> {
        self.commit_with(
            belief_id,
            branch,
            text,
            author,
            CommitOptions {
                change_type,
                ..CommitOptions::default()
            },
        )
        .await
    }

    pub(crate) async fn commit_with(
        &self,
        belief_id: &BeliefId,
        branch: &BranchName,
        text: &str,
        author: &str,
        opts: CommitOptions,
    ) -> Result<VersionRecord, StoreError> {
        let lock = self.commit_lock(belief_id, branch);
        let _guard = lock.lock().await;

        let branch_record = self.branches.ensure(belief_id, branch).await?;
        if branch_record.locked {
            return Err(StoreError::BranchLocked(branch.to_string()));
        }

        let mut records = history::load(self.storage.as_ref(), belief_id, branch).await?;
        let record = match records.last() {
            None => VersionRecord {
                belief_id: belief_id.clone(),
                ordinal: 1,
                semantic_version: SemanticVersion::initial(),
                text: text.to_string(),
                author: author.to_string(),
                timestamp: UtcTimestamp::now(),
                previous_ordinal: None,
                change_type: ChangeType::Creation,
                change_summary: opts
                    .summary
                    .unwrap_or_else(|| "Initial version".to_string()),
                branch: branch.clone(),
                fingerprint: Fingerprint::of_text(text),
                merge_source: opts.merge_source,
                rollback_of: opts.rollback_of,
            },
            Some(head) => {
                let classification = self.classifier.classify(&head.text, text);
                let change_type = opts.change_type.unwrap_or(classification.change_type);
                VersionRecord {
                    belief_id: belief_id.clone(),
                    ordinal: head.ordinal + 1,
                    semantic_version: SemanticVersion::bump(
                        Some(&head.semantic_version),
                        change_type,
                    ),
                    text: text.to_string(),
                    author: author.to_string(),
                    timestamp: UtcTimestamp::now(),
                    previous_ordinal: Some(head.ordinal),
                    change_type,
                    change_summary: opts.summary.unwrap_or(classification.summary),
                    branch: branch.clone(),
                    fingerprint: Fingerprint::of_text(text),
                    merge_source: opts.merge_source,
                    rollback_of: opts.rollback_of,
                }
            }
        };

        records.push(record.clone());
        history::save(self.storage.as_ref(), belief_id, branch, &records).await?;
        self.branches
            .set_head(belief_id, branch, record.ordinal)
            .await?;

        info!(
            belief = %belief_id,
            branch = %branch,
            ordinal = record.ordinal,
            version = %record.semantic_version,
            change = %record.change_type,
            "version committed"
        );
        Ok(record)
    }

    /// The most recent version on a branch, if any.
    pub async fn head(
        &self,
        belief_id: &BeliefId,
        branch: &BranchName,
    ) -> Result<Option<VersionRecord>, StoreError> {
        let records = history::load(self.storage.as_ref(), belief_id, branch).await?;
        Ok(records.into_iter().last())
    }

    /// Full ordered history for a branch, oldest first.
    pub async fn history(
        &self,
        belief_id: &BeliefId,
        branch: &BranchName,
    ) -> Result<Vec<VersionRecord>, StoreError> {
        history::load(self.storage.as_ref(), belief_id, branch).await
    }

    /// Point lookup by ordinal or semantic version.
    pub async fn get(
        &self,
        belief_id: &BeliefId,
        branch: &BranchName,
        selector: VersionSelector,
    ) -> Result<Option<VersionRecord>, StoreError> {
        let records = history::load(self.storage.as_ref(), belief_id, branch).await?;
        Ok(history::resolve(&records, selector).cloned())
    }

    /// Restore an earlier version's content as a new forward version.
    ///
    /// History is never truncated: the target's text is re-committed with
    /// `ChangeType::Rollback` and provenance naming the restored ordinal.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionNotFound`] if the selector resolves to
    /// nothing on this branch.
    pub async fn rollback(
        &self,
        belief_id: &BeliefId,
        branch: &BranchName,
        target: VersionSelector,
        author: &str,
    ) -> Result<VersionRecord, StoreError> {
        let records = history::load(self.storage.as_ref(), belief_id, branch).await?;
        let source = history::resolve(&records, target)
            .ok_or_else(|| StoreError::VersionNotFound(target.to_string()))?
            .clone();

        self.commit_with(
            belief_id,
            branch,
            &source.text,
            author,
            CommitOptions {
                change_type: Some(ChangeType::Rollback),
                summary: Some(format!("Rolled back to version {}", source.ordinal)),
                rollback_of: Some(source.ordinal),
                ..CommitOptions::default()
            },
        )
        .await
    }

    /// Compare two versions on the same branch.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionNotFound`] if either selector resolves
    /// to nothing.
    pub async fn diff(
        &self,
        belief_id: &BeliefId,
        branch: &BranchName,
        from: VersionSelector,
        to: VersionSelector,
    ) -> Result<DiffReport, StoreError> {
        let records = history::load(self.storage.as_ref(), belief_id, branch).await?;
        let left = history::resolve(&records, from)
            .ok_or_else(|| StoreError::VersionNotFound(from.to_string()))?;
        let right = history::resolve(&records, to)
            .ok_or_else(|| StoreError::VersionNotFound(to.to_string()))?;

        let diff = TextDiff::from_lines(left.text.as_str(), right.text.as_str());
        let unified_diff = diff
            .unified_diff()
            .context_radius(self.config.diff_context_radius)
            .header(
                &format!("{branch}@{}", left.ordinal),
                &format!("{branch}@{}", right.ordinal),
            )
            .to_string();

        Ok(DiffReport {
            belief_id: belief_id.clone(),
            branch: branch.clone(),
            from: VersionMeta::from(left),
            to: VersionMeta::from(right),
            unified_diff,
            similarity: ChangeClassifier::similarity(&left.text, &right.text),
        })
    }

    fn commit_lock(&self, belief_id: &BeliefId, branch: &BranchName) -> Arc<Mutex<()>> {
        let mut locks = self.commit_locks.lock().expect("commit lock registry");
        locks
            .entry((belief_id.clone(), branch.clone()))
            .or_default()
            .clone()
    }
}
