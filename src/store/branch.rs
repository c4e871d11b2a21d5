//! store::branch
//!
//! Branch records and the branch manager.
//!
//! # Architecture
//!
//! Branch records for a belief are stored together in one blob keyed
//! `belief/<id>/branches`. Each record tracks the branch head ordinal, an
//! optional lock, and provenance for branches forked from another branch.
//!
//! # Invariants
//!
//! - `head_ordinal` always equals the highest ordinal in the branch's
//!   history; it is advanced only by the version store after a successful
//!   commit
//! - Branch names are unique per belief; `create` refuses duplicates
//! - A locked branch refuses commits until unlocked

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{history, StoreError};
use crate::core::selector::VersionSelector;
use crate::core::types::{BeliefId, BranchName, ChangeType, UtcTimestamp};
use crate::storage::Storage;

/// Provenance of a branch forked from another branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchPoint {
    /// Branch the fork was taken from.
    pub branch: BranchName,
    /// Ordinal of the source version.
    pub ordinal: u64,
    /// When the branch was created.
    pub timestamp: UtcTimestamp,
}

/// Mutable per-branch state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchRecord {
    /// Branch name, unique per belief.
    pub name: BranchName,
    /// Highest ordinal present in the branch history; 0 when empty.
    pub head_ordinal: u64,
    /// Locked branches refuse commits.
    pub locked: bool,
    /// Set for branches forked from another branch; `None` for histories
    /// started by a direct commit (including `main`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_from: Option<BranchPoint>,
}

impl BranchRecord {
    fn empty(name: BranchName) -> Self {
        Self {
            name,
            head_ordinal: 0,
            locked: false,
            created_from: None,
        }
    }
}

type BranchMap = BTreeMap<BranchName, BranchRecord>;

/// Creates branches and tracks head pointers.
pub struct BranchManager {
    storage: Arc<dyn Storage>,
}

impl BranchManager {
    /// Create a branch manager over the given storage.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    fn key(belief_id: &BeliefId) -> String {
        format!("belief/{belief_id}/branches")
    }

    /// Idempotently ensure a branch record exists, with head 0 if new.
    pub async fn ensure(
        &self,
        belief_id: &BeliefId,
        branch: &BranchName,
    ) -> Result<BranchRecord, StoreError> {
        let mut map = self.load(belief_id).await?;
        if let Some(record) = map.get(branch) {
            return Ok(record.clone());
        }
        let record = BranchRecord::empty(branch.clone());
        map.insert(branch.clone(), record.clone());
        self.save(belief_id, &map).await?;
        debug!(belief = %belief_id, branch = %branch, "branch record created");
        Ok(record)
    }

    /// Look up a branch record.
    pub async fn get(
        &self,
        belief_id: &BeliefId,
        branch: &BranchName,
    ) -> Result<Option<BranchRecord>, StoreError> {
        Ok(self.load(belief_id).await?.get(branch).cloned())
    }

    /// All branch records for a belief, ordered by name.
    pub async fn list(&self, belief_id: &BeliefId) -> Result<Vec<BranchRecord>, StoreError> {
        Ok(self.load(belief_id).await?.into_values().collect())
    }

    /// Create a branch from an existing version.
    ///
    /// The new branch's history is seeded with a copy of the source
    /// version as its ordinal 1, so the branch is immediately committable
    /// and its semantic versions continue from the fork point. With no
    /// `from_selector`, the source branch head is used.
    ///
    /// # Errors
    ///
    /// - [`StoreError::BranchExists`] if `name` already exists for this belief
    /// - [`StoreError::BranchNotFound`] if the source branch has no history
    /// - [`StoreError::VersionNotFound`] if the selector resolves to nothing
    pub async fn create(
        &self,
        belief_id: &BeliefId,
        name: &BranchName,
        from_branch: &BranchName,
        from_selector: Option<VersionSelector>,
    ) -> Result<BranchRecord, StoreError> {
        let mut map = self.load(belief_id).await?;
        if map.contains_key(name) {
            return Err(StoreError::BranchExists(name.to_string()));
        }

        let source_history = history::load(self.storage.as_ref(), belief_id, from_branch).await?;
        if source_history.is_empty() {
            return Err(StoreError::BranchNotFound(from_branch.to_string()));
        }
        let source = match from_selector {
            Some(selector) => history::resolve(&source_history, selector)
                .ok_or_else(|| StoreError::VersionNotFound(selector.to_string()))?,
            None => source_history
                .last()
                .expect("non-empty history has a last record"),
        };

        let now = UtcTimestamp::now();
        let mut seed = source.clone();
        seed.ordinal = 1;
        seed.previous_ordinal = None;
        seed.branch = name.clone();
        seed.change_type = ChangeType::Creation;
        seed.change_summary = format!("Branched from {from_branch}@{}", source.ordinal);
        seed.timestamp = now;
        history::save(self.storage.as_ref(), belief_id, name, &[seed]).await?;

        let record = BranchRecord {
            name: name.clone(),
            head_ordinal: 1,
            locked: false,
            created_from: Some(BranchPoint {
                branch: from_branch.clone(),
                ordinal: source.ordinal,
                timestamp: now,
            }),
        };
        map.insert(name.clone(), record.clone());
        self.save(belief_id, &map).await?;
        info!(
            belief = %belief_id,
            branch = %name,
            from = %from_branch,
            at = source.ordinal,
            "branch created"
        );
        Ok(record)
    }

    /// Advance a branch head after a successful commit.
    ///
    /// Invoked exclusively by the version store; not part of the public
    /// surface.
    pub(crate) async fn set_head(
        &self,
        belief_id: &BeliefId,
        branch: &BranchName,
        ordinal: u64,
    ) -> Result<(), StoreError> {
        let mut map = self.load(belief_id).await?;
        let record = map
            .get_mut(branch)
            .ok_or_else(|| StoreError::BranchNotFound(branch.to_string()))?;
        record.head_ordinal = ordinal;
        self.save(belief_id, &map).await
    }

    /// Lock a branch against commits.
    pub async fn lock(&self, belief_id: &BeliefId, branch: &BranchName) -> Result<(), StoreError> {
        self.set_locked(belief_id, branch, true).await
    }

    /// Unlock a branch.
    pub async fn unlock(
        &self,
        belief_id: &BeliefId,
        branch: &BranchName,
    ) -> Result<(), StoreError> {
        self.set_locked(belief_id, branch, false).await
    }

    async fn set_locked(
        &self,
        belief_id: &BeliefId,
        branch: &BranchName,
        locked: bool,
    ) -> Result<(), StoreError> {
        let mut map = self.load(belief_id).await?;
        let record = map
            .get_mut(branch)
            .ok_or_else(|| StoreError::BranchNotFound(branch.to_string()))?;
        record.locked = locked;
        self.save(belief_id, &map).await?;
        debug!(belief = %belief_id, branch = %branch, locked, "branch lock state changed");
        Ok(())
    }

    async fn load(&self, belief_id: &BeliefId) -> Result<BranchMap, StoreError> {
        match self.storage.get(&Self::key(belief_id)).await? {
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StoreError::ParseError(e.to_string()))
            }
            None => Ok(BranchMap::new()),
        }
    }

    async fn save(&self, belief_id: &BeliefId, map: &BranchMap) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(map).map_err(|e| StoreError::SerializeError(e.to_string()))?;
        self.storage.put(&Self::key(belief_id), bytes).await?;
        Ok(())
    }
}
