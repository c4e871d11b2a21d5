//! graph
//!
//! Bidirectional dependency adjacency between beliefs.
//!
//! # Architecture
//!
//! Each belief stores both sides of its edges: `depends_on` (beliefs this
//! one is built on) and `depended_by` (beliefs built on this one). The
//! redundancy buys O(1) traversal in both directions; the cost is that
//! every update must touch both endpoints of every changed edge.
//!
//! # Invariants
//!
//! - Symmetry: A lists B in `depends_on` exactly when B lists A in
//!   `depended_by`
//! - Updates are atomic with respect to readers: a reader never observes
//!   one endpoint of an edge without the other. All access goes through a
//!   graph-wide `RwLock`; writers hold it across every storage write of a
//!   single logical update
//! - Self-edges are not representable; a belief in its own target set is
//!   ignored
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use std::sync::Arc;
//!
//! use credence::core::types::BeliefId;
//! use credence::graph::DependencyGraph;
//! use credence::storage::MemoryStorage;
//!
//! # tokio_test::block_on(async {
//! let graph = DependencyGraph::new(Arc::new(MemoryStorage::new()));
//! let x = BeliefId::new("x").unwrap();
//! let y = BeliefId::new("y").unwrap();
//!
//! let delta = graph
//!     .set_depends_on(&x, BTreeSet::from([y.clone()]))
//!     .await
//!     .unwrap();
//! assert_eq!(delta.added.len(), 1);
//!
//! let links = graph.get(&y).await.unwrap();
//! assert!(links.depended_by.contains(&x));
//! # });
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::core::types::BeliefId;
use crate::storage::{Storage, StorageError};

/// Errors from dependency graph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Failed to parse a stored dependency record.
    #[error("failed to parse dependency record: {0}")]
    ParseError(String),

    /// Failed to serialize a dependency record.
    #[error("failed to serialize dependency record: {0}")]
    SerializeError(String),
}

/// Both directions of a belief's dependency edges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyLinks {
    /// Beliefs this belief is built on.
    pub depends_on: BTreeSet<BeliefId>,
    /// Beliefs built on this belief.
    pub depended_by: BTreeSet<BeliefId>,
}

/// Edges added and removed by a `set_depends_on` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyDelta {
    /// Targets newly depended on.
    pub added: BTreeSet<BeliefId>,
    /// Targets no longer depended on.
    pub removed: BTreeSet<BeliefId>,
}

/// Storage-backed dependency graph.
pub struct DependencyGraph {
    storage: Arc<dyn Storage>,
    // Guards edge symmetry: a writer updates both endpoints of each edge
    // under the write half, readers take the read half.
    access: RwLock<()>,
}

impl DependencyGraph {
    /// Create a graph over the given storage.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            access: RwLock::new(()),
        }
    }

    fn key(belief_id: &BeliefId) -> String {
        format!("belief/{belief_id}/deps")
    }

    /// Replace a belief's `depends_on` set.
    ///
    /// Computes the symmetric difference against the current set, updates
    /// this belief's `depends_on`, and updates `depended_by` on every
    /// added and removed target within the same logical transaction. The
    /// belief itself is ignored if present in `targets`.
    pub async fn set_depends_on(
        &self,
        belief_id: &BeliefId,
        mut targets: BTreeSet<BeliefId>,
    ) -> Result<DependencyDelta, GraphError> {
        targets.remove(belief_id);

        let _guard = self.access.write().await;

        let mut subject = self.load(belief_id).await?;
        let added: BTreeSet<BeliefId> = targets.difference(&subject.depends_on).cloned().collect();
        let removed: BTreeSet<BeliefId> =
            subject.depends_on.difference(&targets).cloned().collect();

        if added.is_empty() && removed.is_empty() {
            return Ok(DependencyDelta::default());
        }

        subject.depends_on = targets;
        self.save(belief_id, &subject).await?;

        for target in &added {
            let mut links = self.load(target).await?;
            links.depended_by.insert(belief_id.clone());
            self.save(target, &links).await?;
        }
        for target in &removed {
            let mut links = self.load(target).await?;
            links.depended_by.remove(belief_id);
            self.save(target, &links).await?;
        }

        debug!(
            belief = %belief_id,
            added = added.len(),
            removed = removed.len(),
            "dependency edges updated"
        );
        Ok(DependencyDelta { added, removed })
    }

    /// Both edge directions for a belief.
    ///
    /// Unknown beliefs return empty sets, never an error.
    pub async fn get(&self, belief_id: &BeliefId) -> Result<DependencyLinks, GraphError> {
        let _guard = self.access.read().await;
        self.load(belief_id).await
    }

    async fn load(&self, belief_id: &BeliefId) -> Result<DependencyLinks, GraphError> {
        let key = Self::key(belief_id);
        match self.storage.get(&key).await? {
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| GraphError::ParseError(e.to_string()))
            }
            None => Ok(DependencyLinks::default()),
        }
    }

    async fn save(&self, belief_id: &BeliefId, links: &DependencyLinks) -> Result<(), GraphError> {
        let bytes =
            serde_json::to_vec(links).map_err(|e| GraphError::SerializeError(e.to_string()))?;
        self.storage.put(&Self::key(belief_id), bytes).await?;
        Ok(())
    }
}
