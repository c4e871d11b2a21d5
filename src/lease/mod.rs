//! lease
//!
//! Advisory write leases on beliefs.
//!
//! # Architecture
//!
//! Leases express application-level intent: which caller is allowed to
//! write a belief across a multi-step operation. They are advisory - the
//! version store independently serializes commits per (belief, branch),
//! so leases are not required for history correctness, only for
//! coordinating callers.
//!
//! # Expiry Policy
//!
//! Expiry is passive; there is no background reaper. The contract is:
//!
//! - `acquire` treats expired leases as absent when checking for
//!   conflicts, and prunes them while it holds the table lock
//! - `list` returns all recorded leases, including any that expired since
//!   the last acquire; read paths that must not act on stale state filter
//!   with [`Lease::is_expired`] themselves
//!
//! # Invariants
//!
//! - At most one active exclusive lease per belief
//! - An active exclusive lease excludes all shared leases, and vice versa
//! - Any number of shared leases may coexist
//!
//! # Example
//!
//! ```
//! use credence::core::types::{BeliefId, LeaseKind};
//! use credence::lease::LeaseManager;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let leases = LeaseManager::new(Duration::from_secs(60));
//! let belief = BeliefId::new("b1").unwrap();
//!
//! let lease = leases
//!     .acquire(&belief, "agent-a", LeaseKind::Exclusive, None)
//!     .await
//!     .unwrap();
//!
//! // A second writer is refused while the lease is active
//! let denied = leases
//!     .acquire(&belief, "agent-b", LeaseKind::Shared, None)
//!     .await;
//! assert!(denied.is_err());
//!
//! leases.release(&belief, "agent-a", Some(lease.lease_id)).await.unwrap();
//! # });
//! ```

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::core::types::{BeliefId, LeaseKind, UtcTimestamp};

/// Errors from lease operations.
#[derive(Debug, Error)]
pub enum LeaseError {
    /// The requested lease conflicts with an active lease.
    #[error("lease conflict on {belief_id}: {holder} holds a {held_kind} lease")]
    Conflict {
        /// Belief the lease was requested on
        belief_id: BeliefId,
        /// Owner of the conflicting lease
        holder: String,
        /// Kind of the conflicting lease
        held_kind: LeaseKind,
    },

    /// No matching lease to release.
    #[error("no lease held by {owner} on {belief_id}")]
    NotFound {
        /// Belief the release targeted
        belief_id: BeliefId,
        /// Owner that held nothing
        owner: String,
    },
}

/// An advisory time-bounded write permission on a belief.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Unique id for targeted release.
    pub lease_id: Uuid,
    /// Belief this lease covers.
    pub belief_id: BeliefId,
    /// Caller that holds the lease.
    pub owner: String,
    /// Exclusive or shared.
    pub kind: LeaseKind,
    /// When the lease was granted.
    pub acquired_at: UtcTimestamp,
    /// When the lease stops being active.
    pub expires_at: UtcTimestamp,
}

impl Lease {
    /// Whether this lease has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        *self.expires_at.as_datetime() <= Utc::now()
    }
}

/// Grants and tracks leases per belief.
///
/// State is held in memory: leases are ephemeral coordination artifacts,
/// not durable history, and a process restart revoking them is the
/// conservative outcome.
#[derive(Debug)]
pub struct LeaseManager {
    leases: Mutex<HashMap<BeliefId, Vec<Lease>>>,
    default_ttl: Duration,
}

impl LeaseManager {
    /// Create a lease manager with the given default TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            leases: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Acquire a lease on a belief.
    ///
    /// With `ttl = None` the manager's default TTL applies. Expired leases
    /// are treated as absent for the conflict check and pruned in passing.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::Conflict`] if an exclusive lease is requested
    /// while any active lease exists, or a shared lease is requested while
    /// an active exclusive lease exists.
    pub async fn acquire(
        &self,
        belief_id: &BeliefId,
        owner: &str,
        kind: LeaseKind,
        ttl: Option<Duration>,
    ) -> Result<Lease, LeaseError> {
        let mut table = self.leases.lock().await;
        let entry = table.entry(belief_id.clone()).or_default();

        // Lazy invalidation: drop expired leases while we hold the lock.
        entry.retain(|lease| !lease.is_expired());

        let conflict = entry.iter().find(|held| {
            kind == LeaseKind::Exclusive || held.kind == LeaseKind::Exclusive
        });
        if let Some(held) = conflict {
            return Err(LeaseError::Conflict {
                belief_id: belief_id.clone(),
                holder: held.owner.clone(),
                held_kind: held.kind,
            });
        }

        let ttl = ttl.unwrap_or(self.default_ttl);
        let now = Utc::now();
        let lease = Lease {
            lease_id: Uuid::new_v4(),
            belief_id: belief_id.clone(),
            owner: owner.to_string(),
            kind,
            acquired_at: UtcTimestamp::from_datetime(now),
            expires_at: UtcTimestamp::from_datetime(expiry(now, ttl)),
        };
        debug!(belief = %belief_id, owner, %kind, ttl_secs = ttl.as_secs(), "lease acquired");
        entry.push(lease.clone());
        Ok(lease)
    }

    /// Release leases held by `owner` on a belief.
    ///
    /// With a `lease_id`, releases only that lease (and only if `owner`
    /// holds it); otherwise releases every lease `owner` holds on the
    /// belief. Returns the number of leases released.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::NotFound`] if no matching lease exists.
    pub async fn release(
        &self,
        belief_id: &BeliefId,
        owner: &str,
        lease_id: Option<Uuid>,
    ) -> Result<usize, LeaseError> {
        let mut table = self.leases.lock().await;
        let entry = table.entry(belief_id.clone()).or_default();

        let before = entry.len();
        entry.retain(|lease| {
            let matches = lease.owner == owner
                && lease_id.map_or(true, |id| lease.lease_id == id);
            !matches
        });
        let released = before - entry.len();

        if released == 0 {
            return Err(LeaseError::NotFound {
                belief_id: belief_id.clone(),
                owner: owner.to_string(),
            });
        }
        debug!(belief = %belief_id, owner, released, "lease released");
        Ok(released)
    }

    /// All recorded leases on a belief.
    ///
    /// May include leases that have expired since the last acquire; callers
    /// on read paths filter with [`Lease::is_expired`].
    pub async fn list(&self, belief_id: &BeliefId) -> Vec<Lease> {
        self.leases
            .lock()
            .await
            .get(belief_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// Expiry instant for a lease granted at `now`, saturating on overflow.
fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now.checked_add_signed(chrono::Duration::milliseconds(ttl_ms))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn belief(id: &str) -> BeliefId {
        BeliefId::new(id).unwrap()
    }

    fn manager() -> LeaseManager {
        LeaseManager::new(Duration::from_secs(60))
    }

    mod acquire {
        use super::*;

        #[tokio::test]
        async fn exclusive_then_exclusive_conflicts() {
            let leases = manager();
            let b = belief("b1");
            leases
                .acquire(&b, "a", LeaseKind::Exclusive, None)
                .await
                .unwrap();
            let err = leases
                .acquire(&b, "b", LeaseKind::Exclusive, None)
                .await
                .unwrap_err();
            assert!(matches!(err, LeaseError::Conflict { .. }));
        }

        #[tokio::test]
        async fn exclusive_excludes_shared() {
            let leases = manager();
            let b = belief("b1");
            leases
                .acquire(&b, "a", LeaseKind::Exclusive, None)
                .await
                .unwrap();
            assert!(leases
                .acquire(&b, "b", LeaseKind::Shared, None)
                .await
                .is_err());
        }

        #[tokio::test]
        async fn shared_excludes_exclusive() {
            let leases = manager();
            let b = belief("b1");
            leases
                .acquire(&b, "a", LeaseKind::Shared, None)
                .await
                .unwrap();
            assert!(leases
                .acquire(&b, "b", LeaseKind::Exclusive, None)
                .await
                .is_err());
        }

        #[tokio::test]
        async fn shared_leases_coexist() {
            let leases = manager();
            let b = belief("b1");
            leases
                .acquire(&b, "a", LeaseKind::Shared, None)
                .await
                .unwrap();
            leases
                .acquire(&b, "b", LeaseKind::Shared, None)
                .await
                .unwrap();
            assert_eq!(leases.list(&b).await.len(), 2);
        }

        #[tokio::test]
        async fn distinct_beliefs_are_independent() {
            let leases = manager();
            leases
                .acquire(&belief("b1"), "a", LeaseKind::Exclusive, None)
                .await
                .unwrap();
            leases
                .acquire(&belief("b2"), "b", LeaseKind::Exclusive, None)
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn expired_lease_does_not_block() {
            let leases = manager();
            let b = belief("b1");
            leases
                .acquire(&b, "a", LeaseKind::Exclusive, Some(Duration::ZERO))
                .await
                .unwrap();
            // Already expired; a new exclusive acquire must succeed.
            leases
                .acquire(&b, "b", LeaseKind::Exclusive, None)
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn acquire_prunes_expired_leases() {
            let leases = manager();
            let b = belief("b1");
            leases
                .acquire(&b, "a", LeaseKind::Shared, Some(Duration::ZERO))
                .await
                .unwrap();
            leases
                .acquire(&b, "b", LeaseKind::Shared, None)
                .await
                .unwrap();
            let listed = leases.list(&b).await;
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].owner, "b");
        }
    }

    mod release {
        use super::*;

        #[tokio::test]
        async fn release_by_id() {
            let leases = manager();
            let b = belief("b1");
            let lease = leases
                .acquire(&b, "a", LeaseKind::Exclusive, None)
                .await
                .unwrap();
            let released = leases
                .release(&b, "a", Some(lease.lease_id))
                .await
                .unwrap();
            assert_eq!(released, 1);
            assert!(leases.list(&b).await.is_empty());
        }

        #[tokio::test]
        async fn release_all_for_owner() {
            let leases = manager();
            let b = belief("b1");
            leases
                .acquire(&b, "a", LeaseKind::Shared, None)
                .await
                .unwrap();
            leases
                .acquire(&b, "a", LeaseKind::Shared, None)
                .await
                .unwrap();
            leases
                .acquire(&b, "other", LeaseKind::Shared, None)
                .await
                .unwrap();
            let released = leases.release(&b, "a", None).await.unwrap();
            assert_eq!(released, 2);
            assert_eq!(leases.list(&b).await.len(), 1);
        }

        #[tokio::test]
        async fn release_nothing_is_not_found() {
            let leases = manager();
            let err = leases.release(&belief("b1"), "a", None).await.unwrap_err();
            assert!(matches!(err, LeaseError::NotFound { .. }));
        }

        #[tokio::test]
        async fn release_wrong_owner_is_not_found() {
            let leases = manager();
            let b = belief("b1");
            let lease = leases
                .acquire(&b, "a", LeaseKind::Exclusive, None)
                .await
                .unwrap();
            let err = leases
                .release(&b, "b", Some(lease.lease_id))
                .await
                .unwrap_err();
            assert!(matches!(err, LeaseError::NotFound { .. }));
            assert_eq!(leases.list(&b).await.len(), 1);
        }

        #[tokio::test]
        async fn released_exclusive_unblocks_next_writer() {
            let leases = manager();
            let b = belief("b1");
            leases
                .acquire(&b, "a", LeaseKind::Exclusive, None)
                .await
                .unwrap();
            leases.release(&b, "a", None).await.unwrap();
            leases
                .acquire(&b, "b", LeaseKind::Exclusive, None)
                .await
                .unwrap();
        }
    }

    mod list {
        use super::*;

        #[tokio::test]
        async fn unknown_belief_lists_empty() {
            let leases = manager();
            assert!(leases.list(&belief("nope")).await.is_empty());
        }

        #[tokio::test]
        async fn list_may_include_expired() {
            let leases = manager();
            let b = belief("b1");
            leases
                .acquire(&b, "a", LeaseKind::Shared, Some(Duration::ZERO))
                .await
                .unwrap();
            // No acquire has run since expiry, so the stale entry is still
            // recorded; callers must filter with is_expired.
            let listed = leases.list(&b).await;
            assert_eq!(listed.len(), 1);
            assert!(listed[0].is_expired());
        }
    }
}
