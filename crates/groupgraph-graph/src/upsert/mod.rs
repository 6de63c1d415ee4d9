//! Idempotent upserts of groups, members and messages.
//!
//! Each operation turns one entity into a unit of [`Write`]s and hands it to
//! a [`GraphStore`]. Re-running any of them with the same input leaves the
//! graph unchanged.

mod group;
mod member;
mod message;

use std::time::Duration;

use tracing::warn;

use groupgraph_core::GgResult;

use crate::store::{GraphStore, Write};

pub use group::GroupUpsert;

/// How often a unit of work is attempted when the store reports a
/// transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero behaves like one.
    pub attempts: u32,
    /// Fixed delay between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Try once and surface the first error.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Tally of entities written by one or more upserts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub groups: usize,
    pub members: usize,
    pub messages: usize,
    pub attachments: usize,
}

impl UpsertStats {
    pub fn merge(&mut self, other: &UpsertStats) {
        self.groups += other.groups;
        self.members += other.members;
        self.messages += other.messages;
        self.attachments += other.attachments;
    }
}

/// Writes decoded entities into a [`GraphStore`].
pub struct UpsertEngine<'a> {
    store: &'a dyn GraphStore,
    retry: RetryPolicy,
}

impl<'a> UpsertEngine<'a> {
    pub fn new(store: &'a dyn GraphStore) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Apply one unit of work, retrying transient store failures.
    async fn commit(&self, writes: &[Write]) -> GgResult<()> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.store.apply(writes).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(attempt, attempts, error = %e, "Transient store failure, retrying");
                    tokio::time::sleep(self.retry.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use groupgraph_core::model::Member;
    use groupgraph_core::GroupGraphError;

    use super::*;
    use crate::store::MemoryGraph;

    fn member(user_id: &str) -> Member {
        Member {
            user_id: user_id.to_string(),
            nickname: "Ann".to_string(),
            ..Default::default()
        }
    }

    fn fast_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            backoff: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let store = MemoryGraph::new();
        store.inject_failure(GroupGraphError::transient_store("connection reset"));
        let engine = UpsertEngine::new(&store).with_retry(fast_retry(2));

        engine.upsert_member(&member("u1"), "g1").await.unwrap();

        assert!(store.member("u1").is_some());
        assert_eq!(store.units_applied(), 1);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let store = MemoryGraph::new();
        store.inject_failure(GroupGraphError::transient_store("down"));
        store.inject_failure(GroupGraphError::transient_store("still down"));
        let engine = UpsertEngine::new(&store).with_retry(fast_retry(2));

        let err = engine.upsert_member(&member("u1"), "g1").await.unwrap_err();

        assert!(err.is_transient());
        assert!(store.member("u1").is_none());
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let store = MemoryGraph::new();
        store.inject_failure(GroupGraphError::store("constraint violation"));
        let engine = UpsertEngine::new(&store).with_retry(fast_retry(5));

        assert!(engine.upsert_member(&member("u1"), "g1").await.is_err());
        // The injected failure was consumed once; a second call succeeds.
        engine.upsert_member(&member("u1"), "g1").await.unwrap();
        assert_eq!(store.units_applied(), 1);
    }

    #[test]
    fn test_stats_merge() {
        let mut total = UpsertStats {
            groups: 1,
            members: 2,
            ..Default::default()
        };
        total.merge(&UpsertStats {
            members: 1,
            messages: 4,
            attachments: 1,
            ..Default::default()
        });
        assert_eq!(
            total,
            UpsertStats {
                groups: 1,
                members: 3,
                messages: 4,
                attachments: 1
            }
        );
    }
}
