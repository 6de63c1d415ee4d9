//! The data source a sync run reads from.

use async_trait::async_trait;

use crate::error::GgResult;
use crate::model::{Group, Message};

/// Where a page of messages starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageCursor {
    /// The most recent messages.
    Latest,
    /// Messages older than the given id.
    Before(String),
    /// The most recent messages newer than the given id.
    Since(String),
    /// Messages immediately after the given id.
    After(String),
}

impl MessageCursor {
    /// Query parameter carrying the cursor, if any.
    pub fn query_param(&self) -> Option<(&'static str, &str)> {
        match self {
            MessageCursor::Latest => None,
            MessageCursor::Before(id) => Some(("before_id", id)),
            MessageCursor::Since(id) => Some(("since_id", id)),
            MessageCursor::After(id) => Some(("after_id", id)),
        }
    }
}

/// Read side of the GroupMe API used by the sync driver.
#[async_trait]
pub trait GroupSource: Send + Sync {
    /// One page of the caller's groups.
    async fn groups(&self, page: u32, per_page: u32, omit_memberships: bool) -> GgResult<Vec<Group>>;

    /// One page of a group's messages; empty when the history is exhausted.
    async fn messages(&self, group_id: &str, cursor: &MessageCursor, limit: u32) -> GgResult<Vec<Message>>;
}
