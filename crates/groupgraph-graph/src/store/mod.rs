//! The seam between the upsert engine and the graph datastore.
//!
//! The engine describes what to write as [`Write`] values. A [`GraphStore`]
//! applies a batch of writes as one unit of work: Neo4j runs each write as a
//! parameterized Cypher statement inside a transaction, [`MemoryGraph`]
//! applies the same merge semantics to an in-process graph.

pub mod cypher;
pub mod memory;
pub mod neo4j;

use async_trait::async_trait;

use groupgraph_core::model::{AttachmentProperties, Group, Member, Message};
use groupgraph_core::GgResult;

use crate::client::GraphCounts;

pub use memory::MemoryGraph;

/// Relationship types maintained in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeKind {
    /// (:Group)-[:HAS_MEMBER]->(:Member)
    HasMember,
    /// (:Group)-[:CONTAINS]->(:Message)
    Contains,
    /// (:Member)-[:AUTHORED]->(:Message)
    Authored,
    /// (:Member)-[:FAVORITED]->(:Message)
    Favorited,
    /// (:Message)-[:REPLIED_BY]->(:Message)
    RepliedBy,
    /// (:Message)-[:ATTACHMENT]->(:Attachment)
    Attachment,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 6] = [
        EdgeKind::HasMember,
        EdgeKind::Contains,
        EdgeKind::Authored,
        EdgeKind::Favorited,
        EdgeKind::RepliedBy,
        EdgeKind::Attachment,
    ];

    /// The Neo4j relationship type.
    pub fn rel_type(&self) -> &'static str {
        match self {
            EdgeKind::HasMember => "HAS_MEMBER",
            EdgeKind::Contains => "CONTAINS",
            EdgeKind::Authored => "AUTHORED",
            EdgeKind::Favorited => "FAVORITED",
            EdgeKind::RepliedBy => "REPLIED_BY",
            EdgeKind::Attachment => "ATTACHMENT",
        }
    }
}

/// One idempotent graph write.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Merge a group by id. The roster is not part of the node.
    MergeGroup(Group),
    /// Merge a member by user id.
    MergeMember(Member),
    /// Link a group to a member; no-op unless both exist.
    LinkMembership { group_id: String, user_id: String },
    /// Merge a message by id. Attachments are written separately.
    MergeMessage(Message),
    /// Link a message to the group named by its `group_id`; no-op if the group is unknown.
    LinkContainment { message_id: String },
    /// Link a message to the member named by its `user_id`; no-op if the member is unknown.
    LinkAuthorship { message_id: String },
    /// Make FAVORITED edges match the message's `favorited_by` list.
    LinkFavorites { message_id: String },
    /// Insert a message into its group's REPLIED_BY chain.
    SpliceReplyChain { message_id: String },
    /// Merge a content-addressed attachment node under a message.
    MergeAttachment {
        message_id: String,
        attachment: AttachmentProperties,
    },
    /// AUTHORED for every message whose author is a known member.
    BackfillAuthorship,
    /// CONTAINS for every message whose group is known.
    BackfillContainment,
    /// FAVORITED for every (member, message) pair listed in `favorited_by`.
    BackfillFavorites,
    /// Rebuild the REPLIED_BY chain of one group from scratch.
    RelinkReplyChain { group_id: String },
}

/// A graph datastore that applies [`Write`]s.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Apply `writes` in order as a single unit of work: either all of them
    /// take effect or none do.
    async fn apply(&self, writes: &[Write]) -> GgResult<()>;

    /// Total node and relationship counts.
    async fn counts(&self) -> GgResult<GraphCounts>;

    /// Number of relationships of one type.
    async fn edge_count(&self, kind: EdgeKind) -> GgResult<usize>;

    /// Distinct `group_id` values found on stored messages.
    async fn message_group_ids(&self) -> GgResult<Vec<String>>;
}
