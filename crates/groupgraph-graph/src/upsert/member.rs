//! Member upserts.
//!
//! Creates nodes and relationships:
//! - (:Member {user_id})
//! - (:Group)-[:HAS_MEMBER]->(:Member)

use tracing::debug;

use groupgraph_core::model::Member;
use groupgraph_core::GgResult;

use super::{UpsertEngine, UpsertStats};
use crate::store::Write;

impl UpsertEngine<'_> {
    /// Merge a member by `user_id` and link it to `group_id`.
    ///
    /// The membership edge is skipped when the group is not in the graph.
    pub async fn upsert_member(&self, member: &Member, group_id: &str) -> GgResult<UpsertStats> {
        debug!(user_id = %member.user_id, group_id, "Upserting member");

        self.commit(&[
            Write::MergeMember(member.clone()),
            Write::LinkMembership {
                group_id: group_id.to_string(),
                user_id: member.user_id.clone(),
            },
        ])
        .await?;

        Ok(UpsertStats {
            members: 1,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use groupgraph_core::model::Group;

    use crate::store::{EdgeKind, MemoryGraph};
    use crate::upsert::UpsertEngine;

    use super::*;

    fn member(user_id: &str, nickname: &str) -> Member {
        Member {
            id: format!("m-{user_id}"),
            user_id: user_id.to_string(),
            nickname: nickname.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_membership_needs_group() {
        let store = MemoryGraph::new();
        let engine = UpsertEngine::new(&store);

        engine.upsert_member(&member("u1", "Ann"), "missing").await.unwrap();

        assert!(store.member("u1").is_some());
        assert!(store.edges(EdgeKind::HasMember).is_empty());
    }

    #[tokio::test]
    async fn test_match_refreshes_nickname_only_once_per_key() {
        let store = MemoryGraph::new();
        let engine = UpsertEngine::new(&store);
        let group = Group {
            id: "g1".to_string(),
            ..Default::default()
        };
        engine.upsert_group(&group).await.unwrap();

        engine.upsert_member(&member("u1", "Ann"), "g1").await.unwrap();
        engine.upsert_member(&member("u1", "Annie"), "g1").await.unwrap();

        let stored = store.member("u1").unwrap();
        assert_eq!(stored.nickname, "Annie");
        assert_eq!(stored.id, "m-u1");
        assert_eq!(store.edges(EdgeKind::HasMember), vec![("g1".to_string(), "u1".to_string())]);
    }
}
