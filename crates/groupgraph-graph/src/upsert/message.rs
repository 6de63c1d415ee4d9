//! Message upserts.
//!
//! Creates nodes and relationships:
//! - (:Message {id})
//! - (:Group)-[:CONTAINS]->(:Message)
//! - (:Member)-[:AUTHORED]->(:Message)
//! - (:Member)-[:FAVORITED]->(:Message)
//! - (:Message)-[:REPLIED_BY]->(:Message) between neighbours in a group
//! - (:Message)-[:ATTACHMENT]->(:Attachment)

use tracing::debug;

use groupgraph_core::model::Message;
use groupgraph_core::GgResult;

use super::{UpsertEngine, UpsertStats};
use crate::store::Write;

impl UpsertEngine<'_> {
    /// Merge a message and its relationships.
    ///
    /// The node, its edges and its place in the reply chain commit together;
    /// attachments follow in a second unit of work.
    pub async fn upsert_message(&self, message: &Message) -> GgResult<UpsertStats> {
        debug!(message_id = %message.id, group_id = %message.group_id, "Upserting message");

        let id = || message.id.clone();
        let node = Message {
            attachments: Vec::new(),
            ..message.clone()
        };
        self.commit(&[
            Write::MergeMessage(node),
            Write::LinkContainment { message_id: id() },
            Write::LinkAuthorship { message_id: id() },
            Write::LinkFavorites { message_id: id() },
            Write::SpliceReplyChain { message_id: id() },
        ])
        .await?;

        let attachments: Vec<Write> = message
            .attachments
            .iter()
            .map(|attachment| Write::MergeAttachment {
                message_id: id(),
                attachment: attachment.properties(),
            })
            .collect();
        if !attachments.is_empty() {
            self.commit(&attachments).await?;
        }

        Ok(UpsertStats {
            messages: 1,
            attachments: attachments.len(),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use groupgraph_core::model::{Attachment, Group, Member};

    use crate::store::{EdgeKind, GraphStore, MemoryGraph};
    use crate::upsert::UpsertEngine;

    use super::*;

    fn message(id: &str, created_at: i64) -> Message {
        Message {
            id: id.to_string(),
            created_at,
            user_id: "u1".to_string(),
            group_id: "g1".to_string(),
            text: format!("text {id}"),
            ..Default::default()
        }
    }

    async fn seeded() -> MemoryGraph {
        let store = MemoryGraph::new();
        let group = Group {
            id: "g1".to_string(),
            members: vec![
                Member {
                    user_id: "u1".to_string(),
                    ..Default::default()
                },
                Member {
                    user_id: "u2".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        UpsertEngine::new(&store).upsert_group(&group).await.unwrap();
        store
    }

    fn chain(store: &MemoryGraph) -> Vec<(String, String)> {
        store.edges(EdgeKind::RepliedBy)
    }

    fn pairs(ids: &[(&str, &str)]) -> Vec<(String, String)> {
        ids.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    #[tokio::test]
    async fn test_links_group_and_author() {
        let store = seeded().await;
        UpsertEngine::new(&store).upsert_message(&message("m1", 10)).await.unwrap();

        assert!(store.has_edge(EdgeKind::Contains, "g1", "m1"));
        assert!(store.has_edge(EdgeKind::Authored, "u1", "m1"));
    }

    #[tokio::test]
    async fn test_unknown_author_is_a_no_op() {
        let store = seeded().await;
        let mut m = message("m1", 10);
        m.user_id = "stranger".to_string();

        UpsertEngine::new(&store).upsert_message(&m).await.unwrap();

        assert!(store.message("m1").is_some());
        assert!(store.edges(EdgeKind::Authored).is_empty());
        assert!(store.has_edge(EdgeKind::Contains, "g1", "m1"));
    }

    #[tokio::test]
    async fn test_match_refreshes_favorites_not_created_at() {
        let store = seeded().await;
        let engine = UpsertEngine::new(&store);
        engine.upsert_message(&message("m1", 100)).await.unwrap();

        let mut again = message("m1", 555);
        again.text = "edited".to_string();
        again.favorited_by = vec!["u2".to_string()];
        engine.upsert_message(&again).await.unwrap();

        let stored = store.message("m1").unwrap();
        assert_eq!(stored.created_at, 100);
        assert_eq!(stored.text, "text m1");
        assert_eq!(stored.favorited_by, vec!["u2".to_string()]);
        assert!(store.has_edge(EdgeKind::Favorited, "u2", "m1"));

        again.favorited_by.clear();
        engine.upsert_message(&again).await.unwrap();
        assert!(store.edges(EdgeKind::Favorited).is_empty());
    }

    #[tokio::test]
    async fn test_reply_chain_in_order() {
        let store = seeded().await;
        let engine = UpsertEngine::new(&store);
        for (id, ts) in [("m1", 1), ("m2", 2), ("m3", 3)] {
            engine.upsert_message(&message(id, ts)).await.unwrap();
        }
        assert_eq!(chain(&store), pairs(&[("m1", "m2"), ("m2", "m3")]));
    }

    #[tokio::test]
    async fn test_reply_chain_independent_of_order() {
        let expected = pairs(&[("m1", "m2"), ("m2", "m3"), ("m3", "m4")]);
        let orders: [[(&str, i64); 4]; 3] = [
            [("m4", 4), ("m3", 3), ("m2", 2), ("m1", 1)],
            [("m2", 2), ("m4", 4), ("m1", 1), ("m3", 3)],
            [("m3", 3), ("m1", 1), ("m4", 4), ("m2", 2)],
        ];
        for order in orders {
            let store = seeded().await;
            let engine = UpsertEngine::new(&store);
            for (id, ts) in order {
                engine.upsert_message(&message(id, ts)).await.unwrap();
            }
            assert_eq!(chain(&store), expected, "order {order:?}");
        }
    }

    #[tokio::test]
    async fn test_reply_chain_breaks_ties_on_id() {
        let store = seeded().await;
        let engine = UpsertEngine::new(&store);
        engine.upsert_message(&message("b", 5)).await.unwrap();
        engine.upsert_message(&message("a", 5)).await.unwrap();
        assert_eq!(chain(&store), pairs(&[("a", "b")]));
    }

    #[tokio::test]
    async fn test_attachments_are_content_addressed() {
        let store = seeded().await;
        let engine = UpsertEngine::new(&store);
        let mut m = message("m1", 1);
        m.attachments = vec![
            Attachment::Image {
                url: "https://i.example/a.png".to_string(),
            },
            Attachment::Split {
                token: "tok".to_string(),
            },
        ];

        let stats = engine.upsert_message(&m).await.unwrap();
        engine.upsert_message(&m).await.unwrap();

        assert_eq!(stats.attachments, 2);
        assert_eq!(store.attachments_of("m1").len(), 2);
        assert_eq!(store.edge_count(EdgeKind::Attachment).await.unwrap(), 2);
        assert!(store.message("m1").unwrap().attachments.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_message_is_idempotent() {
        let store = seeded().await;
        let engine = UpsertEngine::new(&store);
        let mut m = message("m1", 1);
        m.favorited_by = vec!["u2".to_string()];
        engine.upsert_message(&message("m0", 0)).await.unwrap();
        engine.upsert_message(&m).await.unwrap();
        let first = store.counts().await.unwrap();

        engine.upsert_message(&m).await.unwrap();
        engine.upsert_message(&m).await.unwrap();

        assert_eq!(store.counts().await.unwrap(), first);
    }
}
