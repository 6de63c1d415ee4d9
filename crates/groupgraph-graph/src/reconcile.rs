//! Batch relationship reconciliation.
//!
//! Inline upserts skip an edge when its other endpoint is not in the graph
//! yet. A reconcile pass creates every edge that can be derived from stored
//! node properties:
//! - (:Member)-[:AUTHORED]->(:Message) from `message.user_id`
//! - (:Group)-[:CONTAINS]->(:Message) from `message.group_id`
//! - (:Member)-[:FAVORITED]->(:Message) from `message.favorited_by`
//! - the REPLIED_BY chain of every group, rebuilt in timestamp order

use std::collections::BTreeMap;

use tracing::{debug, info};

use groupgraph_core::GgResult;

use crate::store::{EdgeKind, GraphStore, Write};

const BACKFILLED: [EdgeKind; 3] = [EdgeKind::Authored, EdgeKind::Contains, EdgeKind::Favorited];

/// Edges added by one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub authored: usize,
    pub contains: usize,
    pub favorited: usize,
    /// Net change in REPLIED_BY edges; negative when stale links were removed.
    pub reply_chain_edges: i64,
    pub groups_relinked: usize,
}

impl ReconcileReport {
    pub fn total_added(&self) -> usize {
        self.authored + self.contains + self.favorited + self.reply_chain_edges.max(0) as usize
    }
}

/// Backfill derivable relationships. Safe to re-run; a second pass adds nothing.
pub async fn reconcile(store: &dyn GraphStore) -> GgResult<ReconcileReport> {
    info!("Reconciling relationships");

    let mut before = BTreeMap::new();
    for kind in BACKFILLED {
        before.insert(kind, store.edge_count(kind).await?);
    }

    store
        .apply(&[
            Write::BackfillAuthorship,
            Write::BackfillContainment,
            Write::BackfillFavorites,
        ])
        .await?;

    let added = |kind: EdgeKind, after: usize| after.saturating_sub(before.get(&kind).copied().unwrap_or(0));
    let mut report = ReconcileReport {
        authored: added(EdgeKind::Authored, store.edge_count(EdgeKind::Authored).await?),
        contains: added(EdgeKind::Contains, store.edge_count(EdgeKind::Contains).await?),
        favorited: added(EdgeKind::Favorited, store.edge_count(EdgeKind::Favorited).await?),
        ..Default::default()
    };

    let chain_before = store.edge_count(EdgeKind::RepliedBy).await?;
    for group_id in store.message_group_ids().await? {
        debug!(group_id = %group_id, "Relinking reply chain");
        store.apply(&[Write::RelinkReplyChain { group_id }]).await?;
        report.groups_relinked += 1;
    }
    let chain_after = store.edge_count(EdgeKind::RepliedBy).await?;
    report.reply_chain_edges = chain_after as i64 - chain_before as i64;

    info!(
        authored = report.authored,
        contains = report.contains,
        favorited = report.favorited,
        reply_chain = report.reply_chain_edges,
        groups = report.groups_relinked,
        "Reconcile complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use groupgraph_core::model::{Group, Member, Message};

    use super::*;
    use crate::store::MemoryGraph;
    use crate::upsert::UpsertEngine;

    fn message(id: &str, created_at: i64, user_id: &str) -> Message {
        Message {
            id: id.to_string(),
            created_at,
            user_id: user_id.to_string(),
            group_id: "g1".to_string(),
            favorited_by: vec!["u2".to_string()],
            ..Default::default()
        }
    }

    fn group() -> Group {
        Group {
            id: "g1".to_string(),
            members: ["u1", "u2"]
                .into_iter()
                .map(|user_id| Member {
                    user_id: user_id.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_backfills_edges_for_late_endpoints() {
        let store = MemoryGraph::new();
        let engine = UpsertEngine::new(&store);
        // Messages arrive before their group and authors.
        engine.upsert_message(&message("m1", 1, "u1")).await.unwrap();
        engine.upsert_message(&message("m2", 2, "u2")).await.unwrap();
        engine.upsert_group(&group()).await.unwrap();
        assert!(store.edges(EdgeKind::Authored).is_empty());

        let report = reconcile(&store).await.unwrap();

        assert_eq!(report.authored, 2);
        assert_eq!(report.contains, 2);
        assert_eq!(report.favorited, 2);
        assert_eq!(report.groups_relinked, 1);
        assert!(store.has_edge(EdgeKind::Authored, "u1", "m1"));
        assert!(store.has_edge(EdgeKind::Authored, "u2", "m2"));
        assert!(store.has_edge(EdgeKind::Contains, "g1", "m2"));
        assert!(store.has_edge(EdgeKind::Favorited, "u2", "m1"));
    }

    #[tokio::test]
    async fn test_reconcile_is_rerunnable() {
        let store = MemoryGraph::new();
        let engine = UpsertEngine::new(&store);
        engine.upsert_message(&message("m1", 1, "u1")).await.unwrap();
        engine.upsert_group(&group()).await.unwrap();

        reconcile(&store).await.unwrap();
        let counts = store.counts().await.unwrap();
        let second = reconcile(&store).await.unwrap();

        assert_eq!(second.total_added(), 0);
        assert_eq!(second.reply_chain_edges, 0);
        assert_eq!(store.counts().await.unwrap(), counts);
    }

    #[tokio::test]
    async fn test_relink_keeps_a_correct_chain() {
        let store = MemoryGraph::new();
        let engine = UpsertEngine::new(&store);
        engine.upsert_group(&group()).await.unwrap();
        for (id, ts) in [("m3", 3), ("m1", 1), ("m2", 2)] {
            engine.upsert_message(&message(id, ts, "u1")).await.unwrap();
        }
        let chain = store.edges(EdgeKind::RepliedBy);

        let report = reconcile(&store).await.unwrap();

        assert_eq!(report.reply_chain_edges, 0);
        assert_eq!(store.edges(EdgeKind::RepliedBy), chain);
    }

    #[tokio::test]
    async fn test_empty_graph() {
        let store = MemoryGraph::new();
        assert_eq!(reconcile(&store).await.unwrap(), ReconcileReport::default());
    }
}
