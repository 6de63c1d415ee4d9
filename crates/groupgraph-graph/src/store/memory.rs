//! In-process graph with the same merge semantics as the Cypher statements.
//!
//! Used for dry runs and as the store behind the engine's tests.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::ops::Bound::{Excluded, Unbounded};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use groupgraph_core::model::{AttachmentProperties, Group, Member, Message};
use groupgraph_core::{GgResult, GroupGraphError};

use super::{EdgeKind, GraphStore, Write};
use crate::client::GraphCounts;

/// A relationship between two keyed nodes. Attachment edges live in
/// [`GraphState::attachments`] instead.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Edge {
    kind: EdgeKind,
    from: String,
    to: String,
}

/// Position of a message in its group's history.
type TimelineKey = (i64, String);

#[derive(Debug, Default)]
struct GraphState {
    groups: BTreeMap<String, Group>,
    members: BTreeMap<String, Member>,
    messages: BTreeMap<String, Message>,
    attachments: BTreeSet<(String, AttachmentProperties)>,
    edges: BTreeSet<Edge>,
    /// `edges` keyed by `(kind, to, from)`, for incoming lookups.
    incoming: BTreeSet<(EdgeKind, String, String)>,
    /// Message keys per group id, oldest first.
    timelines: BTreeMap<String, BTreeSet<TimelineKey>>,
}

/// An in-memory [`GraphStore`].
///
/// Every write in a batch is infallible once the batch is accepted, so a
/// unit of work is applied directly to the live graph.
#[derive(Default)]
pub struct MemoryGraph {
    state: Mutex<GraphState>,
    /// Scripted outcomes for upcoming `apply` calls; `None` lets one through.
    failures: Mutex<VecDeque<Option<GroupGraphError>>>,
    units_applied: AtomicUsize,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn script(&self) -> MutexGuard<'_, VecDeque<Option<GroupGraphError>>> {
        self.failures.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the next unscripted call to [`GraphStore::apply`] fail with `error`.
    pub fn inject_failure(&self, error: GroupGraphError) {
        self.script().push_back(Some(error));
    }

    /// Let the next `units` calls to [`GraphStore::apply`] through before any
    /// failure queued after this call.
    pub fn allow_units(&self, units: usize) {
        self.script().extend(std::iter::repeat_with(|| None).take(units));
    }

    /// Number of units of work that were committed.
    pub fn units_applied(&self) -> usize {
        self.units_applied.load(Ordering::SeqCst)
    }

    pub fn group(&self, id: &str) -> Option<Group> {
        self.lock().groups.get(id).cloned()
    }

    pub fn member(&self, user_id: &str) -> Option<Member> {
        self.lock().members.get(user_id).cloned()
    }

    pub fn message(&self, id: &str) -> Option<Message> {
        self.lock().messages.get(id).cloned()
    }

    /// `(from, to)` keys of every relationship of one kind. For attachments
    /// `to` is the attachment type.
    pub fn edges(&self, kind: EdgeKind) -> Vec<(String, String)> {
        let state = self.lock();
        if kind == EdgeKind::Attachment {
            return state
                .attachments
                .iter()
                .map(|(message_id, props)| (message_id.clone(), props.kind.clone()))
                .collect();
        }
        state
            .edges
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| (e.from.clone(), e.to.clone()))
            .collect()
    }

    pub fn has_edge(&self, kind: EdgeKind, from: &str, to: &str) -> bool {
        self.lock().edges.contains(&Edge {
            kind,
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    /// Attachment nodes hanging off a message.
    pub fn attachments_of(&self, message_id: &str) -> Vec<AttachmentProperties> {
        self.lock()
            .attachments
            .range((message_id.to_string(), AttachmentProperties::default())..)
            .take_while(|(id, _)| id == message_id)
            .map(|(_, props)| props.clone())
            .collect()
    }
}

impl GraphState {
    fn counts(&self) -> GraphCounts {
        GraphCounts {
            nodes: self.groups.len() + self.members.len() + self.messages.len() + self.attachments.len(),
            relationships: self.edges.len() + self.attachments.len(),
        }
    }

    fn link(&mut self, kind: EdgeKind, from: &str, to: &str) {
        let inserted = self.edges.insert(Edge {
            kind,
            from: from.to_string(),
            to: to.to_string(),
        });
        if inserted {
            self.incoming.insert((kind, to.to_string(), from.to_string()));
        }
    }

    fn unlink(&mut self, kind: EdgeKind, from: &str, to: &str) {
        self.edges.remove(&Edge {
            kind,
            from: from.to_string(),
            to: to.to_string(),
        });
        self.incoming.remove(&(kind, to.to_string(), from.to_string()));
    }

    /// Targets of `kind` edges leaving `from`.
    fn outgoing(&self, kind: EdgeKind, from: &str) -> Vec<String> {
        let start = Edge {
            kind,
            from: from.to_string(),
            to: String::new(),
        };
        self.edges
            .range(start..)
            .take_while(|e| e.kind == kind && e.from == from)
            .map(|e| e.to.clone())
            .collect()
    }

    /// Sources of `kind` edges entering `to`.
    fn sources(&self, kind: EdgeKind, to: &str) -> Vec<String> {
        self.incoming
            .range((kind, to.to_string(), String::new())..)
            .take_while(|(k, t, _)| *k == kind && t == to)
            .map(|(_, _, from)| from.clone())
            .collect()
    }

    fn apply(&mut self, write: &Write) {
        match write {
            Write::MergeGroup(group) => match self.groups.get_mut(&group.id) {
                Some(existing) => {
                    existing.name = group.name.clone();
                    existing.description = group.description.clone();
                    existing.updated_at = group.updated_at;
                    existing.messages = group.messages.clone();
                }
                None => {
                    let node = Group {
                        members: Vec::new(),
                        ..group.clone()
                    };
                    self.groups.insert(group.id.clone(), node);
                }
            },
            Write::MergeMember(member) => match self.members.get_mut(&member.user_id) {
                Some(existing) => {
                    existing.nickname = member.nickname.clone();
                    existing.muted = member.muted;
                    existing.image_url = member.image_url.clone();
                    existing.autokicked = member.autokicked;
                    existing.app_installed = member.app_installed;
                }
                None => {
                    self.members.insert(member.user_id.clone(), member.clone());
                }
            },
            Write::LinkMembership { group_id, user_id } => {
                if self.groups.contains_key(group_id) && self.members.contains_key(user_id) {
                    self.link(EdgeKind::HasMember, group_id, user_id);
                } else {
                    debug!(%group_id, %user_id, "Membership endpoint missing, not linked");
                }
            }
            // group_id and created_at never change on match, so the timeline
            // key is fixed at creation.
            Write::MergeMessage(message) => match self.messages.get_mut(&message.id) {
                Some(existing) => existing.favorited_by = message.favorited_by.clone(),
                None => {
                    let node = Message {
                        attachments: Vec::new(),
                        ..message.clone()
                    };
                    self.timelines
                        .entry(message.group_id.clone())
                        .or_default()
                        .insert((message.created_at, message.id.clone()));
                    self.messages.insert(message.id.clone(), node);
                }
            },
            Write::LinkContainment { message_id } => self.link_containment(message_id),
            Write::LinkAuthorship { message_id } => self.link_authorship(message_id),
            Write::LinkFavorites { message_id } => {
                let Some(message) = self.messages.get(message_id) else {
                    return;
                };
                let fans: BTreeSet<String> = message.favorited_by.iter().cloned().collect();
                for stale in self.sources(EdgeKind::Favorited, message_id) {
                    if !fans.contains(&stale) {
                        self.unlink(EdgeKind::Favorited, &stale, message_id);
                    }
                }
                self.add_favorites(message_id);
            }
            Write::SpliceReplyChain { message_id } => self.splice(message_id),
            Write::MergeAttachment { message_id, attachment } => {
                if self.messages.contains_key(message_id) {
                    self.attachments.insert((message_id.clone(), attachment.clone()));
                }
            }
            Write::BackfillAuthorship => {
                let ids: Vec<String> = self.messages.keys().cloned().collect();
                for id in &ids {
                    self.link_authorship(id);
                }
            }
            Write::BackfillContainment => {
                let ids: Vec<String> = self.messages.keys().cloned().collect();
                for id in &ids {
                    self.link_containment(id);
                }
            }
            Write::BackfillFavorites => {
                let ids: Vec<String> = self.messages.keys().cloned().collect();
                for id in &ids {
                    self.add_favorites(id);
                }
            }
            Write::RelinkReplyChain { group_id } => self.relink(group_id),
        }
    }

    fn link_containment(&mut self, message_id: &str) {
        let Some(group_id) = self.messages.get(message_id).map(|m| m.group_id.clone()) else {
            return;
        };
        if self.groups.contains_key(&group_id) {
            self.link(EdgeKind::Contains, &group_id, message_id);
        } else {
            debug!(%message_id, %group_id, "Group not in graph, CONTAINS not linked");
        }
    }

    fn link_authorship(&mut self, message_id: &str) {
        let Some(user_id) = self.messages.get(message_id).map(|m| m.user_id.clone()) else {
            return;
        };
        if self.members.contains_key(&user_id) {
            self.link(EdgeKind::Authored, &user_id, message_id);
        } else {
            debug!(%message_id, %user_id, "Author not in graph, AUTHORED not linked");
        }
    }

    fn add_favorites(&mut self, message_id: &str) {
        let Some(fans) = self.messages.get(message_id).map(|m| m.favorited_by.clone()) else {
            return;
        };
        let known: Vec<String> = fans
            .into_iter()
            .filter(|fan| self.members.contains_key(fan))
            .collect();
        for fan in &known {
            self.link(EdgeKind::Favorited, fan, message_id);
        }
    }

    /// Neighbours of a message in its group's history.
    fn neighbours(&self, message: &Message) -> (Option<String>, Option<String>) {
        let Some(timeline) = self.timelines.get(&message.group_id) else {
            return (None, None);
        };
        let key = (message.created_at, message.id.clone());
        let prev = timeline.range(..key.clone()).next_back().map(|(_, id)| id.clone());
        let next = timeline.range((Excluded(key), Unbounded)).next().map(|(_, id)| id.clone());
        (prev, next)
    }

    fn splice(&mut self, message_id: &str) {
        let Some((prev, next)) = self.messages.get(message_id).map(|m| self.neighbours(m)) else {
            return;
        };

        for to in self.outgoing(EdgeKind::RepliedBy, message_id) {
            if next.as_deref() != Some(to.as_str()) {
                self.unlink(EdgeKind::RepliedBy, message_id, &to);
            }
        }
        for from in self.sources(EdgeKind::RepliedBy, message_id) {
            if prev.as_deref() != Some(from.as_str()) {
                self.unlink(EdgeKind::RepliedBy, &from, message_id);
            }
        }
        if let Some(prev) = &prev {
            for to in self.outgoing(EdgeKind::RepliedBy, prev) {
                if to != message_id {
                    self.unlink(EdgeKind::RepliedBy, prev, &to);
                }
            }
            self.link(EdgeKind::RepliedBy, prev, message_id);
        }
        if let Some(next) = &next {
            for from in self.sources(EdgeKind::RepliedBy, next) {
                if from != message_id {
                    self.unlink(EdgeKind::RepliedBy, &from, next);
                }
            }
            self.link(EdgeKind::RepliedBy, message_id, next);
        }
    }

    fn relink(&mut self, group_id: &str) {
        let ids: Vec<String> = self
            .timelines
            .get(group_id)
            .map(|timeline| timeline.iter().map(|(_, id)| id.clone()).collect())
            .unwrap_or_default();

        for (index, id) in ids.iter().enumerate() {
            let next = ids.get(index + 1);
            for to in self.outgoing(EdgeKind::RepliedBy, id) {
                if next != Some(&to) {
                    self.unlink(EdgeKind::RepliedBy, id, &to);
                }
            }
        }
        for pair in ids.windows(2) {
            self.link(EdgeKind::RepliedBy, &pair[0], &pair[1]);
        }
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn apply(&self, writes: &[Write]) -> GgResult<()> {
        let scripted = self.script().pop_front().flatten();
        if let Some(error) = scripted {
            return Err(error);
        }

        let mut state = self.lock();
        for write in writes {
            state.apply(write);
        }
        drop(state);

        self.units_applied.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn counts(&self) -> GgResult<GraphCounts> {
        Ok(self.lock().counts())
    }

    async fn edge_count(&self, kind: EdgeKind) -> GgResult<usize> {
        let state = self.lock();
        Ok(match kind {
            EdgeKind::Attachment => state.attachments.len(),
            _ => state.edges.iter().filter(|e| e.kind == kind).count(),
        })
    }

    async fn message_group_ids(&self) -> GgResult<Vec<String>> {
        let ids: BTreeSet<String> = self.lock().messages.values().map(|m| m.group_id.clone()).collect();
        Ok(ids.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(group_id: &str, id: &str, created_at: i64) -> Message {
        Message {
            id: id.to_string(),
            group_id: group_id.to_string(),
            created_at,
            ..Default::default()
        }
    }

    async fn insert(store: &MemoryGraph, message: Message) {
        let message_id = message.id.clone();
        store
            .apply(&[Write::MergeMessage(message), Write::SpliceReplyChain { message_id }])
            .await
            .unwrap();
    }

    fn chain(store: &MemoryGraph) -> BTreeMap<String, String> {
        store.edges(EdgeKind::RepliedBy).into_iter().collect()
    }

    #[tokio::test]
    async fn test_long_history_inserted_newest_first() {
        let store = MemoryGraph::new();
        let started = std::time::Instant::now();
        for n in (0..20_000).rev() {
            insert(&store, message("g1", &format!("m{n:05}"), 1_000 + n)).await;
        }

        let links = chain(&store);
        assert_eq!(links.len(), 19_999);
        assert_eq!(links["m00000"], "m00001");
        assert_eq!(links["m19998"], "m19999");
        assert!(!links.contains_key("m19999"));
        // A full rescan per insert takes minutes at this size.
        assert!(started.elapsed() < std::time::Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_timelines_are_per_group() {
        let store = MemoryGraph::new();
        insert(&store, message("g1", "a1", 10)).await;
        insert(&store, message("g2", "b1", 15)).await;
        insert(&store, message("g1", "a2", 20)).await;
        insert(&store, message("g2", "b2", 25)).await;

        assert!(store.has_edge(EdgeKind::RepliedBy, "a1", "a2"));
        assert!(store.has_edge(EdgeKind::RepliedBy, "b1", "b2"));
        assert_eq!(chain(&store).len(), 2);
    }

    #[tokio::test]
    async fn test_tie_on_created_at_orders_by_id() {
        let store = MemoryGraph::new();
        insert(&store, message("g1", "m3", 50)).await;
        insert(&store, message("g1", "m1", 50)).await;
        insert(&store, message("g1", "m2", 50)).await;

        let links = chain(&store);
        assert_eq!(links.len(), 2);
        assert_eq!(links["m1"], "m2");
        assert_eq!(links["m2"], "m3");
    }

    #[tokio::test]
    async fn test_relink_drops_foreign_edges_out_of_group() {
        let store = MemoryGraph::new();
        insert(&store, message("g1", "a1", 10)).await;
        insert(&store, message("g1", "a2", 20)).await;
        insert(&store, message("g1", "a3", 30)).await;
        {
            let mut state = store.lock();
            state.unlink(EdgeKind::RepliedBy, "a1", "a2");
            state.link(EdgeKind::RepliedBy, "a1", "a3");
        }

        store
            .apply(&[Write::RelinkReplyChain {
                group_id: "g1".to_string(),
            }])
            .await
            .unwrap();

        let links = chain(&store);
        assert_eq!(links.len(), 2);
        assert_eq!(links["a1"], "a2");
        assert_eq!(links["a2"], "a3");
        assert_eq!(store.lock().incoming.len(), 2);
    }

    #[tokio::test]
    async fn test_allowed_units_pass_before_failure() {
        let store = MemoryGraph::new();
        store.allow_units(1);
        store.inject_failure(GroupGraphError::store("refused"));

        assert!(store.apply(&[]).await.is_ok());
        assert!(store.apply(&[]).await.is_err());
        assert!(store.apply(&[]).await.is_ok());
        assert_eq!(store.units_applied(), 2);
    }
}
