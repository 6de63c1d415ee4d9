//! Cypher statements for each [`Write`].
//!
//! Every statement text is a static string; entity values are only ever
//! passed as bound parameters.

use super::{EdgeKind, Write};

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Str(String),
    Int(i64),
    Bool(bool),
    StrList(Vec<String>),
}

/// Static query text plus its named parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: &'static str,
    pub params: Vec<(&'static str, Param)>,
}

impl Statement {
    fn new(text: &'static str) -> Self {
        Self { text, params: Vec::new() }
    }

    fn str(mut self, key: &'static str, value: &str) -> Self {
        self.params.push((key, Param::Str(value.to_string())));
        self
    }

    fn int(mut self, key: &'static str, value: i64) -> Self {
        self.params.push((key, Param::Int(value)));
        self
    }

    fn bool(mut self, key: &'static str, value: bool) -> Self {
        self.params.push((key, Param::Bool(value)));
        self
    }

    fn list(mut self, key: &'static str, value: &[String]) -> Self {
        self.params.push((key, Param::StrList(value.to_vec())));
        self
    }
}

const MERGE_GROUP: &str = "MERGE (g:Group {id: $id})
     ON CREATE SET
         g.name = $name,
         g.type = $group_type,
         g.description = $description,
         g.image_url = $image_url,
         g.creator_user_id = $creator_user_id,
         g.created_at = $created_at,
         g.updated_at = $updated_at,
         g.share_url = $share_url,
         g.message_count = $message_count,
         g.last_message_id = $last_message_id,
         g.last_message_created_at = $last_message_created_at
     ON MATCH SET
         g.name = $name,
         g.description = $description,
         g.updated_at = $updated_at,
         g.message_count = $message_count,
         g.last_message_id = $last_message_id,
         g.last_message_created_at = $last_message_created_at";

const MERGE_MEMBER: &str = "MERGE (u:Member {user_id: $user_id})
     ON CREATE SET
         u.id = $id,
         u.nickname = $nickname,
         u.muted = $muted,
         u.image_url = $image_url,
         u.autokicked = $autokicked,
         u.app_installed = $app_installed,
         u.guid = $guid
     ON MATCH SET
         u.nickname = $nickname,
         u.muted = $muted,
         u.image_url = $image_url,
         u.autokicked = $autokicked,
         u.app_installed = $app_installed";

const LINK_MEMBERSHIP: &str = "MATCH (g:Group {id: $group_id}), (u:Member {user_id: $user_id})
     MERGE (g)-[:HAS_MEMBER]->(u)";

const MERGE_MESSAGE: &str = "MERGE (m:Message {id: $id})
     ON CREATE SET
         m.source_guid = $source_guid,
         m.created_at = $created_at,
         m.user_id = $user_id,
         m.group_id = $group_id,
         m.name = $name,
         m.avatar_url = $avatar_url,
         m.text = $text,
         m.system = $system,
         m.favorited_by = $favorited_by
     ON MATCH SET
         m.favorited_by = $favorited_by";

const LINK_CONTAINMENT: &str = "MATCH (m:Message {id: $id})
     MATCH (g:Group {id: m.group_id})
     MERGE (g)-[:CONTAINS]->(m)";

const LINK_AUTHORSHIP: &str = "MATCH (m:Message {id: $id})
     MATCH (u:Member {user_id: m.user_id})
     MERGE (u)-[:AUTHORED]->(m)";

const LINK_FAVORITES: &str = "MATCH (m:Message {id: $id})
     OPTIONAL MATCH (old:Member)-[f:FAVORITED]->(m)
     WHERE NOT old.user_id IN m.favorited_by
     DELETE f
     WITH DISTINCT m
     UNWIND m.favorited_by AS fan_id
     MATCH (u:Member {user_id: fan_id})
     MERGE (u)-[:FAVORITED]->(m)";

// Neighbours are ordered by (created_at, id). Every REPLIED_BY edge touching
// the message or its neighbours that is not part of prev -> m -> next is
// removed, which also drops the old prev -> next edge.
const SPLICE_REPLY_CHAIN: &str = "MATCH (m:Message {id: $id})
     OPTIONAL MATCH (p:Message {group_id: m.group_id})
     WHERE p.created_at < m.created_at OR (p.created_at = m.created_at AND p.id < m.id)
     WITH m, p ORDER BY p.created_at DESC, p.id DESC
     WITH m, head(collect(p)) AS prev
     OPTIONAL MATCH (s:Message {group_id: m.group_id})
     WHERE s.created_at > m.created_at OR (s.created_at = m.created_at AND s.id > m.id)
     WITH m, prev, s ORDER BY s.created_at, s.id
     WITH m, prev, head(collect(s)) AS next
     OPTIONAL MATCH (a:Message)-[r1:REPLIED_BY]->(m) WHERE a.id <> coalesce(prev.id, '')
     OPTIONAL MATCH (m)-[r2:REPLIED_BY]->(b:Message) WHERE b.id <> coalesce(next.id, '')
     OPTIONAL MATCH (prev)-[r3:REPLIED_BY]->(c:Message) WHERE c.id <> m.id
     OPTIONAL MATCH (d:Message)-[r4:REPLIED_BY]->(next) WHERE d.id <> m.id
     WITH m, prev, next,
          collect(DISTINCT r1) + collect(DISTINCT r2) + collect(DISTINCT r3) + collect(DISTINCT r4) AS stale
     FOREACH (r IN stale | DELETE r)
     FOREACH (x IN CASE WHEN prev IS NULL THEN [] ELSE [prev] END | MERGE (x)-[:REPLIED_BY]->(m))
     FOREACH (y IN CASE WHEN next IS NULL THEN [] ELSE [next] END | MERGE (m)-[:REPLIED_BY]->(y))";

const MERGE_ATTACHMENT: &str = "MATCH (m:Message {id: $message_id})
     MERGE (m)-[:ATTACHMENT]->(a:Attachment {
         type: $kind,
         url: $url,
         lat: $lat,
         lng: $lng,
         name: $name,
         token: $token,
         placeholder: $placeholder,
         charmap: $charmap
     })";

const BACKFILL_AUTHORSHIP: &str = "MATCH (m:Message)
     MATCH (u:Member {user_id: m.user_id})
     MERGE (u)-[:AUTHORED]->(m)";

const BACKFILL_CONTAINMENT: &str = "MATCH (m:Message)
     MATCH (g:Group {id: m.group_id})
     MERGE (g)-[:CONTAINS]->(m)";

const BACKFILL_FAVORITES: &str = "MATCH (m:Message)
     UNWIND m.favorited_by AS fan_id
     MATCH (u:Member {user_id: fan_id})
     MERGE (u)-[:FAVORITED]->(m)";

const RELINK_REPLY_CHAIN: &str = "MATCH (m:Message {group_id: $group_id})
     WITH m ORDER BY m.created_at, m.id
     WITH collect(m) AS chain
     FOREACH (i IN range(0, size(chain) - 2) |
         FOREACH (a IN [chain[i]] |
             FOREACH (b IN [chain[i + 1]] |
                 MERGE (a)-[:REPLIED_BY]->(b))))
     WITH [i IN range(0, size(chain) - 2) | [chain[i], chain[i + 1]]] AS pairs
     MATCH (x:Message {group_id: $group_id})-[r:REPLIED_BY]->(y:Message)
     WHERE NOT [x, y] IN pairs
     DELETE r";

/// Lists the distinct groups that own messages.
pub const MESSAGE_GROUP_IDS: &str = "MATCH (m:Message) RETURN DISTINCT m.group_id AS group_id";

/// Counts relationships of one type.
pub fn edge_count_query(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::HasMember => "MATCH ()-[r:HAS_MEMBER]->() RETURN count(r) AS count",
        EdgeKind::Contains => "MATCH ()-[r:CONTAINS]->() RETURN count(r) AS count",
        EdgeKind::Authored => "MATCH ()-[r:AUTHORED]->() RETURN count(r) AS count",
        EdgeKind::Favorited => "MATCH ()-[r:FAVORITED]->() RETURN count(r) AS count",
        EdgeKind::RepliedBy => "MATCH ()-[r:REPLIED_BY]->() RETURN count(r) AS count",
        EdgeKind::Attachment => "MATCH ()-[r:ATTACHMENT]->() RETURN count(r) AS count",
    }
}

/// Build the statement for a write.
pub fn statement(write: &Write) -> Statement {
    match write {
        Write::MergeGroup(g) => Statement::new(MERGE_GROUP)
            .str("id", &g.id)
            .str("name", &g.name)
            .str("group_type", &g.group_type)
            .str("description", &g.description)
            .str("image_url", &g.image_url)
            .str("creator_user_id", &g.creator_user_id)
            .int("created_at", g.created_at)
            .int("updated_at", g.updated_at)
            .str("share_url", &g.share_url)
            .int("message_count", g.messages.count)
            .str("last_message_id", &g.messages.last_message_id)
            .int("last_message_created_at", g.messages.last_message_created_at),
        Write::MergeMember(m) => Statement::new(MERGE_MEMBER)
            .str("user_id", &m.user_id)
            .str("id", &m.id)
            .str("nickname", &m.nickname)
            .bool("muted", m.muted)
            .str("image_url", &m.image_url)
            .bool("autokicked", m.autokicked)
            .bool("app_installed", m.app_installed)
            .str("guid", &m.guid),
        Write::LinkMembership { group_id, user_id } => Statement::new(LINK_MEMBERSHIP)
            .str("group_id", group_id)
            .str("user_id", user_id),
        Write::MergeMessage(m) => Statement::new(MERGE_MESSAGE)
            .str("id", &m.id)
            .str("source_guid", &m.source_guid)
            .int("created_at", m.created_at)
            .str("user_id", &m.user_id)
            .str("group_id", &m.group_id)
            .str("name", &m.name)
            .str("avatar_url", &m.avatar_url)
            .str("text", &m.text)
            .bool("system", m.system)
            .list("favorited_by", &m.favorited_by),
        Write::LinkContainment { message_id } => Statement::new(LINK_CONTAINMENT).str("id", message_id),
        Write::LinkAuthorship { message_id } => Statement::new(LINK_AUTHORSHIP).str("id", message_id),
        Write::LinkFavorites { message_id } => Statement::new(LINK_FAVORITES).str("id", message_id),
        Write::SpliceReplyChain { message_id } => Statement::new(SPLICE_REPLY_CHAIN).str("id", message_id),
        Write::MergeAttachment { message_id, attachment } => Statement::new(MERGE_ATTACHMENT)
            .str("message_id", message_id)
            .str("kind", &attachment.kind)
            .str("url", &attachment.url)
            .str("lat", &attachment.lat)
            .str("lng", &attachment.lng)
            .str("name", &attachment.name)
            .str("token", &attachment.token)
            .str("placeholder", &attachment.placeholder)
            .str("charmap", &attachment.charmap),
        Write::BackfillAuthorship => Statement::new(BACKFILL_AUTHORSHIP),
        Write::BackfillContainment => Statement::new(BACKFILL_CONTAINMENT),
        Write::BackfillFavorites => Statement::new(BACKFILL_FAVORITES),
        Write::RelinkReplyChain { group_id } => Statement::new(RELINK_REPLY_CHAIN).str("group_id", group_id),
    }
}
