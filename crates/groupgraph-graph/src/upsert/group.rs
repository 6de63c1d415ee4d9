//! Group upserts.
//!
//! Creates nodes and relationships:
//! - (:Group {id})
//! - (:Group)-[:HAS_MEMBER]->(:Member) for every member on the roster

use tracing::{debug, warn};

use groupgraph_core::model::Group;
use groupgraph_core::{GgResult, GroupGraphError};

use super::{UpsertEngine, UpsertStats};
use crate::store::Write;

/// Outcome of [`UpsertEngine::upsert_group`].
#[derive(Debug, Default)]
pub struct GroupUpsert {
    pub stats: UpsertStats,
    /// Roster entries whose write failed, by user id, in roster order.
    pub failed_members: Vec<(String, GroupGraphError)>,
}

impl UpsertEngine<'_> {
    /// Merge a group by id, then upsert each member of its roster.
    ///
    /// Only a failure to merge the group node itself is returned as an
    /// error. A member whose write fails is collected in
    /// [`GroupUpsert::failed_members`] and the rest of the roster is still
    /// written.
    pub async fn upsert_group(&self, group: &Group) -> GgResult<GroupUpsert> {
        debug!(group_id = %group.id, name = %group.name, members = group.members.len(), "Upserting group");

        let node = Group {
            members: Vec::new(),
            ..group.clone()
        };
        self.commit(&[Write::MergeGroup(node)]).await?;

        let mut outcome = GroupUpsert {
            stats: UpsertStats {
                groups: 1,
                ..Default::default()
            },
            failed_members: Vec::new(),
        };
        for member in &group.members {
            match self.upsert_member(member, &group.id).await {
                Ok(stats) => outcome.stats.merge(&stats),
                Err(e) => {
                    warn!(group_id = %group.id, user_id = %member.user_id, error = %e, "Member upsert failed");
                    outcome.failed_members.push((member.user_id.clone(), e));
                }
            }
        }
        Ok(outcome)
    }
}
