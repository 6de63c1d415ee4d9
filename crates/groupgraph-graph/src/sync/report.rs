//! Outcome of a sync run.

use std::fmt;
use std::time::Duration;

use crate::upsert::UpsertStats;

/// What kind of entity a sync run gave up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Group,
    Member,
    MessagePage,
    Message,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Group => write!(f, "group"),
            EntityKind::Member => write!(f, "member"),
            EntityKind::MessagePage => write!(f, "message page"),
            EntityKind::Message => write!(f, "message"),
        }
    }
}

/// An entity that failed and was skipped under [`FailurePolicy::SkipEntity`].
///
/// [`FailurePolicy::SkipEntity`]: super::FailurePolicy::SkipEntity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntity {
    pub kind: EntityKind,
    /// Group id for groups and message pages, user id for members, message
    /// id for messages.
    pub id: String,
    pub reason: String,
}

/// Totals for a sync run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub groups: usize,
    pub members: usize,
    pub messages: usize,
    pub attachments: usize,
    /// Message pages requested, including the final empty one per group.
    pub pages_fetched: usize,
    pub skipped: Vec<SkippedEntity>,
    pub elapsed: Duration,
}

impl SyncReport {
    pub fn record(&mut self, stats: &UpsertStats) {
        self.groups += stats.groups;
        self.members += stats.members;
        self.messages += stats.messages;
        self.attachments += stats.attachments;
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates() {
        let mut report = SyncReport::default();
        report.record(&UpsertStats {
            groups: 1,
            members: 3,
            ..Default::default()
        });
        report.record(&UpsertStats {
            messages: 1,
            attachments: 2,
            ..Default::default()
        });
        assert_eq!((report.groups, report.members, report.messages, report.attachments), (1, 3, 1, 2));
        assert!(report.is_clean());
    }

    #[test]
    fn test_entity_kind_display() {
        assert_eq!(EntityKind::MessagePage.to_string(), "message page");
        assert_eq!(EntityKind::Member.to_string(), "member");
    }
}
