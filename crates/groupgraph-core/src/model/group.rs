//! Group records.

use serde::{Deserialize, Serialize};

use super::{nullable, Member};

/// A GroupMe group, optionally carrying its member roster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub group_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub creator_user_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub created_at: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub updated_at: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub members: Vec<Member>,
    #[serde(default, deserialize_with = "nullable")]
    pub share_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub messages: MessageSummary,
}

/// Message statistics embedded in a group listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageSummary {
    #[serde(default, deserialize_with = "nullable")]
    pub count: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub last_message_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub last_message_created_at: i64,
}

impl Group {
    /// False when the listing was requested with `omit=memberships`.
    pub fn has_roster(&self) -> bool {
        !self.members.is_empty()
    }
}
