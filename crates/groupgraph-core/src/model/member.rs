//! Member records.

use serde::{Deserialize, Serialize};

use super::nullable;

/// A user's membership in a group.
///
/// `id` is the per-group membership id; `user_id` is the global identity used
/// as the graph key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    pub user_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub nickname: String,
    #[serde(default, deserialize_with = "nullable")]
    pub muted: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub autokicked: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub app_installed: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub guid: String,
}
