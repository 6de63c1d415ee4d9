//! Request bodies for write endpoints.

use serde::{Deserialize, Serialize};

/// Body of `POST /groups`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewGroup {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_url: String,
    pub share: bool,
}

/// Form fields of `POST /groups/:id/update`. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share: Option<bool>,
}

/// Body of `POST /groups/change_owners`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChangeOwner<'a> {
    pub group_id: &'a str,
    pub owner_id: &'a str,
}

/// A member to add; one of `user_id`, `phone_number` or `email` identifies them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AddMember {
    pub nickname: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    pub guid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub phone_number: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
}

/// Response of `POST /groups/:id/members/add`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AddMembersResult {
    pub results_id: String,
}

/// Body of `POST /groups/:id/memberships/update`.
#[derive(Debug, Serialize)]
pub(crate) struct MembershipUpdate<'a> {
    pub membership: Nickname<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Nickname<'a> {
    pub nickname: &'a str,
}
