//! GroupMe HTTP client.
//!
//! Every request carries the access token as a `token` query parameter and
//! every response goes through [`groupgraph_core::envelope`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use groupgraph_core::envelope;
use groupgraph_core::model::{sort_chronologically, Group, Member, Message, MessagePage};
use groupgraph_core::{GgResult, GroupGraphError, GroupSource, MessageCursor, Settings};

use crate::requests::{
    AddMember, AddMembersResult, ChangeOwner, GroupUpdate, MembershipUpdate, NewGroup, Nickname,
};

/// Largest page the messages endpoint will return.
pub const MAX_MESSAGE_LIMIT: u32 = 100;

/// Deadline for a whole request, body included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the GroupMe v3 API.
#[derive(Clone)]
pub struct GroupMeClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl GroupMeClient {
    /// Create a client from loaded settings.
    pub fn new(settings: &Settings) -> GgResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| GroupGraphError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: settings.group_me_api.trim_end_matches('/').to_string(),
            token: settings.access_token.clone(),
            client,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .timeout(REQUEST_TIMEOUT)
            .query(&[("token", self.token.as_str())])
    }

    async fn send(&self, request: RequestBuilder) -> GgResult<(StatusCode, Vec<u8>)> {
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;
        debug!(status = status.as_u16(), bytes = body.len(), "GroupMe response");
        Ok((status, body.to_vec()))
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> GgResult<T> {
        let (_, body) = self.send(request).await?;
        envelope::open(&body)
    }

    async fn call_empty(&self, request: RequestBuilder) -> GgResult<()> {
        let (_, body) = self.send(request).await?;
        envelope::open_empty(&body)
    }

    // Groups

    pub(crate) fn groups_index_request(&self, page: u32, per_page: u32, omit_memberships: bool) -> RequestBuilder {
        let mut request = self
            .request(Method::GET, "/groups")
            .query(&[("page", page), ("per_page", per_page)]);
        if omit_memberships {
            request = request.query(&[("omit", "memberships")]);
        }
        request
    }

    /// List the groups the caller belongs to.
    pub async fn groups_index(&self, page: u32, per_page: u32, omit_memberships: bool) -> GgResult<Vec<Group>> {
        self.call(self.groups_index_request(page, per_page, omit_memberships)).await
    }

    /// List groups the caller has left but can rejoin.
    pub async fn groups_former(&self) -> GgResult<Vec<Group>> {
        self.call(self.request(Method::GET, "/groups/former")).await
    }

    /// Load a single group.
    pub async fn groups_show(&self, group_id: &str) -> GgResult<Group> {
        self.call(self.request(Method::GET, &format!("/groups/{}", group_id))).await
    }

    pub(crate) fn groups_create_request(&self, group: &NewGroup) -> RequestBuilder {
        self.request(Method::POST, "/groups").json(group)
    }

    /// Create a group.
    pub async fn groups_create(&self, group: &NewGroup) -> GgResult<Group> {
        self.call(self.groups_create_request(group)).await
    }

    pub(crate) fn groups_update_request(&self, group_id: &str, update: &GroupUpdate) -> RequestBuilder {
        self.request(Method::POST, &format!("/groups/{}/update", group_id))
            .form(update)
    }

    /// Update a group's name, description, avatar or sharing settings.
    pub async fn groups_update(&self, group_id: &str, update: &GroupUpdate) -> GgResult<Group> {
        self.call(self.groups_update_request(group_id, update)).await
    }

    /// Disband a group. Only the creator may do this.
    pub async fn groups_destroy(&self, group_id: &str) -> GgResult<()> {
        self.call_empty(self.request(Method::POST, &format!("/groups/{}/destroy", group_id)))
            .await
    }

    /// Join a shared group using its share token.
    pub async fn groups_join(&self, group_id: &str, share_token: &str) -> GgResult<Group> {
        self.call(self.request(Method::POST, &format!("/groups/{}/join/{}", group_id, share_token)))
            .await
    }

    pub(crate) fn groups_rejoin_request(&self, group_id: &str) -> RequestBuilder {
        self.request(Method::POST, "/groups/join")
            .form(&[("group_id", group_id)])
    }

    /// Rejoin a group the caller previously left.
    pub async fn groups_rejoin(&self, group_id: &str) -> GgResult<Group> {
        self.call(self.groups_rejoin_request(group_id)).await
    }

    pub(crate) fn groups_change_owner_request(&self, group_id: &str, owner_id: &str) -> RequestBuilder {
        self.request(Method::POST, "/groups/change_owners")
            .json(&ChangeOwner { group_id, owner_id })
    }

    /// Transfer group ownership to another member.
    pub async fn groups_change_owner(&self, group_id: &str, owner_id: &str) -> GgResult<Group> {
        self.call(self.groups_change_owner_request(group_id, owner_id)).await
    }

    // Members

    pub(crate) fn members_add_request(&self, group_id: &str, members: &[AddMember]) -> RequestBuilder {
        self.request(Method::POST, &format!("/groups/{}/members/add", group_id))
            .json(members)
    }

    /// Add members asynchronously; returns the id to poll with [`Self::members_results`].
    pub async fn members_add(&self, group_id: &str, members: &[AddMember]) -> GgResult<String> {
        let result: AddMembersResult = self.call(self.members_add_request(group_id, members)).await?;
        Ok(result.results_id)
    }

    /// Members created by a previous [`Self::members_add`] call.
    pub async fn members_results(&self, group_id: &str, results_id: &str) -> GgResult<Vec<Member>> {
        self.call(self.request(
            Method::GET,
            &format!("/groups/{}/members/results/{}", group_id, results_id),
        ))
        .await
    }

    /// Remove a membership (by membership id, not user id).
    pub async fn members_remove(&self, group_id: &str, membership_id: &str) -> GgResult<()> {
        self.call_empty(self.request(
            Method::POST,
            &format!("/groups/{}/members/{}/remove", group_id, membership_id),
        ))
        .await
    }

    pub(crate) fn members_update_request(&self, group_id: &str, nickname: &str) -> RequestBuilder {
        self.request(Method::POST, &format!("/groups/{}/memberships/update", group_id))
            .json(&MembershipUpdate {
                membership: Nickname { nickname },
            })
    }

    /// Change the caller's nickname in a group.
    pub async fn members_update_nickname(&self, group_id: &str, nickname: &str) -> GgResult<Member> {
        self.call(self.members_update_request(group_id, nickname)).await
    }

    // Messages

    pub(crate) fn messages_index_request(&self, group_id: &str, cursor: &MessageCursor, limit: u32) -> RequestBuilder {
        let mut request = self
            .request(Method::GET, &format!("/groups/{}/messages", group_id))
            .query(&[("limit", limit.min(MAX_MESSAGE_LIMIT))]);
        if let Some(param) = cursor.query_param() {
            request = request.query(&[param]);
        }
        request
    }

    /// One page of a group's messages, sorted oldest first.
    ///
    /// The API answers `304 Not Modified` with an empty body once the history
    /// is exhausted; that is an empty page, not an error.
    pub async fn messages_index(&self, group_id: &str, cursor: &MessageCursor, limit: u32) -> GgResult<Vec<Message>> {
        let (status, body) = self
            .send(self.messages_index_request(group_id, cursor, limit))
            .await?;
        if status == StatusCode::NOT_MODIFIED {
            debug!(group_id, "No more messages");
            return Ok(Vec::new());
        }

        let page: MessagePage = envelope::open(&body)?;
        let mut messages = page.messages;
        sort_chronologically(&mut messages);
        Ok(messages)
    }
}

#[async_trait]
impl GroupSource for GroupMeClient {
    async fn groups(&self, page: u32, per_page: u32, omit_memberships: bool) -> GgResult<Vec<Group>> {
        self.groups_index(page, per_page, omit_memberships).await
    }

    async fn messages(&self, group_id: &str, cursor: &MessageCursor, limit: u32) -> GgResult<Vec<Message>> {
        self.messages_index(group_id, cursor, limit).await
    }
}

/// The URL is dropped from the message because it carries the access token.
fn transport(e: reqwest::Error) -> GroupGraphError {
    GroupGraphError::Transport(e.without_url().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GroupMeClient {
        GroupMeClient::new(&Settings::new("https://api.groupme.test/v3/", "abc123").unwrap()).unwrap()
    }

    fn body_text(request: &reqwest::Request) -> String {
        let bytes = request.body().and_then(|b| b.as_bytes()).unwrap_or_default();
        String::from_utf8_lossy(bytes).to_string()
    }

    #[test]
    fn test_token_on_every_request() {
        let request = client().request(Method::GET, "/groups/former").build().unwrap();
        assert_eq!(request.url().as_str(), "https://api.groupme.test/v3/groups/former?token=abc123");
    }

    #[test]
    fn test_every_request_has_a_deadline() {
        let request = client().messages_index_request("g1", &MessageCursor::Latest, 20).build().unwrap();
        assert_eq!(request.timeout(), Some(&REQUEST_TIMEOUT));
    }

    #[test]
    fn test_groups_index_query() {
        let request = client().groups_index_request(2, 50, true).build().unwrap();
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(
            request.url().query(),
            Some("token=abc123&page=2&per_page=50&omit=memberships")
        );

        let request = client().groups_index_request(1, 10, false).build().unwrap();
        assert!(!request.url().query().unwrap_or_default().contains("omit"));
    }

    #[test]
    fn test_messages_cursor_and_limit_cap() {
        let cursor = MessageCursor::Before("9876".to_string());
        let request = client().messages_index_request("42", &cursor, 500).build().unwrap();
        assert_eq!(request.url().path(), "/v3/groups/42/messages");
        assert_eq!(request.url().query(), Some("token=abc123&limit=100&before_id=9876"));

        let request = client()
            .messages_index_request("42", &MessageCursor::Latest, 20)
            .build()
            .unwrap();
        assert_eq!(request.url().query(), Some("token=abc123&limit=20"));
    }

    #[test]
    fn test_create_sends_json() {
        let group = NewGroup {
            name: "Climbing".to_string(),
            share: true,
            ..Default::default()
        };
        let request = client().groups_create_request(&group).build().unwrap();
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.url().path(), "/v3/groups");
        let body: serde_json::Value = serde_json::from_str(&body_text(&request)).unwrap();
        assert_eq!(body, serde_json::json!({"name": "Climbing", "share": true}));
    }

    #[test]
    fn test_update_sends_form() {
        let update = GroupUpdate {
            name: Some("Renamed".to_string()),
            office_mode: Some(false),
            ..Default::default()
        };
        let request = client().groups_update_request("7", &update).build().unwrap();
        assert_eq!(request.url().path(), "/v3/groups/7/update");
        assert_eq!(body_text(&request), "name=Renamed&office_mode=false");
    }

    #[test]
    fn test_rejoin_and_change_owner_bodies() {
        let request = client().groups_rejoin_request("7").build().unwrap();
        assert_eq!(body_text(&request), "group_id=7");

        let request = client().groups_change_owner_request("7", "55").build().unwrap();
        let body: serde_json::Value = serde_json::from_str(&body_text(&request)).unwrap();
        assert_eq!(body, serde_json::json!({"group_id": "7", "owner_id": "55"}));
    }

    #[test]
    fn test_member_bodies() {
        let members = vec![AddMember {
            nickname: "Mom".to_string(),
            email: "mom@example.com".to_string(),
            guid: "GUID-1".to_string(),
            ..Default::default()
        }];
        let request = client().members_add_request("7", &members).build().unwrap();
        let body: serde_json::Value = serde_json::from_str(&body_text(&request)).unwrap();
        assert_eq!(
            body,
            serde_json::json!([{"nickname": "Mom", "guid": "GUID-1", "email": "mom@example.com"}])
        );

        let request = client().members_update_request("7", "Captain").build().unwrap();
        let body: serde_json::Value = serde_json::from_str(&body_text(&request)).unwrap();
        assert_eq!(body, serde_json::json!({"membership": {"nickname": "Captain"}}));
    }
}
