//! Message and attachment records.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::nullable;

/// One page of `GET /groups/:id/messages`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePage {
    #[serde(default, deserialize_with = "nullable")]
    pub count: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub messages: Vec<Message>,
}

/// A message posted to a group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub source_guid: String,
    /// Epoch seconds.
    #[serde(default, deserialize_with = "nullable")]
    pub created_at: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub user_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub group_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub avatar_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub text: String,
    #[serde(default, deserialize_with = "nullable")]
    pub system: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub favorited_by: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Position of the message in its group's timeline.
    ///
    /// Messages sharing a `created_at` are ordered by id so the reply chain is
    /// the same on every run.
    pub fn chronological_cmp(&self, other: &Message) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Sort messages oldest first.
pub fn sort_chronologically(messages: &mut [Message]) {
    messages.sort_by(Message::chronological_cmp);
}

/// A typed message attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAttachment", into = "RawAttachment")]
pub enum Attachment {
    Image { url: String },
    Location { lat: String, lng: String, name: String },
    Split { token: String },
    Emoji { placeholder: String, charmap: Vec<Vec<i64>> },
    /// Any attachment type without a dedicated variant (video, file, mentions, ...).
    Other { kind: String, url: String },
}

/// Wire shape shared by every attachment type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawAttachment {
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "coordinate")]
    lat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "coordinate")]
    lng: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    charmap: Option<Vec<Vec<i64>>>,
}

/// Coordinates arrive as strings from most clients and as numbers from some.
fn coordinate<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl From<RawAttachment> for Attachment {
    fn from(raw: RawAttachment) -> Self {
        match raw.kind.as_str() {
            "image" => Attachment::Image {
                url: raw.url.unwrap_or_default(),
            },
            "location" => Attachment::Location {
                lat: raw.lat.unwrap_or_default(),
                lng: raw.lng.unwrap_or_default(),
                name: raw.name.unwrap_or_default(),
            },
            "split" => Attachment::Split {
                token: raw.token.unwrap_or_default(),
            },
            "emoji" => Attachment::Emoji {
                placeholder: raw.placeholder.unwrap_or_default(),
                charmap: raw.charmap.unwrap_or_default(),
            },
            _ => Attachment::Other {
                kind: raw.kind,
                url: raw.url.unwrap_or_default(),
            },
        }
    }
}

impl From<Attachment> for RawAttachment {
    fn from(attachment: Attachment) -> Self {
        match attachment {
            Attachment::Image { url } => RawAttachment {
                kind: "image".to_string(),
                url: Some(url),
                ..Default::default()
            },
            Attachment::Location { lat, lng, name } => RawAttachment {
                kind: "location".to_string(),
                lat: Some(lat),
                lng: Some(lng),
                name: Some(name),
                ..Default::default()
            },
            Attachment::Split { token } => RawAttachment {
                kind: "split".to_string(),
                token: Some(token),
                ..Default::default()
            },
            Attachment::Emoji { placeholder, charmap } => RawAttachment {
                kind: "emoji".to_string(),
                placeholder: Some(placeholder),
                charmap: Some(charmap),
                ..Default::default()
            },
            Attachment::Other { kind, url } => RawAttachment {
                kind,
                url: Some(url),
                ..Default::default()
            },
        }
    }
}

/// Flattened attachment fields; the identity of an attachment node.
///
/// Fields that do not apply to the attachment type are empty strings so that
/// every attachment node carries the same property set.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttachmentProperties {
    pub kind: String,
    pub url: String,
    pub lat: String,
    pub lng: String,
    pub name: String,
    pub token: String,
    pub placeholder: String,
    /// JSON text of the emoji charmap.
    pub charmap: String,
}

impl Attachment {
    /// The attachment type tag as sent by the API.
    pub fn kind(&self) -> &str {
        match self {
            Attachment::Image { .. } => "image",
            Attachment::Location { .. } => "location",
            Attachment::Split { .. } => "split",
            Attachment::Emoji { .. } => "emoji",
            Attachment::Other { kind, .. } => kind,
        }
    }

    pub fn properties(&self) -> AttachmentProperties {
        let mut props = AttachmentProperties {
            kind: self.kind().to_string(),
            ..Default::default()
        };
        match self {
            Attachment::Image { url } | Attachment::Other { url, .. } => props.url = url.clone(),
            Attachment::Location { lat, lng, name } => {
                props.lat = lat.clone();
                props.lng = lng.clone();
                props.name = name.clone();
            }
            Attachment::Split { token } => props.token = token.clone(),
            Attachment::Emoji { placeholder, charmap } => {
                props.placeholder = placeholder.clone();
                props.charmap = serde_json::to_string(charmap).unwrap_or_default();
            }
        }
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_message_with_attachments() {
        let json = r#"{
            "id": "1234567890",
            "source_guid": "GUID",
            "created_at": 1302623328,
            "user_id": "1234567890",
            "group_id": "1234567890",
            "name": "John",
            "avatar_url": "https://i.groupme.com/123456789",
            "text": "Hello world",
            "system": false,
            "favorited_by": ["101", "66"],
            "attachments": [
                {"type": "image", "url": "https://i.groupme.com/123456789"},
                {"type": "location", "lat": "40.738206", "lng": "-73.993285", "name": "GroupMe HQ"},
                {"type": "split", "token": "SPLIT_TOKEN"},
                {"type": "emoji", "placeholder": "☃", "charmap": [[1, 42], [2, 34]]},
                {"type": "video", "url": "https://v.groupme.com/1.mp4", "preview_url": "x"}
            ]
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.favorited_by, vec!["101", "66"]);
        assert_eq!(message.attachments.len(), 5);
        assert_eq!(
            message.attachments[1],
            Attachment::Location {
                lat: "40.738206".into(),
                lng: "-73.993285".into(),
                name: "GroupMe HQ".into()
            }
        );
        assert_eq!(message.attachments[4].kind(), "video");
        assert_eq!(message.created_at, 1302623328);
    }

    #[test]
    fn test_null_text_and_favorites() {
        let message: Message = serde_json::from_str(
            r#"{"id": "1", "text": null, "favorited_by": null, "attachments": null, "created_at": 5}"#,
        )
        .unwrap();
        assert_eq!(message.text, "");
        assert!(message.favorited_by.is_empty());
        assert!(message.attachments.is_empty());
    }

    #[test]
    fn test_numeric_coordinates() {
        let attachment: Attachment =
            serde_json::from_str(r#"{"type": "location", "lat": 40.5, "lng": -73.25, "name": "Pier"}"#).unwrap();
        let props = attachment.properties();
        assert_eq!(props.lat, "40.5");
        assert_eq!(props.lng, "-73.25");
    }

    #[test]
    fn test_emoji_properties_carry_charmap_text() {
        let attachment = Attachment::Emoji {
            placeholder: "☃".to_string(),
            charmap: vec![vec![1, 42]],
        };
        let props = attachment.properties();
        assert_eq!(props.kind, "emoji");
        assert_eq!(props.charmap, "[[1,42]]");
        assert_eq!(props.url, "");
    }

    #[test]
    fn test_attachment_serializes_back_to_wire_shape() {
        let value = serde_json::to_value(Attachment::Split { token: "T".into() }).unwrap();
        assert_eq!(value, serde_json::json!({"type": "split", "token": "T"}));
    }

    #[test]
    fn test_sort_breaks_ties_by_id() {
        let mut messages = vec![
            Message { id: "b".into(), created_at: 10, ..Default::default() },
            Message { id: "c".into(), created_at: 5, ..Default::default() },
            Message { id: "a".into(), created_at: 10, ..Default::default() },
        ];
        sort_chronologically(&mut messages);
        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
