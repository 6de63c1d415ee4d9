//! Typed records for the entities returned by the GroupMe API.

pub mod group;
pub mod member;
pub mod message;

pub use group::{Group, MessageSummary};
pub use member::Member;
pub use message::{sort_chronologically, Attachment, AttachmentProperties, Message, MessagePage};

use serde::{Deserialize, Deserializer};

/// Deserialize a field that the API sends as `null` when empty.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
