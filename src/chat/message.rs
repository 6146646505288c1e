//! Display-ready chat message

use serde::{Deserialize, Serialize};

use crate::sim::{Badge, Color, CommentPayload, MessagePart, SuperChat, SuperSticker};

/// A normalized chat message, immutable once built
///
/// The world gets a derived `CommentPayload`; what happens to that body never
/// feeds back into the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub author_name: String,
    /// Always https when present
    pub author_icon_url: Option<String>,
    pub badges: Vec<Badge>,
    pub is_member: bool,
    pub color: Color,
    pub superchat: Option<SuperChat>,
    pub supersticker: Option<SuperSticker>,
    pub emoji_parts: Vec<MessagePart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<i64>,
}

impl ChatMessage {
    /// Body payload for the physics world
    pub fn to_payload(&self) -> CommentPayload {
        CommentPayload {
            text: self.text.clone(),
            color: self.color.clone(),
            author_name: self.author_name.clone(),
            author_icon_url: self.author_icon_url.clone(),
            badges: self.badges.clone(),
            is_member: self.is_member,
            superchat: self.superchat.clone(),
            supersticker: self.supersticker.clone(),
            emoji_parts: self.emoji_parts.clone(),
        }
    }

    /// Message for a comment injected by hand rather than read from chat
    pub fn from_payload(id: impl Into<String>, payload: &CommentPayload) -> Self {
        Self {
            id: id.into(),
            text: payload.text.clone(),
            author_name: payload.author_name.clone(),
            author_icon_url: payload.author_icon_url.clone(),
            badges: payload.badges.clone(),
            is_member: payload.is_member,
            color: payload.color.clone(),
            superchat: payload.superchat.clone(),
            supersticker: payload.supersticker.clone(),
            emoji_parts: payload.emoji_parts.clone(),
            timestamp_ms: None,
        }
    }
}
