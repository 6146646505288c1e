//! Chat items as delivered by the chat feed client
//!
//! Field names follow the feed client's JSON (camelCase). Everything is
//! optional or defaulted; the feed is not trusted to be complete.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawImage {
    pub url: String,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawBadge {
    pub label: String,
    pub thumbnail: Option<RawImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawAuthor {
    pub name: String,
    pub channel_id: String,
    pub thumbnail: Option<RawImage>,
    pub badges: Vec<RawBadge>,
}

/// One run of the message: either `text` or an emoji image (`url`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawMessagePart {
    pub text: Option<String>,
    pub url: Option<String>,
    pub alt: Option<String>,
    pub emoji_text: Option<String>,
    pub is_custom_emoji: bool,
}

impl RawMessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn emoji(url: impl Into<String>, emoji_text: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            emoji_text: Some(emoji_text.into()),
            is_custom_emoji: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSuperChat {
    /// Display amount, e.g. `¥500`
    pub amount: String,
    /// Background color declared by the service, `#RRGGBB`
    pub color: String,
    pub sticker: Option<RawImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawChatItem {
    pub id: String,
    pub author: RawAuthor,
    pub message: Vec<RawMessagePart>,
    pub superchat: Option<RawSuperChat>,
    /// Set by the service for sponsors
    pub is_membership: bool,
    pub is_verified: bool,
    pub is_owner: bool,
    pub is_moderator: bool,
    pub timestamp_ms: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_feed_json() {
        let item: RawChatItem = serde_json::from_str(
            r#"{
                "id": "abc",
                "author": {
                    "name": "viewer",
                    "channelId": "UCxyz",
                    "thumbnail": {"url": "//yt3.ggpht.com/a.png", "alt": "viewer"},
                    "badges": [{"label": "Member (2 months)"}]
                },
                "message": [
                    {"text": "hi "},
                    {"url": "https://yt3.ggpht.com/e.png", "alt": ":wave:", "emojiText": ":wave:", "isCustomEmoji": true}
                ],
                "isMembership": false
            }"#,
        )
        .unwrap();
        assert_eq!(item.author.channel_id, "UCxyz");
        assert_eq!(item.message.len(), 2);
        assert_eq!(item.message[1].emoji_text.as_deref(), Some(":wave:"));
        assert!(item.superchat.is_none());
        assert_eq!(item.author.badges[0].label, "Member (2 months)");
    }
}
