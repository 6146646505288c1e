//! Raw chat item -> `ChatMessage`
//!
//! Text runs are flattened, image urls forced to https, membership decided
//! from the sponsor flag or badge labels, and a color picked.

use rand::Rng;

use super::message::ChatMessage;
use super::raw::{RawChatItem, RawImage, RawMessagePart, RawSuperChat};
use crate::sim::{Badge, Color, MessagePart, SuperChat, SuperSticker};

/// Badge label fragments that mark a channel member (lowercase)
const MEMBER_MARKERS: [&str; 3] = ["member", "メンバー", "sponsor"];

/// Labels that never count as membership, even if a member marker matches
const NON_MEMBER_MARKERS: [&str; 6] = [
    "moderator",
    "verified",
    "owner",
    "モデレーター",
    "確認済み",
    "所有者",
];

/// Trim and force https: `//host/x` and `http://host/x` become `https://host/x`
///
/// Idempotent; anything else is passed through trimmed.
pub fn secure_url(url: &str) -> String {
    let url = url.trim();
    if let Some(rest) = url.strip_prefix("//") {
        format!("https://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("https://{rest}")
    } else {
        url.to_string()
    }
}

fn secure_image(image: Option<&RawImage>) -> Option<String> {
    image
        .map(|img| secure_url(&img.url))
        .filter(|url| !url.is_empty())
}

/// True if a badge label denotes channel membership
pub fn is_membership_label(label: &str) -> bool {
    let label = label.to_lowercase();
    if NON_MEMBER_MARKERS.iter().any(|m| label.contains(m)) {
        return false;
    }
    MEMBER_MARKERS.iter().any(|m| label.contains(m))
}

pub fn is_member(item: &RawChatItem) -> bool {
    item.is_membership
        || item
            .author
            .badges
            .iter()
            .any(|badge| is_membership_label(&badge.label))
}

/// Concatenate the text runs; emoji runs contribute nothing
pub fn flatten_text(parts: &[RawMessagePart]) -> String {
    parts.iter().filter_map(|p| p.text.as_deref()).collect()
}

/// All runs in order, emoji urls secured
pub fn message_parts(parts: &[RawMessagePart]) -> Vec<MessagePart> {
    parts
        .iter()
        .filter_map(|part| match (&part.url, &part.text) {
            (Some(url), _) => Some(MessagePart {
                text: part.emoji_text.clone().or_else(|| part.alt.clone()),
                icon_url: Some(secure_url(url)),
            }),
            (None, Some(text)) => Some(MessagePart {
                text: Some(text.clone()),
                icon_url: None,
            }),
            (None, None) => None,
        })
        .collect()
}

/// Superchat color when it is a usable hex value, otherwise a random hue
pub fn pick_color<R: Rng>(superchat: Option<&RawSuperChat>, rng: &mut R) -> Color {
    if let Some(sc) = superchat {
        let color = Color::hex(sc.color.trim());
        if color.is_valid() {
            return color;
        }
        log::debug!("Ignoring unusable superchat color {:?}", sc.color);
    }
    Color::from_hue(rng.random_range(0.0..360.0))
}

pub fn normalize<R: Rng>(item: &RawChatItem, rng: &mut R) -> ChatMessage {
    let badges = item
        .author
        .badges
        .iter()
        .map(|badge| Badge {
            label: badge.label.clone(),
            icon_url: secure_image(badge.thumbnail.as_ref()),
        })
        .collect();

    let superchat = item.superchat.as_ref().map(|sc| SuperChat {
        amount_text: sc.amount.clone(),
        color_hex: sc.color.trim().to_string(),
    });
    let supersticker = item
        .superchat
        .as_ref()
        .and_then(|sc| secure_image(sc.sticker.as_ref()))
        .map(|icon_url| SuperSticker { icon_url });

    ChatMessage {
        id: item.id.clone(),
        text: flatten_text(&item.message),
        author_name: item.author.name.clone(),
        author_icon_url: secure_image(item.author.thumbnail.as_ref()),
        badges,
        is_member: is_member(item),
        color: pick_color(item.superchat.as_ref(), rng),
        superchat,
        supersticker,
        emoji_parts: message_parts(&item.message),
        timestamp_ms: item.timestamp_ms,
    }
}
