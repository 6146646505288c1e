//! Body types and comment payloads
//!
//! A body is a fixed-shape tagged value: its kind decides whether it moves,
//! whether it responds physically, and which payload it carries.

use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::WorldError;

/// Stable body identifier, never reused within a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyId(pub u32);

/// Collision shape (immutable after creation)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Shape {
    Circle { radius: f32 },
    Rect { width: f32, height: f32 },
}

impl Shape {
    pub fn area(&self) -> f32 {
        match *self {
            Shape::Circle { radius } => std::f32::consts::PI * radius * radius,
            Shape::Rect { width, height } => width * height,
        }
    }

    /// Half extents of the bounding box
    pub fn half_extents(&self) -> Vec2 {
        match *self {
            Shape::Circle { radius } => Vec2::splat(radius),
            Shape::Rect { width, height } => Vec2::new(width / 2.0, height / 2.0),
        }
    }

    /// Uniformly scaled copy (for viewport projection)
    pub fn scaled(&self, scale: f32) -> Self {
        match *self {
            Shape::Circle { radius } => Shape::Circle {
                radius: radius * scale,
            },
            Shape::Rect { width, height } => Shape::Rect {
                width: width * scale,
                height: height * scale,
            },
        }
    }
}

/// Display color of a comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Color {
    /// Hue in degrees, saturation and lightness in percent
    Hsl {
        hue: f32,
        saturation: f32,
        lightness: f32,
    },
    /// `#rrggbb` / `#rrggbbaa` as declared by the chat service
    Hex { value: String },
}

impl Color {
    /// The randomized comment palette: any hue at 70% saturation, 60% lightness
    pub fn from_hue(hue: f32) -> Self {
        Color::Hsl {
            hue,
            saturation: 70.0,
            lightness: 60.0,
        }
    }

    pub fn hex(value: impl Into<String>) -> Self {
        Color::Hex {
            value: value.into(),
        }
    }

    /// CSS form for renderers
    pub fn to_css(&self) -> String {
        match self {
            Color::Hsl {
                hue,
                saturation,
                lightness,
            } => format!("hsl({hue}, {saturation}%, {lightness}%)"),
            Color::Hex { value } => value.clone(),
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Color::Hsl {
                hue,
                saturation,
                lightness,
            } => hue.is_finite() && saturation.is_finite() && lightness.is_finite(),
            Color::Hex { value } => {
                let digits = value.strip_prefix('#').unwrap_or("");
                matches!(digits.len(), 3 | 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
            }
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::hex("#FFFFFF")
    }
}

/// Author badge (membership, moderator, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub label: String,
    pub icon_url: Option<String>,
}

/// Paid message details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperChat {
    pub amount_text: String,
    pub color_hex: String,
}

/// Paid sticker details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperSticker {
    pub icon_url: String,
}

/// One run of a message: plain text or a custom emoji image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Display metadata carried by a comment body, opaque to the step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentPayload {
    pub text: String,
    pub color: Color,
    pub author_name: String,
    pub author_icon_url: Option<String>,
    pub badges: Vec<Badge>,
    pub is_member: bool,
    pub superchat: Option<SuperChat>,
    pub supersticker: Option<SuperSticker>,
    pub emoji_parts: Vec<MessagePart>,
}

impl CommentPayload {
    /// Plain comment with only text and color
    pub fn text(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color,
            ..Default::default()
        }
    }

    /// Reject payloads a renderer could not draw
    pub fn validate(&self) -> Result<(), WorldError> {
        if self.text.trim().is_empty() && self.emoji_parts.is_empty() {
            return Err(WorldError::InvalidPayload("missing text".to_string()));
        }
        if !self.color.is_valid() {
            return Err(WorldError::InvalidPayload(format!(
                "bad color {:?}",
                self.color
            )));
        }
        Ok(())
    }
}

/// Body kind; only comments carry a payload
#[derive(Debug, Clone, PartialEq)]
pub enum BodyKind {
    Comment(Arc<CommentPayload>),
    Peg,
    Wall,
    Sensor,
}

/// Payload-free kind tag for snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BodyTag {
    Comment,
    Peg,
    Wall,
    Sensor,
}

impl BodyKind {
    pub fn tag(&self) -> BodyTag {
        match self {
            BodyKind::Comment(_) => BodyTag::Comment,
            BodyKind::Peg => BodyTag::Peg,
            BodyKind::Wall => BodyTag::Wall,
            BodyKind::Sensor => BodyTag::Sensor,
        }
    }
}

/// Surface response parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
}

impl Material {
    pub const COMMENT: Material = Material {
        restitution: COMMENT_RESTITUTION,
        friction: COMMENT_FRICTION,
        density: COMMENT_DENSITY,
    };

    pub const STATIC: Material = Material {
        restitution: 0.0,
        friction: 0.1,
        density: 0.0,
    };
}

/// A simulated body
#[derive(Debug, Clone)]
pub struct Body {
    pub id: BodyId,
    pub kind: BodyKind,
    pub shape: Shape,
    pub pos: Vec2,
    pub angle: f32,
    pub vel: Vec2,
    pub angular_vel: f32,
    pub material: Material,
    /// World clock at creation
    pub created_at_ms: f64,
    pub ttl_ms: Option<f64>,
}

impl Body {
    pub fn new_static(id: BodyId, kind: BodyKind, shape: Shape, pos: Vec2) -> Self {
        Self {
            id,
            kind,
            shape,
            pos,
            angle: 0.0,
            vel: Vec2::ZERO,
            angular_vel: 0.0,
            material: Material::STATIC,
            created_at_ms: 0.0,
            ttl_ms: None,
        }
    }

    pub fn new_comment(
        id: BodyId,
        payload: Arc<CommentPayload>,
        pos: Vec2,
        created_at_ms: f64,
        ttl_ms: Option<f64>,
    ) -> Self {
        Self {
            id,
            kind: BodyKind::Comment(payload),
            shape: Shape::Circle {
                radius: COMMENT_RADIUS,
            },
            pos,
            angle: 0.0,
            vel: Vec2::ZERO,
            angular_vel: 0.0,
            material: Material::COMMENT,
            created_at_ms,
            ttl_ms,
        }
    }

    /// Static bodies never move and are never culled
    #[inline]
    pub fn is_static(&self) -> bool {
        !matches!(self.kind, BodyKind::Comment(_))
    }

    /// Sensors detect overlap without physical response
    #[inline]
    pub fn is_sensor(&self) -> bool {
        matches!(self.kind, BodyKind::Sensor)
    }

    pub fn payload(&self) -> Option<&Arc<CommentPayload>> {
        match &self.kind {
            BodyKind::Comment(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn mass(&self) -> f32 {
        self.material.density * self.shape.area()
    }

    /// Inverse mass, zero for static bodies
    pub fn inv_mass(&self) -> f32 {
        let mass = self.mass();
        if self.is_static() || mass <= 0.0 {
            0.0
        } else {
            1.0 / mass
        }
    }

    pub fn age_ms(&self, now_ms: f64) -> f64 {
        now_ms - self.created_at_ms
    }

    /// True once the body's age reaches its time-to-live
    pub fn is_expired(&self, now_ms: f64) -> bool {
        self.ttl_ms.is_some_and(|ttl| self.age_ms(now_ms) >= ttl)
    }
}

/// Renderable copy of one body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyView {
    pub id: BodyId,
    pub kind: BodyTag,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub shape: Shape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Arc<CommentPayload>>,
}

impl From<&Body> for BodyView {
    fn from(body: &Body) -> Self {
        Self {
            id: body.id,
            kind: body.kind.tag(),
            x: body.pos.x,
            y: body.pos.y,
            angle: body.angle,
            shape: body.shape,
            payload: body.payload().cloned(),
        }
    }
}

/// Point-in-time copy of all bodies
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Steps taken so far
    pub step: u64,
    /// World clock in milliseconds
    pub time_ms: f64,
    pub bodies: Vec<BodyView>,
}

impl Snapshot {
    pub fn get(&self, id: BodyId) -> Option<&BodyView> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn comments(&self) -> impl Iterator<Item = &BodyView> {
        self.bodies.iter().filter(|b| b.kind == BodyTag::Comment)
    }
}
