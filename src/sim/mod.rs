//! Deterministic physics world
//!
//! Comments fall as circles through a peg field toward the lucky sensor.
//! This module must stay pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by body ID)
//! - No I/O, no awaiting

pub mod body;
pub mod collision;
pub mod layout;
pub mod state;
pub mod tick;

pub use body::{
    Badge, Body, BodyId, BodyKind, BodyTag, BodyView, Color, CommentPayload, MessagePart, Shape,
    Snapshot, SuperChat, SuperSticker,
};
pub use layout::{Layout, peg_positions};
pub use state::World;
pub use tick::{FixedStepper, StepOutcome, WorldCommand, WorldEvent};
