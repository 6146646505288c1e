//! Chatfall - live-stream overlay core
//!
//! Core modules:
//! - `sim`: Deterministic physics world (comment bodies, pegs, lucky sensor)
//! - `transform`: Simulation space to broadcast/spectator viewport mapping
//! - `control`: Broadcast-software (OBS) control connector
//! - `chat`: Live chat ingestion connector and message normalization
//! - `bus`: Typed inbound/outbound messages for the host message bus
//! - `lucky`: Bounded history of sensor hits
//! - `runtime`: Wires the components onto one cooperative event loop

pub mod bus;
pub mod chat;
pub mod control;
pub mod error;
pub mod lucky;
pub mod retry;
pub mod runtime;
pub mod settings;
pub mod sim;
pub mod transform;

pub use error::{ConnectorError, SettingsError, TransportError, WorldError};
pub use settings::Settings;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Simulation configuration constants
pub mod consts {
    /// Physics rate (steps per second)
    pub const SIM_HZ: u32 = 60;
    /// Fixed simulation timestep in milliseconds
    pub const SIM_DT_MS: f32 = 1000.0 / SIM_HZ as f32;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Virtual world size: the broadcast canvas resolution (FHD)
    pub const VIRTUAL_WIDTH: f32 = 1920.0;
    pub const VIRTUAL_HEIGHT: f32 = 1080.0;

    /// Acceleration in px/s² for a gravity component of 1.0
    pub const GRAVITY_SCALE: f32 = 1000.0;
    /// Default gravity (straight down)
    pub const DEFAULT_GRAVITY: (f32, f32) = (0.0, 1.0);

    /// Comment bodies
    pub const COMMENT_RADIUS: f32 = 18.0;
    pub const COMMENT_RESTITUTION: f32 = 0.8;
    pub const COMMENT_FRICTION: f32 = 0.005;
    pub const COMMENT_DENSITY: f32 = 0.001;
    /// Spawn height, above the visible canvas
    pub const SPAWN_Y: f32 = -100.0;
    /// Horizontal inset of the spawn band from the game area edges
    pub const SPAWN_INSET: f32 = 100.0;

    /// Bodies further than this below the world are culled
    pub const OUT_OF_BOUNDS_MARGIN: f32 = 200.0;

    /// Static geometry
    pub const WALL_THICKNESS: f32 = 100.0;
    pub const PEG_RADIUS: f32 = 8.0;
    pub const PEG_SPACING: f32 = 80.0;
    /// Vertical distance between the two peg rows
    pub const PEG_ROW_GAP: f32 = 80.0;
    /// Pegs of the lower row closer than this to the center are left out
    pub const PEG_GAP_HALF_WIDTH: f32 = 60.0;
    pub const SENSOR_WIDTH: f32 = 160.0;
    pub const SENSOR_HEIGHT: f32 = 40.0;

    /// Default comment lifetime
    pub const DEFAULT_COMMENT_TTL_MS: u64 = 15_000;
}

/// Axis-aligned rectangle in simulation space (top-left origin, y down)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// True if both extents are finite and positive
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

impl Default for Rect {
    /// The game capture area inside the broadcast canvas (1280x720, centered)
    fn default() -> Self {
        Self::new(320.0, 180.0, 1280.0, 720.0)
    }
}
