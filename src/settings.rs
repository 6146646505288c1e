//! Overlay settings
//!
//! Owned and persisted by the host application; the core only reads them.
//! Stored as JSON, missing fields fall back to defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Rect;
use crate::consts::DEFAULT_COMMENT_TTL_MS;
use crate::error::SettingsError;
use crate::transform::ViewportSize;

/// Broadcast-control (OBS websocket) connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Websocket endpoint, e.g. `ws://127.0.0.1:4455`
    pub endpoint: String,
    /// Websocket password (empty when auth is disabled)
    pub credential: String,
    /// Name of the microphone input whose mute state and level are tracked
    pub mic_input_name: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:4455".to_string(),
            credential: String::new(),
            mic_input_name: "Mic/Aux".to_string(),
        }
    }
}

/// Live chat settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Channel id or live URL to attach to
    pub channel_id: String,
}

/// Overlay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub control: ControlConfig,
    pub chat: ChatConfig,
    /// Lifetime of a comment body
    pub comment_ttl_ms: u64,
    /// Where the game capture sits inside the broadcast canvas
    pub game_area: Rect,
    /// Spectator window size in pixels
    pub spectator_viewport: ViewportSize,
    /// Fixed delay before a connector retries
    pub retry_delay_ms: u64,
    /// Seed for spawn positions and comment hues
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            control: ControlConfig::default(),
            chat: ChatConfig::default(),
            comment_ttl_ms: DEFAULT_COMMENT_TTL_MS,
            game_area: Rect::default(),
            spectator_viewport: ViewportSize::new(3840.0, 2160.0),
            retry_delay_ms: 5_000,
            seed: 0x5eed,
        }
    }
}

impl Settings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Load settings from a JSON file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        match std::fs::read_to_string(path) {
            Ok(json) => {
                let settings: Settings = serde_json::from_str(&json)?;
                log::info!("Loaded settings from {}", path.display());
                Ok(settings)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}
