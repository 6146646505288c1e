//! Host message bus vocabulary
//!
//! Every message is a JSON object tagged with a kebab-case `type`. Inbound
//! messages come from the admin panel and overlay windows; outbound messages
//! are fanned out to every subscribed window.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;
use crate::control::ConnectionStatus;
use crate::lucky::LuckyEntry;
use crate::settings::ControlConfig;
use crate::sim::{BodyView, CommentPayload, WorldCommand};
use crate::transform::{ViewportKind, ViewportSize};

/// Outbound queue depth per subscriber; slow consumers skip ahead
pub const OUTBOUND_CAPACITY: usize = 256;

/// Messages the core accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BusInbound {
    SpawnComment {
        payload: CommentPayload,
        #[serde(default)]
        ttl_ms: Option<u64>,
    },
    SetGravity {
        x: f32,
        y: f32,
    },
    ClearWorld,
    SetConfig(ControlConfig),
    SetStreaming {
        enabled: bool,
    },
    SetMuted {
        muted: bool,
    },
    ChatConnect {
        channel_id: String,
    },
    ChatDisconnect,
    SetCommentTtl {
        ttl_ms: u64,
    },
    ViewportResized {
        width: f32,
        height: f32,
    },
    /// Rebroadcast both connector statuses (late-opening windows)
    RequestStatus,
    RequestLuckyLog,
}

impl BusInbound {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// World mutation carried by this message, if any
    pub fn world_command(&self) -> Option<WorldCommand> {
        match self {
            BusInbound::SpawnComment { payload, ttl_ms } => Some(WorldCommand::SpawnComment {
                payload: payload.clone(),
                ttl_ms: *ttl_ms,
            }),
            BusInbound::SetGravity { x, y } => Some(WorldCommand::SetGravity { x: *x, y: *y }),
            BusInbound::ClearWorld => Some(WorldCommand::ClearWorld),
            _ => None,
        }
    }

    pub fn viewport_size(&self) -> Option<ViewportSize> {
        match *self {
            BusInbound::ViewportResized { width, height } => Some(ViewportSize::new(width, height)),
            _ => None,
        }
    }
}

/// Messages the core emits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BusOutbound {
    PhysicsSnapshot {
        viewport: ViewportKind,
        step: u64,
        bodies: Arc<Vec<BodyView>>,
    },
    LuckyHit {
        payload: Arc<CommentPayload>,
    },
    LuckyLog {
        entries: Vec<LuckyEntry>,
    },
    StatusUpdate(ConnectionStatus),
    AudioLevel {
        level: f32,
    },
    ChatStatus {
        connected: bool,
    },
    NewMessage {
        message: Arc<ChatMessage>,
    },
}

impl BusOutbound {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Short tag for logging
    pub fn kind(&self) -> &'static str {
        match self {
            BusOutbound::PhysicsSnapshot { .. } => "physics-snapshot",
            BusOutbound::LuckyHit { .. } => "lucky-hit",
            BusOutbound::LuckyLog { .. } => "lucky-log",
            BusOutbound::StatusUpdate(_) => "status-update",
            BusOutbound::AudioLevel { .. } => "audio-level",
            BusOutbound::ChatStatus { .. } => "chat-status",
            BusOutbound::NewMessage { .. } => "new-message",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_world_messages() {
        let spawn = BusInbound::from_json(
            r##"{"type":"spawn-comment","payload":{"text":"hi","color":{"type":"hex","value":"#FF0000"}},"ttl_ms":3000}"##,
        )
        .unwrap();
        match spawn.world_command() {
            Some(WorldCommand::SpawnComment { payload, ttl_ms }) => {
                assert_eq!(payload.text, "hi");
                assert_eq!(ttl_ms, Some(3000));
            }
            other => panic!("unexpected {other:?}"),
        }

        let gravity = BusInbound::from_json(r#"{"type":"set-gravity","x":0.5,"y":-1}"#).unwrap();
        assert_eq!(gravity, BusInbound::SetGravity { x: 0.5, y: -1.0 });

        let clear = BusInbound::from_json(r#"{"type":"clear-world"}"#).unwrap();
        assert_eq!(clear.world_command(), Some(WorldCommand::ClearWorld));
    }

    #[test]
    fn test_parse_connector_messages() {
        let config = BusInbound::from_json(
            r#"{"type":"set-config","endpoint":"ws://10.0.0.2:4455","credential":"pw","mic_input_name":"Mic"}"#,
        )
        .unwrap();
        match config {
            BusInbound::SetConfig(c) => {
                assert_eq!(c.endpoint, "ws://10.0.0.2:4455");
                assert_eq!(c.mic_input_name, "Mic");
            }
            other => panic!("unexpected {other:?}"),
        }

        assert_eq!(
            BusInbound::from_json(r#"{"type":"chat-connect","channel_id":"UC123"}"#).unwrap(),
            BusInbound::ChatConnect {
                channel_id: "UC123".to_string()
            }
        );
        assert_eq!(
            BusInbound::from_json(r#"{"type":"viewport-resized","width":1280,"height":720}"#)
                .unwrap()
                .viewport_size(),
            Some(ViewportSize::new(1280.0, 720.0))
        );
        assert!(BusInbound::from_json(r#"{"type":"reboot"}"#).is_err());
    }

    #[test]
    fn test_outbound_shapes() {
        let status = BusOutbound::StatusUpdate(ConnectionStatus {
            connected: true,
            streaming: false,
            microphone_muted: true,
        });
        let value: serde_json::Value = serde_json::from_str(&status.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "status-update", "connected": true, "streaming": false, "microphone_muted": true})
        );

        let snapshot = BusOutbound::PhysicsSnapshot {
            viewport: ViewportKind::Spectator,
            step: 3,
            bodies: Arc::new(Vec::new()),
        };
        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "physics-snapshot");
        assert_eq!(value["viewport"], "spectator");
        assert_eq!(snapshot.kind(), "physics-snapshot");
    }
}
