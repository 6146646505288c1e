//! Cached connection status and partial updates
//!
//! Every update is a `StatusPatch` merged into the cached `ConnectionStatus`;
//! consumers only ever receive the merged result, so a field that was known
//! once never turns unknown again.

use serde::{Deserialize, Serialize};

/// Connection lifecycle of the control session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Last-known broadcast-control status (always fully populated)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub streaming: bool,
    pub microphone_muted: bool,
}

/// Partial status update; `None` leaves the cached value untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusPatch {
    pub connected: Option<bool>,
    pub streaming: Option<bool>,
    pub microphone_muted: Option<bool>,
}

impl StatusPatch {
    pub fn connected(connected: bool) -> Self {
        Self {
            connected: Some(connected),
            ..Self::default()
        }
    }

    pub fn streaming(streaming: bool) -> Self {
        Self {
            streaming: Some(streaming),
            ..Self::default()
        }
    }

    pub fn microphone_muted(muted: bool) -> Self {
        Self {
            microphone_muted: Some(muted),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.connected.is_none() && self.streaming.is_none() && self.microphone_muted.is_none()
    }
}

impl ConnectionStatus {
    /// Apply a patch in place
    pub fn merge(&mut self, patch: StatusPatch) {
        if let Some(connected) = patch.connected {
            self.connected = connected;
        }
        if let Some(streaming) = patch.streaming {
            self.streaming = streaming;
        }
        if let Some(muted) = patch.microphone_muted {
            self.microphone_muted = muted;
        }
    }

    /// Merged copy
    pub fn merged(mut self, patch: StatusPatch) -> Self {
        self.merge(patch);
        self
    }
}
