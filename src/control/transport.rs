//! Seam to the broadcast-software websocket client
//!
//! The connector drives a `ControlTransport`; the transport pushes server
//! events into a `ControlEventSink` tagged with the session they belong to.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Identifies one connection attempt; events from older sessions are stale
pub type SessionId = u64;

/// Requests the connector issues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlRequest {
    GetStreamStatus,
    GetInputMute { input_name: String },
    StartStream,
    StopStream,
    SetInputMute { input_name: String, muted: bool },
}

impl ControlRequest {
    /// Remote request type name
    pub fn name(&self) -> &'static str {
        match self {
            ControlRequest::GetStreamStatus => "GetStreamStatus",
            ControlRequest::GetInputMute { .. } => "GetInputMute",
            ControlRequest::StartStream => "StartStream",
            ControlRequest::StopStream => "StopStream",
            ControlRequest::SetInputMute { .. } => "SetInputMute",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlResponse {
    StreamStatus { output_active: bool },
    InputMute { muted: bool },
    Ack,
}

/// Per-input meter sample, `[magnitude, peak, input_peak]` per channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputLevels {
    pub input_name: String,
    pub levels: Vec<[f32; 3]>,
}

/// Unsolicited server events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlEvent {
    StreamStateChanged { output_active: bool },
    InputMuteStateChanged { input_name: String, muted: bool },
    InputVolumeMeters { inputs: Vec<InputLevels> },
    /// The server went away (not sent for a requested disconnect)
    ConnectionClosed { reason: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlSessionEvent {
    pub session: SessionId,
    pub event: ControlEvent,
}

/// Where a transport delivers events for one session
#[derive(Debug, Clone)]
pub struct ControlEventSink {
    session: SessionId,
    tx: mpsc::UnboundedSender<ControlSessionEvent>,
}

impl ControlEventSink {
    pub fn new(session: SessionId, tx: mpsc::UnboundedSender<ControlSessionEvent>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Returns false once the connector is gone
    pub fn push(&self, event: ControlEvent) -> bool {
        self.tx
            .send(ControlSessionEvent {
                session: self.session,
                event,
            })
            .is_ok()
    }
}

/// Broadcast-software remote control client
pub trait ControlTransport {
    /// Open and authenticate a session; events flow into `events` until it ends
    fn connect(
        &mut self,
        endpoint: &str,
        credential: &str,
        events: ControlEventSink,
    ) -> impl Future<Output = Result<(), TransportError>>;

    fn call(
        &mut self,
        request: ControlRequest,
    ) -> impl Future<Output = Result<ControlResponse, TransportError>>;

    /// Close the current session, if any. Must not raise `ConnectionClosed`.
    fn disconnect(&mut self) -> impl Future<Output = ()>;
}
