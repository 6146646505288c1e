//! Broadcast-software (OBS) control
//!
//! - `status`: cached connection status and partial patches
//! - `transport`: seam to the websocket client
//! - `meter`: microphone level shaping
//! - `connector`: session lifecycle, reconnect and fan-out

pub mod connector;
pub mod meter;
pub mod status;
pub mod transport;

pub use connector::{BroadcastConnector, ControlCommand, ControlInbox};
pub use meter::AudioMeter;
pub use status::{ConnectionState, ConnectionStatus, StatusPatch};
pub use transport::{
    ControlEvent, ControlEventSink, ControlRequest, ControlResponse, ControlSessionEvent,
    ControlTransport, InputLevels, SessionId,
};
