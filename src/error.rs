//! Error taxonomy
//!
//! World errors are caller contract violations and are returned to the caller.
//! Connector errors are environmental: they are logged and surfaced only as
//! status changes, never returned from the connector API.

use thiserror::Error;

/// Physics world failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("world has not been initialized")]
    NotInitialized,
    #[error("invalid spawn payload: {0}")]
    InvalidPayload(String),
    #[error("invalid game area: {0}")]
    InvalidBounds(String),
}

/// Connector failures (logged, never propagated out of the connectors)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    #[error("connection to {endpoint} failed: {source}")]
    ConnectionFailed {
        endpoint: String,
        #[source]
        source: TransportError,
    },
    #[error("remote command {command} failed: {reason}")]
    RemoteCommandFailed { command: &'static str, reason: String },
    #[error("no live session found for {0}")]
    SessionNotFound(String),
}

/// Failure reported by a control or chat transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,
    #[error("connection refused: {0}")]
    Refused(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("{0}")]
    Other(String),
}

/// Settings file failures
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings parse: {0}")]
    Parse(#[from] serde_json::Error),
}
