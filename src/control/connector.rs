//! Broadcast-software control connector
//!
//! Owns the control session lifecycle: connect with replay of stream and mute
//! state, reconnect on loss, fire-and-forget remote commands, and fan-out of
//! the merged status and microphone level to every bus subscriber.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use crate::bus::BusOutbound;
use crate::error::ConnectorError;
use crate::retry::RetrySlot;
use crate::settings::ControlConfig;

use super::meter::AudioMeter;
use super::status::{ConnectionState, ConnectionStatus, StatusPatch};
use super::transport::{
    ControlEvent, ControlEventSink, ControlRequest, ControlResponse, ControlSessionEvent,
    ControlTransport, SessionId,
};

/// Work items for the connector's dispatcher
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    /// Store the config and (re)connect with it
    SetConfig(ControlConfig),
    SetStreaming(bool),
    SetMuted(bool),
    /// Posted by the retry timer, tagged with its generation
    Retry(u64),
    /// Rebroadcast the cached status
    Announce,
    Shutdown,
}

/// Receiving ends of the connector's queues, consumed by `run`
#[derive(Debug)]
pub struct ControlInbox {
    pub commands: mpsc::UnboundedReceiver<ControlCommand>,
    pub events: mpsc::UnboundedReceiver<ControlSessionEvent>,
}

pub struct BroadcastConnector<T> {
    transport: T,
    config: Option<ControlConfig>,
    state: ConnectionState,
    session: SessionId,
    status: ConnectionStatus,
    meter: AudioMeter,
    retry: RetrySlot,
    commands: mpsc::UnboundedSender<ControlCommand>,
    events: mpsc::UnboundedSender<ControlSessionEvent>,
    outbox: broadcast::Sender<BusOutbound>,
}

impl<T: ControlTransport> BroadcastConnector<T> {
    pub fn new(
        transport: T,
        outbox: broadcast::Sender<BusOutbound>,
        retry_delay: Duration,
    ) -> (Self, ControlInbox) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();
        let connector = Self {
            transport,
            config: None,
            state: ConnectionState::Disconnected,
            session: 0,
            status: ConnectionStatus::default(),
            meter: AudioMeter::default(),
            retry: RetrySlot::new(retry_delay),
            commands,
            events,
            outbox,
        };
        let inbox = ControlInbox {
            commands: command_rx,
            events: event_rx,
        };
        (connector, inbox)
    }

    pub fn command_sender(&self) -> mpsc::UnboundedSender<ControlCommand> {
        self.commands.clone()
    }

    /// Cached status, no I/O
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn has_pending_retry(&self) -> bool {
        self.retry.is_pending()
    }

    /// Tear down any current session and connect with `config`
    ///
    /// Failures are logged, reflected in the status and retried later.
    pub async fn connect(&mut self, config: ControlConfig) {
        self.retry.cancel();
        self.teardown().await;

        self.session += 1;
        self.state = ConnectionState::Connecting;
        self.config = Some(config.clone());
        log::info!("Connecting to broadcast control at {}", config.endpoint);

        let sink = ControlEventSink::new(self.session, self.events.clone());
        match self
            .transport
            .connect(&config.endpoint, &config.credential, sink)
            .await
        {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                log::info!("Broadcast control connected (session {})", self.session);
                self.update(StatusPatch::connected(true));
                self.sync_status(&config.mic_input_name).await;
            }
            Err(source) => {
                let err = ConnectorError::ConnectionFailed {
                    endpoint: config.endpoint.clone(),
                    source,
                };
                log::warn!("{err}");
                self.state = ConnectionState::Disconnected;
                self.update(StatusPatch {
                    connected: Some(false),
                    streaming: Some(false),
                    microphone_muted: None,
                });
                self.schedule_retry();
            }
        }
    }

    /// Close the session on request; no retry follows
    pub async fn disconnect(&mut self) {
        self.retry.cancel();
        if self.teardown().await {
            self.update(StatusPatch {
                connected: Some(false),
                streaming: Some(false),
                microphone_muted: None,
            });
        }
    }

    /// Start or stop the broadcast; failures are logged only
    pub async fn set_streaming(&mut self, enabled: bool) {
        let request = if enabled {
            ControlRequest::StartStream
        } else {
            ControlRequest::StopStream
        };
        self.fire_and_forget(request).await;
    }

    /// Mute or unmute the configured microphone input; failures are logged only
    pub async fn set_microphone_muted(&mut self, muted: bool) {
        let Some(input_name) = self.config.as_ref().map(|c| c.mic_input_name.clone()) else {
            log::warn!("Cannot change microphone mute before a config is set");
            return;
        };
        self.fire_and_forget(ControlRequest::SetInputMute { input_name, muted })
            .await;
    }

    /// Returns false when the dispatcher should stop
    pub async fn handle_command(&mut self, command: ControlCommand) -> bool {
        match command {
            ControlCommand::SetConfig(config) => self.connect(config).await,
            ControlCommand::SetStreaming(enabled) => self.set_streaming(enabled).await,
            ControlCommand::SetMuted(muted) => self.set_microphone_muted(muted).await,
            ControlCommand::Retry(generation) => {
                if !self.retry.fire(generation) {
                    return true;
                }
                match (self.state, self.config.clone()) {
                    (ConnectionState::Disconnected, Some(config)) => {
                        log::info!("Retrying broadcast control connection");
                        self.connect(config).await;
                    }
                    _ => log::debug!("Retry ignored in state {:?}", self.state),
                }
            }
            ControlCommand::Announce => self.broadcast_status(),
            ControlCommand::Shutdown => return false,
        }
        true
    }

    pub fn handle_event(&mut self, event: ControlSessionEvent) {
        if event.session != self.session || self.state != ConnectionState::Connected {
            log::debug!("Dropping stale control event from session {}", event.session);
            return;
        }
        match event.event {
            ControlEvent::StreamStateChanged { output_active } => {
                log::info!("Stream state changed: active={output_active}");
                self.update(StatusPatch::streaming(output_active));
            }
            ControlEvent::InputMuteStateChanged { input_name, muted } => {
                if self.is_microphone(&input_name) {
                    log::info!("Microphone mute changed: muted={muted}");
                    self.update(StatusPatch::microphone_muted(muted));
                }
            }
            ControlEvent::InputVolumeMeters { inputs } => {
                let level = inputs
                    .iter()
                    .find(|input| self.is_microphone(&input.input_name))
                    .map(|input| self.meter.level(&input.levels));
                if let Some(level) = level {
                    self.send(BusOutbound::AudioLevel { level });
                }
            }
            ControlEvent::ConnectionClosed { reason } => {
                log::warn!(
                    "Broadcast control connection lost: {}",
                    reason.as_deref().unwrap_or("closed by server")
                );
                self.state = ConnectionState::Disconnected;
                self.update(StatusPatch {
                    connected: Some(false),
                    streaming: Some(false),
                    microphone_muted: None,
                });
                self.schedule_retry();
            }
        }
    }

    /// Dispatcher loop; returns after `Shutdown`
    pub async fn run(mut self, mut inbox: ControlInbox) {
        loop {
            tokio::select! {
                Some(command) = inbox.commands.recv() => {
                    if !self.handle_command(command).await {
                        break;
                    }
                }
                Some(event) = inbox.events.recv() => self.handle_event(event),
                else => break,
            }
        }
        self.retry.cancel();
        self.teardown().await;
        log::info!("Broadcast control connector stopped");
    }

    /// Fetch stream and mute state after (re)connecting
    async fn sync_status(&mut self, mic_input_name: &str) {
        let mut patch = StatusPatch::default();

        match self.transport.call(ControlRequest::GetStreamStatus).await {
            Ok(ControlResponse::StreamStatus { output_active }) => {
                patch.streaming = Some(output_active);
            }
            Ok(other) => log::warn!("Unexpected stream status reply: {other:?}"),
            Err(e) => log::warn!("Failed to fetch stream status: {e}"),
        }

        let request = ControlRequest::GetInputMute {
            input_name: mic_input_name.to_string(),
        };
        match self.transport.call(request).await {
            Ok(ControlResponse::InputMute { muted }) => patch.microphone_muted = Some(muted),
            Ok(other) => log::warn!("Unexpected input mute reply: {other:?}"),
            Err(e) => log::warn!("Failed to fetch mute state of {mic_input_name}: {e}"),
        }

        if !patch.is_empty() {
            self.update(patch);
        }
    }

    async fn fire_and_forget(&mut self, request: ControlRequest) {
        let command = request.name();
        if self.state != ConnectionState::Connected {
            let err = ConnectorError::RemoteCommandFailed {
                command,
                reason: "not connected".to_string(),
            };
            log::warn!("{err}");
            return;
        }
        if let Err(e) = self.transport.call(request).await {
            let err = ConnectorError::RemoteCommandFailed {
                command,
                reason: e.to_string(),
            };
            log::warn!("{err}");
        }
    }

    /// Close the live session; true if there was one
    async fn teardown(&mut self) -> bool {
        if self.state == ConnectionState::Disconnected {
            return false;
        }
        self.transport.disconnect().await;
        // Anything still queued from the old session is stale now
        self.session += 1;
        self.state = ConnectionState::Disconnected;
        true
    }

    fn schedule_retry(&mut self) {
        if self.config.is_some() {
            self.retry.schedule(&self.commands, ControlCommand::Retry);
        }
    }

    fn is_microphone(&self, input_name: &str) -> bool {
        self.config
            .as_ref()
            .is_some_and(|c| c.mic_input_name == input_name)
    }

    fn update(&mut self, patch: StatusPatch) {
        self.status.merge(patch);
        self.broadcast_status();
    }

    fn broadcast_status(&self) {
        self.send(BusOutbound::StatusUpdate(self.status));
    }

    fn send(&self, message: BusOutbound) {
        if self.outbox.send(message).is_err() {
            log::debug!("No bus subscribers for control update");
        }
    }
}
