//! Chat ingestion connector
//!
//! One live session at a time. Every chat item is normalized once, then sent
//! to the world as a spawn and to display consumers as a `new-message`.

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use super::message::ChatMessage;
use super::normalize::normalize;
use super::source::{ChatEvent, ChatFeed, ChatSessionEvent, ChatSource, SessionId};
use crate::bus::BusOutbound;
use crate::consts::DEFAULT_COMMENT_TTL_MS;
use crate::error::ConnectorError;
use crate::retry::RetrySlot;
use crate::sim::WorldCommand;

#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    Connect { channel_id: String },
    Disconnect,
    SetCommentTtl(u64),
    /// Posted by the retry timer, tagged with its generation
    Retry(u64),
    /// Rebroadcast the cached status
    Announce,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatState {
    Idle,
    Connecting,
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChatStatus {
    pub connected: bool,
}

/// Receiving ends of the connector's queues, consumed by `run`
#[derive(Debug)]
pub struct ChatInbox {
    pub commands: mpsc::UnboundedReceiver<ChatCommand>,
    pub events: mpsc::UnboundedReceiver<ChatSessionEvent>,
}

pub struct ChatConnector<S> {
    source: S,
    channel_id: Option<String>,
    live_id: Option<String>,
    state: ChatState,
    session: SessionId,
    comment_ttl_ms: u64,
    /// Comment colors
    rng: Pcg32,
    retry: RetrySlot,
    received: u64,
    commands: mpsc::UnboundedSender<ChatCommand>,
    events: mpsc::UnboundedSender<ChatSessionEvent>,
    world: mpsc::UnboundedSender<WorldCommand>,
    outbox: broadcast::Sender<BusOutbound>,
}

impl<S: ChatSource> ChatConnector<S> {
    pub fn new(
        source: S,
        world: mpsc::UnboundedSender<WorldCommand>,
        outbox: broadcast::Sender<BusOutbound>,
        retry_delay: Duration,
    ) -> (Self, ChatInbox) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();
        let connector = Self {
            source,
            channel_id: None,
            live_id: None,
            state: ChatState::Idle,
            session: 0,
            comment_ttl_ms: DEFAULT_COMMENT_TTL_MS,
            rng: Pcg32::seed_from_u64(0),
            retry: RetrySlot::new(retry_delay),
            received: 0,
            commands,
            events,
            world,
            outbox,
        };
        let inbox = ChatInbox {
            commands: command_rx,
            events: event_rx,
        };
        (connector, inbox)
    }

    pub fn with_comment_ttl(mut self, ttl_ms: u64) -> Self {
        self.comment_ttl_ms = ttl_ms;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Pcg32::seed_from_u64(seed);
        self
    }

    pub fn command_sender(&self) -> mpsc::UnboundedSender<ChatCommand> {
        self.commands.clone()
    }

    pub fn status(&self) -> ChatStatus {
        ChatStatus {
            connected: self.state == ChatState::Live,
        }
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn live_id(&self) -> Option<&str> {
        self.live_id.as_deref()
    }

    pub fn comment_ttl_ms(&self) -> u64 {
        self.comment_ttl_ms
    }

    /// Messages delivered since start
    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn has_pending_retry(&self) -> bool {
        self.retry.is_pending()
    }

    /// Lifetime given to comments spawned from now on
    pub fn set_comment_ttl(&mut self, ttl_ms: u64) {
        log::info!("Comment lifetime set to {ttl_ms} ms");
        self.comment_ttl_ms = ttl_ms;
    }

    /// Stop any current session and go live on `channel_id`
    ///
    /// Returns false if the channel has no live broadcast or the feed could
    /// not be reached; the latter is retried later.
    pub async fn connect(&mut self, channel_id: &str) -> bool {
        self.retry.cancel();
        self.stop_session();
        self.broadcast_status();

        self.session += 1;
        self.state = ChatState::Connecting;
        self.channel_id = Some(channel_id.to_string());
        log::info!("Connecting to live chat of {channel_id}");

        let feed = ChatFeed::new(self.session, self.events.clone());
        match self.source.start(channel_id, feed).await {
            Ok(Some(live_id)) => {
                log::info!("Live chat connected (live id {live_id})");
                self.live_id = Some(live_id);
                self.state = ChatState::Live;
                self.broadcast_status();
                true
            }
            Ok(None) => {
                log::warn!("{}", ConnectorError::SessionNotFound(channel_id.to_string()));
                self.stop_session();
                self.broadcast_status();
                false
            }
            Err(source) => {
                let err = ConnectorError::ConnectionFailed {
                    endpoint: channel_id.to_string(),
                    source,
                };
                log::warn!("{err}");
                self.stop_session();
                self.broadcast_status();
                self.schedule_retry();
                false
            }
        }
    }

    /// Stop the session on request; no retry follows
    pub async fn disconnect(&mut self) {
        self.retry.cancel();
        self.stop_session();
        log::info!("Live chat disconnected");
        self.broadcast_status();
    }

    /// Returns false when the dispatcher should stop
    pub async fn handle_command(&mut self, command: ChatCommand) -> bool {
        match command {
            ChatCommand::Connect { channel_id } => {
                self.connect(&channel_id).await;
            }
            ChatCommand::Disconnect => self.disconnect().await,
            ChatCommand::SetCommentTtl(ttl_ms) => self.set_comment_ttl(ttl_ms),
            ChatCommand::Retry(generation) => {
                if !self.retry.fire(generation) {
                    return true;
                }
                match (self.state, self.channel_id.clone()) {
                    (ChatState::Idle, Some(channel_id)) => {
                        log::info!("Retrying live chat connection");
                        self.connect(&channel_id).await;
                    }
                    _ => log::debug!("Retry ignored in state {:?}", self.state),
                }
            }
            ChatCommand::Announce => self.broadcast_status(),
            ChatCommand::Shutdown => return false,
        }
        true
    }

    pub fn handle_event(&mut self, event: ChatSessionEvent) {
        if event.session != self.session || self.state != ChatState::Live {
            log::debug!("Dropping stale chat event from session {}", event.session);
            return;
        }
        match event.event {
            ChatEvent::Message(item) => {
                let message = Arc::new(normalize(&item, &mut self.rng));
                self.deliver(message);
            }
            ChatEvent::Ended { reason } => {
                log::info!(
                    "Live chat ended: {}",
                    reason.as_deref().unwrap_or("broadcast finished")
                );
                self.stop_session();
                self.broadcast_status();
            }
            ChatEvent::Error { message } => {
                log::warn!("Live chat error: {message}");
                self.stop_session();
                self.broadcast_status();
                self.schedule_retry();
            }
        }
    }

    /// Dispatcher loop; returns after `Shutdown`
    pub async fn run(mut self, mut inbox: ChatInbox) {
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
        self.stop_session();
        log::info!("Chat connector stopped");
    }

    /// Spawn in the world and show to display consumers, independently
    fn deliver(&mut self, message: Arc<ChatMessage>) {
        self.received += 1;
        log::debug!("Chat message {} from {}", message.id, message.author_name);

        let spawn = WorldCommand::SpawnComment {
            payload: message.to_payload(),
            ttl_ms: Some(self.comment_ttl_ms),
        };
        if self.world.send(spawn).is_err() {
            log::warn!("World is not accepting comments; message {} not spawned", message.id);
        }
        if self.outbox.send(BusOutbound::NewMessage { message }).is_err() {
            log::debug!("No bus subscribers for chat message");
        }
    }

    fn stop_session(&mut self) {
        if self.state != ChatState::Idle {
            self.source.stop();
            // Queued events of the old session are stale from here on
            self.session += 1;
        }
        self.state = ChatState::Idle;
        self.live_id = None;
    }

    fn schedule_retry(&mut self) {
        if self.channel_id.is_some() {
            self.retry.schedule(&self.commands, ChatCommand::Retry);
        }
    }

    fn broadcast_status(&self) {
        let status = self.status();
        if self
            .outbox
            .send(BusOutbound::ChatStatus {
                connected: status.connected,
            })
            .is_err()
        {
            log::debug!("No bus subscribers for chat status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rect;
    use crate::chat::raw::{RawAuthor, RawChatItem, RawMessagePart};
    use crate::error::TransportError;
    use crate::sim::{Color, World};

    #[derive(Default)]
    struct FakeChat {
        live_id: Option<String>,
        fail: bool,
        starts: u32,
        stops: u32,
        feed: Option<ChatFeed>,
    }

    impl FakeChat {
        fn live() -> Self {
            Self {
                live_id: Some("live-1".to_string()),
                ..Default::default()
            }
        }
    }

    impl ChatSource for FakeChat {
        async fn start(
            &mut self,
            _channel_id: &str,
            feed: ChatFeed,
        ) -> Result<Option<String>, TransportError> {
            self.starts += 1;
            if self.fail {
                return Err(TransportError::Other("feed unreachable".to_string()));
            }
            self.feed = Some(feed);
            Ok(self.live_id.clone())
        }

        fn stop(&mut self) {
            self.stops += 1;
            self.feed = None;
        }
    }

    struct Harness {
        connector: ChatConnector<FakeChat>,
        inbox: ChatInbox,
        world_rx: mpsc::UnboundedReceiver<WorldCommand>,
        bus_rx: broadcast::Receiver<BusOutbound>,
    }

    impl Harness {
        fn new(source: FakeChat) -> Self {
            let _ = env_logger::builder().is_test(true).try_init();
            let (world_tx, world_rx) = mpsc::unbounded_channel();
            let (outbox, bus_rx) = broadcast::channel(64);
            let (connector, inbox) =
                ChatConnector::new(source, world_tx, outbox, Duration::from_secs(5));
            Self {
                connector: connector.with_seed(42),
                inbox,
                world_rx,
                bus_rx,
            }
        }

        fn feed(&self) -> ChatFeed {
            self.connector.source().feed.clone().unwrap()
        }

        fn pump(&mut self) {
            while let Ok(event) = self.inbox.events.try_recv() {
                self.connector.handle_event(event);
            }
        }

        fn spawns(&mut self) -> Vec<WorldCommand> {
            let mut out = Vec::new();
            while let Ok(cmd) = self.world_rx.try_recv() {
                out.push(cmd);
            }
            out
        }

        fn bus(&mut self) -> Vec<BusOutbound> {
            let mut out = Vec::new();
            while let Ok(msg) = self.bus_rx.try_recv() {
                out.push(msg);
            }
            out
        }

        fn retries(&mut self) -> usize {
            let mut count = 0;
            while let Ok(cmd) = self.inbox.commands.try_recv() {
                if matches!(cmd, ChatCommand::Retry(_)) {
                    count += 1;
                }
            }
            count
        }
    }

    fn chat_item(id: &str, text: &str) -> RawChatItem {
        RawChatItem {
            id: id.to_string(),
            author: RawAuthor {
                name: "viewer".to_string(),
                ..Default::default()
            },
            message: vec![RawMessagePart::text(text)],
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hello_reaches_world_and_display() {
        let mut h = Harness::new(FakeChat::live());
        assert!(h.connector.connect("UCchannel").await);
        assert_eq!(h.connector.status(), ChatStatus { connected: true });
        assert_eq!(h.connector.live_id(), Some("live-1"));
        h.bus();

        h.feed().message(chat_item("m1", "hello"));
        h.pump();

        let spawns = h.spawns();
        assert_eq!(spawns.len(), 1);
        let WorldCommand::SpawnComment { payload, ttl_ms } = spawns[0].clone() else {
            panic!("expected a spawn, got {:?}", spawns[0]);
        };
        assert_eq!(payload.text, "hello");
        assert_eq!(ttl_ms, Some(DEFAULT_COMMENT_TTL_MS));
        assert!(matches!(
            payload.color,
            Color::Hsl { saturation, lightness, .. } if saturation == 70.0 && lightness == 60.0
        ));

        match h.bus().as_slice() {
            [BusOutbound::NewMessage { message }] => {
                assert_eq!(message.text, "hello");
                assert_eq!(message.color, payload.color);
            }
            other => panic!("unexpected bus traffic {other:?}"),
        }

        // The spawn request produces exactly one comment body
        let mut world = World::new(1);
        world.initialize(Rect::default()).unwrap();
        world.apply(spawns[0].clone()).unwrap();
        assert_eq!(world.comment_count(), 1);
        let snapshot = world.snapshot();
        let body = snapshot.comments().next().unwrap();
        assert_eq!(body.payload.as_ref().unwrap().text, "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_live_returns_false_without_retry() {
        let mut h = Harness::new(FakeChat::default());
        assert!(!h.connector.connect("UCoffline").await);
        assert_eq!(h.connector.state(), ChatState::Idle);
        assert!(!h.connector.has_pending_retry());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(h.retries(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_failure_retries_once() {
        let mut h = Harness::new(FakeChat {
            fail: true,
            ..FakeChat::live()
        });
        assert!(!h.connector.connect("UCchannel").await);
        assert!(h.connector.has_pending_retry());

        tokio::time::sleep(Duration::from_secs(6)).await;
        let command = h.inbox.commands.try_recv().unwrap();
        assert!(matches!(command, ChatCommand::Retry(_)));

        h.connector.source.fail = false;
        assert!(h.connector.handle_command(command).await);
        assert_eq!(h.connector.state(), ChatState::Live);
        assert_eq!(h.connector.source().starts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_drops_old_session_events() {
        let mut h = Harness::new(FakeChat::live());
        h.connector.connect("UCfirst").await;
        let old_feed = h.feed();
        h.connector.connect("UCsecond").await;
        assert_eq!(h.connector.source().stops, 1);

        old_feed.message(chat_item("old", "from the past"));
        h.feed().message(chat_item("new", "current"));
        h.pump();

        let spawns = h.spawns();
        assert_eq!(spawns.len(), 1);
        assert!(matches!(
            &spawns[0],
            WorldCommand::SpawnComment { payload, .. } if payload.text == "current"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_stops_delivery() {
        let mut h = Harness::new(FakeChat::live());
        h.connector.connect("UCchannel").await;
        let feed = h.feed();
        h.connector.disconnect().await;
        h.bus();

        feed.message(chat_item("late", "too late"));
        h.pump();
        assert!(h.spawns().is_empty());
        assert!(h.bus().is_empty());
        assert_eq!(h.connector.status(), ChatStatus { connected: false });
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_and_error() {
        let mut h = Harness::new(FakeChat::live());
        h.connector.connect("UCchannel").await;
        h.feed().push(ChatEvent::Ended { reason: None });
        h.pump();
        assert_eq!(h.connector.state(), ChatState::Idle);
        assert!(!h.connector.has_pending_retry());

        h.connector.connect("UCchannel").await;
        h.feed().push(ChatEvent::Error {
            message: "socket reset".to_string(),
        });
        h.pump();
        assert_eq!(h.connector.state(), ChatState::Idle);
        assert!(h.connector.has_pending_retry());
        let last = h.bus().pop().unwrap();
        assert_eq!(last, BusOutbound::ChatStatus { connected: false });
    }

    #[tokio::test(start_paused = true)]
    async fn test_display_fanout_survives_world_loss() {
        let mut h = Harness::new(FakeChat::live());
        h.connector.connect("UCchannel").await;
        h.connector.set_comment_ttl(3_000);
        h.bus();

        h.feed().message(chat_item("a", "first"));
        h.pump();
        assert!(matches!(
            h.spawns().as_slice(),
            [WorldCommand::SpawnComment { ttl_ms: Some(3_000), .. }]
        ));
        h.bus();

        // World side goes away; display consumers keep getting messages
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();
        drop(closed_rx);
        h.connector.world = closed_tx;
        h.feed().message(chat_item("b", "second"));
        h.pump();
        match h.bus().as_slice() {
            [BusOutbound::NewMessage { message }] => assert_eq!(message.text, "second"),
            other => panic!("unexpected bus traffic {other:?}"),
        }
        assert_eq!(h.connector.received(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_retry_is_ignored_after_disconnect() {
        let mut h = Harness::new(FakeChat::live());
        h.connector.connect("UCchannel").await;
        h.feed().push(ChatEvent::Error {
            message: "socket reset".to_string(),
        });
        h.pump();

        // Timer fires and its message sits in the queue
        tokio::time::sleep(Duration::from_secs(6)).await;
        let command = h.inbox.commands.try_recv().unwrap();
        assert!(matches!(command, ChatCommand::Retry(_)));

        h.connector.disconnect().await;
        assert!(h.connector.handle_command(command).await);

        assert_eq!(h.connector.state(), ChatState::Idle);
        assert_eq!(h.connector.source().starts, 1);
        assert!(!h.connector.has_pending_retry());
    }
}
