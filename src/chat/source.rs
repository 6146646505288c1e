//! Seam to the live chat feed client

use std::future::Future;

use tokio::sync::mpsc;

use super::raw::RawChatItem;
use crate::error::TransportError;

pub type SessionId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Message(Box<RawChatItem>),
    /// The live broadcast finished
    Ended { reason: Option<String> },
    /// The feed failed mid-session
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatSessionEvent {
    pub session: SessionId,
    pub event: ChatEvent,
}

/// Where a source delivers events for one session
#[derive(Debug, Clone)]
pub struct ChatFeed {
    session: SessionId,
    tx: mpsc::UnboundedSender<ChatSessionEvent>,
}

impl ChatFeed {
    pub fn new(session: SessionId, tx: mpsc::UnboundedSender<ChatSessionEvent>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Returns false once the connector is gone
    pub fn push(&self, event: ChatEvent) -> bool {
        self.tx
            .send(ChatSessionEvent {
                session: self.session,
                event,
            })
            .is_ok()
    }

    pub fn message(&self, item: RawChatItem) -> bool {
        self.push(ChatEvent::Message(Box::new(item)))
    }
}

/// Live chat feed client
pub trait ChatSource {
    /// Look up the live broadcast of `channel_id` and start polling it
    ///
    /// Resolves to the live id, or `None` when the channel is not live.
    fn start(
        &mut self,
        channel_id: &str,
        feed: ChatFeed,
    ) -> impl Future<Output = Result<Option<String>, TransportError>>;

    /// Stop polling. Safe to call when not started.
    fn stop(&mut self);
}
