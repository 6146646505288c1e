//! Live chat ingestion
//!
//! - `raw`: items as the feed client delivers them
//! - `normalize`: url, membership and color rules
//! - `message`: the display-ready `ChatMessage`
//! - `source`: seam to the feed client
//! - `connector`: session lifecycle and fan-out

pub mod connector;
pub mod message;
pub mod normalize;
pub mod raw;
pub mod source;

pub use connector::{ChatCommand, ChatConnector, ChatInbox, ChatState, ChatStatus};
pub use message::ChatMessage;
pub use normalize::{is_member, normalize, secure_url};
pub use raw::{RawAuthor, RawBadge, RawChatItem, RawImage, RawMessagePart, RawSuperChat};
pub use source::{ChatEvent, ChatFeed, ChatSessionEvent, ChatSource};
