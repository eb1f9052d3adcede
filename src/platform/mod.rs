//! Chat platform collaborator interfaces.
//!
//! The dispatch core never talks to a gateway directly. A platform
//! integration wraps each inbound message in a [`MessageEvent`] and hands it
//! to every [`MessageListener`] registered on its [`EventSource`].

mod console;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use console::{ConsoleEvent, ConsoleEventSource, ConsoleIdentity};

/// Errors reported by a platform integration.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Missing permission to send messages in channel {0}")]
    MissingPermission(u64),

    #[error("Failed to send message: {0}")]
    SendFailed(String),

    #[error("Platform connection closed")]
    Closed,
}

/// The guild (server) a message was sent in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guild {
    pub id: u64,
    pub name: String,
}

/// The channel a message was sent in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: u64,
    pub name: String,
}

/// The account that sent a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: u64,
    pub name: String,

    /// Whether the account is a bot or other automated user.
    pub bot: bool,
}

/// The raw message itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub content: String,
}

/// A single inbound guild message together with a way to answer it.
#[async_trait]
pub trait MessageEvent: Send + Sync {
    fn guild(&self) -> &Guild;

    fn channel(&self) -> &Channel;

    fn author(&self) -> &Author;

    fn message(&self) -> &Message;

    /// Whether the bot may currently post in [`MessageEvent::channel`].
    fn can_send_messages(&self) -> bool;

    /// Posts plain text to the channel the event came from.
    async fn send_message(&self, content: &str) -> Result<(), PlatformError>;
}

/// Receives every inbound message delivered by an [`EventSource`].
///
/// Implementations must return quickly; long work belongs in a spawned task.
pub trait MessageListener: Send + Sync {
    fn on_message(&self, event: Arc<dyn MessageEvent>);
}

/// Delivers inbound messages to registered listeners.
pub trait EventSource {
    fn add_listener(&self, listener: Arc<dyn MessageListener>);
}
