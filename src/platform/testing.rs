//! In-memory collaborators for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    Author, Channel, EventSource, Guild, Message, MessageEvent, MessageListener, PlatformError,
};

/// A message event that records everything sent in reply.
pub(crate) struct MockEvent {
    guild: Guild,
    channel: Channel,
    author: Author,
    message: Message,
    can_send: bool,
    pub(crate) sent: Mutex<Vec<String>>,
}

impl MockEvent {
    pub(crate) fn new(content: &str) -> Self {
        Self {
            guild: Guild {
                id: 1,
                name: "guild".to_owned(),
            },
            channel: Channel {
                id: 10,
                name: "general".to_owned(),
            },
            author: Author {
                id: 100,
                name: "user".to_owned(),
                bot: false,
            },
            message: Message {
                id: 1000,
                content: content.to_owned(),
            },
            can_send: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn in_guild(mut self, id: u64) -> Self {
        self.guild.id = id;
        self
    }

    pub(crate) fn in_channel(mut self, id: u64) -> Self {
        self.channel.id = id;
        self
    }

    pub(crate) fn from_user(mut self, id: u64) -> Self {
        self.author.id = id;
        self
    }

    pub(crate) fn from_bot(mut self) -> Self {
        self.author.bot = true;
        self
    }

    pub(crate) fn without_send_permission(mut self) -> Self {
        self.can_send = false;
        self
    }

    pub(crate) fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MessageEvent for MockEvent {
    fn guild(&self) -> &Guild {
        &self.guild
    }

    fn channel(&self) -> &Channel {
        &self.channel
    }

    fn author(&self) -> &Author {
        &self.author
    }

    fn message(&self) -> &Message {
        &self.message
    }

    fn can_send_messages(&self) -> bool {
        self.can_send
    }

    async fn send_message(&self, content: &str) -> Result<(), PlatformError> {
        if !self.can_send {
            return Err(PlatformError::MissingPermission(self.channel.id));
        }
        self.sent.lock().push(content.to_owned());
        Ok(())
    }
}

/// An event source that only remembers its listeners.
#[derive(Default)]
pub(crate) struct MockSource {
    pub(crate) listeners: Mutex<Vec<Arc<dyn MessageListener>>>,
}

impl MockSource {
    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub(crate) fn emit(&self, event: Arc<dyn MessageEvent>) {
        for listener in self.listeners.lock().iter() {
            listener.on_message(Arc::clone(&event));
        }
    }
}

impl EventSource for MockSource {
    fn add_listener(&self, listener: Arc<dyn MessageListener>) {
        self.listeners.lock().push(listener);
    }
}
