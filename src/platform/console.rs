//! Line-oriented console platform.
//!
//! Every line read from the input becomes one guild message sent by a fixed
//! identity. Replies are printed to stdout.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use super::{
    Author, Channel, EventSource, Guild, Message, MessageEvent, MessageListener, PlatformError,
};

/// Who the console is speaking as, and where.
#[derive(Debug, Clone)]
pub struct ConsoleIdentity {
    pub guild: Guild,
    pub channel: Channel,
    pub author: Author,
}

/// A message typed at the console.
#[derive(Debug)]
pub struct ConsoleEvent {
    identity: ConsoleIdentity,
    message: Message,
}

impl ConsoleEvent {
    #[must_use]
    pub fn new(identity: ConsoleIdentity, message: Message) -> Self {
        Self { identity, message }
    }
}

#[async_trait]
impl MessageEvent for ConsoleEvent {
    fn guild(&self) -> &Guild {
        &self.identity.guild
    }

    fn channel(&self) -> &Channel {
        &self.identity.channel
    }

    fn author(&self) -> &Author {
        &self.identity.author
    }

    fn message(&self) -> &Message {
        &self.message
    }

    fn can_send_messages(&self) -> bool {
        true
    }

    async fn send_message(&self, content: &str) -> Result<(), PlatformError> {
        write_reply(&mut io::stdout().lock(), &self.identity.channel.name, content)
    }
}

/// Writes one reply line, reporting a closed pipe as [`PlatformError::Closed`].
fn write_reply<W: Write>(out: &mut W, channel: &str, content: &str) -> Result<(), PlatformError> {
    writeln!(out, "[#{channel}] {content}")
        .and_then(|()| out.flush())
        .map_err(|e| match e.kind() {
            io::ErrorKind::BrokenPipe => PlatformError::Closed,
            _ => PlatformError::SendFailed(e.to_string()),
        })
}

/// Reads messages from an async line reader and fans them out to listeners.
pub struct ConsoleEventSource {
    identity: ConsoleIdentity,
    listeners: Mutex<Vec<Arc<dyn MessageListener>>>,
    next_message_id: AtomicU64,
}

impl ConsoleEventSource {
    #[must_use]
    pub fn new(identity: ConsoleIdentity) -> Self {
        Self {
            identity,
            listeners: Mutex::new(Vec::new()),
            next_message_id: AtomicU64::new(1),
        }
    }

    /// Delivers one message to every listener.
    pub fn deliver(&self, content: &str) {
        let id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
        let event: Arc<dyn MessageEvent> = Arc::new(ConsoleEvent::new(
            self.identity.clone(),
            Message {
                id,
                content: content.to_owned(),
            },
        ));

        let listeners = self.listeners.lock().clone();
        debug!("Delivering console message {} to {} listener(s)", id, listeners.len());
        for listener in listeners {
            listener.on_message(Arc::clone(&event));
        }
    }

    /// Reads lines until EOF, delivering each non-blank line.
    ///
    /// Returns the number of messages delivered.
    pub async fn run<R>(&self, reader: R) -> io::Result<usize>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut delivered = 0;

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            self.deliver(&line);
            delivered += 1;
        }

        Ok(delivered)
    }
}

impl EventSource for ConsoleEventSource {
    fn add_listener(&self, listener: Arc<dyn MessageListener>) {
        self.listeners.lock().push(listener);
    }
}

impl std::fmt::Debug for ConsoleEventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleEventSource")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder(Mutex<Vec<String>>);

    impl MessageListener for Recorder {
        fn on_message(&self, event: Arc<dyn MessageEvent>) {
            self.0.lock().push(event.message().content.clone());
        }
    }

    fn identity() -> ConsoleIdentity {
        ConsoleIdentity {
            guild: Guild {
                id: 1,
                name: "console".to_owned(),
            },
            channel: Channel {
                id: 2,
                name: "general".to_owned(),
            },
            author: Author {
                id: 3,
                name: "operator".to_owned(),
                bot: false,
            },
        }
    }

    #[tokio::test]
    async fn test_run_skips_blank_lines() {
        let source = ConsoleEventSource::new(identity());
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        source.add_listener(recorder.clone());

        let input: &[u8] = b"!ping\n\n   \n!echo hi\n";
        let delivered = source.run(input).await.unwrap();

        assert_eq!(delivered, 2);
        assert_eq!(*recorder.0.lock(), vec!["!ping", "!echo hi"]);
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_reply_format() {
        let mut out = Vec::new();
        write_reply(&mut out, "general", "Pong!").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[#general] Pong!\n");
    }

    #[test]
    fn test_write_reply_closed_pipe() {
        let result = write_reply(&mut ClosedPipe, "general", "Pong!");
        assert!(matches!(result, Err(PlatformError::Closed)));
    }

    #[test]
    fn test_deliver_without_listeners() {
        let source = ConsoleEventSource::new(identity());
        source.deliver("!ping");
    }
}
