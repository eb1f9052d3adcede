//! Command types and invocation parsing.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::CommandTable;
use crate::platform::{Author, Channel, Guild, Message, MessageEvent, PlatformError};

/// Behaviour run when a registered command is invoked.
///
/// Returned errors are logged by the dispatcher and never reach other
/// messages. Panics are isolated the same way.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<()>;
}

/// A registered command.
#[derive(Clone)]
pub struct Command {
    name: String,
    description: Option<String>,
    handler: Arc<dyn CommandHandler>,
}

impl Command {
    pub(crate) fn new(
        name: String,
        description: Option<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> Self {
        Self {
            name,
            description,
            handler,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description for help listings.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A message split into a command name and its arguments.
#[derive(Debug, Clone)]
pub struct ParsedInvocation<'a> {
    /// The matched command, `None` when the name is not registered.
    pub command: Option<&'a Command>,

    /// The name token, case-folded when case is ignored. May be empty.
    pub name: String,

    /// Remaining whitespace-separated tokens in original order.
    pub args: Vec<String>,
}

impl<'a> ParsedInvocation<'a> {
    /// Parses `content` as an invocation using the given `prefix`.
    ///
    /// The prefix is matched literally and removed once from the start. The
    /// name runs up to the first whitespace character, so `"! ping"` yields
    /// an empty name. Content without the prefix is parsed whole; callers
    /// check the prefix first.
    #[must_use]
    pub fn parse(
        content: &str,
        prefix: &str,
        commands: &'a CommandTable,
        ignore_case: bool,
    ) -> Self {
        let body = content.strip_prefix(prefix).unwrap_or(content);

        let (name, rest) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
        let name = if ignore_case {
            name.to_lowercase()
        } else {
            name.to_owned()
        };
        let args = rest.split_whitespace().map(ToOwned::to_owned).collect();

        Self {
            command: commands.get(&name),
            name,
            args,
        }
    }

    /// Whether the name matched a registered command.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        self.command.is_some()
    }
}

/// Everything a handler gets to see about one invocation.
pub struct CommandContext {
    event: Arc<dyn MessageEvent>,
    name: String,
    args: Vec<String>,
    prefix: String,
    commands: Arc<CommandTable>,
}

impl CommandContext {
    #[must_use]
    pub fn new(
        event: Arc<dyn MessageEvent>,
        name: String,
        args: Vec<String>,
        prefix: String,
        commands: Arc<CommandTable>,
    ) -> Self {
        Self {
            event,
            name,
            args,
            prefix,
            commands,
        }
    }

    /// The full platform event.
    #[must_use]
    pub fn event(&self) -> &dyn MessageEvent {
        self.event.as_ref()
    }

    #[must_use]
    pub fn guild(&self) -> &Guild {
        self.event.guild()
    }

    #[must_use]
    pub fn author(&self) -> &Author {
        self.event.author()
    }

    #[must_use]
    pub fn channel(&self) -> &Channel {
        self.event.channel()
    }

    #[must_use]
    pub fn message(&self) -> &Message {
        self.event.message()
    }

    /// The command name as invoked (case-folded when case is ignored).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The prefix that was in effect for this guild.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// All registered commands, for help output.
    #[must_use]
    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Sends a reply to the invoking channel.
    pub async fn reply(&self, content: &str) -> Result<(), PlatformError> {
        if !self.event.can_send_messages() {
            return Err(PlatformError::MissingPermission(self.channel().id));
        }
        self.event.send_message(content).await
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
