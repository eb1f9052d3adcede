//! The per-message dispatch pipeline.
//!
//! Every inbound message walks the same stages in order, stopping at the
//! first one that turns it away:
//! 1. Messages from bots are ignored
//! 2. Blacklisted guilds, then blacklisted channels, are refused
//! 3. Content without the guild's prefix is not a command
//! 4. Users on cooldown are refused
//! 5. The content is parsed and the command looked up
//! 6. The handler runs in its own task, so errors and panics stay there

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{Instrument, Level, debug, error, span, warn};

use super::{AccessGate, Clock, CooldownTracker, PrefixResolver, Scope};
use crate::commands::{CommandContext, CommandTable, ParsedInvocation};
use crate::config::{CommandSettings, ConfigError, NoticeKind, Notices};
use crate::platform::MessageEvent;

/// How a single message left the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The author is a bot.
    IgnoredBot,
    GuildBlocked,
    ChannelBlocked,
    /// The content does not start with the prefix.
    NotACommand,
    CoolingDown,
    /// The prefix matched but the name is not registered.
    UnknownCommand { name: String },
    Executed { name: String },
    /// The handler returned an error or panicked.
    HandlerFailed { name: String },
}

/// Owns the command table and all pipeline state.
pub struct Dispatcher {
    commands: Arc<CommandTable>,
    prefixes: PrefixResolver,
    access: AccessGate,
    cooldowns: CooldownTracker,
    cooldown_ms: AtomicU64,
    ignore_case: AtomicBool,
    notices: RwLock<Notices>,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    /// Builds a dispatcher from settings and a frozen command table.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the settings hold an empty prefix.
    pub fn new(
        settings: &CommandSettings,
        commands: CommandTable,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;

        let prefixes = PrefixResolver::new(settings.default_prefix.clone())?;
        for (guild, prefix) in &settings.custom_prefixes {
            prefixes.set_override(*guild, Some(prefix.clone()))?;
        }

        Ok(Self {
            commands: Arc::new(commands),
            prefixes,
            access: AccessGate::with_lists(
                settings.blacklisted_guilds.iter().copied(),
                settings.blacklisted_channels.iter().copied(),
            ),
            cooldowns: CooldownTracker::new(settings.max_cooldown_entries),
            cooldown_ms: AtomicU64::new(settings.cooldown_millis()),
            ignore_case: AtomicBool::new(settings.ignore_case),
            notices: RwLock::new(settings.notices.clone()),
            clock,
        })
    }

    /// Runs one message through the pipeline.
    pub async fn dispatch(&self, event: Arc<dyn MessageEvent>) -> DispatchOutcome {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            guild = event.guild().id,
            channel = event.channel().id,
            user = event.author().id
        );
        self.run_pipeline(event).instrument(span).await
    }

    async fn run_pipeline(&self, event: Arc<dyn MessageEvent>) -> DispatchOutcome {
        if event.author().bot {
            return DispatchOutcome::IgnoredBot;
        }

        if self.access.is_blocked(event.guild().id, Scope::Guild) {
            debug!("Guild is blacklisted");
            self.notify(event.as_ref(), NoticeKind::GuildBlacklisted).await;
            return DispatchOutcome::GuildBlocked;
        }

        if self.access.is_blocked(event.channel().id, Scope::Channel) {
            debug!("Channel is blacklisted");
            self.notify(event.as_ref(), NoticeKind::ChannelBlacklisted).await;
            return DispatchOutcome::ChannelBlocked;
        }

        let prefix = self.prefixes.resolve(event.guild().id);
        let content = event.message().content.as_str();
        if !content.starts_with(prefix.as_str()) {
            return DispatchOutcome::NotACommand;
        }

        let now = self.clock.now_millis();
        let cooldown_ms = self.cooldown_ms.load(Ordering::Relaxed);
        if !self
            .cooldowns
            .check_and_record(event.author().id, now, cooldown_ms)
        {
            let remaining = self
                .cooldowns
                .remaining(event.author().id, now, cooldown_ms)
                .unwrap_or_default();
            debug!("User is on cooldown for another {:?}", remaining);

            let text = self
                .notice(NoticeKind::Cooldown)
                .map(|text| fill_remaining(&text, remaining));
            send_notice(event.as_ref(), NoticeKind::Cooldown, text).await;
            return DispatchOutcome::CoolingDown;
        }

        let parsed = ParsedInvocation::parse(
            content,
            &prefix,
            &self.commands,
            self.ignore_case.load(Ordering::Relaxed),
        );
        let Some(command) = parsed.command else {
            debug!("Unknown command: {:?}", parsed.name);
            self.notify(event.as_ref(), NoticeKind::UnknownCommand).await;
            return DispatchOutcome::UnknownCommand { name: parsed.name };
        };

        debug!("Executing command {} with {} arg(s)", command.name(), parsed.args.len());
        let handler = Arc::clone(command.handler());
        let name = parsed.name;
        let ctx = CommandContext::new(
            Arc::clone(&event),
            name.clone(),
            parsed.args,
            prefix,
            Arc::clone(&self.commands),
        );

        let task = tokio::spawn(
            async move { handler.execute(&ctx).await }.instrument(tracing::Span::current()),
        );

        match task.await {
            Ok(Ok(())) => DispatchOutcome::Executed { name },
            Ok(Err(e)) => {
                error!("Command {} failed: {:#}", name, e);
                DispatchOutcome::HandlerFailed { name }
            }
            Err(e) if e.is_panic() => {
                error!("Command {} panicked", name);
                DispatchOutcome::HandlerFailed { name }
            }
            Err(e) => {
                error!("Command {} was cancelled: {}", name, e);
                DispatchOutcome::HandlerFailed { name }
            }
        }
    }

    async fn notify(&self, event: &dyn MessageEvent, kind: NoticeKind) {
        send_notice(event, kind, self.notice(kind)).await;
    }

    #[must_use]
    pub fn commands(&self) -> &Arc<CommandTable> {
        &self.commands
    }

    #[must_use]
    pub const fn prefixes(&self) -> &PrefixResolver {
        &self.prefixes
    }

    #[must_use]
    pub const fn access(&self) -> &AccessGate {
        &self.access
    }

    #[must_use]
    pub const fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    /// Drops cooldown entries that no longer matter.
    pub fn sweep_cooldowns(&self) -> usize {
        self.cooldowns
            .sweep(self.clock.now_millis(), self.cooldown_ms.load(Ordering::Relaxed))
    }

    pub fn cooldown_millis(&self) -> u64 {
        self.cooldown_ms.load(Ordering::Relaxed)
    }

    /// Sets the cooldown in seconds, 0 disables it.
    pub fn set_cooldown_secs(&self, secs: u64) {
        self.cooldown_ms
            .store(secs.saturating_mul(1000), Ordering::Relaxed);
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case.load(Ordering::Relaxed)
    }

    pub fn set_ignore_case(&self, ignore_case: bool) {
        self.ignore_case.store(ignore_case, Ordering::Relaxed);
    }

    pub fn notice(&self, kind: NoticeKind) -> Option<String> {
        self.notices.read().get(kind).map(ToOwned::to_owned)
    }

    pub fn set_notice(&self, kind: NoticeKind, text: Option<String>) {
        self.notices.write().set(kind, text);
    }
}

/// Sends a notice if there is one and the bot may post.
async fn send_notice(event: &dyn MessageEvent, kind: NoticeKind, text: Option<String>) {
    let Some(text) = text else {
        return;
    };
    if !event.can_send_messages() {
        debug!("No permission to send {:?} notice", kind);
        return;
    }
    if let Err(e) = event.send_message(&text).await {
        warn!("Failed to send {:?} notice: {}", kind, e);
    }
}

fn fill_remaining(text: &str, remaining: Duration) -> String {
    let secs = remaining.as_millis().div_ceil(1000);
    text.replace("{remaining}", &secs.to_string())
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.commands.len())
            .field("prefixes", &self.prefixes)
            .field("access", &self.access)
            .field("cooldown_ms", &self.cooldown_millis())
            .field("ignore_case", &self.ignore_case())
            .finish_non_exhaustive()
    }
}
