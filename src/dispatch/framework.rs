//! Setup, activation and maintenance of the dispatcher.
//!
//! Commands are registered on a [`FrameworkBuilder`]. Once built, the
//! command table is frozen and the framework can be activated against an
//! [`EventSource`] exactly once. Blacklists, prefixes, cooldown, case
//! handling and notices stay adjustable afterwards.
//!
//! Every delivered message is dispatched on its own task. The tasks are
//! tracked, so [`CommandFramework::shutdown`] can wait for them to finish.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::interval;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use super::{Clock, DispatchOutcome, Dispatcher, Scope, SystemClock};
use crate::commands::{CommandError, CommandHandler, CommandTable};
use crate::config::{CommandSettings, ConfigError, NoticeKind};
use crate::platform::{EventSource, MessageEvent, MessageListener};

/// Errors raised by the framework lifecycle.
#[derive(Debug, Error)]
pub enum FrameworkError {
    #[error("Command framework already activated")]
    AlreadyActivated,

    #[error("Command framework must be activated inside a Tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Messages accepted by [`CommandFramework::run_maintenance`].
#[derive(Debug, Clone)]
pub enum MaintenanceMessage {
    /// Sweep stale cooldown entries now.
    SweepNow,
    /// Stop the maintenance loop.
    Shutdown,
}

/// Collects commands and settings before the framework is built.
pub struct FrameworkBuilder {
    settings: CommandSettings,
    commands: CommandTable,
    clock: Arc<dyn Clock>,
}

impl FrameworkBuilder {
    /// Registers a command without a description.
    pub fn command(
        self,
        name: &str,
        handler: impl CommandHandler + 'static,
    ) -> Result<Self, CommandError> {
        self.register(name, Arc::new(handler), None)
    }

    /// Registers a command with a description for help listings.
    pub fn command_with_description(
        self,
        name: &str,
        description: &str,
        handler: impl CommandHandler + 'static,
    ) -> Result<Self, CommandError> {
        self.register(name, Arc::new(handler), Some(description))
    }

    /// Registers an already shared handler.
    pub fn register(
        mut self,
        name: &str,
        handler: Arc<dyn CommandHandler>,
        description: Option<&str>,
    ) -> Result<Self, CommandError> {
        self.commands.register(name, handler, description)?;
        Ok(self)
    }

    /// Replaces the clock used for cooldowns.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Freezes the command table and builds the framework.
    pub fn build(self) -> Result<CommandFramework, ConfigError> {
        let dispatcher = Dispatcher::new(&self.settings, self.commands, self.clock)?;
        info!(
            "Command framework built with {} command(s), tracking up to {} cooldown(s)",
            dispatcher.commands().len(),
            dispatcher.cooldowns().max_entries()
        );

        Ok(CommandFramework {
            dispatcher: Arc::new(dispatcher),
            activated: AtomicBool::new(false),
            tasks: TaskTracker::new(),
            sweep_interval: Duration::from_secs(self.settings.sweep_interval_secs.max(1)),
        })
    }
}

impl std::fmt::Debug for FrameworkBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameworkBuilder")
            .field("settings", &self.settings)
            .field("commands", &self.commands.len())
            .finish_non_exhaustive()
    }
}

/// Hands every delivered message to the dispatcher on its own task.
///
/// Tasks go to the runtime captured at activation, so sources may deliver
/// from threads that are not part of it.
struct DispatchListener {
    dispatcher: Arc<Dispatcher>,
    runtime: Handle,
    tasks: TaskTracker,
}

impl MessageListener for DispatchListener {
    fn on_message(&self, event: Arc<dyn MessageEvent>) {
        if self.tasks.is_closed() {
            debug!("Shutting down, dropping message {}", event.message().id);
            return;
        }

        let dispatcher = Arc::clone(&self.dispatcher);
        self.tasks.spawn_on(
            async move {
                let outcome = dispatcher.dispatch(event).await;
                if !matches!(outcome, DispatchOutcome::NotACommand | DispatchOutcome::IgnoredBot) {
                    debug!("Dispatch finished: {:?}", outcome);
                }
            },
            &self.runtime,
        );
    }
}

/// The dispatcher plus its one-shot activation.
#[derive(Debug)]
pub struct CommandFramework {
    dispatcher: Arc<Dispatcher>,
    activated: AtomicBool,
    tasks: TaskTracker,
    sweep_interval: Duration,
}

impl CommandFramework {
    #[must_use]
    pub fn builder(settings: CommandSettings) -> FrameworkBuilder {
        FrameworkBuilder {
            settings,
            commands: CommandTable::new(),
            clock: Arc::new(SystemClock::new()),
        }
    }

    /// Starts listening on `source`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameworkError::NoRuntime`] when called outside a Tokio
    /// runtime, and [`FrameworkError::AlreadyActivated`] on every call after
    /// the first successful one.
    pub fn activate(&self, source: &dyn EventSource) -> Result<(), FrameworkError> {
        let runtime = Handle::try_current().map_err(|_| FrameworkError::NoRuntime)?;

        if self
            .activated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(FrameworkError::AlreadyActivated);
        }

        source.add_listener(Arc::new(DispatchListener {
            dispatcher: Arc::clone(&self.dispatcher),
            runtime,
            tasks: self.tasks.clone(),
        }));
        info!("Command framework successfully activated");
        Ok(())
    }

    pub fn is_activated(&self) -> bool {
        self.activated.load(Ordering::Acquire)
    }

    /// Number of dispatches still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Stops accepting messages and waits for in-flight dispatches.
    pub async fn shutdown(&self) {
        self.tasks.close();
        let pending = self.in_flight();
        if pending > 0 {
            info!("Waiting for {} in-flight dispatch(es)", pending);
        }
        self.tasks.wait().await;
        info!("All dispatches finished");
    }

    #[must_use]
    pub const fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    #[must_use]
    pub fn commands(&self) -> &CommandTable {
        self.dispatcher.commands()
    }

    /// Periodically sweeps stale cooldown entries until shut down.
    pub async fn run_maintenance(&self, mut rx: mpsc::Receiver<MaintenanceMessage>) {
        info!("Cooldown maintenance started");

        let mut sweep_timer = interval(self.sweep_interval);

        loop {
            tokio::select! {
                _ = sweep_timer.tick() => {
                    self.dispatcher.sweep_cooldowns();
                }
                msg = rx.recv() => {
                    match msg {
                        Some(MaintenanceMessage::SweepNow) => {
                            debug!("Received sweep request");
                            self.dispatcher.sweep_cooldowns();
                        }
                        Some(MaintenanceMessage::Shutdown) | None => {
                            info!("Cooldown maintenance shutting down");
                            break;
                        }
                    }
                }
            }
        }
    }

    pub fn add_to_blacklist(&self, scope: Scope, id: u64) -> &Self {
        self.dispatcher.access().add(scope, id);
        self
    }

    pub fn add_all_to_blacklist(&self, scope: Scope, ids: impl IntoIterator<Item = u64>) -> &Self {
        self.dispatcher.access().extend(scope, ids);
        self
    }

    pub fn remove_from_blacklist(&self, scope: Scope, id: u64) -> bool {
        self.dispatcher.access().remove(scope, id)
    }

    /// Returns `true` only if every id was blacklisted.
    pub fn remove_all_from_blacklist(
        &self,
        scope: Scope,
        ids: impl IntoIterator<Item = u64>,
    ) -> bool {
        self.dispatcher.access().remove_all(scope, ids)
    }

    pub fn clear_blacklist(&self, scope: Scope) -> &Self {
        self.dispatcher.access().clear(scope);
        self
    }

    pub fn set_default_prefix(&self, prefix: impl Into<String>) -> Result<&Self, ConfigError> {
        self.dispatcher.prefixes().set_default(prefix)?;
        Ok(self)
    }

    /// Sets a guild's prefix; `None` reverts it to the default.
    pub fn set_custom_prefix(
        &self,
        guild_id: u64,
        prefix: Option<String>,
    ) -> Result<&Self, ConfigError> {
        self.dispatcher.prefixes().set_override(guild_id, prefix)?;
        Ok(self)
    }

    pub fn prefix_for(&self, guild_id: u64) -> String {
        self.dispatcher.prefixes().resolve(guild_id)
    }

    /// Sets the cooldown in seconds, 0 disables it.
    pub fn set_cooldown(&self, secs: u64) -> &Self {
        self.dispatcher.set_cooldown_secs(secs);
        self
    }

    pub fn set_ignore_case(&self, ignore_case: bool) -> &Self {
        self.dispatcher.set_ignore_case(ignore_case);
        self
    }

    pub fn set_notice(&self, kind: NoticeKind, text: Option<String>) -> &Self {
        self.dispatcher.set_notice(kind, text);
        self
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::commands::CommandContext;
    use crate::dispatch::ManualClock;
    use crate::platform::testing::{MockEvent, MockSource};

    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<Vec<String>>>>,
    }

    #[async_trait]
    impl CommandHandler for Recorder {
        async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<()> {
            tokio::task::yield_now().await;
            self.calls.lock().push(ctx.args().to_vec());
            Ok(())
        }
    }

    fn framework(recorder: &Recorder) -> CommandFramework {
        CommandFramework::builder(CommandSettings::default())
            .command_with_description("ping", "Replies", recorder.clone())
            .unwrap()
            .clock(Arc::new(ManualClock::new(0)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_rejects_bad_commands() {
        let result = CommandFramework::builder(CommandSettings::default())
            .command("bad name", Recorder::default());
        assert!(matches!(result, Err(CommandError::InvalidName(_))));

        let result = CommandFramework::builder(CommandSettings::default())
            .command("ping", Recorder::default())
            .unwrap()
            .command("ping", Recorder::default());
        assert!(matches!(result, Err(CommandError::DuplicateName(_))));
    }

    #[test]
    fn test_build_rejects_empty_prefix() {
        let result = CommandFramework::builder(CommandSettings::new("", false)).build();
        assert!(matches!(result, Err(ConfigError::EmptyPrefix)));
    }

    #[test]
    fn test_activate_requires_runtime() {
        let framework = framework(&Recorder::default());
        let source = MockSource::default();

        assert!(matches!(
            framework.activate(&source),
            Err(FrameworkError::NoRuntime)
        ));
        assert!(!framework.is_activated());
        assert_eq!(source.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_activate_only_once() {
        let framework = framework(&Recorder::default());
        let source = MockSource::default();

        assert!(!framework.is_activated());
        framework.activate(&source).unwrap();
        assert!(framework.is_activated());

        assert!(matches!(
            framework.activate(&source),
            Err(FrameworkError::AlreadyActivated)
        ));
        assert_eq!(source.listener_count(), 1);
    }

    #[tokio::test]
    async fn test_activated_listener_dispatches() {
        let recorder = Recorder::default();
        let framework = framework(&recorder);
        let source = MockSource::default();
        framework.activate(&source).unwrap();

        source.emit(MockEvent::new("!ping a b").into_arc());
        source.emit(MockEvent::new("hello").into_arc());

        framework.shutdown().await;
        assert_eq!(*recorder.calls.lock(), vec![vec!["a".to_owned(), "b".to_owned()]]);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_dispatches() {
        let recorder = Recorder::default();
        let framework = framework(&recorder);
        let source = MockSource::default();
        framework.activate(&source).unwrap();

        for i in 0..200 {
            source.emit(MockEvent::new(&format!("!ping {i}")).into_arc());
        }
        assert_eq!(framework.in_flight(), 200);

        framework.shutdown().await;
        assert_eq!(framework.in_flight(), 0);
        assert_eq!(recorder.calls.lock().len(), 200);

        // Nothing is accepted once shut down.
        source.emit(MockEvent::new("!ping late").into_arc());
        assert_eq!(framework.in_flight(), 0);
        tokio::task::yield_now().await;
        assert_eq!(recorder.calls.lock().len(), 200);
    }

    #[tokio::test]
    async fn test_emit_from_thread_outside_runtime() {
        let recorder = Recorder::default();
        let framework = framework(&recorder);
        let source = Arc::new(MockSource::default());
        framework.activate(source.as_ref()).unwrap();

        let emitter = std::thread::spawn({
            let source = Arc::clone(&source);
            move || {
                for i in 0..10 {
                    source.emit(MockEvent::new(&format!("!ping {i}")).into_arc());
                }
            }
        });
        emitter.join().unwrap();

        framework.shutdown().await;
        let mut seen: Vec<String> = recorder
            .calls
            .lock()
            .iter()
            .map(|args| args[0].clone())
            .collect();
        seen.sort_unstable_by_key(|arg| arg.parse::<u32>().unwrap());
        let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_configuration_surface() {
        let framework = framework(&Recorder::default());

        framework
            .add_to_blacklist(Scope::Guild, 1)
            .add_all_to_blacklist(Scope::Channel, [2, 3])
            .set_cooldown(5)
            .set_ignore_case(true)
            .set_notice(NoticeKind::Cooldown, Some("wait".to_owned()));

        let dispatcher = framework.dispatcher();
        assert!(dispatcher.access().is_blocked(1, Scope::Guild));
        assert_eq!(dispatcher.access().len(Scope::Channel), 2);
        assert_eq!(dispatcher.cooldown_millis(), 5_000);
        assert!(dispatcher.ignore_case());
        assert_eq!(dispatcher.notice(NoticeKind::Cooldown).as_deref(), Some("wait"));

        assert!(!framework.remove_all_from_blacklist(Scope::Channel, [2, 9]));
        assert!(framework.remove_from_blacklist(Scope::Guild, 1));
        framework.clear_blacklist(Scope::Channel);
        assert_eq!(dispatcher.access().len(Scope::Channel), 0);

        framework.set_default_prefix("$").unwrap();
        framework.set_custom_prefix(4, Some("?".to_owned())).unwrap();
        assert_eq!(framework.prefix_for(4), "?");
        assert_eq!(framework.prefix_for(5), "$");
        framework.set_custom_prefix(4, None).unwrap();
        assert_eq!(framework.prefix_for(4), "$");
        assert!(framework.set_default_prefix("").is_err());

        assert_eq!(framework.commands().get("ping").unwrap().description(), Some("Replies"));
    }

    #[tokio::test]
    async fn test_maintenance_sweeps_and_stops() {
        let clock = Arc::new(ManualClock::new(0));
        let mut settings = CommandSettings::default();
        settings.cooldown_secs = 1;
        let framework = Arc::new(
            CommandFramework::builder(settings)
                .command("ping", Recorder::default())
                .unwrap()
                .clock(clock.clone())
                .build()
                .unwrap(),
        );

        framework
            .dispatcher()
            .dispatch(MockEvent::new("!ping").into_arc())
            .await;
        assert_eq!(framework.dispatcher().cooldowns().len(), 1);

        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn({
            let framework = Arc::clone(&framework);
            async move { framework.run_maintenance(rx).await }
        });

        clock.advance(1_000);
        tx.send(MaintenanceMessage::SweepNow).await.unwrap();
        tx.send(MaintenanceMessage::Shutdown).await.unwrap();
        handle.await.unwrap();

        assert!(framework.dispatcher().cooldowns().is_empty());
    }
}
