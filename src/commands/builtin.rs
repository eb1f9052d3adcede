//! Small general-purpose commands shipped with the console bot.

use std::fmt::Write as _;

use anyhow::Context;
use async_trait::async_trait;

use super::{CommandContext, CommandHandler};

/// Replies with "Pong!".
#[derive(Debug, Default)]
pub struct Ping;

#[async_trait]
impl CommandHandler for Ping {
    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<()> {
        ctx.reply("Pong!").await.context("Failed to answer ping")?;
        Ok(())
    }
}

/// Repeats its arguments back.
#[derive(Debug, Default)]
pub struct Echo;

#[async_trait]
impl CommandHandler for Echo {
    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<()> {
        if ctx.args().is_empty() {
            ctx.reply(&format!("Usage: {}{} <text>", ctx.prefix(), ctx.name()))
                .await?;
            return Ok(());
        }
        ctx.reply(&ctx.args().join(" ")).await?;
        Ok(())
    }
}

/// Lists every registered command, or describes one.
#[derive(Debug, Default)]
pub struct Help;

#[async_trait]
impl CommandHandler for Help {
    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<()> {
        let prefix = ctx.prefix();

        if let Some(name) = ctx.args().first() {
            let message = match ctx.commands().get(name) {
                Some(command) => format!(
                    "{prefix}{} - {}",
                    command.name(),
                    command.description().unwrap_or("No description")
                ),
                None => format!("Unknown command: '{name}'"),
            };
            ctx.reply(&message).await?;
            return Ok(());
        }

        let mut message = String::from("Available commands:");
        for command in ctx.commands().all() {
            match command.description() {
                Some(description) => {
                    let _ = write!(message, "\n  {prefix}{} - {description}", command.name());
                }
                None => {
                    let _ = write!(message, "\n  {prefix}{}", command.name());
                }
            }
        }
        ctx.reply(&message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::commands::CommandTable;
    use crate::platform::testing::MockEvent;

    fn table() -> Arc<CommandTable> {
        let mut table = CommandTable::new();
        table.register("ping", Arc::new(Ping), Some("Check the bot is alive")).unwrap();
        table.register("echo", Arc::new(Echo), None).unwrap();
        table.register("help", Arc::new(Help), Some("List commands")).unwrap();
        Arc::new(table)
    }

    fn context(event: &Arc<MockEvent>, name: &str, args: &[&str]) -> CommandContext {
        CommandContext::new(
            event.clone(),
            name.to_owned(),
            args.iter().map(|a| (*a).to_owned()).collect(),
            "!".to_owned(),
            table(),
        )
    }

    #[tokio::test]
    async fn test_ping() {
        let event = MockEvent::new("!ping").into_arc();
        Ping.execute(&context(&event, "ping", &[])).await.unwrap();
        assert_eq!(event.sent(), vec!["Pong!"]);
    }

    #[tokio::test]
    async fn test_ping_without_permission_fails() {
        let event = MockEvent::new("!ping").without_send_permission().into_arc();
        assert!(Ping.execute(&context(&event, "ping", &[])).await.is_err());
        assert!(event.sent().is_empty());
    }

    #[tokio::test]
    async fn test_echo() {
        let event = MockEvent::new("!echo a b").into_arc();
        Echo.execute(&context(&event, "echo", &["a", "b"])).await.unwrap();
        assert_eq!(event.sent(), vec!["a b"]);
    }

    #[tokio::test]
    async fn test_echo_usage() {
        let event = MockEvent::new("!echo").into_arc();
        Echo.execute(&context(&event, "echo", &[])).await.unwrap();
        assert_eq!(event.sent(), vec!["Usage: !echo <text>"]);
    }

    #[tokio::test]
    async fn test_help_lists_commands() {
        let event = MockEvent::new("!help").into_arc();
        Help.execute(&context(&event, "help", &[])).await.unwrap();
        assert_eq!(
            event.sent(),
            vec![
                "Available commands:\n  !echo\n  !help - List commands\n  !ping - Check the bot is alive"
            ]
        );
    }

    #[tokio::test]
    async fn test_help_single_command() {
        let event = MockEvent::new("!help ping").into_arc();
        Help.execute(&context(&event, "help", &["ping"])).await.unwrap();
        Help.execute(&context(&event, "help", &["nope"])).await.unwrap();
        assert_eq!(
            event.sent(),
            vec!["!ping - Check the bot is alive", "Unknown command: 'nope'"]
        );
    }
}
