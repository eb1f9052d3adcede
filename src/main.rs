//! Guild Commands - Console Bot
//!
//! Runs the command dispatcher against stdin: every line is treated as a
//! guild message from a fixed user, and replies are printed to stdout.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use guild_commands::commands::builtin::{Echo, Help, Ping};
use guild_commands::config::CommandSettings;
use guild_commands::dispatch::{CommandFramework, MaintenanceMessage};
use guild_commands::platform::{Author, Channel, ConsoleEventSource, ConsoleIdentity, Guild};

/// Prefix command bot reading messages from the console.
#[derive(Parser, Debug)]
#[command(name = "guild_commands")]
#[command(about = "Dispatch prefix commands typed at the console")]
#[command(version)]
struct Args {
    /// Path to the settings JSON file (environment defaults are used if missing).
    #[arg(short, long, default_value = "settings.json")]
    config: String,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Generate an example settings file and exit.
    #[arg(long)]
    generate_config: bool,

    /// Guild id the console speaks in.
    #[arg(long, default_value_t = 1)]
    guild_id: u64,

    /// Channel id the console speaks in.
    #[arg(long, default_value_t = 1)]
    channel_id: u64,

    /// User id the console speaks as.
    #[arg(long, default_value_t = 1)]
    user_id: u64,

    /// Display name the console speaks as.
    #[arg(long, default_value = "operator")]
    user_name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Handle example config generation
    if args.generate_config {
        return generate_example_config();
    }

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let settings = load_settings(&args.config)?;
    settings
        .validate()
        .context("Settings validation failed")?;

    info!(
        "Loaded settings (prefix: {}, cooldown: {}s, ignore_case: {})",
        settings.default_prefix, settings.cooldown_secs, settings.ignore_case
    );

    let framework = CommandFramework::builder(settings)
        .command_with_description("ping", "Check that the bot is alive", Ping)?
        .command_with_description("echo", "Repeat the given text", Echo)?
        .command_with_description("help", "List commands or describe one", Help)?
        .build()
        .context("Failed to build command framework")?;
    let framework = Arc::new(framework);

    let source = ConsoleEventSource::new(ConsoleIdentity {
        guild: Guild {
            id: args.guild_id,
            name: "console".to_owned(),
        },
        channel: Channel {
            id: args.channel_id,
            name: "console".to_owned(),
        },
        author: Author {
            id: args.user_id,
            name: args.user_name.clone(),
            bot: false,
        },
    });
    framework.activate(&source)?;

    // Spawn cooldown maintenance task
    let (maintenance_tx, maintenance_rx) = mpsc::channel::<MaintenanceMessage>(8);
    let maintenance_handle = tokio::spawn({
        let framework = Arc::clone(&framework);
        async move { framework.run_maintenance(maintenance_rx).await }
    });

    info!("Bot is running. Type messages, Ctrl+D or Ctrl+C to stop.");
    info!("Prefix in this guild: {}", framework.prefix_for(args.guild_id));

    tokio::select! {
        result = source.run(BufReader::new(tokio::io::stdin())) => {
            let delivered = result.context("Failed to read from stdin")?;
            info!("Input closed after {} message(s)", delivered);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    // Cleanup
    info!("Shutting down...");
    framework.shutdown().await;
    let _ = maintenance_tx.send(MaintenanceMessage::Shutdown).await;
    let _ = maintenance_handle.await;

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads the settings file, falling back to the environment if it is absent.
fn load_settings(path: &str) -> Result<CommandSettings> {
    if Path::new(path).exists() {
        return CommandSettings::load_from_file(path)
            .with_context(|| format!("Failed to load settings from {path}"));
    }

    debug!("Settings file {} not found, using environment defaults", path);
    CommandSettings::from_env_with_defaults().context("Failed to read settings from environment")
}

/// Generates an example settings file.
fn generate_example_config() -> Result<()> {
    let example = CommandSettings::example();
    example.save_to_file("settings.example.json")?;

    println!("✓ Example settings written to: settings.example.json");
    println!("\nTo use this bot:");
    println!("1. Copy settings.example.json to settings.json");
    println!("2. Adjust the prefix, cooldown and blacklists");
    println!("3. Run: guild_commands --guild-id <id> --channel-id <id>");

    Ok(())
}
