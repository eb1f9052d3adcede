//! Dispatcher settings, loadable from JSON or the environment.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::DEFAULT_MAX_ENTRIES;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Prefix cannot be empty")]
    EmptyPrefix,

    #[error("Custom prefix for guild {0} cannot be empty")]
    EmptyCustomPrefix(u64),

    #[error("Invalid value for environment variable {name}: {value}")]
    InvalidEnvVar { name: &'static str, value: String },

    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Which configurable notice a text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    GuildBlacklisted,
    ChannelBlacklisted,
    Cooldown,
    UnknownCommand,
}

/// Optional texts sent back when a message is turned away.
///
/// Unset notices are never sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notices {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_blacklisted: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_blacklisted: Option<String>,

    /// `{remaining}` is replaced with the seconds left, rounded up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_command: Option<String>,
}

impl Notices {
    #[must_use]
    pub fn get(&self, kind: NoticeKind) -> Option<&str> {
        match kind {
            NoticeKind::GuildBlacklisted => self.guild_blacklisted.as_deref(),
            NoticeKind::ChannelBlacklisted => self.channel_blacklisted.as_deref(),
            NoticeKind::Cooldown => self.cooldown.as_deref(),
            NoticeKind::UnknownCommand => self.unknown_command.as_deref(),
        }
    }

    pub fn set(&mut self, kind: NoticeKind, text: Option<String>) {
        let slot = match kind {
            NoticeKind::GuildBlacklisted => &mut self.guild_blacklisted,
            NoticeKind::ChannelBlacklisted => &mut self.channel_blacklisted,
            NoticeKind::Cooldown => &mut self.cooldown,
            NoticeKind::UnknownCommand => &mut self.unknown_command,
        };
        *slot = text;
    }
}

/// Everything the dispatcher needs to know before activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSettings {
    /// Prefix used by guilds without an override.
    #[serde(default = "default_prefix")]
    pub default_prefix: String,

    /// Lowercase command names before lookup.
    #[serde(default)]
    pub ignore_case: bool,

    /// Minimum seconds between two commands of the same user (0 disables).
    #[serde(default)]
    pub cooldown_secs: u64,

    /// Guild id to prefix.
    #[serde(default)]
    pub custom_prefixes: HashMap<u64, String>,

    #[serde(default)]
    pub blacklisted_guilds: BTreeSet<u64>,

    #[serde(default)]
    pub blacklisted_channels: BTreeSet<u64>,

    #[serde(default)]
    pub notices: Notices,

    /// Upper bound on users tracked for cooldowns.
    #[serde(default = "default_max_cooldown_entries")]
    pub max_cooldown_entries: usize,

    /// How often stale cooldown entries are swept.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_prefix() -> String {
    "!".to_owned()
}

const fn default_max_cooldown_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

const fn default_sweep_interval() -> u64 {
    300
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            default_prefix: default_prefix(),
            ignore_case: false,
            cooldown_secs: 0,
            custom_prefixes: HashMap::new(),
            blacklisted_guilds: BTreeSet::new(),
            blacklisted_channels: BTreeSet::new(),
            notices: Notices::default(),
            max_cooldown_entries: default_max_cooldown_entries(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl CommandSettings {
    /// Creates settings with the given prefix and case handling.
    #[must_use]
    pub fn new(default_prefix: impl Into<String>, ignore_case: bool) -> Self {
        Self {
            default_prefix: default_prefix.into(),
            ignore_case,
            ..Self::default()
        }
    }

    /// Loads settings from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Saves settings to a JSON file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Creates settings from environment variables with defaults.
    ///
    /// Reads `COMMAND_PREFIX`, `COMMAND_COOLDOWN_SECS` and
    /// `COMMAND_IGNORE_CASE`.
    pub fn from_env_with_defaults() -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Ok(prefix) = std::env::var("COMMAND_PREFIX") {
            settings.default_prefix = prefix;
        }

        if let Ok(value) = std::env::var("COMMAND_COOLDOWN_SECS") {
            settings.cooldown_secs =
                value.trim().parse().map_err(|_| ConfigError::InvalidEnvVar {
                    name: "COMMAND_COOLDOWN_SECS",
                    value: value.clone(),
                })?;
        }

        if let Ok(value) = std::env::var("COMMAND_IGNORE_CASE") {
            settings.ignore_case = parse_bool(&value).ok_or(ConfigError::InvalidEnvVar {
                name: "COMMAND_IGNORE_CASE",
                value,
            })?;
        }

        Ok(settings)
    }

    /// Checks that every prefix is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }

        let mut guilds: Vec<&u64> = self.custom_prefixes.keys().collect();
        guilds.sort_unstable();
        for guild in guilds {
            if self.custom_prefixes[guild].is_empty() {
                return Err(ConfigError::EmptyCustomPrefix(*guild));
            }
        }

        Ok(())
    }

    /// Cooldown in milliseconds.
    #[must_use]
    pub const fn cooldown_millis(&self) -> u64 {
        self.cooldown_secs.saturating_mul(1000)
    }

    /// A filled-in sample for `--generate-config`.
    #[must_use]
    pub fn example() -> Self {
        Self {
            default_prefix: "!".to_owned(),
            ignore_case: true,
            cooldown_secs: 3,
            custom_prefixes: HashMap::from([(123_456_789_012_345_678, "?".to_owned())]),
            blacklisted_guilds: BTreeSet::from([111_111_111_111_111_111]),
            blacklisted_channels: BTreeSet::from([222_222_222_222_222_222]),
            notices: Notices {
                guild_blacklisted: Some("Commands are disabled on this server.".to_owned()),
                channel_blacklisted: Some("Commands are disabled in this channel.".to_owned()),
                cooldown: Some("Slow down! Try again in {remaining}s.".to_owned()),
                unknown_command: None,
            },
            ..Self::default()
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
