//! Configuration module.
//!
//! Handles loading and validation of dispatcher settings: prefixes,
//! cooldown, blacklists and notice texts.

mod settings;

pub use settings::{CommandSettings, ConfigError, NoticeKind, Notices};
