//! Guild Commands Library
//!
//! Prefix command dispatch for guild-based chat bots.
//!
//! This crate provides the core functionality for:
//! - Registering named commands with handlers and descriptions
//! - Resolving per-guild prefixes and parsing invocations
//! - Blacklisting guilds and channels
//! - Enforcing per-user cooldowns
//! - Isolating handler failures from the dispatch loop

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod platform;
