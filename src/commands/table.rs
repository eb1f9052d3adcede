//! The command registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::{Command, CommandHandler};

/// Errors raised while registering commands.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command name \"{0}\" is not valid (must be non-empty and contain no whitespace)")]
    InvalidName(String),

    #[error("Command \"{0}\" is already registered")]
    DuplicateName(String),
}

/// Maps command names to commands.
///
/// Filled during setup and read concurrently once frozen in an `Arc`.
/// Kept ordered by name so listings need no sorting.
#[derive(Debug, Default, Clone)]
pub struct CommandTable {
    commands: BTreeMap<String, Command>,
}

impl CommandTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidName`] for an empty name or one that
    /// contains whitespace, and [`CommandError::DuplicateName`] if the name
    /// is taken.
    pub fn register(
        &mut self,
        name: &str,
        handler: Arc<dyn CommandHandler>,
        description: Option<&str>,
    ) -> Result<(), CommandError> {
        if !is_valid_name(name) {
            return Err(CommandError::InvalidName(name.to_owned()));
        }
        if self.commands.contains_key(name) {
            return Err(CommandError::DuplicateName(name.to_owned()));
        }

        debug!("Registered command: {}", name);
        self.commands.insert(
            name.to_owned(),
            Command::new(name.to_owned(), description.map(ToOwned::to_owned), handler),
        );
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Lazily iterates over all commands in name order.
    ///
    /// The iterator is `Clone`, so it can be replayed.
    pub fn all(&self) -> impl Iterator<Item = &Command> + Clone {
        self.commands.values()
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(char::is_whitespace)
}
