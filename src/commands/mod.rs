//! Command registration and parsing.
//!
//! Commands are plain names bound to a [`CommandHandler`]. A message is an
//! invocation when it starts with the guild's prefix; the first token after
//! the prefix is the name and the rest are arguments.

pub mod builtin;
mod table;
mod types;

pub use table::{CommandError, CommandTable};
pub use types::{Command, CommandContext, CommandHandler, ParsedInvocation};
