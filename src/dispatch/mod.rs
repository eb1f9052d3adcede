//! Message dispatch.
//!
//! Turns inbound messages into command invocations while enforcing
//! blacklists, per-guild prefixes and per-user cooldowns.

mod access;
mod cooldown;
mod dispatcher;
mod framework;
mod prefix;

pub use access::{AccessGate, Scope};
pub use cooldown::{Clock, CooldownTracker, DEFAULT_MAX_ENTRIES, ManualClock, SystemClock};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use framework::{CommandFramework, FrameworkBuilder, FrameworkError, MaintenanceMessage};
pub use prefix::PrefixResolver;
