//! Per-guild command prefixes.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::config::ConfigError;

/// Resolves the prefix in effect for a guild.
#[derive(Debug)]
pub struct PrefixResolver {
    default_prefix: RwLock<String>,
    overrides: RwLock<HashMap<u64, String>>,
}

impl PrefixResolver {
    /// Creates a resolver with the given global default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyPrefix`] if `default_prefix` is empty.
    pub fn new(default_prefix: impl Into<String>) -> Result<Self, ConfigError> {
        let default_prefix = non_empty(default_prefix.into())?;
        Ok(Self {
            default_prefix: RwLock::new(default_prefix),
            overrides: RwLock::new(HashMap::new()),
        })
    }

    /// The guild's override, or the global default.
    pub fn resolve(&self, guild_id: u64) -> String {
        if let Some(prefix) = self.overrides.read().get(&guild_id) {
            return prefix.clone();
        }
        self.default_prefix.read().clone()
    }

    pub fn set_default(&self, prefix: impl Into<String>) -> Result<(), ConfigError> {
        *self.default_prefix.write() = non_empty(prefix.into())?;
        Ok(())
    }

    /// Sets or, with `None`, clears a guild's override.
    pub fn set_override(&self, guild_id: u64, prefix: Option<String>) -> Result<(), ConfigError> {
        match prefix {
            Some(prefix) => {
                let prefix = non_empty(prefix)?;
                self.overrides.write().insert(guild_id, prefix);
            }
            None => {
                self.overrides.write().remove(&guild_id);
            }
        }
        Ok(())
    }
}

fn non_empty(prefix: String) -> Result<String, ConfigError> {
    if prefix.is_empty() {
        Err(ConfigError::EmptyPrefix)
    } else {
        Ok(prefix)
    }
}
