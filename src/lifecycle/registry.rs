//! Plugin registration and dependency checks.
//!
//! # Responsibilities
//! - Install each plugin at most once per engine
//! - Let a plugin assert that its prerequisites were installed first
//!
//! # Design Decisions
//! - The identifier is recorded before the install function runs
//! - Re-registration is a silent no-op, not an error
//! - Dependency checks only verify; they never install anything
//! - Plugins know each other only by identifier

use crate::error::{Error, Result};
use crate::lifecycle::engine::Engine;

/// An installable unit of behavior with one identifier and one entry point.
pub trait Plugin {
    /// Unique identifier, checked by dependents.
    const ID: &'static str;

    type Options;

    /// Mutate the engine: queue callbacks, middleware and routes.
    fn install(engine: &mut Engine, options: &Self::Options) -> Result<()>;
}

impl Engine {
    /// Install `plugin_id` unless it is already registered.
    pub fn register<O>(
        &mut self,
        plugin_id: &str,
        install: impl FnOnce(&mut Engine, &O) -> Result<()>,
        options: &O,
    ) -> Result<()> {
        if self.registered_plugins.contains(plugin_id) {
            tracing::debug!(plugin = %plugin_id, "Plugin already registered, skipping");
            return Ok(());
        }
        self.registered_plugins.insert(plugin_id.to_string());

        tracing::info!(plugin = %plugin_id, "Installing plugin");
        install(self, options)
    }

    /// Install a typed plugin.
    pub fn install<P: Plugin>(&mut self, options: &P::Options) -> Result<()> {
        self.register(P::ID, P::install, options)
    }

    /// Fail if any of `plugin_ids` was never registered.
    ///
    /// Meant for install functions; the error aborts startup.
    pub fn check_dependencies(&self, plugin_ids: &[&str]) -> Result<()> {
        for plugin_id in plugin_ids {
            if !self.registered_plugins.contains(*plugin_id) {
                tracing::error!(plugin = %plugin_id, "Required plugin is not registered");
                return Err(Error::MissingDependency {
                    plugin: plugin_id.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn is_registered(&self, plugin_id: &str) -> bool {
        self.registered_plugins.contains(plugin_id)
    }

    /// Registered identifiers, in no particular order.
    pub fn registered_plugins(&self) -> impl Iterator<Item = &str> {
        self.registered_plugins.iter().map(String::as_str)
    }
}
