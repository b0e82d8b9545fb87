//! Bundled plugins.
//!
//! Each plugin exposes a `PLUGIN_ID` constant and one [`Plugin`](crate::lifecycle::Plugin)
//! implementation. Plugins never call each other; a dependent plugin only
//! checks that its prerequisite's identifier was registered.

pub mod health;
pub mod identity;
pub mod whoami;

pub use health::{Health, HealthOptions};
pub use identity::{Identity, IdentityExt, IdentityOptions};
pub use whoami::WhoAmIPlugin;
