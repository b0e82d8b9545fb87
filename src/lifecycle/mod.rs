//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (registry.rs):
//!     Engine::register → install fn → queue callbacks / middleware / routes
//!
//! Startup (engine.rs):
//!     init funcs → middleware → routes → pre-run funcs → serve
//! ```
//!
//! # Design Decisions
//! - Ordered startup: each phase completes before the next begins
//! - Fail fast: a missing plugin dependency aborts startup
//! - Listeners start last (traffic only when ready)

pub mod engine;
pub mod registry;

pub use engine::{Engine, RouterFunc, StartupFunc};
pub use registry::Plugin;
