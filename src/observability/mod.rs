//! Observability subsystem.
//!
//! All subsystems log through `tracing`; this module only owns
//! subscriber installation.

pub mod logging;

pub use logging::init_logging;
