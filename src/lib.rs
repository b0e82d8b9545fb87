//! Ginseng: staged startup, typed request binding and plugin registration
//! on top of axum.

pub mod binding;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod plugins;

pub use binding::{FieldBinding, Payload, Source};
pub use config::ServerConfig;
pub use error::{Error, Result};
pub use http::{Context, HttpServer, Middleware};
pub use lifecycle::{Engine, Plugin};
