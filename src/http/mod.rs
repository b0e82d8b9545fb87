//! HTTP adaptation layer over axum.
//!
//! # Data Flow
//! ```text
//! axum request
//!     → server.rs (global middleware snapshot + route chain)
//!     → handler.rs (adapters: bind payload, build context, call handler)
//!     → context.rs (request facts, payload, params, response slot)
//!     → response
//! ```

pub mod context;
pub mod handler;
pub mod server;

pub use context::{Context, Params};
pub use handler::{Flow, HandlerAdapter, Middleware};
pub use server::{HttpServer, RouteInfo};
