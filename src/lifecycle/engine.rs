//! The engine: ordered startup queues and route definitions.
//!
//! # Startup Phases
//! ```text
//! 1. init functions        (queue order)
//! 2. global middleware     → HttpServer::use_middleware
//! 3. routes                → HttpServer::handle
//!    router functions      → HttpServer::map_router
//! 4. pre-run functions     (queue order)
//! 5. serve                 (blocks until shutdown)
//! ```
//!
//! # Design Decisions
//! - `prepare`/`run` consume the engine; a second run cannot be expressed
//! - Queues are only mutated during single-threaded registration
//! - Every phase finishes before the next begins

use std::collections::HashSet;

use axum::http::Method;
use axum::Router;

use crate::binding::Payload;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::http::context::Context;
use crate::http::handler::{handler_adapter, middleware_adapter, HandlerAdapter, Middleware};
use crate::http::server::HttpServer;

/// A zero-argument startup callback.
pub type StartupFunc = Box<dyn FnOnce() + Send>;

/// Router-native setup, run once over the router after the routes.
pub type RouterFunc = Box<dyn FnOnce(Router) -> Router + Send>;

/// A route waiting for installation.
struct Route {
    method: Method,
    path: String,
    /// Route middleware followed by the terminal handler.
    handlers: Vec<HandlerAdapter>,
}

/// Core engine. One per server process.
pub struct Engine {
    config: ServerConfig,

    /// Called before middleware and routes are installed.
    init_funcs: Vec<StartupFunc>,

    /// Installed after init functions, before routes.
    middleware: Vec<HandlerAdapter>,

    routes: Vec<Route>,

    /// Applied to the router after every route is installed.
    router_funcs: Vec<RouterFunc>,

    /// Called after routes are installed, right before serving.
    pre_run_funcs: Vec<StartupFunc>,

    /// Plugins ever registered; membership is permanent.
    pub(super) registered_plugins: HashSet<String>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            config,
            init_funcs: Vec::new(),
            middleware: Vec::new(),
            routes: Vec::new(),
            router_funcs: Vec::new(),
            pre_run_funcs: Vec::new(),
            registered_plugins: HashSet::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn prepend_init_func(&mut self, f: impl FnOnce() + Send + 'static) {
        self.init_funcs.insert(0, Box::new(f));
    }

    pub fn append_init_func(&mut self, f: impl FnOnce() + Send + 'static) {
        self.init_funcs.push(Box::new(f));
    }

    /// Middleware are handlers over the empty payload `()`.
    pub fn prepend_middleware(&mut self, f: impl Fn(&mut Context<()>) + Send + Sync + 'static) {
        self.middleware.insert(0, middleware_adapter(f));
    }

    pub fn append_middleware(&mut self, f: impl Fn(&mut Context<()>) + Send + Sync + 'static) {
        self.middleware.push(middleware_adapter(f));
    }

    /// Queue router-native setup: `nest_service`, static files, a `tower` layer.
    ///
    /// Routes added this way skip the global middleware.
    pub fn append_router_func(&mut self, f: impl FnOnce(Router) -> Router + Send + 'static) {
        self.router_funcs.push(Box::new(f));
    }

    pub fn prepend_pre_run_func(&mut self, f: impl FnOnce() + Send + 'static) {
        self.pre_run_funcs.insert(0, Box::new(f));
    }

    pub fn append_pre_run_func(&mut self, f: impl FnOnce() + Send + 'static) {
        self.pre_run_funcs.push(Box::new(f));
    }

    /// Add a `GET` route. The verb helpers take no route middleware; use
    /// [`Engine::route`] for a route with its own middleware.
    pub fn get<T: Payload>(
        &mut self,
        path: &str,
        handler: impl Fn(&mut Context<T>) + Send + Sync + 'static,
    ) {
        self.route(Method::GET, path, Vec::new(), handler);
    }

    pub fn post<T: Payload>(
        &mut self,
        path: &str,
        handler: impl Fn(&mut Context<T>) + Send + Sync + 'static,
    ) {
        self.route(Method::POST, path, Vec::new(), handler);
    }

    pub fn put<T: Payload>(
        &mut self,
        path: &str,
        handler: impl Fn(&mut Context<T>) + Send + Sync + 'static,
    ) {
        self.route(Method::PUT, path, Vec::new(), handler);
    }

    pub fn patch<T: Payload>(
        &mut self,
        path: &str,
        handler: impl Fn(&mut Context<T>) + Send + Sync + 'static,
    ) {
        self.route(Method::PATCH, path, Vec::new(), handler);
    }

    pub fn delete<T: Payload>(
        &mut self,
        path: &str,
        handler: impl Fn(&mut Context<T>) + Send + Sync + 'static,
    ) {
        self.route(Method::DELETE, path, Vec::new(), handler);
    }

    /// Add a route whose own middleware run before `handler`.
    ///
    /// `path` uses the router's syntax (`/users/{id}`).
    pub fn route<T: Payload>(
        &mut self,
        method: Method,
        path: &str,
        middleware: Vec<Middleware>,
        handler: impl Fn(&mut Context<T>) + Send + Sync + 'static,
    ) {
        let mut handlers: Vec<HandlerAdapter> = middleware.into_iter().map(|m| m.0).collect();
        handlers.push(handler_adapter::<T, _>(handler, self.config.http.body_limit_bytes));

        tracing::debug!(method = %method, path = %path, handlers = handlers.len(), "Route added");
        self.routes.push(Route {
            method,
            path: path.to_string(),
            handlers,
        });
    }

    /// Run phases 1-4 and return the server ready to accept traffic.
    pub fn prepare(self) -> Result<HttpServer> {
        let Self {
            config,
            init_funcs,
            middleware,
            routes,
            router_funcs,
            pre_run_funcs,
            registered_plugins,
        } = self;

        tracing::info!(
            plugins = registered_plugins.len(),
            init_funcs = init_funcs.len(),
            "Running init functions"
        );
        for f in init_funcs {
            f();
        }

        let mut server = HttpServer::new(config.http);
        tracing::debug!(count = middleware.len(), "Installing middleware");
        for adapter in middleware {
            server.use_middleware(adapter);
        }

        tracing::debug!(count = routes.len(), "Installing routes");
        for route in routes {
            server.handle(route.method, &route.path, route.handlers)?;
        }
        for f in router_funcs {
            server.map_router(f);
        }

        tracing::info!(pre_run_funcs = pre_run_funcs.len(), "Running pre-run functions");
        for f in pre_run_funcs {
            f();
        }

        Ok(server)
    }

    /// Start the engine on `addr`. Returns only on shutdown or failure.
    pub async fn run(self, addr: &str) -> Result<()> {
        let server = self.prepare()?;
        server.serve(addr).await
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
