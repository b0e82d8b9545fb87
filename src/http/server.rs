//! HTTP server setup around the axum router.
//!
//! # Responsibilities
//! - Hold global middleware and install routes on the axum Router
//! - Wire up router-level layers (tracing, timeout, request ID)
//! - Bind the listener and run the serve loop
//!
//! # Design Decisions
//! - Global middleware apply to routes installed after them, so each
//!   route's chain is the middleware snapshot plus its own adapters
//! - Unmatched requests still pass through global middleware before 404

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{on, MethodFilter};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use crate::http::handler::{run_chain, Flow, HandlerAdapter};

/// A route as installed on the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: Method,
    pub path: String,
    /// Length of the route's own chain, terminal handler included.
    pub handlers: usize,
    /// Global middleware in front of the chain.
    pub middleware: usize,
}

/// HTTP server hosting the installed middleware and routes.
pub struct HttpServer {
    router: Router,
    config: HttpConfig,
    middleware: Vec<HandlerAdapter>,
    routes: Vec<RouteInfo>,
}

impl HttpServer {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            router: Router::new(),
            config,
            middleware: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Install a global middleware for every route installed afterwards.
    pub fn use_middleware(&mut self, adapter: HandlerAdapter) {
        self.middleware.push(adapter);
    }

    /// Install a route with its adapter chain.
    pub fn handle(&mut self, method: Method, path: &str, chain: Vec<HandlerAdapter>) -> Result<()> {
        let filter = MethodFilter::try_from(method.clone())
            .map_err(|_| Error::UnsupportedMethod(method.clone()))?;

        self.routes.push(RouteInfo {
            method,
            path: path.to_string(),
            handlers: chain.len(),
            middleware: self.middleware.len(),
        });

        let chain: Arc<[HandlerAdapter]> = self.middleware.iter().cloned().chain(chain).collect();
        let router = std::mem::take(&mut self.router);
        self.router = router.route(
            path,
            on(filter, move |request: Request| {
                let chain = chain.clone();
                async move { finish(run_chain(&chain, request).await, StatusCode::OK) }
            }),
        );
        Ok(())
    }

    /// Hand the router to router-native code: nested services, extra layers.
    ///
    /// Routes added here bypass the global middleware chain.
    pub fn map_router(&mut self, f: impl FnOnce(Router) -> Router) {
        let router = std::mem::take(&mut self.router);
        self.router = f(router);
    }

    /// Routes in installation order.
    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    /// Finalize into an axum Router with fallback and layers applied.
    #[allow(deprecated)]
    pub fn into_router(self) -> Router {
        let global: Arc<[HandlerAdapter]> = self.middleware.into();
        let mut router = self.router.fallback(move |request: Request| {
            let global = global.clone();
            async move { finish(run_chain(&global, request).await, StatusCode::NOT_FOUND) }
        });

        router = router.layer(TimeoutLayer::new(Duration::from_secs(
            self.config.request_timeout_secs,
        )));
        if self.config.request_id {
            router = router
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));
        }
        if self.config.trace {
            router = router.layer(TraceLayer::new_for_http());
        }
        router
    }

    /// Bind `addr` and serve until Ctrl+C.
    pub async fn serve(self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await.map_err(|source| Error::Bind {
            addr: addr.to_string(),
            source,
        })?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on(self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr().map_err(Error::Serve)?;
        tracing::info!(address = %addr, routes = self.routes.len(), "HTTP server starting");

        let app = self
            .into_router()
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(Error::Serve)?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// A chain that never responded falls through to `status`.
fn finish(flow: Flow, status: StatusCode) -> Response {
    match flow {
        Flow::Done(response) => response,
        Flow::Next(_) => status.into_response(),
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
