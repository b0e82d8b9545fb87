//! Typed handler adapters.
//!
//! # Data Flow
//! ```text
//! axum request
//!     → middleware adapters (Context<()>, body untouched)
//!         → response set?  → chain stops, response returned
//!     → terminal adapter
//!         → fresh T::default() → binding (uri, json, form) → Context<T>
//!         → user handler → response (200 OK when unset)
//! ```
//!
//! # Design Decisions
//! - Binding failures are logged and never reach the handler as errors
//! - Sources are resolved once per adapter, not per request

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequestParts, Path, Query, Request};
use axum::http::{request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::future::{self, BoxFuture, FutureExt};

use crate::binding::{bind, BindingSources, Payload, RawSources, Source};
use crate::http::context::Context;

/// Outcome of one adapter in a chain.
pub enum Flow {
    /// Continue with the (possibly updated) request.
    Next(Request),
    /// Stop and send this response.
    Done(Response),
}

/// Router-native form of a handler.
pub type HandlerAdapter = Arc<dyn Fn(Request) -> BoxFuture<'static, Flow> + Send + Sync>;

/// A route-specific middleware.
#[derive(Clone)]
pub struct Middleware(pub(crate) HandlerAdapter);

impl Middleware {
    pub fn new(handler: impl Fn(&mut Context<()>) + Send + Sync + 'static) -> Self {
        Self(middleware_adapter(handler))
    }
}

/// Adapt a middleware, a handler over the empty payload. It never reads the body.
pub fn middleware_adapter(
    handler: impl Fn(&mut Context<()>) + Send + Sync + 'static,
) -> HandlerAdapter {
    Arc::new(move |request: Request| {
        let (parts, body) = request.into_parts();
        let mut ctx = Context::new(parts, ());
        handler(&mut ctx);

        let flow = match ctx.into_parts() {
            (_, Some(response)) => Flow::Done(response),
            (parts, None) => Flow::Next(Request::from_parts(parts, body)),
        };
        future::ready(flow).boxed()
    })
}

/// Adapt a terminal handler over payload `T`.
pub fn handler_adapter<T, H>(handler: H, body_limit: usize) -> HandlerAdapter
where
    T: Payload,
    H: Fn(&mut Context<T>) + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    let sources = BindingSources::of::<T>();

    Arc::new(move |request: Request| {
        let handler = handler.clone();
        async move {
            let (mut parts, body) = request.into_parts();
            let payload = bind_request::<T>(sources, &mut parts, body, body_limit).await;

            let mut ctx = Context::new(parts, payload);
            handler(&mut ctx);

            let (_, response) = ctx.into_parts();
            Flow::Done(response.unwrap_or_else(|| StatusCode::OK.into_response()))
        }
        .boxed()
    })
}

/// Run adapters in order until one responds.
pub async fn run_chain(chain: &[HandlerAdapter], mut request: Request) -> Flow {
    for adapter in chain {
        match adapter(request).await {
            Flow::Next(next) => request = next,
            done @ Flow::Done(_) => return done,
        }
    }
    Flow::Next(request)
}

async fn bind_request<T: Payload>(
    sources: BindingSources,
    parts: &mut Parts,
    body: Body,
    body_limit: usize,
) -> T {
    if sources.is_empty() {
        return T::default();
    }

    let path = if sources.contains(Source::Uri) {
        path_params(parts).await
    } else {
        Vec::new()
    };

    let query = if sources.contains(Source::Form) {
        match Query::<Vec<(String, String)>>::try_from_uri(&parts.uri) {
            Ok(Query(pairs)) => pairs,
            Err(e) => {
                tracing::warn!(path = %parts.uri.path(), error = %e, "Query string rejected");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let bytes = if sources.contains(Source::Json) {
        match axum::body::to_bytes(body, body_limit).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(path = %parts.uri.path(), error = %e, "Failed to read request body");
                None
            }
        }
    } else {
        None
    };

    let raw = RawSources {
        path: &path,
        body: bytes.as_deref(),
        query: &query,
    };
    let (payload, errors) = bind::<T>(sources, &raw);
    for error in errors {
        tracing::warn!(
            method = %parts.method,
            path = %parts.uri.path(),
            error = %error,
            "Request binding failed"
        );
    }
    payload
}

async fn path_params(parts: &mut Parts) -> Vec<(String, String)> {
    match Path::<Vec<(String, String)>>::from_request_parts(parts, &()).await {
        Ok(Path(params)) => params,
        Err(PathRejection::MissingPathParams(_)) => Vec::new(),
        Err(e) => {
            tracing::warn!(path = %parts.uri.path(), error = %e, "Path parameters rejected");
            Vec::new()
        }
    }
}
