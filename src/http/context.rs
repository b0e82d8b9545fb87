//! Per-request context handed to handlers and middleware.
//!
//! # Responsibilities
//! - Expose request facts (method, path, client address, headers)
//! - Own the bound payload and the response slot
//! - Carry the `Params` side-channel across the handler chain
//!
//! # Design Decisions
//! - `Params` travels in the request extensions between adapters, so every
//!   middleware and the terminal handler of one request see the same map
//! - The chain is sequential; `Params` needs no locking

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, MatchedPath, Query};
use axum::http::{request::Parts, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Untyped values shared along one request's handler chain.
///
/// Keys are free-form strings; plugins namespace them (`"identity.user_id"`).
#[derive(Clone, Default)]
pub struct Params(HashMap<String, Arc<dyn Any + Send + Sync>>);

impl Params {
    pub fn get(&self, key: &str) -> Option<&(dyn Any + Send + Sync)> {
        self.0.get(key).map(|v| &**v)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Any + Send + Sync) {
        self.0.insert(key.into(), Arc::new(value));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// Request context for a handler bound to payload `T`.
pub struct Context<T> {
    parts: Parts,
    params: Params,
    /// Payload populated by binding; `T::default()` where binding failed.
    pub request: T,
    /// Response written by the handler. Unset renders as `200 OK`.
    pub response: Option<Response>,
}

impl<T> Context<T> {
    pub(crate) fn new(mut parts: Parts, request: T) -> Self {
        let params = parts.extensions.remove::<Params>().unwrap_or_default();
        Self {
            parts,
            params,
            request,
            response: None,
        }
    }

    /// Give the request parts back, with the side-channel re-attached.
    pub(crate) fn into_parts(self) -> (Parts, Option<Response>) {
        let Self {
            mut parts,
            params,
            response,
            ..
        } = self;
        parts.extensions.insert(params);
        (parts, response)
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// The matched route pattern, or the raw path when nothing matched.
    pub fn path(&self) -> &str {
        self.parts
            .extensions
            .get::<MatchedPath>()
            .map(MatchedPath::as_str)
            .unwrap_or_else(|| self.parts.uri.path())
    }

    pub fn raw_path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Client address: `X-Forwarded-For`, then `X-Real-IP`, then the peer.
    pub fn client_ip(&self) -> Option<IpAddr> {
        let forwarded = self
            .header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok());
        forwarded
            .or_else(|| self.header("x-real-ip").and_then(|v| v.trim().parse().ok()))
            .or_else(|| {
                self.parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// First value of a query key.
    pub fn query(&self, name: &str) -> Option<String> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&self.parts.uri).ok()?;
        pairs.into_iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn param(&self, key: &str) -> Option<&(dyn Any + Send + Sync)> {
        self.params.get(key)
    }

    /// Typed read of a param; `None` when absent or of another type.
    pub fn param_as<V: Any>(&self, key: &str) -> Option<&V> {
        self.params.get(key)?.downcast_ref::<V>()
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Any + Send + Sync) {
        self.params.insert(key, value);
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn respond(&mut self, response: impl IntoResponse) {
        self.response = Some(response.into_response());
    }

    pub fn json<B: Serialize>(&mut self, status: StatusCode, body: &B) {
        self.respond((status, Json(body)));
    }

    pub fn text(&mut self, status: StatusCode, body: impl Into<String>) {
        self.respond((status, body.into()));
    }

    /// Stop the chain with a bare status.
    pub fn abort(&mut self, status: StatusCode) {
        self.respond(status);
    }

    pub fn is_responded(&self) -> bool {
        self.response.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn context(builder: axum::http::request::Builder) -> Context<()> {
        let (parts, _) = builder.body(()).unwrap().into_parts();
        Context::new(parts, ())
    }

    #[test]
    fn test_request_facts() {
        let ctx = context(
            Request::builder()
                .method(Method::POST)
                .uri("http://example.com/users/7?verbose=1&verbose=2")
                .header("X-Trace", "abc"),
        );
        assert_eq!(ctx.method(), Method::POST);
        // No matched pattern outside the router.
        assert_eq!(ctx.path(), "/users/7");
        assert_eq!(ctx.raw_path(), "/users/7");
        assert_eq!(ctx.header("x-trace"), Some("abc"));
        assert_eq!(ctx.headers().len(), 1);
        assert_eq!(ctx.header("missing"), None);
        assert_eq!(ctx.query("verbose").as_deref(), Some("1"));
    }

    #[test]
    fn test_client_ip_precedence() {
        let ctx = context(
            Request::builder()
                .header("X-Forwarded-For", "203.0.113.5, 10.0.0.1")
                .header("X-Real-IP", "198.51.100.2"),
        );
        assert_eq!(ctx.client_ip(), Some("203.0.113.5".parse().unwrap()));

        let ctx = context(Request::builder().header("X-Real-IP", "198.51.100.2"));
        assert_eq!(ctx.client_ip(), Some("198.51.100.2".parse().unwrap()));

        let mut req = Request::builder().body(()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("192.0.2.9:4000".parse::<SocketAddr>().unwrap()));
        let ctx = Context::new(req.into_parts().0, ());
        assert_eq!(ctx.client_ip(), Some("192.0.2.9".parse().unwrap()));
    }

    #[test]
    fn test_params_survive_into_parts() {
        let mut ctx = context(Request::builder());
        ctx.set_param("user_id", 42u64);
        assert_eq!(ctx.param_as::<u64>("user_id"), Some(&42));
        assert_eq!(ctx.param_as::<String>("user_id"), None);

        let (parts, response) = ctx.into_parts();
        assert!(response.is_none());

        let ctx = Context::new(parts, ());
        assert!(ctx.param("user_id").is_some());
        assert!(ctx.params().contains("user_id"));
        assert!(!ctx.params().contains("session"));
        assert_eq!(ctx.params().len(), 1);
    }

    #[test]
    fn test_abort_sets_response() {
        let mut ctx = context(Request::builder());
        assert!(!ctx.is_responded());
        ctx.abort(StatusCode::UNAUTHORIZED);
        let (_, response) = ctx.into_parts();
        assert_eq!(response.unwrap().status(), StatusCode::UNAUTHORIZED);
    }
}
