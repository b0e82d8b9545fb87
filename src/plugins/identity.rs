//! Caller identity from a request header.
//!
//! Installs a global middleware that stores the header value under
//! [`USER_ID_PARAM`]. Handlers read it through [`IdentityExt`] instead of
//! the untyped param bag.

use axum::http::StatusCode;

use crate::error::Result;
use crate::http::Context;
use crate::lifecycle::{Engine, Plugin};

pub const PLUGIN_ID: &str = "identity";

/// Param key holding a [`UserId`].
pub const USER_ID_PARAM: &str = "identity.user_id";

#[derive(Debug, Clone)]
pub struct IdentityOptions {
    pub header: String,
    /// Reject requests without the header with `401`.
    pub require: bool,
}

impl Default for IdentityOptions {
    fn default() -> Self {
        Self {
            header: "X-User-Id".to_string(),
            require: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

/// Typed access to the identity param.
pub trait IdentityExt {
    fn user_id(&self) -> Option<&str>;
}

impl<T> IdentityExt for Context<T> {
    fn user_id(&self) -> Option<&str> {
        self.param_as::<UserId>(USER_ID_PARAM).map(|u| u.0.as_str())
    }
}

pub struct Identity;

impl Plugin for Identity {
    const ID: &'static str = PLUGIN_ID;
    type Options = IdentityOptions;

    fn install(engine: &mut Engine, options: &IdentityOptions) -> Result<()> {
        let IdentityOptions { header, require } = options.clone();

        engine.append_middleware(move |ctx| {
            let user = ctx
                .header(&header)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string);

            match user {
                Some(user) => ctx.set_param(USER_ID_PARAM, UserId(user)),
                None if require => {
                    tracing::warn!(path = %ctx.path(), header = %header, "Missing identity header");
                    ctx.text(StatusCode::UNAUTHORIZED, format!("Missing {} header", header));
                }
                None => {}
            }
        });
        Ok(())
    }
}
