//! `GET /whoami`, built on the identity plugin.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::binding::{FieldBinding, Payload};
use crate::error::Result;
use crate::lifecycle::{Engine, Plugin};
use crate::plugins::identity::{self, IdentityExt};

pub const PLUGIN_ID: &str = "whoami";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WhoAmIQuery {
    pub verbose: bool,
}

impl Payload for WhoAmIQuery {
    const BINDINGS: &'static [FieldBinding] = &[FieldBinding::form("verbose")];
}

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

pub struct WhoAmIPlugin;

impl Plugin for WhoAmIPlugin {
    const ID: &'static str = PLUGIN_ID;
    type Options = ();

    fn install(engine: &mut Engine, _: &()) -> Result<()> {
        engine.check_dependencies(&[identity::PLUGIN_ID])?;

        engine.get::<WhoAmIQuery>("/whoami", |ctx| {
            let Some(user_id) = ctx.user_id().map(str::to_string) else {
                ctx.abort(StatusCode::UNAUTHORIZED);
                return;
            };
            let verbose = ctx.request.verbose;
            let body = WhoAmI {
                user_id,
                client_ip: verbose
                    .then(|| ctx.client_ip().map(|ip| ip.to_string()))
                    .flatten(),
                path: verbose.then(|| ctx.path().to_string()),
            };
            ctx.json(StatusCode::OK, &body);
        });
        Ok(())
    }
}
