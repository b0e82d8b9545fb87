//! Liveness endpoint.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use axum::http::StatusCode;
use serde::Serialize;

use crate::error::Result;
use crate::lifecycle::{Engine, Plugin};

pub const PLUGIN_ID: &str = "health";

#[derive(Debug, Clone)]
pub struct HealthOptions {
    /// Route path of the endpoint.
    pub path: String,
}

impl Default for HealthOptions {
    fn default() -> Self {
        Self {
            path: "/health".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

pub struct Health;

impl Plugin for Health {
    const ID: &'static str = PLUGIN_ID;
    type Options = HealthOptions;

    fn install(engine: &mut Engine, options: &HealthOptions) -> Result<()> {
        let started = Arc::new(OnceLock::new());

        let clock = started.clone();
        engine.append_init_func(move || {
            let _ = clock.set(Instant::now());
        });

        engine.get::<()>(&options.path, move |ctx| {
            let uptime_secs = started
                .get()
                .map(|t: &Instant| t.elapsed().as_secs())
                .unwrap_or(0);
            ctx.json(
                StatusCode::OK,
                &HealthStatus {
                    status: "ok",
                    version: env!("CARGO_PKG_VERSION"),
                    uptime_secs,
                },
            );
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_endpoint() {
        let mut engine = Engine::new();
        engine
            .install::<Health>(&HealthOptions {
                path: "/live".into(),
            })
            .unwrap();

        let router = engine.prepare().unwrap().into_router();
        let response = router
            .oneshot(Request::get("/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["uptime_secs"], 0);
    }
}
