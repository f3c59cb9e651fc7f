//! Per-process request dispatcher.
//!
//! The dispatcher owns the always-mounted shell (health, root status, docs,
//! CORS, tracing, request ids) and a set-once slot holding the bootstrap
//! outcome. The first request, or [`Dispatcher::warm_up`], starts the build on
//! a spawned task; every later caller awaits the same shared future.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::json;
use std::sync::{Arc, OnceLock};
use tower::ServiceExt;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::bootstrap::{ApplicationBuilder, BootstrapOutcome, DegradedReason};
use crate::config::EnvironmentConfig;
use crate::documentation::{self, StatusResponse};

type SharedOutcome = Shared<BoxFuture<'static, BootstrapOutcome>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    NotStarted,
    Building,
    Ready,
    Degraded(DegradedReason),
}

#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    builder: ApplicationBuilder,
    env: EnvironmentConfig,
    slot: OnceLock<SharedOutcome>,
}

impl Dispatcher {
    pub fn new(builder: ApplicationBuilder, env: EnvironmentConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                builder,
                env,
                slot: OnceLock::new(),
            }),
        }
    }

    /// Postgres-backed dispatcher configured from the process environment.
    pub fn from_env() -> Self {
        Self::new(ApplicationBuilder::postgres(), EnvironmentConfig::from_env())
    }

    pub fn env(&self) -> &EnvironmentConfig {
        &self.inner.env
    }

    /// Current bootstrap state. Never starts a build.
    pub fn state(&self) -> BootstrapState {
        let Some(shared) = self.inner.slot.get() else {
            return BootstrapState::NotStarted;
        };
        match shared.peek() {
            None => BootstrapState::Building,
            Some(BootstrapOutcome::Ready(_)) => BootstrapState::Ready,
            Some(BootstrapOutcome::Degraded(reason)) => BootstrapState::Degraded(*reason),
        }
    }

    /// Start the build without waiting for a request.
    pub fn warm_up(&self) {
        let _ = self.start();
    }

    /// Bootstrap outcome, starting the build if no caller has yet.
    pub async fn outcome(&self) -> BootstrapOutcome {
        self.start().await
    }

    pub async fn handle(&self, request: Request<Body>) -> Response {
        match self.router().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(root_status))
            .route("/health", get(health))
            .fallback(forward)
            .with_state(self.clone())
            .merge(documentation::router())
            .layer(CatchPanicLayer::new())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(cors_layer(&self.inner.env.allowed_origins))
            .layer(TraceLayer::new_for_http())
    }

    fn start(&self) -> SharedOutcome {
        self.inner
            .slot
            .get_or_init(|| {
                info!("Starting application bootstrap");
                let inner = Arc::clone(&self.inner);
                let task = tokio::spawn(async move { inner.builder.build(&inner.env).await });

                let shared = async move {
                    task.await.unwrap_or_else(|e| {
                        error!(error = %e, "Bootstrap task aborted; entering degraded mode");
                        BootstrapOutcome::Degraded(DegradedReason::InitializationFailed)
                    })
                }
                .boxed()
                .shared();

                // Drive the shared future so state() sees completion even when
                // no request is waiting on it.
                tokio::spawn(shared.clone());
                shared
            })
            .clone()
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    tag = "status",
    responses(
        (status = 200, description = "Process is serving requests", body = String),
        (status = 503, description = "Application initialization failed", body = String)
    )
)]
pub async fn health(State(dispatcher): State<Dispatcher>) -> (StatusCode, &'static str) {
    match dispatcher.state() {
        BootstrapState::Degraded(DegradedReason::InitializationFailed) => {
            (StatusCode::SERVICE_UNAVAILABLE, "error")
        }
        _ => (StatusCode::OK, "ok"),
    }
}

/// Bootstrap state of the application.
#[utoipa::path(
    get,
    path = "/",
    tag = "status",
    responses(
        (status = 200, description = "Ready, or running without DATABASE_URL", body = StatusResponse),
        (status = 500, description = "Initialization failed", body = StatusResponse)
    )
)]
pub async fn root_status(State(dispatcher): State<Dispatcher>) -> Response {
    match dispatcher.outcome().await {
        BootstrapOutcome::Ready(_) => Json(StatusResponse {
            ok: true,
            status: Some("ready".to_string()),
            warning: None,
            error: None,
        })
        .into_response(),
        BootstrapOutcome::Degraded(reason) => degraded_response(reason, None),
    }
}

async fn forward(State(dispatcher): State<Dispatcher>, request: Request) -> Response {
    match dispatcher.outcome().await {
        BootstrapOutcome::Ready(app) => app.dispatch(request).await,
        BootstrapOutcome::Degraded(reason) => {
            degraded_response(reason, Some(request.uri().path()))
        }
    }
}

fn degraded_response(reason: DegradedReason, path: Option<&str>) -> Response {
    let mut body = json!({ "ok": false });
    match reason {
        DegradedReason::MissingDatabaseConfig => {
            body["warning"] = json!("DATABASE_URL not configured");
        }
        DegradedReason::InitializationFailed => {
            body["error"] = json!(reason.code());
        }
    }
    if let Some(path) = path {
        body["path"] = json!(path);
    }

    let bytes = match serde_json::to_vec(&body) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "Failed to serialize degraded response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    Response::builder()
        .status(reason.status_code())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .unwrap_or_else(|e| {
            error!(error = %e, "Failed to build degraded response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

static GLOBAL: OnceLock<Dispatcher> = OnceLock::new();

/// Process-wide dispatcher, configured from the environment on first use.
pub fn global() -> &'static Dispatcher {
    GLOBAL.get_or_init(Dispatcher::from_env)
}

/// Entry point for hosts that hand over one request at a time.
pub async fn handle(request: Request<Body>) -> Response {
    global().handle(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> EnvironmentConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvironmentConfig::from_lookup(|key| vars.get(key).cloned())
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn degraded_body_for_missing_config() {
        let response = degraded_response(DegradedReason::MissingDatabaseConfig, None);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "ok": false, "warning": "DATABASE_URL not configured" })
        );
    }

    #[tokio::test]
    async fn degraded_body_echoes_path() {
        let response =
            degraded_response(DegradedReason::InitializationFailed, Some("/admin/login"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({ "ok": false, "error": "initialization_failed", "path": "/admin/login" })
        );
    }

    #[tokio::test]
    async fn state_is_not_started_until_first_use() {
        let dispatcher = Dispatcher::new(ApplicationBuilder::postgres(), env(&[]));
        assert_eq!(dispatcher.state(), BootstrapState::NotStarted);

        let outcome = dispatcher.outcome().await;
        assert_eq!(
            outcome.degraded_reason(),
            Some(DegradedReason::MissingDatabaseConfig)
        );
        assert_eq!(
            dispatcher.state(),
            BootstrapState::Degraded(DegradedReason::MissingDatabaseConfig)
        );
    }

    #[test]
    fn invalid_origins_are_skipped() {
        let _ = cors_layer(&["https://ok.example".to_string(), "bad\norigin".to_string()]);
    }
}
