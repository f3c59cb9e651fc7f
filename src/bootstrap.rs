//! One-shot construction of the full application.
//!
//! [`ApplicationBuilder::build`] never fails outward: a missing database
//! configuration or any wiring error yields a [`BootstrapOutcome::Degraded`]
//! so the process can keep answering requests.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use std::error::Error as _;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, info};

use crate::admin::{
    self, AdminState, AuthProvider, DefaultAuthProvider, MaterialResource, ResourceRegistry,
    DEFAULT_ROOT_PATH,
};
use crate::api;
use crate::config::EnvironmentConfig;
use crate::db::{ConnectionSettings, DatabaseConnector, PgConnector};
use crate::errors::{AppError, BootstrapError};
use crate::session::{SessionSigner, DEFAULT_SESSION_TTL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradedReason {
    MissingDatabaseConfig,
    InitializationFailed,
}

impl DegradedReason {
    pub fn code(self) -> &'static str {
        match self {
            DegradedReason::MissingDatabaseConfig => "missing_database_config",
            DegradedReason::InitializationFailed => "initialization_failed",
        }
    }

    /// Missing configuration is an expected deployment state; a failed
    /// initialization is a server error.
    pub fn status_code(self) -> StatusCode {
        match self {
            DegradedReason::MissingDatabaseConfig => StatusCode::OK,
            DegradedReason::InitializationFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The fully wired application.
#[derive(Clone)]
pub struct AppHandle {
    router: Router,
}

impl AppHandle {
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}

#[derive(Clone)]
pub enum BootstrapOutcome {
    Ready(AppHandle),
    Degraded(DegradedReason),
}

impl BootstrapOutcome {
    pub fn degraded_reason(&self) -> Option<DegradedReason> {
        match self {
            BootstrapOutcome::Ready(_) => None,
            BootstrapOutcome::Degraded(reason) => Some(*reason),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, BootstrapOutcome::Ready(_))
    }
}

impl std::fmt::Debug for BootstrapOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapOutcome::Ready(_) => f.write_str("Ready"),
            BootstrapOutcome::Degraded(reason) => write!(f, "Degraded({})", reason.code()),
        }
    }
}

pub struct ApplicationBuilder {
    connector: Arc<dyn DatabaseConnector>,
    auth: Option<Arc<dyn AuthProvider>>,
}

impl ApplicationBuilder {
    pub fn new(connector: Arc<dyn DatabaseConnector>) -> Self {
        Self {
            connector,
            auth: None,
        }
    }

    pub fn postgres() -> Self {
        Self::new(Arc::new(PgConnector))
    }

    /// Replace the credential check built from `ADMIN_EMAIL`/`ADMIN_PASSWORD`.
    pub fn with_auth_provider(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(provider);
        self
    }

    pub async fn build(&self, env: &EnvironmentConfig) -> BootstrapOutcome {
        let Some(database_url) = env.database_url.as_deref() else {
            info!("DATABASE_URL not configured; serving health and status endpoints only");
            return BootstrapOutcome::Degraded(DegradedReason::MissingDatabaseConfig);
        };

        let timeout = env.bootstrap_timeout;
        let wired = match tokio::time::timeout(timeout, self.wire(database_url, env)).await {
            Ok(result) => result,
            Err(_) => Err(BootstrapError::Timeout {
                seconds: timeout.as_secs(),
            }),
        };

        match wired {
            Ok(router) => {
                info!(mode = ?env.mode, "Application bootstrap complete");
                BootstrapOutcome::Ready(AppHandle { router })
            }
            Err(e) => {
                error!(
                    step = e.step(),
                    error = %error_chain(&e),
                    "Application bootstrap failed; entering degraded mode"
                );
                BootstrapOutcome::Degraded(DegradedReason::InitializationFailed)
            }
        }
    }

    async fn wire(
        &self,
        database_url: &str,
        env: &EnvironmentConfig,
    ) -> Result<Router, BootstrapError> {
        let settings = ConnectionSettings {
            max_connections: env.database_max_connections,
            acquire_timeout: env.bootstrap_timeout,
        };
        let repository = self.connector.connect(database_url, &settings).await?;

        let registry = ResourceRegistry::new(DEFAULT_ROOT_PATH)
            .register(Arc::new(MaterialResource::new(Arc::clone(&repository))));
        if env.mode.is_production() {
            registry.initialize()?;
        } else {
            registry.watch()?;
        }

        let secret = env.resolve_cookie_secret()?;
        let auth = self.auth.clone().unwrap_or_else(|| {
            Arc::new(DefaultAuthProvider::new(
                env.admin_email.clone(),
                env.admin_password.clone(),
            ))
        });
        let admin = admin::router(AdminState {
            registry: Arc::new(registry),
            auth,
            signer: SessionSigner::new(&secret, DEFAULT_SESSION_TTL),
            secure_cookies: env.mode.is_production(),
        });

        Ok(Router::new()
            .merge(admin)
            .merge(api::router(repository))
            .fallback(not_found)
            .layer(CatchPanicLayer::new()))
    }
}

async fn not_found(request: Request<Body>) -> AppError {
    AppError::not_found("Route", request.uri().path())
}

fn error_chain(error: &BootstrapError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
