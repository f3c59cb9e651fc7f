use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::repository::DbError;

/// Failures raised while wiring the full application.
///
/// None of these escape the builder; each one is logged and turned into
/// `Degraded(InitializationFailed)`.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Database initialization failed")]
    Database {
        #[from]
        source: DbError,
    },

    #[error("Bootstrap did not finish within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("COOKIE_SECRET is required in production")]
    MissingCookieSecret,

    #[error("COOKIE_SECRET must be at least {min_len} bytes in production")]
    InsecureCookieSecret { min_len: usize },

    #[error("Admin panel initialization failed: {reason}")]
    Admin { reason: String },
}

impl BootstrapError {
    /// Short label of the bootstrap step that failed, for structured logs.
    pub fn step(&self) -> &'static str {
        match self {
            BootstrapError::Database { .. } => "database",
            BootstrapError::Timeout { .. } => "timeout",
            BootstrapError::MissingCookieSecret | BootstrapError::InsecureCookieSecret { .. } => {
                "cookie_secret"
            }
            BootstrapError::Admin { .. } => "admin",
        }
    }
}

/// Request-time errors surfaced by the REST API and the admin panel.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{resource} with id {id} not found")]
    NotFound { resource: String, id: String },

    #[error("Unknown admin resource: {0}")]
    UnknownResource(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Database error")]
    Database {
        #[from]
        source: DbError,
    },

    #[error("Template rendering failed")]
    Template {
        #[from]
        source: tera::Error,
    },

    #[error("Internal server error: {context}")]
    Internal { context: String },
}

impl AppError {
    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn internal(context: impl Into<String>) -> Self {
        Self::Internal {
            context: context.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } | AppError::UnknownResource(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Database {
                source: DbError::Unavailable(_),
            } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database { .. } | AppError::Template { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "invalid_input",
            AppError::NotFound { .. } => "not_found",
            AppError::UnknownResource(_) => "unknown_resource",
            AppError::Unauthorized => "unauthorized",
            AppError::Database { .. } => "database_error",
            AppError::Template { .. } => "template_error",
            AppError::Internal { .. } => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}
