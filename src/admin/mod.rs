//! Server-rendered admin panel.
//!
//! Resources register with a [`ResourceRegistry`], which introspects their
//! declared properties to render list, show and edit pages. Every page apart
//! from login is behind a signed session cookie.

mod auth;
mod pages;
mod resources;
mod templates;

use async_trait::async_trait;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::errors::{AppError, BootstrapError};
use crate::session::SessionSigner;

pub use auth::{AdminUser, AuthProvider, DefaultAuthProvider};
pub use resources::MaterialResource;
pub use templates::AdminTemplates;

pub const DEFAULT_ROOT_PATH: &str = "/admin";

/// A row as rendered by the admin pages, keyed by property name.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Submitted form fields, keyed by property name.
pub type FormParams = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Id,
    String,
    Text,
    Number,
    DateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: PropertyKind,
    pub required: bool,
    pub editable: bool,
    /// Shown as a column on the list page
    pub listed: bool,
}

#[async_trait]
pub trait AdminResource: Send + Sync {
    fn id(&self) -> &str;
    fn label(&self) -> &str;
    fn properties(&self) -> &[PropertyDescriptor];

    async fn count(&self) -> Result<i64, AppError>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Record>, AppError>;
    async fn find(&self, id: &str) -> Result<Option<Record>, AppError>;
    async fn create(&self, params: &FormParams) -> Result<Record, AppError>;
    async fn update(&self, id: &str, params: &FormParams) -> Result<Option<Record>, AppError>;
    async fn delete(&self, id: &str) -> Result<bool, AppError>;
}

pub struct ResourceRegistry {
    root_path: String,
    resources: Vec<Arc<dyn AdminResource>>,
    templates: AdminTemplates,
}

impl ResourceRegistry {
    pub fn new(root_path: impl Into<String>) -> Self {
        let root_path = root_path.into().trim_end_matches('/').to_string();
        Self {
            root_path,
            resources: Vec::new(),
            templates: AdminTemplates::new(),
        }
    }

    pub fn register(mut self, resource: Arc<dyn AdminResource>) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn resources(&self) -> &[Arc<dyn AdminResource>] {
        &self.resources
    }

    pub fn resource(&self, id: &str) -> Option<&Arc<dyn AdminResource>> {
        self.resources.iter().find(|r| r.id() == id)
    }

    pub fn templates(&self) -> &AdminTemplates {
        &self.templates
    }

    /// Validate every registered resource and compile the page templates now.
    pub fn initialize(&self) -> Result<(), BootstrapError> {
        self.validate()?;
        self.templates
            .compile()
            .map_err(|e| BootstrapError::Admin {
                reason: format!("template compilation failed: {e}"),
            })?;
        tracing::info!(resources = self.resources.len(), "Admin panel initialized");
        Ok(())
    }

    /// Validate resources but leave template compilation to the first render.
    pub fn watch(&self) -> Result<(), BootstrapError> {
        self.validate()?;
        tracing::debug!("Admin templates will compile on first render");
        Ok(())
    }

    fn validate(&self) -> Result<(), BootstrapError> {
        if !self.root_path.starts_with('/') || self.root_path.len() < 2 {
            return Err(BootstrapError::Admin {
                reason: format!("invalid root path '{}'", self.root_path),
            });
        }

        let mut seen = HashSet::new();
        for resource in &self.resources {
            if !seen.insert(resource.id().to_string()) {
                return Err(BootstrapError::Admin {
                    reason: format!("resource '{}' registered twice", resource.id()),
                });
            }
            let ids = resource
                .properties()
                .iter()
                .filter(|p| p.kind == PropertyKind::Id)
                .count();
            if ids != 1 {
                return Err(BootstrapError::Admin {
                    reason: format!(
                        "resource '{}' must declare exactly one id property, found {}",
                        resource.id(),
                        ids
                    ),
                });
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct AdminState {
    pub registry: Arc<ResourceRegistry>,
    pub auth: Arc<dyn AuthProvider>,
    pub signer: SessionSigner,
    pub secure_cookies: bool,
}

/// Build the authenticated admin router mounted under the registry root.
pub fn router(state: AdminState) -> Router {
    let root = state.registry.root_path().to_string();

    let protected = Router::new()
        .route(&root, get(pages::dashboard))
        .route(&format!("{root}/"), get(pages::dashboard))
        .route(
            &format!("{root}/resources/:resource"),
            get(pages::list).post(pages::create),
        )
        .route(&format!("{root}/resources/:resource/new"), get(pages::new_record))
        .route(&format!("{root}/resources/:resource/records/:id"), get(pages::show))
        .route(
            &format!("{root}/resources/:resource/records/:id/edit"),
            get(pages::edit).post(pages::update),
        )
        .route(
            &format!("{root}/resources/:resource/records/:id/delete"),
            post(pages::delete),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    Router::new()
        .route(&format!("{root}/login"), get(auth::login_page).post(auth::login))
        .route(&format!("{root}/logout"), get(auth::logout).post(auth::logout))
        .merge(protected)
        .with_state(state)
}
