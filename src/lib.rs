#![forbid(unsafe_code)]

pub mod admin;
pub mod api;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod documentation;
pub mod errors;
pub mod models;
pub mod repository;
pub mod session;

pub use bootstrap::{AppHandle, ApplicationBuilder, BootstrapOutcome, DegradedReason};
pub use config::{EnvironmentConfig, RuntimeMode};
pub use db::{ConnectionSettings, DatabaseConnector, PgConnector};
pub use dispatcher::{handle, BootstrapState, Dispatcher};
pub use errors::{AppError, BootstrapError};
pub use repository::{DbError, InMemoryMaterialRepository, MaterialRepository};
