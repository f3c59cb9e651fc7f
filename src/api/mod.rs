//! Versioned REST route group.

pub mod handlers;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::repository::MaterialRepository;

pub const API_PREFIX: &str = "/api/v1";

#[derive(Clone)]
pub struct ApiState {
    pub repository: Arc<dyn MaterialRepository>,
}

pub fn router(repository: Arc<dyn MaterialRepository>) -> Router {
    let routes = Router::new()
        .route(
            "/materials",
            get(handlers::list_materials).post(handlers::create_material),
        )
        .route(
            "/materials/:id",
            get(handlers::get_material)
                .put(handlers::update_material)
                .delete(handlers::delete_material),
        )
        .with_state(ApiState { repository });

    Router::new().nest(API_PREFIX, routes)
}
