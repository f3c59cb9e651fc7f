#![allow(clippy::needless_for_each)]

use axum::{response::Html, routing::get, Json, Router};
use serde::Serialize;
use std::sync::OnceLock;
use utoipa::{
    openapi::{PathItemType, RefOr},
    OpenApi,
};

use crate::errors::AppError;
use crate::models::{CreateMaterialRequest, Material, MaterialPage, UpdateMaterialRequest};

pub const DOCS_PATH: &str = "/api-docs";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Materials Admin API",
        version = "1.0.0",
        description = "CRUD API over materials, served next to the admin panel",
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        crate::dispatcher::health,
        crate::dispatcher::root_status,
        crate::api::handlers::list_materials,
        crate::api::handlers::create_material,
        crate::api::handlers::get_material,
        crate::api::handlers::update_material,
        crate::api::handlers::delete_material,
    ),
    components(
        schemas(
            Material,
            MaterialPage,
            CreateMaterialRequest,
            UpdateMaterialRequest,
            StatusResponse,
            ErrorResponse,
            ErrorDetails,
        )
    ),
    tags(
        (name = "materials", description = "Material CRUD operations"),
        (name = "status", description = "Health and bootstrap state")
    )
)]
pub struct ApiDoc;

/// Body of `GET /` in every bootstrap state.
#[derive(Debug, Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct StatusResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "DATABASE_URL not configured")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "initialization_failed")]
    pub error: Option<String>,
}

#[derive(serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorDetails {
    #[schema(example = "invalid_input")]
    pub r#type: String,
    #[schema(example = "Invalid input: Name cannot be empty")]
    pub message: String,
    #[schema(example = 400)]
    pub status: u16,
}

#[derive(Serialize)]
struct OperationSummary {
    method: &'static str,
    path: String,
    summary: Option<String>,
    responses: Vec<String>,
}

fn method_name(method: &PathItemType) -> &'static str {
    match method {
        PathItemType::Get => "get",
        PathItemType::Post => "post",
        PathItemType::Put => "put",
        PathItemType::Delete => "delete",
        PathItemType::Options => "options",
        PathItemType::Head => "head",
        PathItemType::Patch => "patch",
        PathItemType::Trace => "trace",
        PathItemType::Connect => "connect",
        #[allow(unreachable_patterns)]
        _ => "other",
    }
}

fn operations(doc: &utoipa::openapi::OpenApi) -> Vec<OperationSummary> {
    doc.paths
        .paths
        .iter()
        .flat_map(|(path, item)| {
            item.operations.iter().map(move |(method, op)| OperationSummary {
                method: method_name(method),
                path: path.clone(),
                summary: op.summary.clone().or_else(|| op.description.clone()),
                responses: op
                    .responses
                    .responses
                    .iter()
                    .map(|(status, response)| match response {
                        RefOr::T(r) => format!("{} {}", status, r.description),
                        RefOr::Ref(_) => status.clone(),
                    })
                    .collect(),
            })
        })
        .collect()
}

fn render_docs_page(doc: &utoipa::openapi::OpenApi) -> Result<Html<String>, AppError> {
    let mut context = tera::Context::new();
    context.insert("title", &doc.info.title);
    context.insert("version", &doc.info.version);
    context.insert("description", &doc.info.description);
    context.insert("spec_url", &format!("{DOCS_PATH}/openapi.json"));
    context.insert("operations", &operations(doc));

    let page = tera::Tera::one_off(include_str!("../templates/api_docs.html"), &context, true)?;
    Ok(Html(page))
}

fn api_doc() -> &'static utoipa::openapi::OpenApi {
    static DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();
    DOC.get_or_init(ApiDoc::openapi)
}

async fn docs_page() -> Result<Html<String>, AppError> {
    render_docs_page(api_doc())
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(api_doc().clone())
}

/// Documentation routes, mounted regardless of bootstrap state.
pub fn router() -> Router {
    Router::new()
        .route(DOCS_PATH, get(docs_page))
        .route(&format!("{DOCS_PATH}/openapi.json"), get(openapi_json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_material_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/materials"));
        assert!(doc.paths.paths.contains_key("/api/v1/materials/{id}"));
        assert!(doc.paths.paths.contains_key("/health"));
    }

    #[test]
    fn docs_page_renders_every_operation() {
        let doc = ApiDoc::openapi();
        let Html(page) = render_docs_page(&doc).unwrap();
        assert!(page.contains("Materials Admin API"));
        assert!(page.contains("/api/v1/materials/{id}"));
        assert_eq!(page.matches("class=\"method\"").count(), operations(&doc).len());
    }
}
