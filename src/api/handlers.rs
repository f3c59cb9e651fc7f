use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::ApiState;
use crate::documentation::ErrorResponse;
use crate::errors::AppError;
use crate::models::{CreateMaterialRequest, ListParams, Material, MaterialPage, UpdateMaterialRequest};

fn json_body<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

fn material_id(result: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    result
        .map(|Path(id)| id)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

fn list_params(result: Result<Query<ListParams>, QueryRejection>) -> Result<ListParams, AppError> {
    result
        .map(|Query(params)| params)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

#[utoipa::path(
    get,
    path = "/api/v1/materials",
    tag = "materials",
    params(ListParams),
    responses(
        (status = 200, description = "Page of materials ordered by id", body = MaterialPage),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_materials(
    State(state): State<ApiState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<MaterialPage>, AppError> {
    let (limit, offset) = list_params(params)?.normalized();
    let data = state.repository.list(limit, offset).await?;
    let total = state.repository.count().await?;
    Ok(Json(MaterialPage {
        data,
        total,
        limit,
        offset,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/materials",
    tag = "materials",
    request_body = CreateMaterialRequest,
    responses(
        (status = 201, description = "Material created", body = Material),
        (status = 400, description = "Invalid request body", body = ErrorResponse)
    )
)]
pub async fn create_material(
    State(state): State<ApiState>,
    body: Result<Json<CreateMaterialRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = json_body(body)?;
    let material = request.validate().map_err(AppError::Validation)?;
    let created = state.repository.create(material).await?;
    tracing::info!(id = created.id, "Material created");
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/materials/{id}",
    tag = "materials",
    params(("id" = i64, Path, description = "Material id")),
    responses(
        (status = 200, description = "Material found", body = Material),
        (status = 404, description = "No material with that id", body = ErrorResponse)
    )
)]
pub async fn get_material(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Material>, AppError> {
    let id = material_id(id)?;
    state
        .repository
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Material", id))
}

#[utoipa::path(
    put,
    path = "/api/v1/materials/{id}",
    tag = "materials",
    params(("id" = i64, Path, description = "Material id")),
    request_body = UpdateMaterialRequest,
    responses(
        (status = 200, description = "Material updated", body = Material),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 404, description = "No material with that id", body = ErrorResponse)
    )
)]
pub async fn update_material(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateMaterialRequest>, JsonRejection>,
) -> Result<Json<Material>, AppError> {
    let id = material_id(id)?;
    let request = json_body(body)?;
    let update = request.validate().map_err(AppError::Validation)?;
    if update.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }
    state
        .repository
        .update(id, update)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Material", id))
}

#[utoipa::path(
    delete,
    path = "/api/v1/materials/{id}",
    tag = "materials",
    params(("id" = i64, Path, description = "Material id")),
    responses(
        (status = 204, description = "Material deleted"),
        (status = 404, description = "No material with that id", body = ErrorResponse)
    )
)]
pub async fn delete_material(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = material_id(id)?;
    if state.repository.delete(id).await? {
        tracing::info!(id, "Material deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Material", id))
    }
}
