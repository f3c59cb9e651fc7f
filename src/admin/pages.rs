use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tera::Context;

use super::{AdminResource, AdminState, AdminUser, FormParams, PropertyDescriptor, Record};
use crate::errors::AppError;

const PER_PAGE: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

#[derive(Serialize)]
struct ResourceLink<'a> {
    id: &'a str,
    label: &'a str,
}

#[derive(Serialize)]
struct ResourceSummary<'a> {
    id: &'a str,
    label: &'a str,
    count: i64,
}

#[derive(Serialize)]
struct Row {
    id: String,
    cells: Vec<String>,
}

#[derive(Serialize)]
struct FormField<'a> {
    name: &'a str,
    label: &'a str,
    kind: super::PropertyKind,
    required: bool,
    value: String,
}

#[derive(Serialize)]
struct ShownField<'a> {
    label: &'a str,
    value: String,
}

fn display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn base_context(state: &AdminState, user: &AdminUser) -> Context {
    let links: Vec<ResourceLink<'_>> = state
        .registry
        .resources()
        .iter()
        .map(|r| ResourceLink {
            id: r.id(),
            label: r.label(),
        })
        .collect();

    let mut context = Context::new();
    context.insert("root_path", state.registry.root_path());
    context.insert("resources", &links);
    context.insert("user", &user.email);
    context
}

fn resource_context(
    state: &AdminState,
    user: &AdminUser,
    resource: &dyn AdminResource,
) -> Context {
    let mut context = base_context(state, user);
    context.insert(
        "resource",
        &ResourceLink {
            id: resource.id(),
            label: resource.label(),
        },
    );
    context
}

fn lookup(state: &AdminState, id: &str) -> Result<Arc<dyn AdminResource>, AppError> {
    state
        .registry
        .resource(id)
        .cloned()
        .ok_or_else(|| AppError::UnknownResource(id.to_string()))
}

fn record_id(resource: &dyn AdminResource, record: &Record) -> String {
    resource
        .properties()
        .iter()
        .find(|p| p.kind == super::PropertyKind::Id)
        .map(|p| display(record.get(p.name)))
        .unwrap_or_default()
}

fn form_fields<'a>(properties: &'a [PropertyDescriptor], values: &FormParams) -> Vec<FormField<'a>> {
    properties
        .iter()
        .filter(|p| p.editable)
        .map(|p| FormField {
            name: p.name,
            label: p.label,
            kind: p.kind,
            required: p.required,
            value: values.get(p.name).cloned().unwrap_or_default(),
        })
        .collect()
}

fn record_to_params(record: &Record) -> FormParams {
    record
        .iter()
        .map(|(k, v)| (k.clone(), display(Some(v))))
        .collect()
}

fn record_path(state: &AdminState, resource: &dyn AdminResource, id: &str) -> String {
    format!(
        "{}/resources/{}/records/{}",
        state.registry.root_path(),
        resource.id(),
        id
    )
}

#[allow(clippy::too_many_arguments)]
fn render_form(
    state: &AdminState,
    user: &AdminUser,
    resource: &dyn AdminResource,
    heading: &str,
    action: &str,
    values: &FormParams,
    error: Option<String>,
    status: StatusCode,
) -> Response {
    let mut context = resource_context(state, user, resource);
    context.insert("heading", heading);
    context.insert("action", action);
    context.insert("fields", &form_fields(resource.properties(), values));
    context.insert("error", &error);

    match state.registry.templates().render("admin/form.html", &context) {
        Ok(page) => (status, page).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn dashboard(
    State(state): State<AdminState>,
    Extension(user): Extension<AdminUser>,
) -> Result<Html<String>, AppError> {
    let mut counts = Vec::with_capacity(state.registry.resources().len());
    for resource in state.registry.resources() {
        counts.push(resource.count().await?);
    }

    let summaries: Vec<ResourceSummary<'_>> = state
        .registry
        .resources()
        .iter()
        .zip(counts)
        .map(|(r, count)| ResourceSummary {
            id: r.id(),
            label: r.label(),
            count,
        })
        .collect();

    let mut context = base_context(&state, &user);
    context.insert("summaries", &summaries);
    state.registry.templates().render("admin/dashboard.html", &context)
}

pub async fn list(
    State(state): State<AdminState>,
    Extension(user): Extension<AdminUser>,
    Path(resource_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let resource = lookup(&state, &resource_id)?;

    let total = resource.count().await?;
    let pages = ((total + PER_PAGE - 1) / PER_PAGE).max(1);
    let page = query.page.unwrap_or(1).clamp(1, pages);
    let records = resource.list(PER_PAGE, (page - 1) * PER_PAGE).await?;

    let columns: Vec<&PropertyDescriptor> =
        resource.properties().iter().filter(|p| p.listed).collect();
    let rows: Vec<Row> = records
        .iter()
        .map(|record| Row {
            id: record_id(resource.as_ref(), record),
            cells: columns.iter().map(|c| display(record.get(c.name))).collect(),
        })
        .collect();

    let mut context = resource_context(&state, &user, resource.as_ref());
    context.insert("columns", &columns);
    context.insert("rows", &rows);
    context.insert("total", &total);
    context.insert("page", &page);
    context.insert("pages", &pages);
    state.registry.templates().render("admin/list.html", &context)
}

pub async fn new_record(
    State(state): State<AdminState>,
    Extension(user): Extension<AdminUser>,
    Path(resource_id): Path<String>,
) -> Result<Response, AppError> {
    let resource = lookup(&state, &resource_id)?;
    let action = format!("{}/resources/{}", state.registry.root_path(), resource.id());
    let heading = format!("New {}", resource.label());
    Ok(render_form(
        &state,
        &user,
        resource.as_ref(),
        &heading,
        &action,
        &FormParams::new(),
        None,
        StatusCode::OK,
    ))
}

pub async fn create(
    State(state): State<AdminState>,
    Extension(user): Extension<AdminUser>,
    Path(resource_id): Path<String>,
    Form(params): Form<FormParams>,
) -> Result<Response, AppError> {
    let resource = lookup(&state, &resource_id)?;

    match resource.create(&params).await {
        Ok(record) => {
            let id = record_id(resource.as_ref(), &record);
            tracing::info!(resource = %resource.id(), id = %id, admin = %user.email, "Record created");
            Ok(Redirect::to(&record_path(&state, resource.as_ref(), &id)).into_response())
        }
        Err(AppError::Validation(message)) => {
            let action = format!("{}/resources/{}", state.registry.root_path(), resource.id());
            let heading = format!("New {}", resource.label());
            Ok(render_form(
                &state,
                &user,
                resource.as_ref(),
                &heading,
                &action,
                &params,
                Some(message),
                StatusCode::UNPROCESSABLE_ENTITY,
            ))
        }
        Err(e) => Err(e),
    }
}

pub async fn show(
    State(state): State<AdminState>,
    Extension(user): Extension<AdminUser>,
    Path((resource_id, id)): Path<(String, String)>,
) -> Result<Html<String>, AppError> {
    let resource = lookup(&state, &resource_id)?;
    let record = resource
        .find(&id)
        .await?
        .ok_or_else(|| AppError::not_found(resource.label(), &id))?;

    let fields: Vec<ShownField<'_>> = resource
        .properties()
        .iter()
        .map(|p| ShownField {
            label: p.label,
            value: display(record.get(p.name)),
        })
        .collect();

    let mut context = resource_context(&state, &user, resource.as_ref());
    context.insert("record_id", &id);
    context.insert("fields", &fields);
    state.registry.templates().render("admin/show.html", &context)
}

pub async fn edit(
    State(state): State<AdminState>,
    Extension(user): Extension<AdminUser>,
    Path((resource_id, id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let resource = lookup(&state, &resource_id)?;
    let record = resource
        .find(&id)
        .await?
        .ok_or_else(|| AppError::not_found(resource.label(), &id))?;

    let action = format!("{}/edit", record_path(&state, resource.as_ref(), &id));
    let heading = format!("Edit {} #{}", resource.label(), id);
    Ok(render_form(
        &state,
        &user,
        resource.as_ref(),
        &heading,
        &action,
        &record_to_params(&record),
        None,
        StatusCode::OK,
    ))
}

pub async fn update(
    State(state): State<AdminState>,
    Extension(user): Extension<AdminUser>,
    Path((resource_id, id)): Path<(String, String)>,
    Form(params): Form<FormParams>,
) -> Result<Response, AppError> {
    let resource = lookup(&state, &resource_id)?;

    match resource.update(&id, &params).await {
        Ok(Some(_)) => {
            tracing::info!(resource = %resource.id(), id = %id, admin = %user.email, "Record updated");
            Ok(Redirect::to(&record_path(&state, resource.as_ref(), &id)).into_response())
        }
        Ok(None) => Err(AppError::not_found(resource.label(), &id)),
        Err(AppError::Validation(message)) => {
            let action = format!("{}/edit", record_path(&state, resource.as_ref(), &id));
            let heading = format!("Edit {} #{}", resource.label(), id);
            Ok(render_form(
                &state,
                &user,
                resource.as_ref(),
                &heading,
                &action,
                &params,
                Some(message),
                StatusCode::UNPROCESSABLE_ENTITY,
            ))
        }
        Err(e) => Err(e),
    }
}

pub async fn delete(
    State(state): State<AdminState>,
    Extension(user): Extension<AdminUser>,
    Path((resource_id, id)): Path<(String, String)>,
) -> Result<Redirect, AppError> {
    let resource = lookup(&state, &resource_id)?;
    if !resource.delete(&id).await? {
        return Err(AppError::not_found(resource.label(), &id));
    }
    tracing::info!(resource = %resource.id(), id = %id, admin = %user.email, "Record deleted");
    Ok(Redirect::to(&format!(
        "{}/resources/{}",
        state.registry.root_path(),
        resource.id()
    )))
}
