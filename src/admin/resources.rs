use async_trait::async_trait;
use std::sync::Arc;

use super::{AdminResource, FormParams, PropertyDescriptor, PropertyKind, Record};
use crate::errors::AppError;
use crate::models::{CreateMaterialRequest, Material, UpdateMaterialRequest};
use crate::repository::MaterialRepository;

const MATERIAL_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor {
        name: "id",
        label: "ID",
        kind: PropertyKind::Id,
        required: false,
        editable: false,
        listed: true,
    },
    PropertyDescriptor {
        name: "name",
        label: "Name",
        kind: PropertyKind::String,
        required: true,
        editable: true,
        listed: true,
    },
    PropertyDescriptor {
        name: "description",
        label: "Description",
        kind: PropertyKind::Text,
        required: false,
        editable: true,
        listed: false,
    },
    PropertyDescriptor {
        name: "quantity",
        label: "Quantity",
        kind: PropertyKind::Number,
        required: false,
        editable: true,
        listed: true,
    },
    PropertyDescriptor {
        name: "unit",
        label: "Unit",
        kind: PropertyKind::String,
        required: false,
        editable: true,
        listed: true,
    },
    PropertyDescriptor {
        name: "created_at",
        label: "Created",
        kind: PropertyKind::DateTime,
        required: false,
        editable: false,
        listed: false,
    },
    PropertyDescriptor {
        name: "updated_at",
        label: "Updated",
        kind: PropertyKind::DateTime,
        required: false,
        editable: false,
        listed: true,
    },
];

/// Admin view of the `materials` table.
pub struct MaterialResource {
    repository: Arc<dyn MaterialRepository>,
}

impl MaterialResource {
    pub fn new(repository: Arc<dyn MaterialRepository>) -> Self {
        Self { repository }
    }
}

fn to_record(material: Material) -> Result<Record, AppError> {
    match serde_json::to_value(material) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::internal("material did not serialize to an object")),
        Err(e) => Err(AppError::internal(format!("material serialization failed: {e}"))),
    }
}

fn parse_id(id: &str) -> Option<i64> {
    id.parse().ok()
}

fn field(params: &FormParams, name: &str) -> Option<String> {
    params.get(name).cloned()
}

fn parse_quantity(params: &FormParams) -> Result<Option<i32>, AppError> {
    match params.get("quantity").map(|q| q.trim()) {
        None | Some("") => Ok(None),
        Some(q) => q
            .parse()
            .map(Some)
            .map_err(|_| AppError::Validation("Quantity must be a whole number".to_string())),
    }
}

#[async_trait]
impl AdminResource for MaterialResource {
    fn id(&self) -> &str {
        "materials"
    }

    fn label(&self) -> &str {
        "Materials"
    }

    fn properties(&self) -> &[PropertyDescriptor] {
        MATERIAL_PROPERTIES
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.repository.count().await?)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Record>, AppError> {
        self.repository
            .list(limit, offset)
            .await?
            .into_iter()
            .map(to_record)
            .collect()
    }

    async fn find(&self, id: &str) -> Result<Option<Record>, AppError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        self.repository.find_by_id(id).await?.map(to_record).transpose()
    }

    async fn create(&self, params: &FormParams) -> Result<Record, AppError> {
        let request = CreateMaterialRequest {
            name: field(params, "name").unwrap_or_default(),
            description: field(params, "description"),
            quantity: parse_quantity(params)?,
            unit: field(params, "unit"),
        };
        let material = request.validate().map_err(AppError::Validation)?;
        to_record(self.repository.create(material).await?)
    }

    async fn update(&self, id: &str, params: &FormParams) -> Result<Option<Record>, AppError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        // Blank unit on the edit form keeps the stored unit.
        let request = UpdateMaterialRequest {
            name: field(params, "name"),
            description: field(params, "description"),
            quantity: parse_quantity(params)?,
            unit: field(params, "unit").filter(|u| !u.trim().is_empty()),
        };
        let update = request.validate().map_err(AppError::Validation)?;
        self.repository.update(id, update).await?.map(to_record).transpose()
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        match parse_id(id) {
            Some(id) => Ok(self.repository.delete(id).await?),
            None => Ok(false),
        }
    }
}
