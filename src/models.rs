use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_UNIT_LEN: usize = 32;
pub const MAX_DESCRIPTION_LEN: usize = 2000;
pub const DEFAULT_UNIT: &str = "unit";

/// A stocked material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Material {
    pub id: i64,
    #[schema(example = "Copper wire")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 120)]
    pub quantity: i32,
    #[schema(example = "m")]
    pub unit: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateMaterialRequest {
    pub name: String,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateMaterialRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub unit: Option<String>,
}

/// Validated, trimmed field values ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMaterial {
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit: String,
}

impl CreateMaterialRequest {
    pub fn validate(&self) -> Result<NewMaterial, String> {
        let name = validate_name(&self.name)?;
        let description = validate_description(self.description.as_deref())?;
        let quantity = validate_quantity(self.quantity.unwrap_or(0))?;
        let unit = match self.unit.as_deref() {
            Some(unit) if !unit.trim().is_empty() => validate_unit(unit)?,
            _ => DEFAULT_UNIT.to_string(),
        };

        Ok(NewMaterial {
            name,
            description,
            quantity,
            unit,
        })
    }
}

impl UpdateMaterialRequest {
    /// Validate the fields that are present, returning a normalized copy.
    pub fn validate(&self) -> Result<UpdateMaterialRequest, String> {
        Ok(UpdateMaterialRequest {
            name: self.name.as_deref().map(validate_name).transpose()?,
            description: match self.description.as_deref() {
                Some(d) => Some(validate_description(Some(d))?.unwrap_or_default()),
                None => None,
            },
            quantity: self.quantity.map(validate_quantity).transpose()?,
            unit: self.unit.as_deref().map(validate_unit).transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.quantity.is_none()
            && self.unit.is_none()
    }
}

fn validate_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name cannot be empty".to_string());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("Name cannot exceed {} characters", MAX_NAME_LEN));
    }
    Ok(name.to_string())
}

fn validate_description(description: Option<&str>) -> Result<Option<String>, String> {
    match description.map(str::trim) {
        None | Some("") => Ok(None),
        Some(d) if d.chars().count() > MAX_DESCRIPTION_LEN => Err(format!(
            "Description cannot exceed {} characters",
            MAX_DESCRIPTION_LEN
        )),
        Some(d) => Ok(Some(d.to_string())),
    }
}

fn validate_quantity(quantity: i32) -> Result<i32, String> {
    if quantity < 0 {
        return Err("Quantity cannot be negative".to_string());
    }
    Ok(quantity)
}

fn validate_unit(unit: &str) -> Result<String, String> {
    let unit = unit.trim();
    if unit.is_empty() {
        return Err("Unit cannot be empty".to_string());
    }
    if unit.chars().count() > MAX_UNIT_LEN {
        return Err(format!("Unit cannot exceed {} characters", MAX_UNIT_LEN));
    }
    Ok(unit.to_string())
}

#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Page size, capped at 100
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListParams {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    pub fn normalized(self) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MaterialPage {
    pub data: Vec<Material>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
