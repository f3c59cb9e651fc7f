use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::models::{Material, NewMaterial, UpdateMaterialRequest};

/// Database error types
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Query execution error: {0}")]
    Query(String),

    #[error("Internal database error")]
    Internal,
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DbError::Unavailable(err.to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Configuration(_) => {
                DbError::Connection(err.to_string())
            }
            sqlx::Error::Database(db_err) => DbError::Query(db_err.message().to_string()),
            _ => DbError::Query(err.to_string()),
        }
    }
}

/// Persistence operations over the `materials` table.
#[async_trait]
pub trait MaterialRepository: Send + Sync {
    async fn create(&self, material: NewMaterial) -> Result<Material, DbError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Material>, DbError>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Material>, DbError>;
    async fn update(&self, id: i64, update: UpdateMaterialRequest)
        -> Result<Option<Material>, DbError>;
    async fn delete(&self, id: i64) -> Result<bool, DbError>;
    async fn count(&self) -> Result<i64, DbError>;
}

/// In-memory repository used in development tooling and tests
#[derive(Default)]
pub struct InMemoryMaterialRepository {
    inner: Mutex<InMemoryState>,
}

#[derive(Default)]
struct InMemoryState {
    materials: BTreeMap<i64, Material>,
    next_id: i64,
}

impl InMemoryMaterialRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<dyn MaterialRepository> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl MaterialRepository for InMemoryMaterialRepository {
    async fn create(&self, material: NewMaterial) -> Result<Material, DbError> {
        let mut state = self.inner.lock().map_err(|_| DbError::Internal)?;
        state.next_id += 1;
        let now = Utc::now();
        let material = Material {
            id: state.next_id,
            name: material.name,
            description: material.description,
            quantity: material.quantity,
            unit: material.unit,
            created_at: now,
            updated_at: now,
        };
        state.materials.insert(material.id, material.clone());
        Ok(material)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Material>, DbError> {
        let state = self.inner.lock().map_err(|_| DbError::Internal)?;
        Ok(state.materials.get(&id).cloned())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Material>, DbError> {
        let state = self.inner.lock().map_err(|_| DbError::Internal)?;
        Ok(state
            .materials
            .values()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        id: i64,
        update: UpdateMaterialRequest,
    ) -> Result<Option<Material>, DbError> {
        let mut state = self.inner.lock().map_err(|_| DbError::Internal)?;
        let Some(existing) = state.materials.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = update.name {
            existing.name = name;
        }
        if let Some(description) = update.description {
            existing.description = Some(description).filter(|d| !d.is_empty());
        }
        if let Some(quantity) = update.quantity {
            existing.quantity = quantity;
        }
        if let Some(unit) = update.unit {
            existing.unit = unit;
        }
        existing.updated_at = Utc::now();

        Ok(Some(existing.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, DbError> {
        let mut state = self.inner.lock().map_err(|_| DbError::Internal)?;
        Ok(state.materials.remove(&id).is_some())
    }

    async fn count(&self) -> Result<i64, DbError> {
        let state = self.inner.lock().map_err(|_| DbError::Internal)?;
        Ok(state.materials.len() as i64)
    }
}

const MATERIAL_COLUMNS: &str = "id, name, description, quantity, unit, created_at, updated_at";

/// PostgreSQL repository implementation
pub struct PostgresMaterialRepository {
    pool: PgPool,
}

impl PostgresMaterialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `materials` table when it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), DbError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS materials (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                description TEXT,
                quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
                unit VARCHAR(32) NOT NULL DEFAULT 'unit',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl MaterialRepository for PostgresMaterialRepository {
    async fn create(&self, material: NewMaterial) -> Result<Material, DbError> {
        let sql = format!(
            "INSERT INTO materials (name, description, quantity, unit) \
             VALUES ($1, $2, $3, $4) RETURNING {MATERIAL_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Material>(&sql)
            .bind(material.name)
            .bind(material.description)
            .bind(material.quantity)
            .bind(material.unit)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Material>, DbError> {
        let sql = format!("SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = $1");
        let row = sqlx::query_as::<_, Material>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Material>, DbError> {
        let sql =
            format!("SELECT {MATERIAL_COLUMNS} FROM materials ORDER BY id LIMIT $1 OFFSET $2");
        let rows = sqlx::query_as::<_, Material>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update(
        &self,
        id: i64,
        update: UpdateMaterialRequest,
    ) -> Result<Option<Material>, DbError> {
        // An empty description clears the column; NULL leaves it untouched.
        let sql = format!(
            "UPDATE materials SET \
               name = COALESCE($1, name), \
               description = CASE WHEN $2::TEXT IS NULL THEN description \
                                  WHEN $2::TEXT = '' THEN NULL \
                                  ELSE $2::TEXT END, \
               quantity = COALESCE($3, quantity), \
               unit = COALESCE($4, unit), \
               updated_at = NOW() \
             WHERE id = $5 RETURNING {MATERIAL_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Material>(&sql)
            .bind(update.name)
            .bind(update.description)
            .bind(update.quantity)
            .bind(update.unit)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM materials WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM materials")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
