//! Spare-part category service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Category service for spare-part classification
#[derive(Clone)]
pub struct CategoryService {
    db: PgPool,
}

/// A spare-part category
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or renaming a category
#[derive(Debug, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
}

impl CategoryService {
    /// Create a new CategoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a category; names are unique case-insensitively
    pub async fn create_category(&self, input: &CategoryInput) -> AppResult<Category> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Category name cannot be empty".to_string(),
                message_id: "Nama kategori tidak boleh kosong".to_string(),
            });
        }

        self.ensure_name_free(name, None).await?;

        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(&input.description)
        .fetch_one(&self.db)
        .await?;

        Ok(category)
    }

    /// Get a category by id
    pub async fn get_category(&self, category_id: Uuid) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at, updated_at FROM categories WHERE id = $1",
        )
        .bind(category_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))
    }

    /// List all categories alphabetically
    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at, updated_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(categories)
    }

    /// Rename a category or change its description
    pub async fn update_category(
        &self,
        category_id: Uuid,
        input: &CategoryInput,
    ) -> AppResult<Category> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Category name cannot be empty".to_string(),
                message_id: "Nama kategori tidak boleh kosong".to_string(),
            });
        }

        self.get_category(category_id).await?;
        self.ensure_name_free(name, Some(category_id)).await?;

        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = $1, description = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(&input.description)
        .bind(category_id)
        .fetch_one(&self.db)
        .await?;

        Ok(category)
    }

    /// Delete a category. Blocked while live spare parts still reference
    /// it; soft-deleted parts are detached by the schema
    /// (`ON DELETE SET NULL`).
    pub async fn delete_category(&self, category_id: Uuid) -> AppResult<()> {
        self.get_category(category_id).await?;

        let in_use = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM spare_parts WHERE category_id = $1 AND NOT is_deleted",
        )
        .bind(category_id)
        .fetch_one(&self.db)
        .await?;

        if in_use > 0 {
            return Err(AppError::ReferentialIntegrity {
                resource: "category".to_string(),
                message: format!("Category is used by {} spare part(s)", in_use),
                message_id: format!("Kategori dipakai oleh {} suku cadang", in_use),
            });
        }

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn ensure_name_free(&self, name: &str, exclude: Option<Uuid>) -> AppResult<()> {
        let clash = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM categories
            WHERE LOWER(name) = LOWER($1)
              AND ($2::uuid IS NULL OR id <> $2)
            "#,
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;

        if clash > 0 {
            return Err(AppError::DuplicateEntry(format!(
                "Category {} already exists",
                name
            )));
        }
        Ok(())
    }
}
