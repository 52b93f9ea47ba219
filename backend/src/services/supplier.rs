//! Supplier master-data service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{PaginatedResponse, Pagination};

/// Supplier service
#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

/// A parts supplier
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or updating a supplier
#[derive(Debug, Deserialize)]
pub struct SupplierInput {
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Listing filter for suppliers
#[derive(Debug, Default, Deserialize)]
pub struct SupplierFilter {
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

const SUPPLIER_COLUMNS: &str = "id, name, contact_name, phone, address, created_at, updated_at";

impl SupplierService {
    /// Create a new SupplierService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a supplier; names are unique case-insensitively
    pub async fn create_supplier(&self, input: &SupplierInput) -> AppResult<Supplier> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Supplier name cannot be empty".to_string(),
                message_id: "Nama pemasok tidak boleh kosong".to_string(),
            });
        }

        self.ensure_name_free(name, None).await?;

        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            INSERT INTO suppliers (name, contact_name, phone, address)
            VALUES ($1, $2, $3, $4)
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(&input.contact_name)
        .bind(&input.phone)
        .bind(&input.address)
        .fetch_one(&self.db)
        .await?;

        Ok(supplier)
    }

    /// Get a supplier by id
    pub async fn get_supplier(&self, supplier_id: Uuid) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1"
        ))
        .bind(supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    /// List suppliers alphabetically
    pub async fn list_suppliers(
        &self,
        filter: SupplierFilter,
    ) -> AppResult<PaginatedResponse<Supplier>> {
        let pagination = Pagination::from_query(filter.page, filter.per_page);
        let q = filter.q.as_ref().map(|q| q.trim().to_string());

        let total_items = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM suppliers
            WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')
            "#,
        )
        .bind(&q)
        .fetch_one(&self.db)
        .await?;

        let suppliers = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            SELECT {SUPPLIER_COLUMNS} FROM suppliers
            WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')
            ORDER BY name
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(&q)
        .bind(i64::from(pagination.limit()))
        .bind(i64::from(pagination.offset()))
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(
            suppliers,
            pagination,
            total_items as u64,
        ))
    }

    /// Update supplier contact details
    pub async fn update_supplier(
        &self,
        supplier_id: Uuid,
        input: &SupplierInput,
    ) -> AppResult<Supplier> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Supplier name cannot be empty".to_string(),
                message_id: "Nama pemasok tidak boleh kosong".to_string(),
            });
        }

        self.get_supplier(supplier_id).await?;
        self.ensure_name_free(name, Some(supplier_id)).await?;

        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            UPDATE suppliers
            SET name = $1, contact_name = $2, phone = $3, address = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(&input.contact_name)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(supplier_id)
        .fetch_one(&self.db)
        .await?;

        Ok(supplier)
    }

    /// Delete a supplier. Blocked while live spare parts or purchases
    /// reference it; deleting under a purchase would orphan the audit
    /// trail behind it. Soft-deleted parts are detached by the schema
    /// (`ON DELETE SET NULL`).
    pub async fn delete_supplier(&self, supplier_id: Uuid) -> AppResult<()> {
        self.get_supplier(supplier_id).await?;

        let live_parts = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM spare_parts WHERE supplier_id = $1 AND NOT is_deleted",
        )
        .bind(supplier_id)
        .fetch_one(&self.db)
        .await?;

        if live_parts > 0 {
            return Err(AppError::ReferentialIntegrity {
                resource: "supplier".to_string(),
                message: format!("Supplier is used by {} spare part(s)", live_parts),
                message_id: format!("Pemasok dipakai oleh {} suku cadang", live_parts),
            });
        }

        let purchases = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM purchases WHERE supplier_id = $1",
        )
        .bind(supplier_id)
        .fetch_one(&self.db)
        .await?;

        if purchases > 0 {
            return Err(AppError::ReferentialIntegrity {
                resource: "supplier".to_string(),
                message: format!("Supplier has {} purchase record(s)", purchases),
                message_id: format!("Pemasok punya {} catatan pembelian", purchases),
            });
        }

        sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(supplier_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn ensure_name_free(&self, name: &str, exclude: Option<Uuid>) -> AppResult<()> {
        let clash = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM suppliers
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
                "Supplier {} already exists",
                name
            )));
        }
        Ok(())
    }
}
