//! Spare-part inventory service: the stock ledger, its audit trail, sell
//! prices, filtered listings and the dashboard stats.
//!
//! Every stock mutation in the system funnels through
//! [`apply_stock_mutation`]: a version-guarded compare-and-swap update
//! paired with an append-only audit row, executed inside the caller's
//! transaction. A failed version check aborts the transaction and is
//! retried by the owning service with fresh reads.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::MAX_CONFLICT_RETRIES;
use shared::{validate_part_code, PaginatedResponse, Pagination};

/// Inventory service for managing spare parts and the stock ledger
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// A spare part row, with its category name resolved
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SparePart {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub unit: String,
    pub stock: i32,
    pub min_stock: i32,
    pub cost_price: Decimal,
    pub version: i32,
    pub supplier_id: Option<Uuid>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A sell price variant (brand/packaging) of a spare part; append-only
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SellPrice {
    pub id: Uuid,
    pub spare_part_id: Uuid,
    pub brand: String,
    pub price: Decimal,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry of the append-only stock audit trail
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventoryAudit {
    pub id: Uuid,
    pub spare_part_id: Uuid,
    pub delta: i32,
    pub before: i32,
    pub after: i32,
    pub reason: String,
    pub reference_id: Option<Uuid>,
    pub performed_by: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a spare part
#[derive(Debug, Deserialize)]
pub struct CreateSparePartInput {
    pub code: String,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub unit: Option<String>,
    pub min_stock: Option<i32>,
    pub cost_price: Option<Decimal>,
    pub supplier_id: Option<Uuid>,
    /// Opening balance; audited as "initial-stock" when positive
    pub initial_stock: Option<i32>,
}

/// Input for updating the descriptive fields of a spare part.
/// Stock is never written through this path. Omitting `category_id` or
/// `supplier_id` keeps the stored value; sending `null` clears it.
#[derive(Debug, Deserialize)]
pub struct UpdateSparePartInput {
    pub code: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::services::double_option")]
    pub category_id: Option<Option<Uuid>>,
    pub unit: Option<String>,
    pub min_stock: Option<i32>,
    #[serde(default, deserialize_with = "crate::services::double_option")]
    pub supplier_id: Option<Option<Uuid>>,
}

/// Listing filter for spare parts
#[derive(Debug, Default, Deserialize)]
pub struct SparePartFilter {
    /// Free-text match on code or name
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    /// Only rows at or below their reorder threshold
    #[serde(default)]
    pub low_stock: bool,
    /// Include zero-stock rows (defaults to true)
    pub include_empty: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Input for a manual stock adjustment (correction after a physical count)
#[derive(Debug, Deserialize)]
pub struct AdjustStockInput {
    /// Signed correction; positive counts in, negative counts out
    pub delta: i32,
    pub note: Option<String>,
}

/// Input for appending a sell price
#[derive(Debug, Deserialize)]
pub struct CreateSellPriceInput {
    pub brand: String,
    pub price: Decimal,
    pub note: Option<String>,
}

/// Dashboard statistics, computed in one pass over one snapshot read
#[derive(Debug, Clone, Serialize)]
pub struct InventoryStats {
    pub total_items: i64,
    pub low_stock_count: i64,
    pub total_value: Decimal,
    pub recent_purchases: Vec<RecentPurchase>,
}

/// Recent purchase activity entry for the stats feed
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecentPurchase {
    pub id: Uuid,
    pub spare_part_code: String,
    pub spare_part_name: String,
    pub quantity: i32,
    pub cost_price: Decimal,
    pub supplier_name: String,
    pub supplier_ref_number: String,
    pub purchase_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Which error a stock write that would go negative maps to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum NegativeStockError {
    /// Explicit outbound path (usage, manual adjustment): user-recoverable.
    Insufficient,
    /// Bookkeeping path (purchase reversal): the ledger no longer adds up.
    Invariant,
}

/// A single stock-affecting write and its audit attribution
pub(crate) struct StockMutation<'a> {
    pub spare_part_id: Uuid,
    pub delta: i32,
    /// Last-purchase-price policy: set on purchase application, left
    /// untouched everywhere else
    pub new_cost_price: Option<Decimal>,
    pub reason: &'a str,
    pub reference_id: Option<Uuid>,
    pub performed_by: &'a str,
    pub on_negative: NegativeStockError,
}

/// Apply one stock mutation inside `tx`: read stock+version, write the new
/// stock only if the version still matches (zero rows affected means a
/// concurrent writer won and the caller must retry), then append the audit
/// row. Returns the (before, after) stock snapshot.
pub(crate) async fn apply_stock_mutation(
    tx: &mut Transaction<'_, Postgres>,
    m: StockMutation<'_>,
) -> AppResult<(i32, i32)> {
    let (code, stock, version) = sqlx::query_as::<_, (String, i32, i32)>(
        "SELECT code, stock, version FROM spare_parts WHERE id = $1 AND NOT is_deleted",
    )
    .bind(m.spare_part_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Spare part".to_string()))?;

    let after = stock.checked_add(m.delta).ok_or_else(|| {
        AppError::InvariantViolation(format!(
            "stock arithmetic overflow on {}: {} + {}",
            code, stock, m.delta
        ))
    })?;
    if after < 0 {
        return Err(match m.on_negative {
            NegativeStockError::Insufficient => AppError::InsufficientStock(format!(
                "{} has {} in stock, {} requested",
                code,
                stock,
                m.delta.unsigned_abs()
            )),
            NegativeStockError::Invariant => AppError::InvariantViolation(format!(
                "reversal would drive stock of {} to {} ({} on hand, delta {})",
                code, after, stock, m.delta
            )),
        });
    }

    let result = sqlx::query(
        r#"
        UPDATE spare_parts
        SET stock = $1, cost_price = COALESCE($2, cost_price),
            version = version + 1, updated_at = NOW()
        WHERE id = $3 AND version = $4
        "#,
    )
    .bind(after)
    .bind(m.new_cost_price)
    .bind(m.spare_part_id)
    .bind(version)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict {
            resource: "spare_part".to_string(),
            message: format!("Concurrent stock update on {}", code),
            message_id: format!("Stok {} sedang diubah oleh proses lain", code),
        });
    }

    sqlx::query(
        r#"
        INSERT INTO inventory_audits (spare_part_id, delta, before, after, reason, reference_id, performed_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(m.spare_part_id)
    .bind(m.delta)
    .bind(stock)
    .bind(after)
    .bind(m.reason)
    .bind(m.reference_id)
    .bind(m.performed_by)
    .execute(&mut **tx)
    .await?;

    Ok((stock, after))
}

const SPARE_PART_COLUMNS: &str = r#"
    sp.id, sp.code, sp.name, sp.category_id, c.name AS category_name, sp.unit,
    sp.stock, sp.min_stock, sp.cost_price, sp.version, sp.supplier_id,
    sp.is_deleted, sp.created_at, sp.updated_at
"#;

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a spare part. Codes are unique among non-deleted rows only;
    /// a soft-deleted part never blocks re-use of its code.
    pub async fn create_spare_part(
        &self,
        input: CreateSparePartInput,
        performed_by: &str,
    ) -> AppResult<SparePart> {
        if let Err(msg) = validate_part_code(&input.code) {
            return Err(AppError::Validation {
                field: "code".to_string(),
                message: msg.to_string(),
                message_id: "Kode suku cadang tidak valid".to_string(),
            });
        }
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Part name cannot be empty".to_string(),
                message_id: "Nama suku cadang tidak boleh kosong".to_string(),
            });
        }
        let min_stock = input.min_stock.unwrap_or(0);
        let initial_stock = input.initial_stock.unwrap_or(0);
        if min_stock < 0 || initial_stock < 0 {
            return Err(AppError::Validation {
                field: "min_stock".to_string(),
                message: "Stock levels cannot be negative".to_string(),
                message_id: "Tingkat stok tidak boleh negatif".to_string(),
            });
        }
        let cost_price = input.cost_price.unwrap_or(Decimal::ZERO);
        if cost_price < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "cost_price".to_string(),
                message: "Cost price cannot be negative".to_string(),
                message_id: "Harga beli tidak boleh negatif".to_string(),
            });
        }

        let duplicate = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM spare_parts WHERE code = $1 AND NOT is_deleted",
        )
        .bind(&input.code)
        .fetch_one(&self.db)
        .await?;
        if duplicate > 0 {
            return Err(AppError::DuplicateEntry("code".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let part_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO spare_parts (code, name, category_id, unit, stock, min_stock, cost_price, supplier_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&input.code)
        .bind(input.name.trim())
        .bind(input.category_id)
        .bind(input.unit.as_deref().unwrap_or("pcs"))
        .bind(initial_stock)
        .bind(min_stock)
        .bind(cost_price)
        .bind(input.supplier_id)
        .fetch_one(&mut *tx)
        .await?;

        if initial_stock > 0 {
            sqlx::query(
                r#"
                INSERT INTO inventory_audits (spare_part_id, delta, before, after, reason, performed_by)
                VALUES ($1, $2, 0, $2, 'initial-stock', $3)
                "#,
            )
            .bind(part_id)
            .bind(initial_stock)
            .bind(performed_by)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_spare_part(part_id).await
    }

    /// Get a spare part by id (soft-deleted rows excluded)
    pub async fn get_spare_part(&self, part_id: Uuid) -> AppResult<SparePart> {
        sqlx::query_as::<_, SparePart>(&format!(
            r#"
            SELECT {SPARE_PART_COLUMNS}
            FROM spare_parts sp
            LEFT JOIN categories c ON c.id = sp.category_id
            WHERE sp.id = $1 AND NOT sp.is_deleted
            "#
        ))
        .bind(part_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Spare part".to_string()))
    }

    /// Update the descriptive fields of a spare part
    pub async fn update_spare_part(
        &self,
        part_id: Uuid,
        input: UpdateSparePartInput,
    ) -> AppResult<SparePart> {
        let existing = self.get_spare_part(part_id).await?;

        let code = input.code.unwrap_or(existing.code);
        if let Err(msg) = validate_part_code(&code) {
            return Err(AppError::Validation {
                field: "code".to_string(),
                message: msg.to_string(),
                message_id: "Kode suku cadang tidak valid".to_string(),
            });
        }
        let duplicate = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM spare_parts WHERE code = $1 AND NOT is_deleted AND id != $2",
        )
        .bind(&code)
        .bind(part_id)
        .fetch_one(&self.db)
        .await?;
        if duplicate > 0 {
            return Err(AppError::DuplicateEntry("code".to_string()));
        }

        let name = input.name.unwrap_or(existing.name);
        if name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Part name cannot be empty".to_string(),
                message_id: "Nama suku cadang tidak boleh kosong".to_string(),
            });
        }
        let min_stock = input.min_stock.unwrap_or(existing.min_stock);
        if min_stock < 0 {
            return Err(AppError::Validation {
                field: "min_stock".to_string(),
                message: "Reorder threshold cannot be negative".to_string(),
                message_id: "Batas stok minimum tidak boleh negatif".to_string(),
            });
        }
        let category_id = input.category_id.unwrap_or(existing.category_id);
        let unit = input.unit.unwrap_or(existing.unit);
        let supplier_id = input.supplier_id.unwrap_or(existing.supplier_id);

        sqlx::query(
            r#"
            UPDATE spare_parts
            SET code = $1, name = $2, category_id = $3, unit = $4, min_stock = $5,
                supplier_id = $6, updated_at = NOW()
            WHERE id = $7
            "#,
        )
        .bind(&code)
        .bind(name.trim())
        .bind(category_id)
        .bind(&unit)
        .bind(min_stock)
        .bind(supplier_id)
        .bind(part_id)
        .execute(&self.db)
        .await?;

        self.get_spare_part(part_id).await
    }

    /// List spare parts with filters and pagination
    pub async fn list_spare_parts(
        &self,
        filter: SparePartFilter,
    ) -> AppResult<PaginatedResponse<SparePart>> {
        let pagination = Pagination::from_query(filter.page, filter.per_page);
        let q = filter.q.as_ref().map(|q| q.trim().to_string());
        let include_empty = filter.include_empty.unwrap_or(true);

        let total_items = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM spare_parts sp
            WHERE NOT sp.is_deleted
              AND ($1::text IS NULL OR sp.code ILIKE '%' || $1 || '%' OR sp.name ILIKE '%' || $1 || '%')
              AND ($2::uuid IS NULL OR sp.category_id = $2)
              AND (NOT $3 OR sp.stock <= sp.min_stock)
              AND ($4 OR sp.stock > 0)
            "#,
        )
        .bind(&q)
        .bind(filter.category_id)
        .bind(filter.low_stock)
        .bind(include_empty)
        .fetch_one(&self.db)
        .await?;

        let parts = sqlx::query_as::<_, SparePart>(&format!(
            r#"
            SELECT {SPARE_PART_COLUMNS}
            FROM spare_parts sp
            LEFT JOIN categories c ON c.id = sp.category_id
            WHERE NOT sp.is_deleted
              AND ($1::text IS NULL OR sp.code ILIKE '%' || $1 || '%' OR sp.name ILIKE '%' || $1 || '%')
              AND ($2::uuid IS NULL OR sp.category_id = $2)
              AND (NOT $3 OR sp.stock <= sp.min_stock)
              AND ($4 OR sp.stock > 0)
            ORDER BY sp.code
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(&q)
        .bind(filter.category_id)
        .bind(filter.low_stock)
        .bind(include_empty)
        .bind(i64::from(pagination.limit()))
        .bind(i64::from(pagination.offset()))
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(
            parts,
            pagination,
            total_items as u64,
        ))
    }

    /// Soft-delete a spare part. History (purchases, audits) is preserved
    /// and the code becomes available again.
    pub async fn soft_delete_spare_part(&self, part_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE spare_parts SET is_deleted = true, updated_at = NOW() WHERE id = $1 AND NOT is_deleted",
        )
        .bind(part_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Spare part".to_string()));
        }
        Ok(())
    }

    /// Manual stock correction after a physical count. Version-guarded and
    /// audited like every other stock write; retried on conflict.
    pub async fn adjust_stock(
        &self,
        part_id: Uuid,
        input: &AdjustStockInput,
        performed_by: &str,
    ) -> AppResult<SparePart> {
        if input.delta == 0 {
            return Err(AppError::Validation {
                field: "delta".to_string(),
                message: "Adjustment delta cannot be zero".to_string(),
                message_id: "Nilai penyesuaian tidak boleh nol".to_string(),
            });
        }

        let reason = match input.note.as_deref().map(str::trim) {
            Some(note) if !note.is_empty() => format!("manual-adjustment: {}", note),
            _ => "manual-adjustment".to_string(),
        };

        let mut attempt = 0;
        loop {
            let result = self
                .try_adjust_stock(part_id, input.delta, &reason, performed_by)
                .await;
            match result {
                Err(e) if e.is_retryable() && attempt + 1 < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    tracing::debug!("Retrying stock adjustment for {} (attempt {})", part_id, attempt + 1);
                }
                other => return other,
            }
        }
    }

    async fn try_adjust_stock(
        &self,
        part_id: Uuid,
        delta: i32,
        reason: &str,
        performed_by: &str,
    ) -> AppResult<SparePart> {
        let mut tx = self.db.begin().await?;
        apply_stock_mutation(
            &mut tx,
            StockMutation {
                spare_part_id: part_id,
                delta,
                new_cost_price: None,
                reason,
                reference_id: None,
                performed_by,
                on_negative: NegativeStockError::Insufficient,
            },
        )
        .await?;
        tx.commit().await?;

        self.get_spare_part(part_id).await
    }

    /// Append a sell price variant. There is no update path; price history
    /// stays intact.
    pub async fn add_sell_price(
        &self,
        part_id: Uuid,
        input: CreateSellPriceInput,
    ) -> AppResult<SellPrice> {
        if input.price < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "price".to_string(),
                message: "Sell price cannot be negative".to_string(),
                message_id: "Harga jual tidak boleh negatif".to_string(),
            });
        }
        // Ensure the part exists and is active
        self.get_spare_part(part_id).await?;

        let sell_price = sqlx::query_as::<_, SellPrice>(
            r#"
            INSERT INTO sell_prices (spare_part_id, brand, price, note)
            VALUES ($1, $2, $3, $4)
            RETURNING id, spare_part_id, brand, price, note, created_at
            "#,
        )
        .bind(part_id)
        .bind(input.brand.trim())
        .bind(input.price)
        .bind(&input.note)
        .fetch_one(&self.db)
        .await?;

        Ok(sell_price)
    }

    /// List sell prices of a part, newest first
    pub async fn list_sell_prices(&self, part_id: Uuid) -> AppResult<Vec<SellPrice>> {
        self.get_spare_part(part_id).await?;

        let prices = sqlx::query_as::<_, SellPrice>(
            r#"
            SELECT id, spare_part_id, brand, price, note, created_at
            FROM sell_prices
            WHERE spare_part_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(part_id)
        .fetch_all(&self.db)
        .await?;

        Ok(prices)
    }

    /// Full audit trail of a part in ledger order
    pub async fn get_audit_trail(&self, part_id: Uuid) -> AppResult<Vec<InventoryAudit>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM spare_parts WHERE id = $1)",
        )
        .bind(part_id)
        .fetch_one(&self.db)
        .await?;
        if !exists {
            return Err(AppError::NotFound("Spare part".to_string()));
        }

        let audits = sqlx::query_as::<_, InventoryAudit>(
            r#"
            SELECT id, spare_part_id, delta, before, after, reason, reference_id, performed_by, created_at
            FROM inventory_audits
            WHERE spare_part_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(part_id)
        .fetch_all(&self.db)
        .await?;

        Ok(audits)
    }

    /// Dashboard stats: item/low-stock counts and total inventory value
    /// from a single aggregate read, plus the latest purchase activity.
    pub async fn get_stats(&self) -> AppResult<InventoryStats> {
        let (total_items, low_stock_count, total_value) =
            sqlx::query_as::<_, (i64, i64, Decimal)>(
                r#"
                SELECT COUNT(*),
                       COUNT(*) FILTER (WHERE stock <= min_stock),
                       COALESCE(SUM(stock * cost_price), 0)
                FROM spare_parts
                WHERE NOT is_deleted
                "#,
            )
            .fetch_one(&self.db)
            .await?;

        let recent_purchases = sqlx::query_as::<_, RecentPurchase>(
            r#"
            SELECT p.id, p.spare_part_code, p.spare_part_name, p.quantity, p.cost_price,
                   s.name AS supplier_name, p.supplier_ref_number, p.purchase_date, p.created_at
            FROM purchases p
            JOIN suppliers s ON s.id = p.supplier_id
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT 5
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(InventoryStats {
            total_items,
            low_stock_count,
            total_value,
            recent_purchases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_input_distinguishes_absent_from_null() {
        let keep: UpdateSparePartInput = serde_json::from_str("{}").unwrap();
        assert_eq!(keep.category_id, None);
        assert_eq!(keep.supplier_id, None);

        let clear: UpdateSparePartInput =
            serde_json::from_str(r#"{"category_id": null}"#).unwrap();
        assert_eq!(clear.category_id, Some(None));
        assert_eq!(clear.supplier_id, None);

        let id = Uuid::new_v4();
        let set: UpdateSparePartInput =
            serde_json::from_str(&format!(r#"{{"category_id": "{}"}}"#, id)).unwrap();
        assert_eq!(set.category_id, Some(Some(id)));
    }
}
