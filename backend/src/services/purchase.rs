//! Purchasing service: single and batch purchase creation, and the
//! purchase-group operations that treat all rows sharing one
//! (supplier, reference number) pair as a single editable invoice.
//!
//! Every operation here runs in one transaction and moves stock through
//! the audited, version-guarded mutation in the inventory service. Group
//! edits are expressed as a full reversal of the old lines followed by a
//! re-application of the new ones, so the ledger always reflects exactly
//! the current content of the group and the edit itself stays auditable.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::inventory::{apply_stock_mutation, NegativeStockError, StockMutation};
use crate::services::MAX_CONFLICT_RETRIES;
use shared::{
    validate_net_cost, validate_part_code, validate_quantity, PaginatedResponse, Pagination,
};

/// Purchase service for supplier deliveries and invoice groups
#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
}

/// One purchase line. `spare_part_code` and `spare_part_name` are
/// point-in-time snapshots taken at creation and never refreshed from the
/// live part.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub spare_part_id: Option<Uuid>,
    pub spare_part_code: String,
    pub spare_part_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount: Decimal,
    pub cost_price: Decimal,
    pub supplier_id: Uuid,
    pub supplier_ref_number: String,
    pub purchase_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Identifies a purchase group: the natural key of one physical supplier
/// invoice. No synthetic group id exists anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseGroupKey {
    pub supplier_id: Uuid,
    pub supplier_ref_number: String,
}

/// One line item of a purchase or batch request. The part is resolved by
/// id when given, otherwise by code; an unknown code auto-creates a
/// minimal spare part (name required in that case).
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseLineInput {
    pub spare_part_id: Option<Uuid>,
    pub spare_part_code: Option<String>,
    pub spare_part_name: Option<String>,
    pub category_id: Option<Uuid>,
    pub unit: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    /// Per-unit discount; net cost = unit_price - discount
    #[serde(default)]
    pub discount: Decimal,
}

/// Input for a single-line purchase
#[derive(Debug, Deserialize)]
pub struct CreatePurchaseInput {
    pub supplier_id: Uuid,
    pub supplier_ref_number: String,
    pub purchase_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub line: PurchaseLineInput,
}

/// Input for a multi-line purchase sharing one reference number
#[derive(Debug, Deserialize)]
pub struct CreatePurchaseBatchInput {
    pub supplier_id: Uuid,
    pub supplier_ref_number: String,
    pub purchase_date: Option<NaiveDate>,
    pub items: Vec<PurchaseLineInput>,
}

/// Replacement item list for an existing purchase group
#[derive(Debug, Deserialize)]
pub struct UpdatePurchaseGroupInput {
    pub purchase_date: Option<NaiveDate>,
    pub items: Vec<PurchaseLineInput>,
}

/// A purchase row enriched with the live part snapshot, as consumed by
/// the edit dialog
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseGroupLine {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub current_code: Option<String>,
    pub current_name: Option<String>,
    pub category_name: Option<String>,
}

/// A full purchase group
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseGroup {
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub supplier_ref_number: String,
    pub items: Vec<PurchaseGroupLine>,
    pub total_cost: Decimal,
}

/// Listing entry: one group summarized
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseGroupSummary {
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub supplier_ref_number: String,
    pub purchase_date: NaiveDate,
    pub item_count: i64,
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

const PURCHASE_COLUMNS: &str = r#"
    p.id, p.spare_part_id, p.spare_part_code, p.spare_part_name, p.quantity,
    p.unit_price, p.discount, p.cost_price, p.supplier_id, p.supplier_ref_number,
    p.purchase_date, p.created_at
"#;

impl PurchaseService {
    /// Create a new PurchaseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a single purchase line and apply its stock effect.
    /// Version conflicts are retried with fresh reads before surfacing.
    pub async fn create_purchase(
        &self,
        input: &CreatePurchaseInput,
        performed_by: &str,
    ) -> AppResult<Purchase> {
        self.validate_group_header(input.supplier_id, &input.supplier_ref_number)
            .await?;
        validate_line(&input.line)?;

        let mut attempt = 0;
        loop {
            let result = self.try_create_purchase(input, performed_by).await;
            match result {
                Err(e) if e.is_retryable() && attempt + 1 < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_create_purchase(
        &self,
        input: &CreatePurchaseInput,
        performed_by: &str,
    ) -> AppResult<Purchase> {
        let purchase_date = input
            .purchase_date
            .unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;
        let purchase_id = insert_line_and_apply(
            &mut tx,
            input.supplier_id,
            &input.supplier_ref_number,
            purchase_date,
            &input.line,
            "purchase",
            performed_by,
        )
        .await?;
        tx.commit().await?;

        self.get_purchase(purchase_id).await
    }

    /// Record a multi-line purchase under one reference number; all lines
    /// succeed or none do.
    pub async fn create_purchase_batch(
        &self,
        input: &CreatePurchaseBatchInput,
        performed_by: &str,
    ) -> AppResult<PurchaseGroup> {
        self.validate_group_header(input.supplier_id, &input.supplier_ref_number)
            .await?;
        if input.items.is_empty() {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: "At least one purchase item is required".to_string(),
                message_id: "Minimal satu item pembelian diperlukan".to_string(),
            });
        }
        for line in &input.items {
            validate_line(line)?;
        }

        let mut attempt = 0;
        loop {
            let result = self.try_create_purchase_batch(input, performed_by).await;
            match result {
                Err(e) if e.is_retryable() && attempt + 1 < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_create_purchase_batch(
        &self,
        input: &CreatePurchaseBatchInput,
        performed_by: &str,
    ) -> AppResult<PurchaseGroup> {
        let purchase_date = input
            .purchase_date
            .unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;
        for line in &input.items {
            insert_line_and_apply(
                &mut tx,
                input.supplier_id,
                &input.supplier_ref_number,
                purchase_date,
                line,
                "purchase",
                performed_by,
            )
            .await?;
        }
        tx.commit().await?;

        self.get_purchase_group(&PurchaseGroupKey {
            supplier_id: input.supplier_id,
            supplier_ref_number: input.supplier_ref_number.clone(),
        })
        .await
    }

    /// Get one purchase row by id
    pub async fn get_purchase(&self, purchase_id: Uuid) -> AppResult<Purchase> {
        sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases p WHERE p.id = $1"
        ))
        .bind(purchase_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase".to_string()))
    }

    /// Fetch all lines of a purchase group in creation order, enriched
    /// with the live part snapshot for the edit dialog.
    pub async fn get_purchase_group(&self, key: &PurchaseGroupKey) -> AppResult<PurchaseGroup> {
        let supplier_name = sqlx::query_scalar::<_, String>(
            "SELECT name FROM suppliers WHERE id = $1",
        )
        .bind(key.supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        let rows = sqlx::query_as::<_, PurchaseGroupRow>(&format!(
            r#"
            SELECT {PURCHASE_COLUMNS},
                   sp.code AS current_code, sp.name AS current_name, c.name AS category_name
            FROM purchases p
            LEFT JOIN spare_parts sp ON sp.id = p.spare_part_id AND NOT sp.is_deleted
            LEFT JOIN categories c ON c.id = sp.category_id
            WHERE p.supplier_id = $1 AND p.supplier_ref_number = $2
            ORDER BY p.created_at, p.id
            "#
        ))
        .bind(key.supplier_id)
        .bind(&key.supplier_ref_number)
        .fetch_all(&self.db)
        .await?;

        if rows.is_empty() {
            return Err(AppError::NotFound("Purchase group".to_string()));
        }

        let items: Vec<PurchaseGroupLine> = rows.into_iter().map(PurchaseGroupLine::from).collect();
        let total_cost = items
            .iter()
            .map(|l| l.purchase.cost_price * Decimal::from(l.purchase.quantity))
            .sum();

        Ok(PurchaseGroup {
            supplier_id: key.supplier_id,
            supplier_name,
            supplier_ref_number: key.supplier_ref_number.clone(),
            items,
            total_cost,
        })
    }

    /// Replace the item list of an existing group. In one transaction the
    /// old lines' stock effects are reversed and audited, the old rows
    /// deleted, and the new lines inserted and applied, so no intermediate
    /// state is ever observable.
    pub async fn update_purchase_group(
        &self,
        key: &PurchaseGroupKey,
        input: &UpdatePurchaseGroupInput,
        performed_by: &str,
    ) -> AppResult<PurchaseGroup> {
        if input.items.is_empty() {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: "At least one purchase item is required (delete the group instead)"
                    .to_string(),
                message_id: "Minimal satu item diperlukan (hapus transaksi jika kosong)"
                    .to_string(),
            });
        }
        for line in &input.items {
            validate_line(line)?;
        }

        let mut attempt = 0;
        loop {
            let result = self
                .try_update_purchase_group(key, input, performed_by)
                .await;
            match result {
                Err(e) if e.is_retryable() && attempt + 1 < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_update_purchase_group(
        &self,
        key: &PurchaseGroupKey,
        input: &UpdatePurchaseGroupInput,
        performed_by: &str,
    ) -> AppResult<PurchaseGroup> {
        let mut tx = self.db.begin().await?;

        let old_lines = lock_group_lines(&mut tx, key).await?;
        if old_lines.is_empty() {
            return Err(AppError::NotFound("Purchase group".to_string()));
        }
        let purchase_date = input
            .purchase_date
            .unwrap_or(old_lines[0].purchase_date);

        reverse_lines(&mut tx, &old_lines, "purchase-edit-reversal", performed_by).await?;
        delete_group_rows(&mut tx, key).await?;

        for line in &input.items {
            insert_line_and_apply(
                &mut tx,
                key.supplier_id,
                &key.supplier_ref_number,
                purchase_date,
                line,
                "purchase-edit",
                performed_by,
            )
            .await?;
        }

        tx.commit().await?;

        self.get_purchase_group(key).await
    }

    /// Remove a whole group, reversing its stock effect line by line.
    pub async fn delete_purchase_group(
        &self,
        key: &PurchaseGroupKey,
        performed_by: &str,
    ) -> AppResult<()> {
        let mut attempt = 0;
        loop {
            let result = self.try_delete_purchase_group(key, performed_by).await;
            match result {
                Err(e) if e.is_retryable() && attempt + 1 < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_delete_purchase_group(
        &self,
        key: &PurchaseGroupKey,
        performed_by: &str,
    ) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let old_lines = lock_group_lines(&mut tx, key).await?;
        if old_lines.is_empty() {
            return Err(AppError::NotFound("Purchase group".to_string()));
        }

        reverse_lines(&mut tx, &old_lines, "purchase-delete-reversal", performed_by).await?;
        delete_group_rows(&mut tx, key).await?;

        tx.commit().await?;
        Ok(())
    }

    /// List purchase groups, newest first
    pub async fn list_purchase_groups(
        &self,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<PurchaseGroupSummary>> {
        let total_items = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT (supplier_id, supplier_ref_number)) FROM purchases",
        )
        .fetch_one(&self.db)
        .await?;

        let groups = sqlx::query_as::<_, PurchaseGroupSummary>(
            r#"
            SELECT p.supplier_id, s.name AS supplier_name, p.supplier_ref_number,
                   MIN(p.purchase_date) AS purchase_date,
                   COUNT(*) AS item_count,
                   SUM(p.cost_price * p.quantity) AS total_cost,
                   MIN(p.created_at) AS created_at
            FROM purchases p
            JOIN suppliers s ON s.id = p.supplier_id
            GROUP BY p.supplier_id, s.name, p.supplier_ref_number
            ORDER BY MIN(p.created_at) DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(pagination.limit()))
        .bind(i64::from(pagination.offset()))
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(
            groups,
            pagination,
            total_items as u64,
        ))
    }

    async fn validate_group_header(
        &self,
        supplier_id: Uuid,
        supplier_ref_number: &str,
    ) -> AppResult<()> {
        if supplier_ref_number.trim().is_empty() {
            return Err(AppError::Validation {
                field: "supplier_ref_number".to_string(),
                message: "Supplier reference number is required".to_string(),
                message_id: "Nomor referensi pemasok wajib diisi".to_string(),
            });
        }
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)",
        )
        .bind(supplier_id)
        .fetch_one(&self.db)
        .await?;
        if !exists {
            return Err(AppError::NotFound("Supplier".to_string()));
        }
        Ok(())
    }
}

/// Validate one line item before touching the database
fn validate_line(line: &PurchaseLineInput) -> AppResult<()> {
    if line.spare_part_id.is_none() && line.spare_part_code.is_none() {
        return Err(AppError::Validation {
            field: "spare_part_id".to_string(),
            message: "Either spare_part_id or spare_part_code is required".to_string(),
            message_id: "Harus mengisi spare_part_id atau spare_part_code".to_string(),
        });
    }
    if let Err(msg) = validate_quantity(line.quantity) {
        return Err(AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
            message_id: "Jumlah harus lebih dari nol".to_string(),
        });
    }
    if let Err(msg) = validate_net_cost(line.unit_price, line.discount) {
        return Err(AppError::Validation {
            field: "unit_price".to_string(),
            message: msg.to_string(),
            message_id: "Harga atau diskon tidak valid".to_string(),
        });
    }
    Ok(())
}

/// Resolve the spare part for a line: by id, by code, or by auto-creating
/// a minimal part for a code the inventory has never seen.
async fn resolve_spare_part(
    tx: &mut Transaction<'_, Postgres>,
    line: &PurchaseLineInput,
    net_cost: Decimal,
) -> AppResult<(Uuid, String, String)> {
    if let Some(part_id) = line.spare_part_id {
        let (code, name) = sqlx::query_as::<_, (String, String)>(
            "SELECT code, name FROM spare_parts WHERE id = $1 AND NOT is_deleted",
        )
        .bind(part_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Spare part".to_string()))?;
        return Ok((part_id, code, name));
    }

    // Unwrap is safe: validate_line guarantees a code when the id is absent
    let code = line.spare_part_code.as_deref().unwrap_or_default().trim();
    if let Err(msg) = validate_part_code(code) {
        return Err(AppError::Validation {
            field: "spare_part_code".to_string(),
            message: msg.to_string(),
            message_id: "Kode suku cadang tidak valid".to_string(),
        });
    }

    let existing = sqlx::query_as::<_, (Uuid, String, String)>(
        "SELECT id, code, name FROM spare_parts WHERE code = $1 AND NOT is_deleted",
    )
    .bind(code)
    .fetch_optional(&mut **tx)
    .await?;
    if let Some(found) = existing {
        return Ok(found);
    }

    let name = match line.spare_part_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => {
            return Err(AppError::Validation {
                field: "spare_part_name".to_string(),
                message: "Part name is required when creating a new part by code".to_string(),
                message_id: "Nama suku cadang wajib diisi untuk kode baru".to_string(),
            })
        }
    };

    let part_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO spare_parts (code, name, category_id, unit, stock, min_stock, cost_price)
        VALUES ($1, $2, $3, $4, 0, 0, $5)
        RETURNING id
        "#,
    )
    .bind(code)
    .bind(name)
    .bind(line.category_id)
    .bind(line.unit.as_deref().unwrap_or("pcs"))
    .bind(net_cost)
    .fetch_one(&mut **tx)
    .await?;

    Ok((part_id, code.to_string(), name.to_string()))
}

/// Insert one purchase row and apply its stock effect and audit. Returns
/// the new purchase id.
async fn insert_line_and_apply(
    tx: &mut Transaction<'_, Postgres>,
    supplier_id: Uuid,
    supplier_ref_number: &str,
    purchase_date: NaiveDate,
    line: &PurchaseLineInput,
    reason: &str,
    performed_by: &str,
) -> AppResult<Uuid> {
    let net_cost = line.unit_price - line.discount;
    let (part_id, code, name) = resolve_spare_part(tx, line, net_cost).await?;

    let purchase_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO purchases (spare_part_id, spare_part_code, spare_part_name, quantity,
                               unit_price, discount, cost_price, supplier_id,
                               supplier_ref_number, purchase_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(part_id)
    .bind(&code)
    .bind(&name)
    .bind(line.quantity)
    .bind(line.unit_price)
    .bind(line.discount)
    .bind(net_cost)
    .bind(supplier_id)
    .bind(supplier_ref_number)
    .bind(purchase_date)
    .fetch_one(&mut **tx)
    .await?;

    apply_stock_mutation(
        tx,
        StockMutation {
            spare_part_id: part_id,
            delta: line.quantity,
            new_cost_price: Some(net_cost),
            reason,
            reference_id: Some(purchase_id),
            performed_by,
            on_negative: NegativeStockError::Invariant,
        },
    )
    .await?;

    Ok(purchase_id)
}

/// Read the current rows of a group with row locks held, serializing
/// concurrent edits of the same invoice.
async fn lock_group_lines(
    tx: &mut Transaction<'_, Postgres>,
    key: &PurchaseGroupKey,
) -> AppResult<Vec<Purchase>> {
    let lines = sqlx::query_as::<_, Purchase>(&format!(
        r#"
        SELECT {PURCHASE_COLUMNS}
        FROM purchases p
        WHERE p.supplier_id = $1 AND p.supplier_ref_number = $2
        ORDER BY p.created_at, p.id
        FOR UPDATE
        "#
    ))
    .bind(key.supplier_id)
    .bind(&key.supplier_ref_number)
    .fetch_all(&mut **tx)
    .await?;

    Ok(lines)
}

/// Reverse the stock effect of each line. Lines whose part was since
/// soft-deleted or never resolved carry no stock effect to reverse.
async fn reverse_lines(
    tx: &mut Transaction<'_, Postgres>,
    lines: &[Purchase],
    reason: &str,
    performed_by: &str,
) -> AppResult<()> {
    for line in lines {
        let Some(part_id) = line.spare_part_id else {
            continue;
        };
        let active = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM spare_parts WHERE id = $1 AND NOT is_deleted)",
        )
        .bind(part_id)
        .fetch_one(&mut **tx)
        .await?;
        if !active {
            continue;
        }
        apply_stock_mutation(
            tx,
            StockMutation {
                spare_part_id: part_id,
                delta: -line.quantity,
                new_cost_price: None,
                reason,
                reference_id: Some(line.id),
                performed_by,
                on_negative: NegativeStockError::Invariant,
            },
        )
        .await?;
    }
    Ok(())
}

async fn delete_group_rows(
    tx: &mut Transaction<'_, Postgres>,
    key: &PurchaseGroupKey,
) -> AppResult<()> {
    sqlx::query("DELETE FROM purchases WHERE supplier_id = $1 AND supplier_ref_number = $2")
        .bind(key.supplier_id)
        .bind(&key.supplier_ref_number)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Row type backing the enriched group query
#[derive(Debug, FromRow)]
struct PurchaseGroupRow {
    id: Uuid,
    spare_part_id: Option<Uuid>,
    spare_part_code: String,
    spare_part_name: String,
    quantity: i32,
    unit_price: Decimal,
    discount: Decimal,
    cost_price: Decimal,
    supplier_id: Uuid,
    supplier_ref_number: String,
    purchase_date: NaiveDate,
    created_at: DateTime<Utc>,
    current_code: Option<String>,
    current_name: Option<String>,
    category_name: Option<String>,
}

impl From<PurchaseGroupRow> for PurchaseGroupLine {
    fn from(row: PurchaseGroupRow) -> Self {
        PurchaseGroupLine {
            purchase: Purchase {
                id: row.id,
                spare_part_id: row.spare_part_id,
                spare_part_code: row.spare_part_code,
                spare_part_name: row.spare_part_name,
                quantity: row.quantity,
                unit_price: row.unit_price,
                discount: row.discount,
                cost_price: row.cost_price,
                supplier_id: row.supplier_id,
                supplier_ref_number: row.supplier_ref_number,
                purchase_date: row.purchase_date,
                created_at: row.created_at,
            },
            current_code: row.current_code,
            current_name: row.current_name,
            category_name: row.category_name,
        }
    }
}
