//! Visit service: vehicle intake, the daily-sequential visit number,
//! worklist status tracking, diagnosis entry, spare-part usage and the
//! billing summary.
//!
//! Visit numbers are derived by reading the day's highest existing number
//! inside the insert transaction. The visits table carries a UNIQUE
//! constraint on the number, so two check-ins racing on the same day make
//! one of them fail with a unique violation, which is mapped to a
//! retryable conflict and re-run with a fresh read.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::inventory::{apply_stock_mutation, NegativeStockError, StockMutation};
use crate::services::MAX_CONFLICT_RETRIES;
use shared::{
    bill_parts_total, format_visit_number, parse_visit_sequence, validate_plate_number,
    visit_number_day_prefix, PaginatedResponse, Pagination, Visit, VisitBill, VisitBillLine,
    VisitStatus, DAILY_VISIT_CAP,
};

/// Visit service for intake and the mechanic worklist
#[derive(Clone)]
pub struct VisitService {
    db: PgPool,
    visit_prefix: String,
}

/// Input for checking in a vehicle
#[derive(Debug, Deserialize)]
pub struct CreateVisitInput {
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub plate_number: String,
    pub vehicle_brand: Option<String>,
    pub vehicle_model: Option<String>,
    pub complaint: Option<String>,
}

/// Input for updating intake fields and the service fee. Omitting an
/// optional field keeps the stored value; sending `null` clears it.
#[derive(Debug, Deserialize)]
pub struct UpdateVisitInput {
    pub customer_name: Option<String>,
    #[serde(default, deserialize_with = "crate::services::double_option")]
    pub customer_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::services::double_option")]
    pub vehicle_brand: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::services::double_option")]
    pub vehicle_model: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::services::double_option")]
    pub complaint: Option<Option<String>>,
    pub service_fee: Option<Decimal>,
}

/// Input for recording the mechanic's diagnosis
#[derive(Debug, Deserialize)]
pub struct DiagnosisInput {
    pub diagnosis: String,
}

/// Listing filter for the worklist
#[derive(Debug, Default, Deserialize)]
pub struct VisitFilter {
    /// Free-text match on plate number or customer name
    pub q: Option<String>,
    pub status: Option<String>,
    pub date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Input for using a spare part on a visit
#[derive(Debug, Deserialize)]
pub struct UsePartInput {
    pub spare_part_id: Uuid,
    pub quantity: i32,
    /// Billed unit price; defaults to the part's latest sell price
    pub unit_price: Option<Decimal>,
}

/// A spare part consumed by a visit, with its billing price snapshot
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PartUsage {
    pub id: Uuid,
    pub visit_id: Uuid,
    pub spare_part_id: Uuid,
    pub spare_part_code: String,
    pub spare_part_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Raw visit row; status is stored as text
#[derive(Debug, FromRow)]
struct VisitRow {
    id: Uuid,
    visit_number: String,
    customer_name: String,
    customer_phone: Option<String>,
    plate_number: String,
    vehicle_brand: Option<String>,
    vehicle_model: Option<String>,
    complaint: Option<String>,
    diagnosis: Option<String>,
    mechanic_name: Option<String>,
    status: String,
    service_fee: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn visit_from_row(row: VisitRow) -> AppResult<Visit> {
    let status = VisitStatus::from_str(&row.status).ok_or_else(|| {
        AppError::Internal(format!("Unknown visit status in store: {}", row.status))
    })?;
    Ok(Visit {
        id: row.id,
        visit_number: row.visit_number,
        customer_name: row.customer_name,
        customer_phone: row.customer_phone,
        plate_number: row.plate_number,
        vehicle_brand: row.vehicle_brand,
        vehicle_model: row.vehicle_model,
        complaint: row.complaint,
        diagnosis: row.diagnosis,
        mechanic_name: row.mechanic_name,
        status,
        service_fee: row.service_fee,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

const VISIT_COLUMNS: &str = r#"
    id, visit_number, customer_name, customer_phone, plate_number, vehicle_brand,
    vehicle_model, complaint, diagnosis, mechanic_name, status, service_fee,
    created_at, updated_at
"#;

impl VisitService {
    /// Create a new VisitService instance
    pub fn new(db: PgPool, visit_prefix: &str) -> Self {
        Self {
            db,
            visit_prefix: visit_prefix.to_string(),
        }
    }

    /// Check in a vehicle, assigning the next visit number for today.
    pub async fn create_visit(&self, input: &CreateVisitInput) -> AppResult<Visit> {
        if input.customer_name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "customer_name".to_string(),
                message: "Customer name cannot be empty".to_string(),
                message_id: "Nama pelanggan tidak boleh kosong".to_string(),
            });
        }
        if let Err(msg) = validate_plate_number(&input.plate_number) {
            return Err(AppError::Validation {
                field: "plate_number".to_string(),
                message: msg.to_string(),
                message_id: "Nomor polisi tidak valid".to_string(),
            });
        }

        let mut attempt = 0;
        loop {
            let result = self.try_create_visit(input).await;
            match result {
                Err(e) if e.is_retryable() && attempt + 1 < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    tracing::debug!("Visit number collision, retrying (attempt {})", attempt + 1);
                }
                other => return other,
            }
        }
    }

    async fn try_create_visit(&self, input: &CreateVisitInput) -> AppResult<Visit> {
        let today = Utc::now().date_naive();

        let mut tx = self.db.begin().await?;
        let visit_number = self.next_visit_number(&mut tx, today).await?;

        let insert = sqlx::query_as::<_, VisitRow>(&format!(
            r#"
            INSERT INTO visits (visit_number, customer_name, customer_phone, plate_number,
                                vehicle_brand, vehicle_model, complaint, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'checked_in')
            RETURNING {VISIT_COLUMNS}
            "#
        ))
        .bind(&visit_number)
        .bind(input.customer_name.trim())
        .bind(&input.customer_phone)
        .bind(input.plate_number.trim())
        .bind(&input.vehicle_brand)
        .bind(&input.vehicle_model)
        .bind(&input.complaint)
        .fetch_one(&mut *tx)
        .await;

        let row = match insert {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                // Another check-in took this number first
                return Err(AppError::Conflict {
                    resource: "visit_number".to_string(),
                    message: format!("Visit number {} was taken concurrently", visit_number),
                    message_id: format!("Nomor kunjungan {} sudah terpakai", visit_number),
                });
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;
        visit_from_row(row)
    }

    /// Next sequential number for `date`: read the day's maximum, add one.
    /// Bounded by the three-digit suffix; exceeding it fails loudly.
    async fn next_visit_number(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        date: NaiveDate,
    ) -> AppResult<String> {
        let day_prefix = visit_number_day_prefix(&self.visit_prefix, date);

        let last = sqlx::query_scalar::<_, String>(
            r#"
            SELECT visit_number FROM visits
            WHERE visit_number LIKE $1 || '-%'
            ORDER BY visit_number DESC
            LIMIT 1
            "#,
        )
        .bind(&day_prefix)
        .fetch_optional(&mut **tx)
        .await?;

        let next = match last {
            Some(number) => parse_visit_sequence(&number, &day_prefix)
                .ok_or_else(|| {
                    AppError::Internal(format!("Malformed visit number in store: {}", number))
                })?
                .checked_add(1)
                .ok_or_else(|| AppError::Internal("Visit sequence overflow".to_string()))?,
            None => 1,
        };

        if next > DAILY_VISIT_CAP {
            return Err(AppError::InvariantViolation(format!(
                "Daily visit capacity of {} exhausted for {}",
                DAILY_VISIT_CAP, day_prefix
            )));
        }

        Ok(format_visit_number(&self.visit_prefix, date, next))
    }

    /// Get a visit by id
    pub async fn get_visit(&self, visit_id: Uuid) -> AppResult<Visit> {
        let row = sqlx::query_as::<_, VisitRow>(&format!(
            "SELECT {VISIT_COLUMNS} FROM visits WHERE id = $1"
        ))
        .bind(visit_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Visit".to_string()))?;

        visit_from_row(row)
    }

    /// List visits for the worklist, newest first
    pub async fn list_visits(&self, filter: VisitFilter) -> AppResult<PaginatedResponse<Visit>> {
        if let Some(status) = filter.status.as_deref() {
            if VisitStatus::from_str(status).is_none() {
                return Err(AppError::Validation {
                    field: "status".to_string(),
                    message: "Invalid visit status".to_string(),
                    message_id: "Status kunjungan tidak valid".to_string(),
                });
            }
        }
        let pagination = Pagination::from_query(filter.page, filter.per_page);
        let q = filter.q.as_ref().map(|q| q.trim().to_string());

        let total_items = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM visits
            WHERE ($1::text IS NULL OR plate_number ILIKE '%' || $1 || '%'
                                    OR customer_name ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR status = $2)
              AND ($3::date IS NULL OR created_at::date = $3)
            "#,
        )
        .bind(&q)
        .bind(&filter.status)
        .bind(filter.date)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, VisitRow>(&format!(
            r#"
            SELECT {VISIT_COLUMNS} FROM visits
            WHERE ($1::text IS NULL OR plate_number ILIKE '%' || $1 || '%'
                                    OR customer_name ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR status = $2)
              AND ($3::date IS NULL OR created_at::date = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(&q)
        .bind(&filter.status)
        .bind(filter.date)
        .bind(i64::from(pagination.limit()))
        .bind(i64::from(pagination.offset()))
        .fetch_all(&self.db)
        .await?;

        let visits = rows
            .into_iter()
            .map(visit_from_row)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse::new(
            visits,
            pagination,
            total_items as u64,
        ))
    }

    /// Update intake fields and the service fee
    pub async fn update_visit(&self, visit_id: Uuid, input: UpdateVisitInput) -> AppResult<Visit> {
        let existing = self.get_visit(visit_id).await?;

        let service_fee = input.service_fee.unwrap_or(existing.service_fee);
        if service_fee < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "service_fee".to_string(),
                message: "Service fee cannot be negative".to_string(),
                message_id: "Biaya jasa tidak boleh negatif".to_string(),
            });
        }
        let customer_name = input.customer_name.unwrap_or(existing.customer_name);
        let customer_phone = input.customer_phone.unwrap_or(existing.customer_phone);
        let vehicle_brand = input.vehicle_brand.unwrap_or(existing.vehicle_brand);
        let vehicle_model = input.vehicle_model.unwrap_or(existing.vehicle_model);
        let complaint = input.complaint.unwrap_or(existing.complaint);

        let row = sqlx::query_as::<_, VisitRow>(&format!(
            r#"
            UPDATE visits
            SET customer_name = $1, customer_phone = $2, vehicle_brand = $3,
                vehicle_model = $4, complaint = $5, service_fee = $6, updated_at = NOW()
            WHERE id = $7
            RETURNING {VISIT_COLUMNS}
            "#
        ))
        .bind(&customer_name)
        .bind(&customer_phone)
        .bind(&vehicle_brand)
        .bind(&vehicle_model)
        .bind(&complaint)
        .bind(service_fee)
        .bind(visit_id)
        .fetch_one(&self.db)
        .await?;

        visit_from_row(row)
    }

    /// Move a visit one step along the worklist
    pub async fn update_status(&self, visit_id: Uuid, status: &str) -> AppResult<Visit> {
        let next = VisitStatus::from_str(status).ok_or_else(|| AppError::Validation {
            field: "status".to_string(),
            message: "Invalid visit status".to_string(),
            message_id: "Status kunjungan tidak valid".to_string(),
        })?;

        let existing = self.get_visit(visit_id).await?;
        if !existing.status.can_transition_to(next) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot move visit {} from {} to {}",
                existing.visit_number,
                existing.status.as_str(),
                next.as_str()
            )));
        }

        let row = sqlx::query_as::<_, VisitRow>(&format!(
            r#"
            UPDATE visits SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {VISIT_COLUMNS}
            "#
        ))
        .bind(next.as_str())
        .bind(visit_id)
        .fetch_one(&self.db)
        .await?;

        visit_from_row(row)
    }

    /// Record the diagnosis, attributed to the mechanic who entered it
    pub async fn set_diagnosis(
        &self,
        visit_id: Uuid,
        input: DiagnosisInput,
        mechanic_name: &str,
    ) -> AppResult<Visit> {
        if input.diagnosis.trim().is_empty() {
            return Err(AppError::Validation {
                field: "diagnosis".to_string(),
                message: "Diagnosis cannot be empty".to_string(),
                message_id: "Diagnosis tidak boleh kosong".to_string(),
            });
        }
        self.get_visit(visit_id).await?;

        let row = sqlx::query_as::<_, VisitRow>(&format!(
            r#"
            UPDATE visits SET diagnosis = $1, mechanic_name = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING {VISIT_COLUMNS}
            "#
        ))
        .bind(input.diagnosis.trim())
        .bind(mechanic_name)
        .bind(visit_id)
        .fetch_one(&self.db)
        .await?;

        visit_from_row(row)
    }

    /// Take a spare part from stock for a visit. The stock-out goes
    /// through the same version-guarded, audited path as every other
    /// stock write; the billed price is snapshotted on the usage row.
    pub async fn use_spare_part(
        &self,
        visit_id: Uuid,
        input: &UsePartInput,
        performed_by: &str,
    ) -> AppResult<PartUsage> {
        if input.quantity <= 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity must be positive".to_string(),
                message_id: "Jumlah harus lebih dari nol".to_string(),
            });
        }

        let mut attempt = 0;
        loop {
            let result = self.try_use_spare_part(visit_id, input, performed_by).await;
            match result {
                Err(e) if e.is_retryable() && attempt + 1 < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_use_spare_part(
        &self,
        visit_id: Uuid,
        input: &UsePartInput,
        performed_by: &str,
    ) -> AppResult<PartUsage> {
        let visit = self.get_visit(visit_id).await?;
        if visit.status == VisitStatus::Delivered {
            return Err(AppError::InvalidStateTransition(format!(
                "Visit {} is already delivered",
                visit.visit_number
            )));
        }

        let mut tx = self.db.begin().await?;

        let (code, name) = sqlx::query_as::<_, (String, String)>(
            "SELECT code, name FROM spare_parts WHERE id = $1 AND NOT is_deleted",
        )
        .bind(input.spare_part_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Spare part".to_string()))?;

        let unit_price = match input.unit_price {
            Some(price) if price >= Decimal::ZERO => price,
            Some(_) => {
                return Err(AppError::Validation {
                    field: "unit_price".to_string(),
                    message: "Unit price cannot be negative".to_string(),
                    message_id: "Harga satuan tidak boleh negatif".to_string(),
                })
            }
            None => sqlx::query_scalar::<_, Decimal>(
                r#"
                SELECT price FROM sell_prices
                WHERE spare_part_id = $1
                ORDER BY created_at DESC
                LIMIT 1
                "#,
            )
            .bind(input.spare_part_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::Validation {
                field: "unit_price".to_string(),
                message: format!("{} has no sell price; provide unit_price explicitly", code),
                message_id: format!("{} belum punya harga jual; isi unit_price", code),
            })?,
        };

        apply_stock_mutation(
            &mut tx,
            StockMutation {
                spare_part_id: input.spare_part_id,
                delta: -input.quantity,
                new_cost_price: None,
                reason: "usage",
                reference_id: Some(visit_id),
                performed_by,
                on_negative: NegativeStockError::Insufficient,
            },
        )
        .await?;

        let usage = sqlx::query_as::<_, PartUsage>(
            r#"
            INSERT INTO visit_part_usages (visit_id, spare_part_id, spare_part_code,
                                           spare_part_name, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, visit_id, spare_part_id, spare_part_code, spare_part_name,
                      quantity, unit_price, created_at
            "#,
        )
        .bind(visit_id)
        .bind(input.spare_part_id)
        .bind(&code)
        .bind(&name)
        .bind(input.quantity)
        .bind(unit_price)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(usage)
    }

    /// Remove a usage line, returning its quantity to stock
    pub async fn remove_part_usage(
        &self,
        visit_id: Uuid,
        usage_id: Uuid,
        performed_by: &str,
    ) -> AppResult<()> {
        let mut attempt = 0;
        loop {
            let result = self
                .try_remove_part_usage(visit_id, usage_id, performed_by)
                .await;
            match result {
                Err(e) if e.is_retryable() && attempt + 1 < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_remove_part_usage(
        &self,
        visit_id: Uuid,
        usage_id: Uuid,
        performed_by: &str,
    ) -> AppResult<()> {
        let visit = self.get_visit(visit_id).await?;
        if visit.status == VisitStatus::Delivered {
            return Err(AppError::InvalidStateTransition(format!(
                "Visit {} is already delivered",
                visit.visit_number
            )));
        }

        let mut tx = self.db.begin().await?;

        let usage = sqlx::query_as::<_, PartUsage>(
            r#"
            SELECT id, visit_id, spare_part_id, spare_part_code, spare_part_name,
                   quantity, unit_price, created_at
            FROM visit_part_usages
            WHERE id = $1 AND visit_id = $2
            FOR UPDATE
            "#,
        )
        .bind(usage_id)
        .bind(visit_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Part usage".to_string()))?;

        apply_stock_mutation(
            &mut tx,
            StockMutation {
                spare_part_id: usage.spare_part_id,
                delta: usage.quantity,
                new_cost_price: None,
                reason: "usage-reversal",
                reference_id: Some(usage.id),
                performed_by,
                on_negative: NegativeStockError::Invariant,
            },
        )
        .await?;

        sqlx::query("DELETE FROM visit_part_usages WHERE id = $1")
            .bind(usage.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// List the parts used on a visit in entry order
    pub async fn list_part_usages(&self, visit_id: Uuid) -> AppResult<Vec<PartUsage>> {
        self.get_visit(visit_id).await?;

        let usages = sqlx::query_as::<_, PartUsage>(
            r#"
            SELECT id, visit_id, spare_part_id, spare_part_code, spare_part_name,
                   quantity, unit_price, created_at
            FROM visit_part_usages
            WHERE visit_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(visit_id)
        .fetch_all(&self.db)
        .await?;

        Ok(usages)
    }

    /// Billing summary: parts used plus the service fee
    pub async fn get_bill(&self, visit_id: Uuid) -> AppResult<VisitBill> {
        let visit = self.get_visit(visit_id).await?;
        let usages = self.list_part_usages(visit_id).await?;

        let lines: Vec<VisitBillLine> = usages
            .into_iter()
            .map(|u| VisitBillLine {
                spare_part_code: u.spare_part_code,
                spare_part_name: u.spare_part_name,
                quantity: u.quantity,
                unit_price: u.unit_price,
                line_total: u.unit_price * Decimal::from(u.quantity),
            })
            .collect();

        let parts_total = bill_parts_total(&lines);
        Ok(VisitBill {
            visit_id: visit.id,
            visit_number: visit.visit_number,
            lines,
            parts_total,
            service_fee: visit.service_fee,
            grand_total: parts_total + visit.service_fee,
        })
    }
}
