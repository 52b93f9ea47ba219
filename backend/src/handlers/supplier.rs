//! HTTP handlers for supplier endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::supplier::{Supplier, SupplierFilter, SupplierInput, SupplierService};
use crate::AppState;
use shared::PaginatedResponse;

/// Create a supplier
pub async fn create_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<SupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    require_admin(&current_user.0)?;
    let service = SupplierService::new(state.db);
    let supplier = service.create_supplier(&input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// Get a supplier by id
pub async fn get_supplier(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<Supplier>> {
    let service = SupplierService::new(state.db);
    let supplier = service.get_supplier(supplier_id).await?;
    Ok(Json(supplier))
}

/// List suppliers
pub async fn list_suppliers(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<SupplierFilter>,
) -> AppResult<Json<PaginatedResponse<Supplier>>> {
    let service = SupplierService::new(state.db);
    let page = service.list_suppliers(filter).await?;
    Ok(Json(page))
}

/// Update a supplier
pub async fn update_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
    Json(input): Json<SupplierInput>,
) -> AppResult<Json<Supplier>> {
    require_admin(&current_user.0)?;
    let service = SupplierService::new(state.db);
    let supplier = service.update_supplier(supplier_id, &input).await?;
    Ok(Json(supplier))
}

/// Delete a supplier
pub async fn delete_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    require_admin(&current_user.0)?;
    let service = SupplierService::new(state.db);
    service.delete_supplier(supplier_id).await?;
    Ok(Json(()))
}
