//! HTTP handlers for spare-part inventory endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::inventory::{
    AdjustStockInput, CreateSellPriceInput, CreateSparePartInput, InventoryAudit, InventoryService,
    InventoryStats, SellPrice, SparePart, SparePartFilter, UpdateSparePartInput,
};
use crate::AppState;
use shared::PaginatedResponse;

/// Create a spare part
pub async fn create_spare_part(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSparePartInput>,
) -> AppResult<(StatusCode, Json<SparePart>)> {
    require_admin(&current_user.0)?;
    let service = InventoryService::new(state.db);
    let part = service
        .create_spare_part(input, &current_user.0.name)
        .await?;
    Ok((StatusCode::CREATED, Json(part)))
}

/// Get a spare part by id
pub async fn get_spare_part(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(part_id): Path<Uuid>,
) -> AppResult<Json<SparePart>> {
    let service = InventoryService::new(state.db);
    let part = service.get_spare_part(part_id).await?;
    Ok(Json(part))
}

/// List spare parts with filters and pagination
pub async fn list_spare_parts(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<SparePartFilter>,
) -> AppResult<Json<PaginatedResponse<SparePart>>> {
    let service = InventoryService::new(state.db);
    let page = service.list_spare_parts(filter).await?;
    Ok(Json(page))
}

/// Update a spare part's descriptive fields
pub async fn update_spare_part(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(part_id): Path<Uuid>,
    Json(input): Json<UpdateSparePartInput>,
) -> AppResult<Json<SparePart>> {
    require_admin(&current_user.0)?;
    let service = InventoryService::new(state.db);
    let part = service.update_spare_part(part_id, input).await?;
    Ok(Json(part))
}

/// Soft-delete a spare part
pub async fn delete_spare_part(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(part_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    require_admin(&current_user.0)?;
    let service = InventoryService::new(state.db);
    service.soft_delete_spare_part(part_id).await?;
    Ok(Json(()))
}

/// Apply a manual stock correction
pub async fn adjust_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(part_id): Path<Uuid>,
    Json(input): Json<AdjustStockInput>,
) -> AppResult<Json<SparePart>> {
    require_admin(&current_user.0)?;
    let service = InventoryService::new(state.db);
    let part = service
        .adjust_stock(part_id, &input, &current_user.0.name)
        .await?;
    Ok(Json(part))
}

/// Append a sell price entry for a part
pub async fn add_sell_price(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(part_id): Path<Uuid>,
    Json(input): Json<CreateSellPriceInput>,
) -> AppResult<(StatusCode, Json<SellPrice>)> {
    require_admin(&current_user.0)?;
    let service = InventoryService::new(state.db);
    let price = service.add_sell_price(part_id, input).await?;
    Ok((StatusCode::CREATED, Json(price)))
}

/// List sell prices for a part, newest first
pub async fn list_sell_prices(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(part_id): Path<Uuid>,
) -> AppResult<Json<Vec<SellPrice>>> {
    let service = InventoryService::new(state.db);
    let prices = service.list_sell_prices(part_id).await?;
    Ok(Json(prices))
}

/// Get the stock audit trail for a part
pub async fn get_audit_trail(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(part_id): Path<Uuid>,
) -> AppResult<Json<Vec<InventoryAudit>>> {
    require_admin(&current_user.0)?;
    let service = InventoryService::new(state.db);
    let audits = service.get_audit_trail(part_id).await?;
    Ok(Json(audits))
}

/// Inventory dashboard statistics
pub async fn get_inventory_stats(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<InventoryStats>> {
    let service = InventoryService::new(state.db);
    let stats = service.get_stats().await?;
    Ok(Json(stats))
}
