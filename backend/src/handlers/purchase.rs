//! HTTP handlers for purchasing endpoints
//!
//! Purchase groups have no synthetic id; group endpoints take the
//! natural key (supplier_id, supplier_ref_number) as query parameters.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::purchase::{
    CreatePurchaseBatchInput, CreatePurchaseInput, Purchase, PurchaseGroup, PurchaseGroupKey,
    PurchaseGroupSummary, PurchaseService, UpdatePurchaseGroupInput,
};
use crate::AppState;
use shared::{PaginatedResponse, Pagination};

/// Record a single-line purchase
pub async fn create_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreatePurchaseInput>,
) -> AppResult<(StatusCode, Json<Purchase>)> {
    require_admin(&current_user.0)?;
    let service = PurchaseService::new(state.db);
    let purchase = service.create_purchase(&input, &current_user.0.name).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

/// Record a multi-line purchase under one reference number
pub async fn create_purchase_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreatePurchaseBatchInput>,
) -> AppResult<(StatusCode, Json<PurchaseGroup>)> {
    require_admin(&current_user.0)?;
    let service = PurchaseService::new(state.db);
    let group = service
        .create_purchase_batch(&input, &current_user.0.name)
        .await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// Get a single purchase line by id
pub async fn get_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(purchase_id): Path<Uuid>,
) -> AppResult<Json<Purchase>> {
    require_admin(&current_user.0)?;
    let service = PurchaseService::new(state.db);
    let purchase = service.get_purchase(purchase_id).await?;
    Ok(Json(purchase))
}

/// Get a purchase group by its natural key
pub async fn get_purchase_group(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(key): Query<PurchaseGroupKey>,
) -> AppResult<Json<PurchaseGroup>> {
    require_admin(&current_user.0)?;
    let service = PurchaseService::new(state.db);
    let group = service.get_purchase_group(&key).await?;
    Ok(Json(group))
}

/// Replace a purchase group's item list
pub async fn update_purchase_group(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(key): Query<PurchaseGroupKey>,
    Json(input): Json<UpdatePurchaseGroupInput>,
) -> AppResult<Json<PurchaseGroup>> {
    require_admin(&current_user.0)?;
    let service = PurchaseService::new(state.db);
    let group = service
        .update_purchase_group(&key, &input, &current_user.0.name)
        .await?;
    Ok(Json(group))
}

/// Delete a purchase group, reversing its stock effects
pub async fn delete_purchase_group(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(key): Query<PurchaseGroupKey>,
) -> AppResult<Json<()>> {
    require_admin(&current_user.0)?;
    let service = PurchaseService::new(state.db);
    service
        .delete_purchase_group(&key, &current_user.0.name)
        .await?;
    Ok(Json(()))
}

/// List purchase groups, most recent first
pub async fn list_purchase_groups(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<PurchaseGroupSummary>>> {
    require_admin(&current_user.0)?;
    let service = PurchaseService::new(state.db);
    let page = service.list_purchase_groups(pagination).await?;
    Ok(Json(page))
}
