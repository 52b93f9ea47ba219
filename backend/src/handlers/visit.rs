//! HTTP handlers for workshop visit endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::visit::{
    CreateVisitInput, DiagnosisInput, PartUsage, UpdateVisitInput, UsePartInput, VisitFilter,
    VisitService,
};
use crate::AppState;
use shared::{PaginatedResponse, Visit, VisitBill};

fn visit_service(state: &AppState) -> VisitService {
    VisitService::new(state.db.clone(), &state.config.workshop.visit_prefix)
}

/// Check in a vehicle
pub async fn create_visit(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<CreateVisitInput>,
) -> AppResult<(StatusCode, Json<Visit>)> {
    let service = visit_service(&state);
    let visit = service.create_visit(&input).await?;
    Ok((StatusCode::CREATED, Json(visit)))
}

/// Get a visit by id
pub async fn get_visit(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(visit_id): Path<Uuid>,
) -> AppResult<Json<Visit>> {
    let service = visit_service(&state);
    let visit = service.get_visit(visit_id).await?;
    Ok(Json(visit))
}

/// List visits for the worklist
pub async fn list_visits(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<VisitFilter>,
) -> AppResult<Json<PaginatedResponse<Visit>>> {
    let service = visit_service(&state);
    let page = service.list_visits(filter).await?;
    Ok(Json(page))
}

/// Update intake details and the service fee
pub async fn update_visit(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(visit_id): Path<Uuid>,
    Json(input): Json<UpdateVisitInput>,
) -> AppResult<Json<Visit>> {
    let service = visit_service(&state);
    let visit = service.update_visit(visit_id, input).await?;
    Ok(Json(visit))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Move a visit to the next worklist status
pub async fn update_visit_status(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(visit_id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> AppResult<Json<Visit>> {
    let service = visit_service(&state);
    let visit = service.update_status(visit_id, &body.status).await?;
    Ok(Json(visit))
}

/// Record the diagnosis for a visit
pub async fn set_diagnosis(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(visit_id): Path<Uuid>,
    Json(input): Json<DiagnosisInput>,
) -> AppResult<Json<Visit>> {
    let service = visit_service(&state);
    let visit = service
        .set_diagnosis(visit_id, input, &current_user.0.name)
        .await?;
    Ok(Json(visit))
}

/// Take a spare part from stock for this visit
pub async fn use_spare_part(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(visit_id): Path<Uuid>,
    Json(input): Json<UsePartInput>,
) -> AppResult<(StatusCode, Json<PartUsage>)> {
    let service = visit_service(&state);
    let usage = service
        .use_spare_part(visit_id, &input, &current_user.0.name)
        .await?;
    Ok((StatusCode::CREATED, Json(usage)))
}

/// Remove a usage line, returning stock
pub async fn remove_part_usage(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((visit_id, usage_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<()>> {
    let service = visit_service(&state);
    service
        .remove_part_usage(visit_id, usage_id, &current_user.0.name)
        .await?;
    Ok(Json(()))
}

/// List parts used on a visit
pub async fn list_part_usages(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(visit_id): Path<Uuid>,
) -> AppResult<Json<Vec<PartUsage>>> {
    let service = visit_service(&state);
    let usages = service.list_part_usages(visit_id).await?;
    Ok(Json(usages))
}

/// Billing summary for a visit
pub async fn get_visit_bill(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(visit_id): Path<Uuid>,
) -> AppResult<Json<VisitBill>> {
    let service = visit_service(&state);
    let bill = service.get_bill(visit_id).await?;
    Ok(Json(bill))
}
