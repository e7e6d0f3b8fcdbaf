use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use serde::Deserialize;
use time::Date;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::models::{
    Reservation, ReservationCreateRequest, ReservationStatus, ReservationView,
};
use crate::error::{AppError, AppResult};
use crate::security::{CurrentUser, RolesResponse};

const STUDENT_ROLE: &str = "STUDENT";
const TUTOR_ROLE: &str = "TUTOR";

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<Date>,
    pub to: Option<Date>,
}

#[derive(Debug, Deserialize)]
pub struct AttendedQuery {
    pub value: bool,
}

pub async fn create(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(req): Json<ReservationCreateRequest>,
) -> AppResult<Json<Reservation>> {
    user.require_role(STUDENT_ROLE)?;
    req.validate()?;
    state.reservations.create(&user.id, &req).await.map(Json)
}

pub async fn my(
    user: CurrentUser,
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> AppResult<Json<Vec<Reservation>>> {
    state
        .reservations
        .my_reservations(&user.id, range.from, range.to)
        .await
        .map(Json)
}

pub async fn for_me(
    user: CurrentUser,
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> AppResult<Json<Vec<Reservation>>> {
    state
        .reservations
        .reservations_for_tutor(&user.id, range.from, range.to)
        .await
        .map(Json)
}

pub async fn by_id(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Reservation>> {
    let reservation = state
        .reservations
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("reservation not found".to_string()))?;
    if user.id != reservation.student_id && user.id != reservation.tutor_id {
        return Err(AppError::Forbidden(
            "not a party to this reservation".to_string(),
        ));
    }
    Ok(Json(reservation))
}

pub async fn cancel(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Reservation>> {
    state
        .reservations
        .change_status(&user.id, id, ReservationStatus::Cancelado)
        .await
        .map(Json)
}

pub async fn accept(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Reservation>> {
    user.require_role(TUTOR_ROLE)?;
    state
        .reservations
        .change_status(&user.id, id, ReservationStatus::Aceptado)
        .await
        .map(Json)
}

pub async fn attended(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AttendedQuery>,
) -> AppResult<Json<Reservation>> {
    state
        .reservations
        .set_attended(&user.id, id, query.value)
        .await
        .map(Json)
}

pub async fn views_by_tutor(
    State(state): State<AppState>,
    Path(tutor_id): Path<String>,
) -> AppResult<Json<Vec<ReservationView>>> {
    state.queries.list_by_tutor(&tutor_id).await.map(Json)
}

pub async fn views_by_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> AppResult<Json<Vec<ReservationView>>> {
    state.queries.list_by_student(&student_id).await.map(Json)
}

/// Roles proxy for the frontend: forwards the caller's bearer token to the
/// user service and returns the resolved identity.
pub async fn my_roles(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<RolesResponse>> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Authentication("missing Authorization header".to_string()))?;
    state.users.my_roles(bearer).await.map(Json)
}
