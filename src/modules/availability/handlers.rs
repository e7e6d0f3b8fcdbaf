use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use time::{Date, Time};
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::models::{
    AddAvailabilityRequest, AddAvailabilityResponse, AvailabilitySlot, BulkAvailabilityRequest,
    DayAvailabilityUpdateRequest,
};
use crate::error::AppResult;
use crate::security::CurrentUser;
use crate::time_util::parse_hour;

const TUTOR_ROLE: &str = "TUTOR";

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: Date,
    pub to: Date,
}

pub async fn bulk(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(req): Json<BulkAvailabilityRequest>,
) -> AppResult<Json<Vec<AvailabilitySlot>>> {
    user.require_role(TUTOR_ROLE)?;
    req.validate()?;
    state
        .availability
        .bulk_create(&user.id, &req)
        .await
        .map(Json)
}

pub async fn my(
    user: CurrentUser,
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> AppResult<Json<Vec<AvailabilitySlot>>> {
    user.require_role(TUTOR_ROLE)?;
    state
        .availability
        .my_slots(&user.id, range.from, range.to)
        .await
        .map(Json)
}

pub async fn delete_slot(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(slot_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require_role(TUTOR_ROLE)?;

    // The deletion guard is composed here: the availability engine only
    // receives the already-computed flag.
    let has_active_reservation = match state.availability.slot_by_id(slot_id).await? {
        Some(slot) => {
            state
                .reservations
                .has_active_reservation_for_tutor_at(&user.id, slot.date, slot.start)
                .await?
        }
        None => false,
    };

    state
        .availability
        .delete_own_slot(&user.id, slot_id, has_active_reservation)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn replace_day(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(date): Path<Date>,
    Json(req): Json<DayAvailabilityUpdateRequest>,
) -> AppResult<StatusCode> {
    user.require_role(TUTOR_ROLE)?;
    req.validate()?;

    let requested: Vec<Time> = req
        .hours
        .iter()
        .map(|h| parse_hour(h))
        .collect::<Result<_, _>>()?;

    // Hours with an active reservation are protected from deletion, even
    // when the tutor leaves them out of the request.
    let existing = state.availability.slots_for_day(&user.id, date).await?;
    let mut protected = HashSet::new();
    for slot in &existing {
        if state
            .reservations
            .has_active_reservation_for_tutor_at(&user.id, date, slot.start)
            .await?
        {
            protected.insert(slot.start);
        }
    }

    state
        .availability
        .replace_day(&user.id, date, &requested, &protected)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(req): Json<AddAvailabilityRequest>,
) -> AppResult<Json<AddAvailabilityResponse>> {
    user.require_role(TUTOR_ROLE)?;
    req.validate()?;

    let hours: Vec<Time> = req
        .hours
        .iter()
        .map(|h| parse_hour(h))
        .collect::<Result<_, _>>()?;

    let added = state
        .availability
        .add_availability(&user.id, req.date, &hours)
        .await?;

    Ok(Json(AddAvailabilityResponse {
        message: "Disponibilidad agregada".to_string(),
        date: req.date,
        added_count: added,
        requested_count: hours.len(),
    }))
}
