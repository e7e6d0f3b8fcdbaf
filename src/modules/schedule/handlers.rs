use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use time::Date;

use crate::app_state::AppState;
use crate::db::models::ScheduleCell;
use crate::error::AppResult;
use crate::security::CurrentUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekQuery {
    pub week_start: Date,
}

pub async fn week(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(tutor_id): Path<String>,
    Query(query): Query<WeekQuery>,
) -> AppResult<Json<Vec<ScheduleCell>>> {
    user.require_any_role(&["STUDENT", "TUTOR"])?;
    state
        .schedule
        .week_for_tutor(&tutor_id, query.week_start)
        .await
        .map(Json)
}
