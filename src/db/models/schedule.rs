use serde::Serialize;
use sqlx::types::Uuid;
use time::Date;

/// One hour cell of a tutor's weekly grid. `status` is `"DISPONIBLE"` for a
/// free slot, the reservation status name when the hour is booked, and
/// absent when the tutor is not available at all.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCell {
    pub date: Date,
    pub hour: String,
    pub status: Option<String>,
    pub reservation_id: Option<Uuid>,
    pub student_id: Option<String>,
}
