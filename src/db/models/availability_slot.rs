use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::{Date, OffsetDateTime, Time, Weekday};
use validator::Validate;

/// One bookable civil hour declared by a tutor. Unique per
/// `(tutor_id, date, start)`; `end` is always `start + 1h`.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub tutor_id: String,
    pub date: Date,
    #[sqlx(rename = "start_hour")]
    pub start: Time,
    #[sqlx(rename = "end_hour")]
    pub end: Time,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewAvailabilitySlot {
    pub tutor_id: String,
    pub date: Date,
    pub start: Time,
    pub end: Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn weekday(self) -> Weekday {
        match self {
            DayOfWeek::Monday => Weekday::Monday,
            DayOfWeek::Tuesday => Weekday::Tuesday,
            DayOfWeek::Wednesday => Weekday::Wednesday,
            DayOfWeek::Thursday => Weekday::Thursday,
            DayOfWeek::Friday => Weekday::Friday,
            DayOfWeek::Saturday => Weekday::Saturday,
            DayOfWeek::Sunday => Weekday::Sunday,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkAvailabilityRequest {
    pub from_date: Date,
    pub to_date: Date,
    #[validate(length(min = 1, message = "fromHour is required"))]
    pub from_hour: String,
    /// Exclusive upper bound, e.g. "17:00" creates nothing past 16:00-17:00.
    #[validate(length(min = 1, message = "toHour is required"))]
    pub to_hour: String,
    pub days_of_week: Option<Vec<DayOfWeek>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DayAvailabilityUpdateRequest {
    #[validate(length(min = 1, message = "hours must not be empty"))]
    pub hours: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddAvailabilityRequest {
    pub date: Date,
    #[validate(length(min = 1, message = "hours must not be empty"))]
    pub hours: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAvailabilityResponse {
    pub message: String,
    pub date: Date,
    pub added_count: usize,
    pub requested_count: usize,
}
