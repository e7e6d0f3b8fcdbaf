use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::{Date, OffsetDateTime, Time};
use validator::Validate;

/// Stored reservation status. `Finalizada` and `Incumplida` are legacy
/// stored values accepted for correction flows; the engine itself only ever
/// writes `Pendiente`, `Aceptado` and `Cancelado` — the finished states are
/// derived at read time (see [`DisplayStatus`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "reservation_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ReservationStatus {
    Pendiente,
    Aceptado,
    Cancelado,
    Finalizada,
    Incumplida,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pendiente => "PENDIENTE",
            ReservationStatus::Aceptado => "ACEPTADO",
            ReservationStatus::Cancelado => "CANCELADO",
            ReservationStatus::Finalizada => "FINALIZADA",
            ReservationStatus::Incumplida => "INCUMPLIDA",
        }
    }

    /// A reservation in this state blocks the tutor's hour.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Pendiente | ReservationStatus::Aceptado
        )
    }
}

/// Derived, never-persisted status shown to humans. Kept as a separate type
/// so a derived value can not accidentally be written back to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DisplayStatus {
    Pendiente,
    Aceptado,
    Activa,
    Cancelado,
    Finalizada,
    Incumplida,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub tutor_id: String,
    pub student_id: String,
    pub date: Date,
    #[sqlx(rename = "start_hour")]
    pub start: Time,
    #[sqlx(rename = "end_hour")]
    pub end: Time,
    pub status: ReservationStatus,
    pub attended: Option<bool>,
    pub version: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub tutor_id: String,
    pub student_id: String,
    pub date: Date,
    pub start: Time,
    pub end: Time,
    pub status: ReservationStatus,
    pub attended: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReservationCreateRequest {
    #[validate(length(min = 1, message = "tutorId is required"))]
    pub tutor_id: String,
    pub date: Date,
    #[validate(length(min = 1, message = "hour is required"))]
    pub hour: String,
}

/// Reservation enriched for display: derived status plus the public
/// profiles of both parties.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationView {
    pub id: Uuid,
    pub tutor_id: String,
    pub student_id: String,
    pub date: Date,
    pub start: Time,
    pub end: Time,
    pub status: DisplayStatus,
    pub attended: Option<bool>,
    pub student_name: String,
    pub student_avatar: Option<String>,
    pub tutor_name: String,
    pub tutor_avatar: Option<String>,
}
