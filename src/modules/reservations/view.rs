use std::sync::Arc;

use time::PrimitiveDateTime;

use crate::db::models::{DisplayStatus, Reservation, ReservationStatus, ReservationView};
use crate::security::UserServiceClient;
use crate::time_util::{datetime, slot_end, Clock};

/// Derive the status shown to humans from the stored status, the clock and
/// the attendance flag. Pure: never touches storage.
pub fn display_status(reservation: &Reservation, now: PrimitiveDateTime) -> DisplayStatus {
    match reservation.status {
        ReservationStatus::Pendiente => DisplayStatus::Pendiente,
        ReservationStatus::Cancelado => DisplayStatus::Cancelado,
        ReservationStatus::Finalizada => DisplayStatus::Finalizada,
        ReservationStatus::Incumplida => DisplayStatus::Incumplida,
        ReservationStatus::Aceptado => {
            let start = datetime(reservation.date, reservation.start);
            let end = slot_end(reservation.date, reservation.start);
            if now < start {
                DisplayStatus::Aceptado
            } else if now < end {
                DisplayStatus::Activa
            } else if reservation.attended == Some(true) {
                DisplayStatus::Finalizada
            } else {
                DisplayStatus::Incumplida
            }
        }
    }
}

/// Composes reservation entities with their derived status and the public
/// profiles of both parties.
pub struct ReservationViewAssembler {
    users: Arc<UserServiceClient>,
    clock: Arc<dyn Clock>,
}

impl ReservationViewAssembler {
    pub fn new(users: Arc<UserServiceClient>, clock: Arc<dyn Clock>) -> Self {
        Self { users, clock }
    }

    pub async fn to_view(&self, reservation: &Reservation) -> ReservationView {
        let student = self.users.public_profile(&reservation.student_id).await;
        let tutor = self.users.public_profile(&reservation.tutor_id).await;

        ReservationView {
            id: reservation.id,
            tutor_id: reservation.tutor_id.clone(),
            student_id: reservation.student_id.clone(),
            date: reservation.date,
            start: reservation.start,
            end: reservation.end,
            status: display_status(reservation, self.clock.now()),
            attended: reservation.attended,
            student_name: student
                .as_ref()
                .and_then(|p| p.name.clone())
                .unwrap_or_else(|| "Estudiante".to_string()),
            student_avatar: student.and_then(|p| p.avatar_url),
            tutor_name: tutor
                .as_ref()
                .and_then(|p| p.name.clone())
                .unwrap_or_else(|| "Tutor".to_string()),
            tutor_avatar: tutor.and_then(|p| p.avatar_url),
        }
    }
}
