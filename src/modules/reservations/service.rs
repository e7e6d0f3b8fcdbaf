use std::sync::Arc;

use time::{Date, Duration, Time};
use tracing::info;
use uuid::Uuid;

use crate::db::models::{
    NewReservation, Reservation, ReservationCreateRequest, ReservationStatus,
};
use crate::db::repositories::{
    ReservationInsert, ReservationRepository, SlotRepository,
};
use crate::db::DatabaseError;
use crate::error::{AppError, AppResult};
use crate::time_util::{datetime, hour_after, is_on_the_hour, parse_hour, slot_end, Clock};

/// Minimum notice for cancelling a reservation.
const CANCELLATION_NOTICE: Duration = Duration::hours(12);

/// Drives the reservation lifecycle. Availability is consulted read-only at
/// creation time; the store's uniqueness constraints are the authoritative
/// guard against double-booking, the pre-checks only exist to fail early.
pub struct ReservationService {
    reservations: Arc<dyn ReservationRepository>,
    slots: Arc<dyn SlotRepository>,
    clock: Arc<dyn Clock>,
}

impl ReservationService {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        slots: Arc<dyn SlotRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reservations,
            slots,
            clock,
        }
    }

    /// Book one of the tutor's published hours for a student. The new
    /// reservation starts out `PENDIENTE`.
    pub async fn create(
        &self,
        student_id: &str,
        req: &ReservationCreateRequest,
    ) -> AppResult<Reservation> {
        let start = parse_hour(&req.hour)?;
        let end = hour_after(start);
        if !is_on_the_hour(start) || !is_on_the_hour(end) {
            return Err(AppError::Validation(
                "hour must be on the hour (HH:00)".to_string(),
            ));
        }
        if student_id == req.tutor_id {
            return Err(AppError::Validation(
                "tutor and student must be different users".to_string(),
            ));
        }
        if datetime(req.date, start) < self.clock.now() {
            return Err(AppError::Validation(
                "cannot reserve an hour in the past".to_string(),
            ));
        }

        self.slots
            .find_one(&req.tutor_id, req.date, start)
            .await?
            .ok_or_else(|| {
                AppError::Conflict("tutor has no availability at that hour".to_string())
            })?;

        if self
            .reservations
            .exists_by_student_at(student_id, req.date, start)
            .await?
            || self
                .reservations
                .exists_by_tutor_at(&req.tutor_id, req.date, start)
                .await?
        {
            return Err(AppError::Conflict(
                "a reservation already exists for that hour".to_string(),
            ));
        }

        let new = NewReservation {
            tutor_id: req.tutor_id.clone(),
            student_id: student_id.to_string(),
            date: req.date,
            start,
            end,
            status: ReservationStatus::Pendiente,
            attended: None,
        };
        match self.reservations.insert(new).await? {
            ReservationInsert::Created(reservation) => {
                info!(reservation_id = %reservation.id, tutor_id = %reservation.tutor_id,
                    "reservation created");
                Ok(reservation)
            }
            // Lost the race between the pre-check and the insert.
            ReservationInsert::Duplicate => Err(AppError::Conflict(
                "the availability slot was already reserved".to_string(),
            )),
        }
    }

    /// State machine for status changes, driven by the reservation's
    /// student or tutor. Only cancellation and acceptance are reachable
    /// through this entry point.
    pub async fn change_status(
        &self,
        actor_id: &str,
        id: Uuid,
        new_status: ReservationStatus,
    ) -> AppResult<Reservation> {
        let mut reservation = self
            .reservations
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("reservation not found".to_string()))?;

        let is_student = actor_id == reservation.student_id;
        let is_tutor = actor_id == reservation.tutor_id;
        if !is_student && !is_tutor {
            return Err(AppError::Forbidden(
                "not a party to this reservation".to_string(),
            ));
        }

        match new_status {
            ReservationStatus::Cancelado => {
                if !reservation.status.is_active() {
                    return Err(AppError::Conflict(
                        "only PENDIENTE or ACEPTADO reservations can be cancelled".to_string(),
                    ));
                }
                let until_start = datetime(reservation.date, reservation.start) - self.clock.now();
                if until_start < CANCELLATION_NOTICE {
                    return Err(AppError::Conflict(
                        "reservations cannot be cancelled less than 12 hours before start"
                            .to_string(),
                    ));
                }
            }
            ReservationStatus::Aceptado => {
                if !is_tutor {
                    return Err(AppError::Forbidden(
                        "only the tutor can accept a reservation".to_string(),
                    ));
                }
                if reservation.status != ReservationStatus::Pendiente {
                    return Err(AppError::Conflict(
                        "only PENDIENTE reservations can be accepted".to_string(),
                    ));
                }
            }
            ReservationStatus::Pendiente
            | ReservationStatus::Finalizada
            | ReservationStatus::Incumplida => {
                return Err(AppError::Conflict(format!(
                    "transition to {} is not supported",
                    new_status.as_str()
                )));
            }
        }

        let expected_version = reservation.version;
        reservation.status = new_status;
        match self.reservations.update(&reservation, expected_version).await {
            Ok(updated) => {
                info!(reservation_id = %updated.id, status = updated.status.as_str(),
                    "reservation status changed");
                Ok(updated)
            }
            Err(DatabaseError::StaleVersion) => Err(AppError::Conflict(
                "reservation was modified concurrently".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Record whether the student attended. Tutor only, and only once the
    /// class has finished. Attendance never changes the stored status; the
    /// finished display state is derived at read time.
    pub async fn set_attended(
        &self,
        actor_id: &str,
        id: Uuid,
        attended: bool,
    ) -> AppResult<Reservation> {
        let mut reservation = self
            .reservations
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("reservation not found".to_string()))?;

        if actor_id != reservation.tutor_id {
            return Err(AppError::Forbidden(
                "only the tutor can record attendance".to_string(),
            ));
        }
        match reservation.status {
            ReservationStatus::Aceptado
            | ReservationStatus::Finalizada
            | ReservationStatus::Incumplida => {}
            ReservationStatus::Pendiente | ReservationStatus::Cancelado => {
                return Err(AppError::Conflict(
                    "attendance can only be recorded for accepted classes".to_string(),
                ));
            }
        }
        if slot_end(reservation.date, reservation.start) >= self.clock.now() {
            return Err(AppError::Conflict(
                "attendance cannot be recorded until the class has finished".to_string(),
            ));
        }

        let expected_version = reservation.version;
        reservation.attended = Some(attended);
        match self.reservations.update(&reservation, expected_version).await {
            Ok(updated) => Ok(updated),
            Err(DatabaseError::StaleVersion) => Err(AppError::Conflict(
                "reservation was modified concurrently".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// True when a `PENDIENTE` or `ACEPTADO` reservation blocks the
    /// tutor's hour. Used by availability callers before removing a slot.
    pub async fn has_active_reservation_for_tutor_at(
        &self,
        tutor_id: &str,
        date: Date,
        start: Time,
    ) -> AppResult<bool> {
        Ok(self
            .reservations
            .find_one_by_tutor_at(tutor_id, date, start)
            .await?
            .map(|r| r.status.is_active())
            .unwrap_or(false))
    }

    pub async fn my_reservations(
        &self,
        student_id: &str,
        from: Option<Date>,
        to: Option<Date>,
    ) -> AppResult<Vec<Reservation>> {
        Ok(self.reservations.find_by_student(student_id, from, to).await?)
    }

    pub async fn reservations_for_tutor(
        &self,
        tutor_id: &str,
        from: Option<Date>,
        to: Option<Date>,
    ) -> AppResult<Vec<Reservation>> {
        Ok(self.reservations.find_by_tutor(tutor_id, from, to).await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        Ok(self.reservations.find_by_id(id).await?)
    }
}
