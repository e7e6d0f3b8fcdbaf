use std::collections::HashMap;
use std::sync::Arc;

use time::{Date, Duration};

use crate::db::models::ScheduleCell;
use crate::db::repositories::{ReservationRepository, SlotRepository};
use crate::error::{AppError, AppResult};

/// Read-only composer merging availability and reservations into an
/// hour-by-hour weekly grid.
pub struct ScheduleService {
    slots: Arc<dyn SlotRepository>,
    reservations: Arc<dyn ReservationRepository>,
}

impl ScheduleService {
    pub fn new(slots: Arc<dyn SlotRepository>, reservations: Arc<dyn ReservationRepository>) -> Self {
        Self {
            slots,
            reservations,
        }
    }

    /// 7×24 cells from `week_start` through `week_start + 6`, in strict
    /// chronological order. A reservation always overrides the bare
    /// DISPONIBLE of its underlying slot; hours with neither are emitted
    /// with no status.
    pub async fn week_for_tutor(
        &self,
        tutor_id: &str,
        week_start: Date,
    ) -> AppResult<Vec<ScheduleCell>> {
        if tutor_id.is_empty() {
            return Err(AppError::Validation("tutorId is required".to_string()));
        }
        let week_end = week_start
            .checked_add(Duration::days(6))
            .ok_or_else(|| AppError::Validation("weekStart is out of range".to_string()))?;

        let slots = self
            .slots
            .find_by_tutor_and_date_range(tutor_id, week_start, week_end)
            .await?;
        let reservations = self
            .reservations
            .find_by_tutor(tutor_id, Some(week_start), Some(week_end))
            .await?;

        let mut cells: HashMap<(Date, u8), ScheduleCell> =
            HashMap::with_capacity(slots.len() + reservations.len());

        for slot in &slots {
            cells.insert(
                (slot.date, slot.start.hour()),
                ScheduleCell {
                    date: slot.date,
                    hour: format_hour(slot.start.hour()),
                    status: Some("DISPONIBLE".to_string()),
                    reservation_id: None,
                    student_id: None,
                },
            );
        }

        for reservation in &reservations {
            let key = (reservation.date, reservation.start.hour());
            let cell = cells.entry(key).or_insert_with(|| ScheduleCell {
                date: reservation.date,
                hour: format_hour(reservation.start.hour()),
                status: None,
                reservation_id: None,
                student_id: None,
            });
            cell.status = Some(reservation.status.as_str().to_string());
            cell.reservation_id = Some(reservation.id);
            cell.student_id = Some(reservation.student_id.clone());
        }

        let mut grid = Vec::with_capacity(7 * 24);
        let mut date = week_start;
        loop {
            for hour in 0..24 {
                let cell = cells.remove(&(date, hour)).unwrap_or_else(|| ScheduleCell {
                    date,
                    hour: format_hour(hour),
                    status: None,
                    reservation_id: None,
                    student_id: None,
                });
                grid.push(cell);
            }
            if date >= week_end {
                break;
            }
            match date.next_day() {
                Some(next) => date = next,
                None => break,
            }
        }
        Ok(grid)
    }
}

fn format_hour(hour: u8) -> String {
    format!("{hour:02}:00")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{NewAvailabilitySlot, NewReservation, ReservationStatus};
    use crate::db::repositories::memory::{
        InMemoryReservationRepository, InMemorySlotRepository,
    };
    use crate::db::repositories::ReservationInsert;
    use crate::time_util::hour_after;
    use time::macros::{date, time};
    use time::Time;

    struct Fixture {
        service: ScheduleService,
        slots: Arc<InMemorySlotRepository>,
        reservations: Arc<InMemoryReservationRepository>,
    }

    fn fixture() -> Fixture {
        let slots = Arc::new(InMemorySlotRepository::default());
        let reservations = Arc::new(InMemoryReservationRepository::default());
        let service = ScheduleService::new(slots.clone(), reservations.clone());
        Fixture {
            service,
            slots,
            reservations,
        }
    }

    async fn seed_slot(fixture: &Fixture, date: Date, start: Time) {
        fixture
            .slots
            .insert(NewAvailabilitySlot {
                tutor_id: "t1".to_string(),
                date,
                start,
                end: hour_after(start),
            })
            .await
            .unwrap();
    }

    async fn seed_reservation(
        fixture: &Fixture,
        date: Date,
        start: Time,
        status: ReservationStatus,
    ) -> uuid::Uuid {
        let inserted = fixture
            .reservations
            .insert(NewReservation {
                tutor_id: "t1".to_string(),
                student_id: "s1".to_string(),
                date,
                start,
                end: hour_after(start),
                status,
                attended: None,
            })
            .await
            .unwrap();
        match inserted {
            ReservationInsert::Created(r) => r.id,
            ReservationInsert::Duplicate => unreachable!(),
        }
    }

    #[tokio::test]
    async fn grid_is_a_full_chronological_week() {
        let fx = fixture();
        let grid = fx
            .service
            .week_for_tutor("t1", date!(2025 - 03 - 10))
            .await
            .unwrap();

        assert_eq!(grid.len(), 7 * 24);
        assert_eq!(grid[0].date, date!(2025 - 03 - 10));
        assert_eq!(grid[0].hour, "00:00");
        assert_eq!(grid[23].hour, "23:00");
        assert_eq!(grid[24].date, date!(2025 - 03 - 11));
        assert_eq!(grid[167].date, date!(2025 - 03 - 16));
        assert_eq!(grid[167].hour, "23:00");
        assert!(grid.iter().all(|c| c.status.is_none()));
    }

    #[tokio::test]
    async fn slots_show_as_disponible_and_reservations_override() {
        let fx = fixture();
        let monday = date!(2025 - 03 - 10);
        seed_slot(&fx, monday, time!(09:00)).await;
        seed_slot(&fx, monday, time!(10:00)).await;
        let reservation_id =
            seed_reservation(&fx, monday, time!(10:00), ReservationStatus::Aceptado).await;

        let grid = fx.service.week_for_tutor("t1", monday).await.unwrap();

        let free = &grid[9];
        assert_eq!(free.status.as_deref(), Some("DISPONIBLE"));
        assert_eq!(free.reservation_id, None);

        let booked = &grid[10];
        assert_eq!(booked.status.as_deref(), Some("ACEPTADO"));
        assert_eq!(booked.reservation_id, Some(reservation_id));
        assert_eq!(booked.student_id.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn reservations_without_a_backing_slot_still_appear() {
        let fx = fixture();
        let monday = date!(2025 - 03 - 10);
        seed_reservation(&fx, monday, time!(15:00), ReservationStatus::Pendiente).await;

        let grid = fx.service.week_for_tutor("t1", monday).await.unwrap();
        assert_eq!(grid[15].status.as_deref(), Some("PENDIENTE"));
    }

    #[tokio::test]
    async fn out_of_week_entries_are_ignored() {
        let fx = fixture();
        let monday = date!(2025 - 03 - 10);
        seed_slot(&fx, date!(2025 - 03 - 17), time!(09:00)).await;
        seed_reservation(
            &fx,
            date!(2025 - 03 - 09),
            time!(09:00),
            ReservationStatus::Aceptado,
        )
        .await;

        let grid = fx.service.week_for_tutor("t1", monday).await.unwrap();
        assert!(grid.iter().all(|c| c.status.is_none()));
    }

    #[tokio::test]
    async fn booked_and_accepted_hour_shows_up_in_the_grid() {
        use crate::db::models::{BulkAvailabilityRequest, ReservationCreateRequest};
        use crate::modules::availability::service::AvailabilityService;
        use crate::modules::reservations::service::ReservationService;
        use crate::time_util::FixedClock;
        use time::macros::datetime;

        let fx = fixture();
        let availability = AvailabilityService::new(fx.slots.clone());
        let reservations = ReservationService::new(
            fx.reservations.clone(),
            fx.slots.clone(),
            Arc::new(FixedClock(datetime!(2025 - 03 - 08 08:00))),
        );
        let monday = date!(2025 - 03 - 10);

        availability
            .bulk_create(
                "t1",
                &BulkAvailabilityRequest {
                    from_date: monday,
                    to_date: monday,
                    from_hour: "10:00".to_string(),
                    to_hour: "11:00".to_string(),
                    days_of_week: None,
                },
            )
            .await
            .unwrap();

        let request = ReservationCreateRequest {
            tutor_id: "t1".to_string(),
            date: monday,
            hour: "10:00".to_string(),
        };
        let reservation = reservations.create("s1", &request).await.unwrap();
        assert!(reservations.create("s2", &request).await.is_err());
        reservations
            .change_status("t1", reservation.id, ReservationStatus::Aceptado)
            .await
            .unwrap();

        let grid = fx.service.week_for_tutor("t1", monday).await.unwrap();
        let cell = &grid[10];
        assert_eq!(cell.date, monday);
        assert_eq!(cell.hour, "10:00");
        assert_eq!(cell.status.as_deref(), Some("ACEPTADO"));
        assert_eq!(cell.reservation_id, Some(reservation.id));
        assert_eq!(cell.student_id.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn empty_tutor_id_is_rejected() {
        let fx = fixture();
        let err = fx
            .service
            .week_for_tutor("", date!(2025 - 03 - 10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
