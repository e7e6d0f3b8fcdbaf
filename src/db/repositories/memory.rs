//! In-memory repositories for engine tests. They enforce the same
//! uniqueness and versioning semantics as the Postgres implementations so
//! the race-safety properties can be exercised without a database.

use std::sync::Mutex;

use async_trait::async_trait;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::db::models::{AvailabilitySlot, NewAvailabilitySlot, NewReservation, Reservation};
use crate::db::repositories::{
    ReservationInsert, ReservationRepository, SlotInsert, SlotRepository,
};
use crate::db::DatabaseError;

#[derive(Default)]
pub struct InMemorySlotRepository {
    slots: Mutex<Vec<AvailabilitySlot>>,
}

#[async_trait]
impl SlotRepository for InMemorySlotRepository {
    async fn insert(&self, new: NewAvailabilitySlot) -> Result<SlotInsert, DatabaseError> {
        let mut slots = self.slots.lock().unwrap();
        let duplicate = slots
            .iter()
            .any(|s| s.tutor_id == new.tutor_id && s.date == new.date && s.start == new.start);
        if duplicate {
            return Ok(SlotInsert::AlreadyExists);
        }
        let slot = AvailabilitySlot {
            id: Uuid::new_v4(),
            tutor_id: new.tutor_id,
            date: new.date,
            start: new.start,
            end: new.end,
            created_at: OffsetDateTime::now_utc(),
        };
        slots.push(slot.clone());
        Ok(SlotInsert::Created(slot))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AvailabilitySlot>, DatabaseError> {
        Ok(self
            .slots
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn find_one(
        &self,
        tutor_id: &str,
        date: Date,
        start: Time,
    ) -> Result<Option<AvailabilitySlot>, DatabaseError> {
        Ok(self
            .slots
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.tutor_id == tutor_id && s.date == date && s.start == start)
            .cloned())
    }

    async fn find_by_tutor_and_date(
        &self,
        tutor_id: &str,
        date: Date,
    ) -> Result<Vec<AvailabilitySlot>, DatabaseError> {
        let mut found: Vec<_> = self
            .slots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.tutor_id == tutor_id && s.date == date)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.start);
        Ok(found)
    }

    async fn find_by_tutor_and_date_range(
        &self,
        tutor_id: &str,
        from: Date,
        to: Date,
    ) -> Result<Vec<AvailabilitySlot>, DatabaseError> {
        let mut found: Vec<_> = self
            .slots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.tutor_id == tutor_id && s.date >= from && s.date <= to)
            .cloned()
            .collect();
        found.sort_by_key(|s| (s.date, s.start));
        Ok(found)
    }

    async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut slots = self.slots.lock().unwrap();
        let before = slots.len();
        slots.retain(|s| s.id != id);
        if slots.len() == before {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryReservationRepository {
    rows: Mutex<Vec<Reservation>>,
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn insert(&self, new: NewReservation) -> Result<ReservationInsert, DatabaseError> {
        // Single lock covers both uniqueness checks and the push, matching
        // the atomicity of the database constraint.
        let mut rows = self.rows.lock().unwrap();
        let duplicate = rows.iter().any(|r| {
            (r.student_id == new.student_id || r.tutor_id == new.tutor_id)
                && r.date == new.date
                && r.start == new.start
        });
        if duplicate {
            return Ok(ReservationInsert::Duplicate);
        }
        let now = OffsetDateTime::now_utc();
        let reservation = Reservation {
            id: Uuid::new_v4(),
            tutor_id: new.tutor_id,
            student_id: new.student_id,
            date: new.date,
            start: new.start,
            end: new.end,
            status: new.status,
            attended: new.attended,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        rows.push(reservation.clone());
        Ok(ReservationInsert::Created(reservation))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reservation>, DatabaseError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn find_one_by_tutor_at(
        &self,
        tutor_id: &str,
        date: Date,
        start: Time,
    ) -> Result<Option<Reservation>, DatabaseError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.tutor_id == tutor_id && r.date == date && r.start == start)
            .cloned())
    }

    async fn exists_by_student_at(
        &self,
        student_id: &str,
        date: Date,
        start: Time,
    ) -> Result<bool, DatabaseError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.student_id == student_id && r.date == date && r.start == start))
    }

    async fn exists_by_tutor_at(
        &self,
        tutor_id: &str,
        date: Date,
        start: Time,
    ) -> Result<bool, DatabaseError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.tutor_id == tutor_id && r.date == date && r.start == start))
    }

    async fn find_by_student(
        &self,
        student_id: &str,
        from: Option<Date>,
        to: Option<Date>,
    ) -> Result<Vec<Reservation>, DatabaseError> {
        let mut found: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.student_id == student_id
                    && from.map_or(true, |f| r.date >= f)
                    && to.map_or(true, |t| r.date <= t)
            })
            .cloned()
            .collect();
        found.sort_by_key(|r| (r.date, r.start));
        Ok(found)
    }

    async fn find_by_tutor(
        &self,
        tutor_id: &str,
        from: Option<Date>,
        to: Option<Date>,
    ) -> Result<Vec<Reservation>, DatabaseError> {
        let mut found: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.tutor_id == tutor_id
                    && from.map_or(true, |f| r.date >= f)
                    && to.map_or(true, |t| r.date <= t)
            })
            .cloned()
            .collect();
        found.sort_by_key(|r| (r.date, r.start));
        Ok(found)
    }

    async fn update(
        &self,
        reservation: &Reservation,
        expected_version: i64,
    ) -> Result<Reservation, DatabaseError> {
        let mut rows = self.rows.lock().unwrap();
        let stored = rows
            .iter_mut()
            .find(|r| r.id == reservation.id)
            .ok_or(DatabaseError::NotFound)?;
        if stored.version != expected_version {
            return Err(DatabaseError::StaleVersion);
        }
        stored.status = reservation.status;
        stored.attended = reservation.attended;
        stored.version += 1;
        stored.updated_at = OffsetDateTime::now_utc();
        Ok(stored.clone())
    }
}
