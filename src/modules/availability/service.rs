use std::collections::HashSet;
use std::sync::Arc;

use time::{Date, Time, Weekday};
use tracing::debug;
use uuid::Uuid;

use crate::db::models::{AvailabilitySlot, BulkAvailabilityRequest, NewAvailabilitySlot};
use crate::db::repositories::{SlotInsert, SlotRepository};
use crate::db::DatabaseError;
use crate::error::{AppError, AppResult};
use crate::time_util::{hour_after, is_on_the_hour, parse_hour};

/// Source of truth for "when is this tutor bookable". All creation paths
/// are idempotent under concurrent retries: losing a duplicate-key race is
/// treated as success, never surfaced to the caller.
pub struct AvailabilityService {
    slots: Arc<dyn SlotRepository>,
}

impl AvailabilityService {
    pub fn new(slots: Arc<dyn SlotRepository>) -> Self {
        Self { slots }
    }

    /// Create one-hour slots for every date in `[fromDate, toDate]` whose
    /// weekday is selected, for every hour in `[fromHour, toHour)`. Returns
    /// only the slots actually created by this call; re-running the same
    /// request is a no-op.
    pub async fn bulk_create(
        &self,
        tutor_id: &str,
        req: &BulkAvailabilityRequest,
    ) -> AppResult<Vec<AvailabilitySlot>> {
        if req.from_date > req.to_date {
            return Err(AppError::Validation(
                "fromDate must not be after toDate".to_string(),
            ));
        }
        let from = parse_hour(&req.from_hour)?;
        let to = parse_hour(&req.to_hour)?;
        if !is_on_the_hour(from) || !is_on_the_hour(to) {
            return Err(AppError::Validation(
                "hours must be on the hour (HH:00)".to_string(),
            ));
        }
        if to <= from {
            return Err(AppError::Validation(
                "toHour must be after fromHour".to_string(),
            ));
        }

        let days: Option<HashSet<Weekday>> = req
            .days_of_week
            .as_ref()
            .map(|days| days.iter().map(|d| d.weekday()).collect());

        let mut created = Vec::new();
        let mut date = req.from_date;
        loop {
            if days.as_ref().map_or(true, |d| d.contains(&date.weekday())) {
                let mut start = from;
                while start < to {
                    let new = NewAvailabilitySlot {
                        tutor_id: tutor_id.to_string(),
                        date,
                        start,
                        end: hour_after(start),
                    };
                    match self.slots.insert(new).await? {
                        SlotInsert::Created(slot) => created.push(slot),
                        SlotInsert::AlreadyExists => {}
                    }
                    start = hour_after(start);
                }
            }
            if date >= req.to_date {
                break;
            }
            match date.next_day() {
                Some(next) => date = next,
                None => break,
            }
        }
        Ok(created)
    }

    pub async fn my_slots(
        &self,
        tutor_id: &str,
        from: Date,
        to: Date,
    ) -> AppResult<Vec<AvailabilitySlot>> {
        Ok(self
            .slots
            .find_by_tutor_and_date_range(tutor_id, from, to)
            .await?)
    }

    pub async fn slots_for_day(
        &self,
        tutor_id: &str,
        date: Date,
    ) -> AppResult<Vec<AvailabilitySlot>> {
        Ok(self.slots.find_by_tutor_and_date(tutor_id, date).await?)
    }

    pub async fn slot_by_id(&self, id: Uuid) -> AppResult<Option<AvailabilitySlot>> {
        Ok(self.slots.find_by_id(id).await?)
    }

    /// Delete a slot the tutor owns. The caller computes
    /// `has_active_reservation` through the reservation engine.
    pub async fn delete_own_slot(
        &self,
        tutor_id: &str,
        slot_id: Uuid,
        has_active_reservation: bool,
    ) -> AppResult<()> {
        let slot = self
            .slots
            .find_by_id(slot_id)
            .await?
            .ok_or_else(|| AppError::NotFound("availability slot not found".to_string()))?;
        if slot.tutor_id != tutor_id {
            return Err(AppError::Forbidden(
                "availability slot belongs to another tutor".to_string(),
            ));
        }
        if has_active_reservation {
            return Err(AppError::Conflict(
                "availability slot has an active reservation".to_string(),
            ));
        }
        self.slots.delete(slot_id).await?;
        Ok(())
    }

    /// Reconcile a day against the requested hour set: existing hours that
    /// are neither requested nor reservation-protected are deleted, missing
    /// requested hours are created.
    pub async fn replace_day(
        &self,
        tutor_id: &str,
        date: Date,
        hours: &[Time],
        protected: &HashSet<Time>,
    ) -> AppResult<()> {
        for h in hours {
            if !is_on_the_hour(*h) {
                return Err(AppError::Validation(
                    "hours must be on the hour (HH:00)".to_string(),
                ));
            }
        }

        let existing = self.slots.find_by_tutor_and_date(tutor_id, date).await?;
        let existing_hours: HashSet<Time> = existing.iter().map(|s| s.start).collect();

        for slot in &existing {
            if !hours.contains(&slot.start) && !protected.contains(&slot.start) {
                match self.slots.delete(slot.id).await {
                    Ok(()) => {}
                    // A concurrent caller already removed it.
                    Err(DatabaseError::NotFound) => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        for hour in hours {
            if !existing_hours.contains(hour) {
                let new = NewAvailabilitySlot {
                    tutor_id: tutor_id.to_string(),
                    date,
                    start: *hour,
                    end: hour_after(*hour),
                };
                // A concurrent creator wins; nothing to report.
                match self.slots.insert(new).await? {
                    SlotInsert::Created(_) | SlotInsert::AlreadyExists => {}
                }
            }
        }
        Ok(())
    }

    /// Additive variant of `replace_day`: only creates hours not already
    /// present, never deletes. Returns the number of slots actually added.
    pub async fn add_availability(
        &self,
        tutor_id: &str,
        date: Date,
        hours: &[Time],
    ) -> AppResult<usize> {
        for h in hours {
            if !is_on_the_hour(*h) {
                return Err(AppError::Validation(
                    "hours must be on the hour (HH:00)".to_string(),
                ));
            }
        }

        let existing = self.slots.find_by_tutor_and_date(tutor_id, date).await?;
        let existing_hours: HashSet<Time> = existing.iter().map(|s| s.start).collect();

        let mut added = 0;
        let mut skipped = 0;
        for hour in hours {
            if existing_hours.contains(hour) {
                skipped += 1;
                continue;
            }
            let new = NewAvailabilitySlot {
                tutor_id: tutor_id.to_string(),
                date,
                start: *hour,
                end: hour_after(*hour),
            };
            match self.slots.insert(new).await? {
                SlotInsert::Created(_) => added += 1,
                SlotInsert::AlreadyExists => {
                    debug!(%tutor_id, %date, hour = %hour, "slot created concurrently, skipping");
                    skipped += 1;
                }
            }
        }
        debug!(%tutor_id, %date, added, skipped, total = hours.len(), "availability add reconciled");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::DayOfWeek;
    use crate::db::repositories::memory::InMemorySlotRepository;
    use time::macros::{date, time};

    fn service() -> AvailabilityService {
        AvailabilityService::new(Arc::new(InMemorySlotRepository::default()))
    }

    fn bulk_request(
        from_date: Date,
        to_date: Date,
        from_hour: &str,
        to_hour: &str,
        days_of_week: Option<Vec<DayOfWeek>>,
    ) -> BulkAvailabilityRequest {
        BulkAvailabilityRequest {
            from_date,
            to_date,
            from_hour: from_hour.to_string(),
            to_hour: to_hour.to_string(),
            days_of_week,
        }
    }

    #[tokio::test]
    async fn bulk_create_creates_every_hour_in_range() {
        let service = service();
        let req = bulk_request(date!(2025 - 03 - 10), date!(2025 - 03 - 11), "08:00", "10:00", None);

        let created = service.bulk_create("t1", &req).await.unwrap();

        assert_eq!(created.len(), 4);
        assert!(created.iter().all(|s| s.tutor_id == "t1"));
        assert!(created.iter().all(|s| s.end == hour_after(s.start)));
    }

    #[tokio::test]
    async fn bulk_create_rerun_is_a_no_op() {
        let service = service();
        let req = bulk_request(date!(2025 - 03 - 10), date!(2025 - 03 - 10), "08:00", "12:00", None);

        let first = service.bulk_create("t1", &req).await.unwrap();
        let second = service.bulk_create("t1", &req).await.unwrap();

        assert_eq!(first.len(), 4);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn bulk_create_honors_days_of_week() {
        let service = service();
        // 2025-03-10 is a Monday; the range covers two full weeks.
        let req = bulk_request(
            date!(2025 - 03 - 10),
            date!(2025 - 03 - 23),
            "08:00",
            "09:00",
            Some(vec![DayOfWeek::Monday]),
        );

        let created = service.bulk_create("t1", &req).await.unwrap();

        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|s| s.date.weekday() == Weekday::Monday));
    }

    #[tokio::test]
    async fn bulk_create_rejects_inverted_date_range() {
        let service = service();
        let req = bulk_request(date!(2025 - 03 - 11), date!(2025 - 03 - 10), "08:00", "10:00", None);

        let err = service.bulk_create("t1", &req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn bulk_create_rejects_misaligned_and_inverted_hours() {
        let service = service();

        let req = bulk_request(date!(2025 - 03 - 10), date!(2025 - 03 - 10), "08:30", "10:00", None);
        assert!(matches!(
            service.bulk_create("t1", &req).await.unwrap_err(),
            AppError::Validation(_)
        ));

        let req = bulk_request(date!(2025 - 03 - 10), date!(2025 - 03 - 10), "10:00", "10:00", None);
        assert!(matches!(
            service.bulk_create("t1", &req).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn replace_day_reconciles_requested_and_protected_hours() {
        let service = service();
        let day = date!(2025 - 03 - 10);
        service
            .add_availability("t1", day, &[time!(07:00), time!(08:00)])
            .await
            .unwrap();

        let protected: HashSet<Time> = [time!(08:00)].into_iter().collect();
        service
            .replace_day("t1", day, &[time!(08:00), time!(09:00)], &protected)
            .await
            .unwrap();

        let hours: Vec<Time> = service
            .slots_for_day("t1", day)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.start)
            .collect();
        assert_eq!(hours, vec![time!(08:00), time!(09:00)]);
    }

    #[tokio::test]
    async fn replace_day_keeps_protected_hours_even_when_not_requested() {
        let service = service();
        let day = date!(2025 - 03 - 10);
        service
            .add_availability("t1", day, &[time!(07:00), time!(08:00)])
            .await
            .unwrap();

        let protected: HashSet<Time> = [time!(08:00)].into_iter().collect();
        service
            .replace_day("t1", day, &[time!(10:00)], &protected)
            .await
            .unwrap();

        let hours: Vec<Time> = service
            .slots_for_day("t1", day)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.start)
            .collect();
        assert_eq!(hours, vec![time!(08:00), time!(10:00)]);
    }

    #[tokio::test]
    async fn replace_day_rejects_misaligned_hours() {
        let service = service();
        let err = service
            .replace_day("t1", date!(2025 - 03 - 10), &[time!(08:15)], &HashSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn add_availability_counts_only_new_hours() {
        let service = service();
        let day = date!(2025 - 03 - 10);
        service
            .add_availability("t1", day, &[time!(08:00)])
            .await
            .unwrap();

        let added = service
            .add_availability("t1", day, &[time!(08:00), time!(09:00)])
            .await
            .unwrap();

        assert_eq!(added, 1);
        assert_eq!(service.slots_for_day("t1", day).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_own_slot_enforces_guards() {
        let service = service();
        let day = date!(2025 - 03 - 10);
        service
            .add_availability("t1", day, &[time!(08:00)])
            .await
            .unwrap();
        let slot = service.slots_for_day("t1", day).await.unwrap().remove(0);

        let err = service
            .delete_own_slot("t1", Uuid::new_v4(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = service
            .delete_own_slot("t2", slot.id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = service
            .delete_own_slot("t1", slot.id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        service.delete_own_slot("t1", slot.id, false).await.unwrap();
        assert!(service.slots_for_day("t1", day).await.unwrap().is_empty());
    }
}
