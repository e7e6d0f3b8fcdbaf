use async_trait::async_trait;
use sqlx::PgPool;
use time::{Date, Time};
use uuid::Uuid;

use crate::db::models::{AvailabilitySlot, NewAvailabilitySlot};
use crate::db::DatabaseError;

/// Outcome of an insert against the `(tutor_id, date, start)` uniqueness
/// constraint. Callers branch on the value instead of catching driver errors.
#[derive(Debug)]
pub enum SlotInsert {
    Created(AvailabilitySlot),
    AlreadyExists,
}

#[async_trait]
pub trait SlotRepository: Send + Sync {
    async fn insert(&self, new: NewAvailabilitySlot) -> Result<SlotInsert, DatabaseError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AvailabilitySlot>, DatabaseError>;

    async fn find_one(
        &self,
        tutor_id: &str,
        date: Date,
        start: Time,
    ) -> Result<Option<AvailabilitySlot>, DatabaseError>;

    async fn find_by_tutor_and_date(
        &self,
        tutor_id: &str,
        date: Date,
    ) -> Result<Vec<AvailabilitySlot>, DatabaseError>;

    async fn find_by_tutor_and_date_range(
        &self,
        tutor_id: &str,
        from: Date,
        to: Date,
    ) -> Result<Vec<AvailabilitySlot>, DatabaseError>;

    /// Fails with `DatabaseError::NotFound` when the slot is already gone.
    async fn delete(&self, id: Uuid) -> Result<(), DatabaseError>;
}

pub struct PgSlotRepository {
    pool: PgPool,
}

impl PgSlotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SLOT_COLUMNS: &str = "id, tutor_id, date, start_hour, end_hour, created_at";

#[async_trait]
impl SlotRepository for PgSlotRepository {
    async fn insert(&self, new: NewAvailabilitySlot) -> Result<SlotInsert, DatabaseError> {
        let result = sqlx::query_as::<_, AvailabilitySlot>(&format!(
            r#"
            INSERT INTO availability_slots (id, tutor_id, date, start_hour, end_hour)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SLOT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.tutor_id)
        .bind(new.date)
        .bind(new.start)
        .bind(new.end)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(slot) => Ok(SlotInsert::Created(slot)),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Ok(SlotInsert::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AvailabilitySlot>, DatabaseError> {
        sqlx::query_as::<_, AvailabilitySlot>(&format!(
            "SELECT {SLOT_COLUMNS} FROM availability_slots WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn find_one(
        &self,
        tutor_id: &str,
        date: Date,
        start: Time,
    ) -> Result<Option<AvailabilitySlot>, DatabaseError> {
        sqlx::query_as::<_, AvailabilitySlot>(&format!(
            r#"
            SELECT {SLOT_COLUMNS}
            FROM availability_slots
            WHERE tutor_id = $1 AND date = $2 AND start_hour = $3
            "#
        ))
        .bind(tutor_id)
        .bind(date)
        .bind(start)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn find_by_tutor_and_date(
        &self,
        tutor_id: &str,
        date: Date,
    ) -> Result<Vec<AvailabilitySlot>, DatabaseError> {
        sqlx::query_as::<_, AvailabilitySlot>(&format!(
            r#"
            SELECT {SLOT_COLUMNS}
            FROM availability_slots
            WHERE tutor_id = $1 AND date = $2
            ORDER BY start_hour ASC
            "#
        ))
        .bind(tutor_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn find_by_tutor_and_date_range(
        &self,
        tutor_id: &str,
        from: Date,
        to: Date,
    ) -> Result<Vec<AvailabilitySlot>, DatabaseError> {
        sqlx::query_as::<_, AvailabilitySlot>(&format!(
            r#"
            SELECT {SLOT_COLUMNS}
            FROM availability_slots
            WHERE tutor_id = $1 AND date >= $2 AND date <= $3
            ORDER BY date ASC, start_hour ASC
            "#
        ))
        .bind(tutor_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM availability_slots WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() < 1 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }
}
