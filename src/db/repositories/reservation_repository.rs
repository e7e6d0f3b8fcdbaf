use async_trait::async_trait;
use sqlx::PgPool;
use time::{Date, Time};
use uuid::Uuid;

use crate::db::models::{NewReservation, Reservation};
use crate::db::DatabaseError;

/// Outcome of an insert against the per-student and per-tutor hour
/// uniqueness constraints. The insert is the authoritative concurrency
/// guard; `Duplicate` means another reservation won the hour.
#[derive(Debug)]
pub enum ReservationInsert {
    Created(Reservation),
    Duplicate,
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn insert(&self, new: NewReservation) -> Result<ReservationInsert, DatabaseError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reservation>, DatabaseError>;

    async fn find_one_by_tutor_at(
        &self,
        tutor_id: &str,
        date: Date,
        start: Time,
    ) -> Result<Option<Reservation>, DatabaseError>;

    async fn exists_by_student_at(
        &self,
        student_id: &str,
        date: Date,
        start: Time,
    ) -> Result<bool, DatabaseError>;

    async fn exists_by_tutor_at(
        &self,
        tutor_id: &str,
        date: Date,
        start: Time,
    ) -> Result<bool, DatabaseError>;

    /// Reservations for a student, optionally date-bounded, ordered by date
    /// then start hour.
    async fn find_by_student(
        &self,
        student_id: &str,
        from: Option<Date>,
        to: Option<Date>,
    ) -> Result<Vec<Reservation>, DatabaseError>;

    /// Reservations for a tutor, optionally date-bounded, ordered by date
    /// then start hour.
    async fn find_by_tutor(
        &self,
        tutor_id: &str,
        from: Option<Date>,
        to: Option<Date>,
    ) -> Result<Vec<Reservation>, DatabaseError>;

    /// Persist `status` and `attended` if the stored version still equals
    /// `expected_version`; fails with `DatabaseError::StaleVersion` when a
    /// concurrent update got there first.
    async fn update(
        &self,
        reservation: &Reservation,
        expected_version: i64,
    ) -> Result<Reservation, DatabaseError>;
}

pub struct PgReservationRepository {
    pool: PgPool,
}

impl PgReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const RESERVATION_COLUMNS: &str = "id, tutor_id, student_id, date, start_hour, end_hour, \
     status, attended, version, created_at, updated_at";

#[async_trait]
impl ReservationRepository for PgReservationRepository {
    async fn insert(&self, new: NewReservation) -> Result<ReservationInsert, DatabaseError> {
        let result = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            INSERT INTO reservations
                (id, tutor_id, student_id, date, start_hour, end_hour, status, attended)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.tutor_id)
        .bind(&new.student_id)
        .bind(new.date)
        .bind(new.start)
        .bind(new.end)
        .bind(new.status)
        .bind(new.attended)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(reservation) => Ok(ReservationInsert::Created(reservation)),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Ok(ReservationInsert::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reservation>, DatabaseError> {
        sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn find_one_by_tutor_at(
        &self,
        tutor_id: &str,
        date: Date,
        start: Time,
    ) -> Result<Option<Reservation>, DatabaseError> {
        sqlx::query_as::<_, Reservation>(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
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

    async fn exists_by_student_at(
        &self,
        student_id: &str,
        date: Date,
        start: Time,
    ) -> Result<bool, DatabaseError> {
        let exists: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM reservations
                WHERE student_id = $1 AND date = $2 AND start_hour = $3
            )
            "#,
        )
        .bind(student_id)
        .bind(date)
        .bind(start)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.0)
    }

    async fn exists_by_tutor_at(
        &self,
        tutor_id: &str,
        date: Date,
        start: Time,
    ) -> Result<bool, DatabaseError> {
        let exists: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM reservations
                WHERE tutor_id = $1 AND date = $2 AND start_hour = $3
            )
            "#,
        )
        .bind(tutor_id)
        .bind(date)
        .bind(start)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.0)
    }

    async fn find_by_student(
        &self,
        student_id: &str,
        from: Option<Date>,
        to: Option<Date>,
    ) -> Result<Vec<Reservation>, DatabaseError> {
        sqlx::query_as::<_, Reservation>(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
            WHERE student_id = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY date ASC, start_hour ASC
            "#
        ))
        .bind(student_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn find_by_tutor(
        &self,
        tutor_id: &str,
        from: Option<Date>,
        to: Option<Date>,
    ) -> Result<Vec<Reservation>, DatabaseError> {
        sqlx::query_as::<_, Reservation>(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
            WHERE tutor_id = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
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

    async fn update(
        &self,
        reservation: &Reservation,
        expected_version: i64,
    ) -> Result<Reservation, DatabaseError> {
        let updated = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            UPDATE reservations
            SET status = $1, attended = $2, version = version + 1, updated_at = now()
            WHERE id = $3 AND version = $4
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(reservation.status)
        .bind(reservation.attended)
        .bind(reservation.id)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(r) => Ok(r),
            // No row matched: either the reservation vanished or the
            // version moved on underneath us.
            None => match self.find_by_id(reservation.id).await? {
                Some(_) => Err(DatabaseError::StaleVersion),
                None => Err(DatabaseError::NotFound),
            },
        }
    }
}
