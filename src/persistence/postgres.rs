//! PostgreSQL implementation of the event log.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::ReservationEvent;
use crate::error::ReservationError;

/// PostgreSQL-backed event log using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Creates a new persistence layer with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`ReservationError::PersistenceError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), ReservationError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ReservationError::PersistenceError(e.to_string()))
    }

    /// Appends an event to the event log.
    ///
    /// # Errors
    ///
    /// Returns a [`ReservationError::PersistenceError`] on database or
    /// serialization failure.
    pub async fn save_event(&self, event: &ReservationEvent) -> Result<i64, ReservationError> {
        let payload = serde_json::to_value(event)
            .map_err(|e| ReservationError::PersistenceError(e.to_string()))?;
        let reservation_id = event.reservation_id().map(|id| *id.as_uuid());

        let row = sqlx::query_scalar::<_, i64>(
            "INSERT INTO events (facility_id, reservation_id, event_type, payload, occurred_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(*event.facility_id().as_uuid())
        .bind(reservation_id)
        .bind(event.event_type_str())
        .bind(&payload)
        .bind(event.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ReservationError::PersistenceError(e.to_string()))?;

        Ok(row)
    }

    /// Deletes events older than the given number of days.
    ///
    /// # Errors
    ///
    /// Returns a [`ReservationError::PersistenceError`] on database failure.
    pub async fn delete_old_events(&self, before_days: u64) -> Result<u64, ReservationError> {
        let cutoff = i64::try_from(before_days)
            .ok()
            .and_then(chrono::Duration::try_days)
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let result = sqlx::query("DELETE FROM events WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| ReservationError::PersistenceError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
