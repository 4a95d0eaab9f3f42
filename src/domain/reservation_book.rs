//! Concurrent reservation storage with per-reservation row locking.
//!
//! [`ReservationBook`] keeps every reservation in its own
//! `Arc<RwLock<Reservation>>` row. Lifecycle transitions take the row's
//! write lock through [`super::row_lock::lock_row`], so two operations on the
//! same reservation are serialized while different reservations proceed in
//! parallel.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::reservation::Reservation;
use super::{FacilityId, ReservationId, UserId};
use crate::error::ReservationError;

/// Shared handle to one reservation row.
pub type ReservationRow = Arc<RwLock<Reservation>>;

/// Central store for all reservations.
///
/// The outer map only guards membership; reservations are never removed,
/// terminal ones stay for history and billing.
#[derive(Debug, Default)]
pub struct ReservationBook {
    rows: RwLock<HashMap<ReservationId, ReservationRow>>,
}

impl ReservationBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new reservation.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Internal`] if the id is already taken
    /// (should never happen with UUID v4).
    pub async fn insert(&self, reservation: Reservation) -> Result<ReservationId, ReservationError> {
        let id = reservation.id;
        let mut rows = self.rows.write().await;
        if rows.contains_key(&id) {
            return Err(ReservationError::Internal(format!(
                "reservation {id} already exists"
            )));
        }
        rows.insert(id, Arc::new(RwLock::new(reservation)));
        Ok(id)
    }

    /// Returns the lockable row of a reservation.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::ReservationNotFound`] for an unknown id.
    pub async fn row(&self, id: ReservationId) -> Result<ReservationRow, ReservationError> {
        self.rows
            .read()
            .await
            .get(&id)
            .map(Arc::clone)
            .ok_or(ReservationError::ReservationNotFound(id))
    }

    /// Returns a snapshot of one reservation.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::ReservationNotFound`] for an unknown id.
    pub async fn get(&self, id: ReservationId) -> Result<Reservation, ReservationError> {
        let row = self.row(id).await?;
        let reservation = row.read().await;
        Ok(reservation.clone())
    }

    /// Returns a user's reservations, newest first.
    pub async fn list_for_user(&self, user_id: UserId) -> Vec<Reservation> {
        self.collect(|r| r.user_id == user_id).await
    }

    /// Returns a facility's reservations, newest first.
    pub async fn list_for_facility(&self, facility_id: FacilityId) -> Vec<Reservation> {
        self.collect(|r| r.facility_id == facility_id).await
    }

    /// Returns the ids of `pendiente` reservations created strictly before
    /// `cutoff`.
    ///
    /// The result is a candidate list; callers must re-check the state under
    /// the row lock before acting on it.
    pub async fn stale_pending(&self, cutoff: DateTime<Utc>) -> Vec<ReservationId> {
        self.collect(|r| r.is_stale(cutoff))
            .await
            .into_iter()
            .map(|r| r.id)
            .collect()
    }

    async fn collect<P>(&self, predicate: P) -> Vec<Reservation>
    where
        P: Fn(&Reservation) -> bool,
    {
        let rows: Vec<ReservationRow> = self.rows.read().await.values().map(Arc::clone).collect();
        let mut matched = Vec::new();
        for row in rows {
            let reservation = row.read().await;
            if predicate(&reservation) {
                matched.push(reservation.clone());
            }
        }
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched
    }
}
