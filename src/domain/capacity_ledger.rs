//! Authoritative spot accounting with per-facility row locking.
//!
//! [`CapacityLedger`] stores every facility as an individually locked row.
//! `reserve`, `release`, `resize` and the detail updates each run as one read-modify-write unit
//! under that row's write lock, so two callers racing for the last spot of
//! a facility are serialized and only one of them gets it. Operations on
//! different facilities never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::facility::{Facility, NewFacility};
use super::row_lock::{RetryPolicy, lock_row, retry_on_conflict};
use super::{Clock, FacilityId};
use crate::error::ReservationError;

/// Central store for facilities and their spot counters.
///
/// # Concurrency
///
/// - The outer map lock only guards membership and is held briefly.
/// - Each facility row is an `Arc<RwLock<Facility>>`; mutations take the
///   row's write lock with a bounded wait and are retried on conflict.
/// - Readers clone a snapshot under the row's read lock.
#[derive(Debug)]
pub struct CapacityLedger {
    facilities: RwLock<HashMap<FacilityId, Arc<RwLock<Facility>>>>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl CapacityLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, policy: RetryPolicy) -> Self {
        Self {
            facilities: RwLock::new(HashMap::new()),
            clock,
            policy,
        }
    }

    /// Registers a facility with `available = total`.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::InvalidRequest`] on invalid registration
    /// data.
    pub async fn register(&self, new: NewFacility) -> Result<Facility, ReservationError> {
        let facility = Facility::register(new, self.clock.now())?;
        let snapshot = facility.clone();
        self.facilities
            .write()
            .await
            .insert(facility.id, Arc::new(RwLock::new(facility)));
        tracing::info!(
            facility_id = %snapshot.id,
            total = snapshot.total_spots(),
            "facility registered"
        );
        Ok(snapshot)
    }

    /// Takes one spot: checks `available > 0` and decrements it atomically.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::CapacityExhausted`] if no spot is free.
    /// - [`ReservationError::FacilityNotFound`] for an unknown facility.
    /// - [`ReservationError::StorageUnavailable`] if the row stayed locked.
    pub async fn reserve(&self, facility_id: FacilityId) -> Result<Facility, ReservationError> {
        let result = self
            .transact(facility_id, "ledger.reserve", |facility, now| {
                facility.take_spot(now)
            })
            .await;
        if let Err(ReservationError::CapacityExhausted(_)) = &result {
            tracing::debug!(%facility_id, "reserve refused: capacity exhausted");
        }
        result
    }

    /// Returns one spot: increments `available` atomically.
    ///
    /// A release that would push `available` past `total` is rejected rather
    /// than clamped, so double releases surface as bookkeeping bugs.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::CapacityOverflow`] if every spot is already free.
    /// - [`ReservationError::FacilityNotFound`] for an unknown facility.
    /// - [`ReservationError::StorageUnavailable`] if the row stayed locked.
    pub async fn release(&self, facility_id: FacilityId) -> Result<Facility, ReservationError> {
        let result = self
            .transact(facility_id, "ledger.release", |facility, now| {
                facility.return_spot(now)
            })
            .await;
        if let Err(ReservationError::CapacityOverflow(_)) = &result {
            tracing::error!(%facility_id, "release rejected: available already equals total");
        }
        result
    }

    /// Changes the total spot count, keeping current occupancy.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::InvalidRequest`] if `new_total` is below the
    ///   number of occupied spots.
    /// - [`ReservationError::FacilityNotFound`] for an unknown facility.
    /// - [`ReservationError::StorageUnavailable`] if the row stayed locked.
    pub async fn resize(
        &self,
        facility_id: FacilityId,
        new_total: u32,
    ) -> Result<Facility, ReservationError> {
        self.transact(facility_id, "ledger.resize", |facility, now| {
            facility.resize(new_total, now)
        })
        .await
    }

    /// Sets the manual open/closed flag. Spot counters are untouched.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::FacilityNotFound`] for an unknown facility.
    /// - [`ReservationError::StorageUnavailable`] if the row stayed locked.
    pub async fn set_open(
        &self,
        facility_id: FacilityId,
        is_open: bool,
    ) -> Result<Facility, ReservationError> {
        self.transact(facility_id, "ledger.set_open", |facility, now| {
            facility.set_open(is_open, now);
            Ok(())
        })
        .await
    }

    /// Replaces the facility's name and address. Spot counters are untouched.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::InvalidRequest`] on a blank name or address.
    /// - [`ReservationError::FacilityNotFound`] for an unknown facility.
    /// - [`ReservationError::StorageUnavailable`] if the row stayed locked.
    pub async fn update_details(
        &self,
        facility_id: FacilityId,
        name: &str,
        address: &str,
    ) -> Result<Facility, ReservationError> {
        self.transact(facility_id, "ledger.update_details", |facility, now| {
            facility.update_details(name, address, now)
        })
        .await
    }

    /// Returns a snapshot of one facility.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::FacilityNotFound`] for an unknown id.
    pub async fn get(&self, facility_id: FacilityId) -> Result<Facility, ReservationError> {
        let row = self.row(facility_id).await?;
        let facility = row.read().await;
        Ok(facility.clone())
    }

    /// Returns `true` if the facility is registered.
    pub async fn contains(&self, facility_id: FacilityId) -> bool {
        self.facilities.read().await.contains_key(&facility_id)
    }

    /// Returns snapshots of all facilities, sorted by name.
    pub async fn list(&self) -> Vec<Facility> {
        let rows: Vec<Arc<RwLock<Facility>>> =
            self.facilities.read().await.values().map(Arc::clone).collect();
        let mut facilities = Vec::with_capacity(rows.len());
        for row in rows {
            facilities.push(row.read().await.clone());
        }
        facilities.sort_by(|a, b| a.name.cmp(&b.name));
        facilities
    }

    async fn row(&self, facility_id: FacilityId) -> Result<Arc<RwLock<Facility>>, ReservationError> {
        self.facilities
            .read()
            .await
            .get(&facility_id)
            .map(Arc::clone)
            .ok_or(ReservationError::FacilityNotFound(facility_id))
    }

    /// Runs `mutate` under the facility's row lock, retrying on conflict,
    /// and returns the post-mutation snapshot.
    async fn transact<F>(
        &self,
        facility_id: FacilityId,
        operation: &'static str,
        mutate: F,
    ) -> Result<Facility, ReservationError>
    where
        F: Fn(&mut Facility, chrono::DateTime<chrono::Utc>) -> Result<(), ReservationError>,
    {
        let row = self.row(facility_id).await?;
        let mutate = &mutate;
        let clock = &self.clock;
        let lock_timeout = self.policy.lock_timeout;
        retry_on_conflict(&self.policy, operation, move || {
            let row = Arc::clone(&row);
            async move {
                let mut facility = lock_row(row, lock_timeout).await?;
                mutate(&mut facility, clock.now())?;
                Ok(facility.clone())
            }
        })
        .await
    }
}
