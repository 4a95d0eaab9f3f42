//! Facility service: registration, details, tariffs and capacity administration.

use super::Stores;
use crate::domain::{
    EventBus, Facility, FacilityId, NewFacility, ReservationEvent, TariffEntry,
};
use crate::error::ReservationError;

/// Administrative operations on facilities.
///
/// Spot counters are only ever changed through the [`crate::domain::CapacityLedger`];
/// this service never writes them directly.
#[derive(Debug, Clone)]
pub struct FacilityService {
    stores: Stores,
    event_bus: EventBus,
}

impl FacilityService {
    /// Creates a new `FacilityService`.
    #[must_use]
    pub fn new(stores: Stores, event_bus: EventBus) -> Self {
        Self { stores, event_bus }
    }

    /// Registers an open facility with every spot available.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::InvalidRequest`] on invalid registration
    /// data.
    pub async fn register(&self, new: NewFacility) -> Result<Facility, ReservationError> {
        let facility = self.stores.ledger.register(new).await?;
        let _ = self.event_bus.publish(ReservationEvent::FacilityRegistered {
            facility_id: facility.id,
            name: facility.name.clone(),
            total_spots: facility.total_spots(),
            timestamp: facility.created_at,
        });
        Ok(facility)
    }

    /// Replaces the facility's whole tariff set.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::FacilityNotFound`] for an unknown facility.
    /// - [`ReservationError::InvalidRequest`] on an invalid rate or a
    ///   duplicated vehicle class; the previous set stays in place.
    pub async fn replace_tariffs(
        &self,
        facility_id: FacilityId,
        entries: Vec<TariffEntry>,
    ) -> Result<Vec<TariffEntry>, ReservationError> {
        if !self.stores.ledger.contains(facility_id).await {
            return Err(ReservationError::FacilityNotFound(facility_id));
        }
        let count = self.stores.tariffs.replace(facility_id, entries).await?;
        let _ = self.event_bus.publish(ReservationEvent::TariffsReplaced {
            facility_id,
            entries: count,
            timestamp: self.stores.clock.now(),
        });
        tracing::info!(%facility_id, entries = count, "tariffs replaced");
        Ok(self.stores.tariffs.list(facility_id).await)
    }

    /// Returns the facility's tariff set, sorted by vehicle class.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::FacilityNotFound`] for an unknown facility.
    pub async fn tariffs(&self, facility_id: FacilityId) -> Result<Vec<TariffEntry>, ReservationError> {
        if !self.stores.ledger.contains(facility_id).await {
            return Err(ReservationError::FacilityNotFound(facility_id));
        }
        Ok(self.stores.tariffs.list(facility_id).await)
    }

    /// Sets the manual open/closed flag. Spot counters are untouched.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::FacilityNotFound`] for an unknown facility.
    /// - [`ReservationError::StorageUnavailable`] on persistent contention.
    pub async fn set_manual_availability(
        &self,
        facility_id: FacilityId,
        is_open: bool,
    ) -> Result<Facility, ReservationError> {
        let facility = self.stores.ledger.set_open(facility_id, is_open).await?;
        let _ = self.event_bus.publish(ReservationEvent::AvailabilityChanged {
            facility_id,
            is_open,
            timestamp: facility.updated_at,
        });
        tracing::info!(%facility_id, is_open, "manual availability changed");
        Ok(facility)
    }

    /// Renames a facility or moves its address. Capacity goes through
    /// [`Self::resize`] instead.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::InvalidRequest`] on a blank name or address.
    /// - [`ReservationError::FacilityNotFound`] for an unknown facility.
    /// - [`ReservationError::StorageUnavailable`] on persistent contention.
    pub async fn update(
        &self,
        facility_id: FacilityId,
        name: &str,
        address: &str,
    ) -> Result<Facility, ReservationError> {
        let facility = self
            .stores
            .ledger
            .update_details(facility_id, name, address)
            .await?;
        let _ = self.event_bus.publish(ReservationEvent::FacilityUpdated {
            facility_id,
            name: facility.name.clone(),
            address: facility.address.clone(),
            timestamp: facility.updated_at,
        });
        tracing::info!(%facility_id, name = %facility.name, "facility details updated");
        Ok(facility)
    }

    /// Changes the total spot count while keeping current occupancy.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::FacilityNotFound`] for an unknown facility.
    /// - [`ReservationError::InvalidRequest`] if `total_spots` is below the
    ///   number of occupied spots.
    /// - [`ReservationError::StorageUnavailable`] on persistent contention.
    pub async fn resize(
        &self,
        facility_id: FacilityId,
        total_spots: u32,
    ) -> Result<Facility, ReservationError> {
        let facility = self.stores.ledger.resize(facility_id, total_spots).await?;
        let _ = self.event_bus.publish(ReservationEvent::CapacityResized {
            facility_id,
            total_spots: facility.total_spots(),
            available_spots: facility.available_spots(),
            timestamp: facility.updated_at,
        });
        tracing::info!(
            %facility_id,
            total = facility.total_spots(),
            available = facility.available_spots(),
            "capacity resized"
        );
        Ok(facility)
    }

    /// Returns a facility snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::FacilityNotFound`] for an unknown id.
    pub async fn get(&self, facility_id: FacilityId) -> Result<Facility, ReservationError> {
        self.stores.ledger.get(facility_id).await
    }

    /// Returns all facilities, sorted by name.
    pub async fn list(&self) -> Vec<Facility> {
        self.stores.ledger.list().await
    }
}
