//! Domain events reflecting reservation and facility mutations.
//!
//! Every successful mutation emits a [`ReservationEvent`] through the
//! [`super::EventBus`]. Events are optionally persisted to the PostgreSQL
//! event log.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{FacilityId, ReservationId, UserId, VehicleClass};

/// Why a reservation was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The driver asked for it.
    Requested,
    /// The sweeper found it pending past the TTL.
    Expired,
}

/// Domain event emitted after every state mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ReservationEvent {
    /// A reservation was created in `pendiente`.
    ReservationCreated {
        /// Reservation identifier.
        reservation_id: ReservationId,
        /// Facility reserved at.
        facility_id: FacilityId,
        /// Owning driver.
        user_id: UserId,
        /// Vehicle class.
        vehicle_class: VehicleClass,
        /// Projected fare at creation.
        projected_fare: f64,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Entry was authorized and one spot taken.
    EntryAuthorized {
        /// Reservation identifier.
        reservation_id: ReservationId,
        /// Facility entered.
        facility_id: FacilityId,
        /// Free spots left after entry.
        available_spots: u32,
        /// Arrival timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The vehicle left and the stay was billed.
    ReservationCompleted {
        /// Reservation identifier.
        reservation_id: ReservationId,
        /// Facility left.
        facility_id: FacilityId,
        /// Billed duration in hours.
        elapsed_hours: f64,
        /// Billed fare.
        fare: f64,
        /// Departure timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A pending reservation was cancelled.
    ReservationCancelled {
        /// Reservation identifier.
        reservation_id: ReservationId,
        /// Facility of the reservation.
        facility_id: FacilityId,
        /// Who cancelled it.
        reason: CancelReason,
        /// Cancellation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The final fare of a completed reservation was recomputed.
    FareRecomputed {
        /// Reservation identifier.
        reservation_id: ReservationId,
        /// Facility of the reservation.
        facility_id: FacilityId,
        /// Fare before recomputation.
        old_fare: f64,
        /// Fare after recomputation.
        new_fare: f64,
        /// Recomputation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A facility was registered.
    FacilityRegistered {
        /// Facility identifier.
        facility_id: FacilityId,
        /// Display name.
        name: String,
        /// Number of spots.
        total_spots: u32,
        /// Registration timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A facility's name or address changed.
    FacilityUpdated {
        /// Facility identifier.
        facility_id: FacilityId,
        /// New display name.
        name: String,
        /// New street address.
        address: String,
        /// Update timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A facility's tariff set was replaced.
    TariffsReplaced {
        /// Facility identifier.
        facility_id: FacilityId,
        /// Number of entries in the new set.
        entries: usize,
        /// Replacement timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The manual open/closed flag changed.
    AvailabilityChanged {
        /// Facility identifier.
        facility_id: FacilityId,
        /// New flag value.
        is_open: bool,
        /// Change timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The facility's total spot count changed.
    CapacityResized {
        /// Facility identifier.
        facility_id: FacilityId,
        /// New total.
        total_spots: u32,
        /// Free spots after the resize.
        available_spots: u32,
        /// Resize timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl ReservationEvent {
    /// Returns the facility the event concerns.
    #[must_use]
    pub const fn facility_id(&self) -> FacilityId {
        match self {
            Self::ReservationCreated { facility_id, .. }
            | Self::EntryAuthorized { facility_id, .. }
            | Self::ReservationCompleted { facility_id, .. }
            | Self::ReservationCancelled { facility_id, .. }
            | Self::FareRecomputed { facility_id, .. }
            | Self::FacilityRegistered { facility_id, .. }
            | Self::FacilityUpdated { facility_id, .. }
            | Self::TariffsReplaced { facility_id, .. }
            | Self::AvailabilityChanged { facility_id, .. }
            | Self::CapacityResized { facility_id, .. } => *facility_id,
        }
    }

    /// Returns the reservation the event concerns, if any.
    #[must_use]
    pub const fn reservation_id(&self) -> Option<ReservationId> {
        match self {
            Self::ReservationCreated { reservation_id, .. }
            | Self::EntryAuthorized { reservation_id, .. }
            | Self::ReservationCompleted { reservation_id, .. }
            | Self::ReservationCancelled { reservation_id, .. }
            | Self::FareRecomputed { reservation_id, .. } => Some(*reservation_id),
            Self::FacilityRegistered { .. }
            | Self::FacilityUpdated { .. }
            | Self::TariffsReplaced { .. }
            | Self::AvailabilityChanged { .. }
            | Self::CapacityResized { .. } => None,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::ReservationCreated { .. } => "reservation_created",
            Self::EntryAuthorized { .. } => "entry_authorized",
            Self::ReservationCompleted { .. } => "reservation_completed",
            Self::ReservationCancelled { .. } => "reservation_cancelled",
            Self::FareRecomputed { .. } => "fare_recomputed",
            Self::FacilityRegistered { .. } => "facility_registered",
            Self::FacilityUpdated { .. } => "facility_updated",
            Self::TariffsReplaced { .. } => "tariffs_replaced",
            Self::AvailabilityChanged { .. } => "availability_changed",
            Self::CapacityResized { .. } => "capacity_resized",
        }
    }

    /// Returns the timestamp of the mutation.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::ReservationCreated { timestamp, .. }
            | Self::EntryAuthorized { timestamp, .. }
            | Self::ReservationCompleted { timestamp, .. }
            | Self::ReservationCancelled { timestamp, .. }
            | Self::FareRecomputed { timestamp, .. }
            | Self::FacilityRegistered { timestamp, .. }
            | Self::FacilityUpdated { timestamp, .. }
            | Self::TariffsReplaced { timestamp, .. }
            | Self::AvailabilityChanged { timestamp, .. }
            | Self::CapacityResized { timestamp, .. } => *timestamp,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_event_serializes_reason() {
        let event = ReservationEvent::ReservationCancelled {
            reservation_id: ReservationId::new(),
            facility_id: FacilityId::new(),
            reason: CancelReason::Expired,
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type_str(), "reservation_cancelled");
        let Ok(json) = serde_json::to_string(&event) else {
            panic!("serialization failed");
        };
        assert!(json.contains("\"event_type\":\"reservation_cancelled\""));
        assert!(json.contains("\"reason\":\"expired\""));
    }

    #[test]
    fn facility_events_have_no_reservation() {
        let facility_id = FacilityId::new();
        let event = ReservationEvent::AvailabilityChanged {
            facility_id,
            is_open: false,
            timestamp: Utc::now(),
        };
        assert_eq!(event.facility_id(), facility_id);
        assert!(event.reservation_id().is_none());
    }

    #[test]
    fn facility_updated_carries_new_details() {
        let event = ReservationEvent::FacilityUpdated {
            facility_id: FacilityId::new(),
            name: "Unicentro".to_string(),
            address: "Av 15 # 124-30".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type_str(), "facility_updated");
        assert!(event.reservation_id().is_none());
        let Ok(json) = serde_json::to_value(&event) else {
            panic!("serialization failed");
        };
        assert_eq!(json.get("name").and_then(|v| v.as_str()), Some("Unicentro"));
    }
}
