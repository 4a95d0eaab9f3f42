//! Service layer: business logic orchestration.
//!
//! [`ReservationService`] drives the reservation lifecycle against the
//! capacity ledger and tariff schedule, [`FacilityService`] covers the
//! administrative side, and [`ExpirationSweeper`] runs the periodic cleanup.
//! All of them emit events through the [`super::domain::EventBus`].

pub mod facility_service;
pub mod reservation_service;
pub mod sweeper;

use std::sync::Arc;

use crate::domain::{CapacityLedger, Clock, ReservationBook, RetryPolicy, TariffSchedule};

pub use facility_service::FacilityService;
pub use reservation_service::{ReservationService, SweepReport};
pub use sweeper::ExpirationSweeper;

/// Handles to the shared stores, cloned into every service.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Reservation rows.
    pub book: Arc<ReservationBook>,
    /// Facility rows and spot counters.
    pub ledger: Arc<CapacityLedger>,
    /// Tariff sets.
    pub tariffs: Arc<TariffSchedule>,
    /// Time source for every timestamp.
    pub clock: Arc<dyn Clock>,
}

impl Stores {
    /// Creates empty in-memory stores sharing one clock and retry policy.
    #[must_use]
    pub fn in_memory(clock: Arc<dyn Clock>, policy: RetryPolicy) -> Self {
        Self {
            book: Arc::new(ReservationBook::new()),
            ledger: Arc::new(CapacityLedger::new(Arc::clone(&clock), policy)),
            tariffs: Arc::new(TariffSchedule::new()),
            clock,
        }
    }
}

/// Tunables of the reservation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Row-lock wait and conflict retry bounds.
    pub policy: RetryPolicy,
    /// Arrival deadline given to unscheduled reservations.
    pub arrival_window: chrono::Duration,
    /// Age after which a pending reservation is swept.
    pub pending_ttl: chrono::Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            arrival_window: chrono::Duration::minutes(15),
            pending_ttl: chrono::Duration::minutes(15),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod testing {
    //! Shared fixtures for service tests.

    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};

    use super::{FacilityService, LifecycleSettings, ReservationService, Stores};
    use crate::domain::{
        Clock, EventBus, FacilityId, GeoPoint, ManualClock, NewFacility, RetryPolicy, TariffEntry,
        VehicleClass,
    };

    pub(crate) struct Fixture {
        pub clock: Arc<ManualClock>,
        pub stores: Stores,
        pub event_bus: EventBus,
        pub reservations: Arc<ReservationService>,
        pub facilities: FacilityService,
    }

    pub(crate) fn start() -> DateTime<Utc> {
        let Some(start) = Utc.with_ymd_and_hms(2024, 1, 1, 9, 55, 0).single() else {
            panic!("valid start instant");
        };
        start
    }

    pub(crate) fn class(name: &str) -> VehicleClass {
        let Some(class) = VehicleClass::parse(name) else {
            panic!("valid class");
        };
        class
    }

    pub(crate) fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(start()));
        let settings = LifecycleSettings {
            policy: RetryPolicy {
                lock_timeout: std::time::Duration::from_millis(50),
                max_attempts: 3,
                backoff: std::time::Duration::from_millis(1),
            },
            ..LifecycleSettings::default()
        };
        let shared: Arc<dyn Clock> = Arc::clone(&clock) as Arc<dyn Clock>;
        let stores = Stores::in_memory(shared, settings.policy);
        let event_bus = EventBus::new(256);
        let reservations = Arc::new(ReservationService::new(
            stores.clone(),
            event_bus.clone(),
            settings,
        ));
        let facilities = FacilityService::new(stores.clone(), event_bus.clone());
        Fixture {
            clock,
            stores,
            event_bus,
            reservations,
            facilities,
        }
    }

    impl Fixture {
        /// Registers a facility with a carro tariff of 2000 / 1000.
        pub(crate) async fn facility(&self, total_spots: u32) -> FacilityId {
            let new = NewFacility {
                name: "Parqueadero Calle 85".to_string(),
                address: "Calle 85 # 11-53".to_string(),
                location: GeoPoint {
                    latitude: 4.668,
                    longitude: -74.053,
                },
                total_spots,
            };
            let Ok(facility) = self.facilities.register(new).await else {
                panic!("registration failed");
            };
            let tariffs = vec![TariffEntry::tiered(class("carro"), 2000.0, 1000.0)];
            if self
                .facilities
                .replace_tariffs(facility.id, tariffs)
                .await
                .is_err()
            {
                panic!("tariff replacement failed");
            }
            facility.id
        }
    }
}
