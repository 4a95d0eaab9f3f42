//! Domain layer: identities, tariffs, capacity accounting, reservations and
//! the event system.
//!
//! Facilities and reservations are stored as individually locked rows
//! ([`CapacityLedger`], [`ReservationBook`]); the tariff schedule swaps whole
//! per-facility sets. All timestamps come from an injected [`Clock`].

pub mod capacity_ledger;
pub mod clock;
pub mod event_bus;
pub mod facility;
pub mod fare;
pub mod ids;
pub mod reservation;
pub mod reservation_book;
pub mod reservation_event;
pub mod row_lock;
pub mod tariff;

pub use capacity_ledger::CapacityLedger;
pub use clock::{Clock, ManualClock, SystemClock};
pub use event_bus::{EventBus, drain_ready};
pub use facility::{Facility, GeoPoint, NewFacility};
pub use fare::{FareQuote, compute_fare, hours_between};
pub use ids::{FacilityId, ReservationId, UserId};
pub use reservation::{
    Booking, Reservation, ReservationRequest, ReservationState, ScheduledWindow,
    ValidatedRequest,
};
pub use reservation_book::ReservationBook;
pub use reservation_event::{CancelReason, ReservationEvent};
pub use row_lock::RetryPolicy;
pub use tariff::{TariffEntry, TariffSchedule, VehicleClass};
