//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::{FacilityService, ReservationService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Reservation lifecycle and billing.
    pub reservation_service: Arc<ReservationService>,
    /// Facility administration.
    pub facility_service: Arc<FacilityService>,
    /// Event bus feeding the event log writer.
    pub event_bus: EventBus,
}
