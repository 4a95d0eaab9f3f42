//! OpenAPI document covering every REST endpoint.

use utoipa::OpenApi;

use crate::api::handlers::{facility, reservation, system};

/// API Documentation
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        system::health_handler,
        system::sweep_handler,
        facility::register_facility,
        facility::list_facilities,
        facility::get_facility,
        facility::update_facility,
        facility::replace_tariffs,
        facility::list_tariffs,
        facility::set_availability,
        facility::resize_capacity,
        facility::list_facility_reservations,
        reservation::create_reservation,
        reservation::get_reservation,
        reservation::authorize_entry,
        reservation::complete_reservation,
        reservation::cancel_reservation,
        reservation::quote_fare,
        reservation::recompute_fare,
        reservation::list_user_reservations,
    ),
    tags(
        (name = "Reservations", description = "Reservation lifecycle and billing"),
        (name = "Facilities", description = "Facility capacity and tariff administration"),
        (name = "System", description = "Health and maintenance"),
    ),
    info(
        title = "Parking Gateway API",
        description = "Reservation lifecycle, capacity ledger and tiered billing for parking facilities",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_lifecycle_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| *p == "/api/v1/reservations"));
        assert!(paths.iter().any(|p| *p == "/api/v1/reservations/{id}/authorize-entry"));
        assert!(paths.iter().any(|p| *p == "/api/v1/facilities/{id}/tariffs"));
        assert!(paths.iter().any(|p| *p == "/health"));
    }
}
