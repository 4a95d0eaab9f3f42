//! Facility administration handlers: registration, details, tariffs,
//! availability, capacity and per-facility reservation listings.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{
    AvailabilityRequest, FacilityDto, RegisterFacilityRequest, ReplaceTariffsRequest,
    ReservationListResponse, ResizeCapacityRequest, TariffListResponse, UpdateFacilityRequest,
};
use crate::app_state::AppState;
use crate::domain::FacilityId;
use crate::error::{ErrorResponse, ReservationError};

/// `POST /facilities`: Register a facility.
///
/// # Errors
///
/// Returns [`ReservationError::InvalidRequest`] on a blank name or
/// out-of-range coordinates.
#[utoipa::path(
    post,
    path = "/api/v1/facilities",
    tag = "Facilities",
    summary = "Register a facility",
    description = "Registers an open facility with every spot available and no tariffs.",
    request_body = RegisterFacilityRequest,
    responses(
        (status = 201, description = "Facility registered", body = FacilityDto),
        (status = 400, description = "Invalid registration", body = ErrorResponse),
    )
)]
pub async fn register_facility(
    State(state): State<AppState>,
    Json(req): Json<RegisterFacilityRequest>,
) -> Result<impl IntoResponse, ReservationError> {
    let facility = state.facility_service.register(req.into()).await?;
    Ok((StatusCode::CREATED, Json(FacilityDto::from(facility))))
}

/// `GET /facilities`: List facilities sorted by name.
#[utoipa::path(
    get,
    path = "/api/v1/facilities",
    tag = "Facilities",
    summary = "List facilities",
    responses(
        (status = 200, description = "All facilities", body = Vec<FacilityDto>),
    )
)]
pub async fn list_facilities(State(state): State<AppState>) -> impl IntoResponse {
    let facilities: Vec<FacilityDto> = state
        .facility_service
        .list()
        .await
        .into_iter()
        .map(FacilityDto::from)
        .collect();
    Json(facilities)
}

/// `GET /facilities/:id`: Facility snapshot with live spot counters.
///
/// # Errors
///
/// Returns [`ReservationError::FacilityNotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/v1/facilities/{id}",
    tag = "Facilities",
    summary = "Get facility details",
    params(
        ("id" = uuid::Uuid, Path, description = "Facility UUID"),
    ),
    responses(
        (status = 200, description = "Facility details", body = FacilityDto),
        (status = 404, description = "Facility not found", body = ErrorResponse),
    )
)]
pub async fn get_facility(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ReservationError> {
    let facility = state
        .facility_service
        .get(FacilityId::from_uuid(id))
        .await?;
    Ok(Json(FacilityDto::from(facility)))
}

/// `PUT /facilities/:id`: Update name and address.
///
/// # Errors
///
/// Returns [`ReservationError`] on a blank field or an unknown facility.
#[utoipa::path(
    put,
    path = "/api/v1/facilities/{id}",
    tag = "Facilities",
    summary = "Update facility details",
    description = "Replaces the name and address. Capacity is changed through the capacity endpoint.",
    params(
        ("id" = uuid::Uuid, Path, description = "Facility UUID"),
    ),
    request_body = UpdateFacilityRequest,
    responses(
        (status = 200, description = "Facility updated", body = FacilityDto),
        (status = 400, description = "Blank name or address", body = ErrorResponse),
        (status = 404, description = "Facility not found", body = ErrorResponse),
    )
)]
pub async fn update_facility(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateFacilityRequest>,
) -> Result<impl IntoResponse, ReservationError> {
    let facility = state
        .facility_service
        .update(FacilityId::from_uuid(id), &req.name, &req.address)
        .await?;
    Ok(Json(FacilityDto::from(facility)))
}

/// `PUT /facilities/:id/tariffs`: Replace the tariff set.
///
/// # Errors
///
/// Returns [`ReservationError`] for an unknown facility or an invalid entry;
/// the previous set is kept on error.
#[utoipa::path(
    put,
    path = "/api/v1/facilities/{id}/tariffs",
    tag = "Facilities",
    summary = "Replace tariffs",
    description = "Replaces the facility's whole tariff set. Completed reservations keep their fare until recomputed.",
    params(
        ("id" = uuid::Uuid, Path, description = "Facility UUID"),
    ),
    request_body = ReplaceTariffsRequest,
    responses(
        (status = 200, description = "Tariffs replaced", body = TariffListResponse),
        (status = 400, description = "Invalid tariff entry", body = ErrorResponse),
        (status = 404, description = "Facility not found", body = ErrorResponse),
    )
)]
pub async fn replace_tariffs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReplaceTariffsRequest>,
) -> Result<impl IntoResponse, ReservationError> {
    let facility_id = FacilityId::from_uuid(id);
    let entries = req.into_entries()?;
    let tariffs = state
        .facility_service
        .replace_tariffs(facility_id, entries)
        .await?;
    Ok(Json(TariffListResponse {
        facility_id,
        tariffs,
    }))
}

/// `GET /facilities/:id/tariffs`: Current tariff set.
///
/// # Errors
///
/// Returns [`ReservationError::FacilityNotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/v1/facilities/{id}/tariffs",
    tag = "Facilities",
    summary = "List tariffs",
    params(
        ("id" = uuid::Uuid, Path, description = "Facility UUID"),
    ),
    responses(
        (status = 200, description = "Tariff set", body = TariffListResponse),
        (status = 404, description = "Facility not found", body = ErrorResponse),
    )
)]
pub async fn list_tariffs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ReservationError> {
    let facility_id = FacilityId::from_uuid(id);
    let tariffs = state.facility_service.tariffs(facility_id).await?;
    Ok(Json(TariffListResponse {
        facility_id,
        tariffs,
    }))
}

/// `PUT /facilities/:id/availability`: Set the manual open flag.
///
/// # Errors
///
/// Returns [`ReservationError::FacilityNotFound`] for an unknown id.
#[utoipa::path(
    put,
    path = "/api/v1/facilities/{id}/availability",
    tag = "Facilities",
    summary = "Set manual availability",
    description = "Flips the informational open/closed flag. Spot counters are not touched.",
    params(
        ("id" = uuid::Uuid, Path, description = "Facility UUID"),
    ),
    request_body = AvailabilityRequest,
    responses(
        (status = 200, description = "Flag updated", body = FacilityDto),
        (status = 404, description = "Facility not found", body = ErrorResponse),
    )
)]
pub async fn set_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AvailabilityRequest>,
) -> Result<impl IntoResponse, ReservationError> {
    let facility = state
        .facility_service
        .set_manual_availability(FacilityId::from_uuid(id), req.is_open)
        .await?;
    Ok(Json(FacilityDto::from(facility)))
}

/// `PUT /facilities/:id/capacity`: Resize total spots.
///
/// # Errors
///
/// Returns [`ReservationError::InvalidRequest`] if the new total is below
/// current occupancy.
#[utoipa::path(
    put,
    path = "/api/v1/facilities/{id}/capacity",
    tag = "Facilities",
    summary = "Resize capacity",
    description = "Changes the total spot count, keeping the vehicles currently inside.",
    params(
        ("id" = uuid::Uuid, Path, description = "Facility UUID"),
    ),
    request_body = ResizeCapacityRequest,
    responses(
        (status = 200, description = "Capacity resized", body = FacilityDto),
        (status = 400, description = "Total below occupancy", body = ErrorResponse),
        (status = 404, description = "Facility not found", body = ErrorResponse),
    )
)]
pub async fn resize_capacity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResizeCapacityRequest>,
) -> Result<impl IntoResponse, ReservationError> {
    let facility = state
        .facility_service
        .resize(FacilityId::from_uuid(id), req.total_spots)
        .await?;
    Ok(Json(FacilityDto::from(facility)))
}

/// `GET /facilities/:id/reservations`: Reservations at a facility.
///
/// # Errors
///
/// Returns [`ReservationError::FacilityNotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/v1/facilities/{id}/reservations",
    tag = "Facilities",
    summary = "List a facility's reservations",
    params(
        ("id" = uuid::Uuid, Path, description = "Facility UUID"),
    ),
    responses(
        (status = 200, description = "Reservations, newest first", body = ReservationListResponse),
        (status = 404, description = "Facility not found", body = ErrorResponse),
    )
)]
pub async fn list_facility_reservations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ReservationError> {
    let reservations = state
        .reservation_service
        .list_for_facility(FacilityId::from_uuid(id))
        .await?;
    Ok(Json(ReservationListResponse::from(reservations)))
}

/// Facility routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/facilities", get(list_facilities).post(register_facility))
        .route("/facilities/{id}", get(get_facility).put(update_facility))
        .route(
            "/facilities/{id}/tariffs",
            get(list_tariffs).put(replace_tariffs),
        )
        .route("/facilities/{id}/availability", put(set_availability))
        .route("/facilities/{id}/capacity", put(resize_capacity))
        .route(
            "/facilities/{id}/reservations",
            get(list_facility_reservations),
        )
}
