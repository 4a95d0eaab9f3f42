//! Reservation lifecycle handlers: create, entry, exit, cancel, fares.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{CreateReservationRequest, ReservationDto, ReservationListResponse};
use crate::app_state::AppState;
use crate::domain::{FareQuote, ReservationId, UserId};
use crate::error::{ErrorResponse, ReservationError};

/// `POST /reservations`: Create a pending reservation.
///
/// # Errors
///
/// Returns [`ReservationError`] on missing fields, an invalid window, an
/// unknown facility or a missing tariff for a scheduled booking.
#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    tag = "Reservations",
    summary = "Create a reservation",
    description = "Creates a `pendiente` reservation. With both scheduled times the fare is projected from the facility tariff; without them the driver gets an arrival deadline and `countdown_start` is true. No spot is taken until entry is authorized.",
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation created", body = ReservationDto),
        (status = 400, description = "Missing field or invalid window", body = ErrorResponse),
        (status = 404, description = "Facility or tariff not found", body = ErrorResponse),
    )
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, ReservationError> {
    let request = req.into_request()?;
    let reservation = state.reservation_service.create(request).await?;
    Ok((StatusCode::CREATED, Json(ReservationDto::from(reservation))))
}

/// `GET /reservations/:id`: Get a reservation.
///
/// # Errors
///
/// Returns [`ReservationError::ReservationNotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/v1/reservations/{id}",
    tag = "Reservations",
    summary = "Get reservation details",
    params(
        ("id" = uuid::Uuid, Path, description = "Reservation UUID"),
    ),
    responses(
        (status = 200, description = "Reservation details", body = ReservationDto),
        (status = 404, description = "Reservation not found", body = ErrorResponse),
    )
)]
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ReservationError> {
    let reservation = state
        .reservation_service
        .get(ReservationId::from_uuid(id))
        .await?;
    Ok(Json(ReservationDto::from(reservation)))
}

/// `POST /reservations/:id/authorize-entry`: Admit the vehicle.
///
/// Also mounted as `/reservations/:id/arrival`.
///
/// # Errors
///
/// Returns [`ReservationError`] when the reservation is not awaiting entry
/// or the facility is full.
#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/authorize-entry",
    tag = "Reservations",
    summary = "Authorize entry",
    description = "Moves a `pendiente` reservation to `activa`, records the arrival time and takes one spot from the facility.",
    params(
        ("id" = uuid::Uuid, Path, description = "Reservation UUID"),
    ),
    responses(
        (status = 200, description = "Entry authorized", body = ReservationDto),
        (status = 404, description = "Reservation not found or not awaiting entry", body = ErrorResponse),
        (status = 409, description = "No free spots left", body = ErrorResponse),
        (status = 503, description = "Storage contention persisted", body = ErrorResponse),
    )
)]
pub async fn authorize_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ReservationError> {
    let reservation = state
        .reservation_service
        .authorize_entry(ReservationId::from_uuid(id))
        .await?;
    Ok(Json(ReservationDto::from(reservation)))
}

/// `POST /reservations/:id/complete`: Record departure and bill.
///
/// Also mounted as `/reservations/:id/exit`.
///
/// # Errors
///
/// Returns [`ReservationError`] when the reservation is not `activa` or no
/// tariff is on file.
#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/complete",
    tag = "Reservations",
    summary = "Complete a reservation",
    description = "Moves an `activa` reservation to `completada`, bills the elapsed time against the current tariff and frees the spot.",
    params(
        ("id" = uuid::Uuid, Path, description = "Reservation UUID"),
    ),
    responses(
        (status = 200, description = "Reservation completed", body = ReservationDto),
        (status = 404, description = "Reservation or tariff not found", body = ErrorResponse),
        (status = 409, description = "Reservation is not active", body = ErrorResponse),
    )
)]
pub async fn complete_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ReservationError> {
    let reservation = state
        .reservation_service
        .complete(ReservationId::from_uuid(id))
        .await?;
    Ok(Json(ReservationDto::from(reservation)))
}

/// `POST /reservations/:id/cancel`: Cancel a pending reservation.
///
/// # Errors
///
/// Returns [`ReservationError::NotCancellable`] unless `pendiente`.
#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/cancel",
    tag = "Reservations",
    summary = "Cancel a reservation",
    params(
        ("id" = uuid::Uuid, Path, description = "Reservation UUID"),
    ),
    responses(
        (status = 200, description = "Reservation cancelled", body = ReservationDto),
        (status = 404, description = "Reservation not found", body = ErrorResponse),
        (status = 409, description = "Reservation is not pending", body = ErrorResponse),
    )
)]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ReservationError> {
    let reservation = state
        .reservation_service
        .cancel(ReservationId::from_uuid(id))
        .await?;
    Ok(Json(ReservationDto::from(reservation)))
}

/// `GET /reservations/:id/fare`: Fare quote.
///
/// # Errors
///
/// Returns [`ReservationError`] for an unknown reservation or missing tariff.
#[utoipa::path(
    get,
    path = "/api/v1/reservations/{id}/fare",
    tag = "Reservations",
    summary = "Quote the fare",
    description = "Live quote for an `activa` reservation, billed fare for `completada`, projection otherwise. Rates always come from the current tariff.",
    params(
        ("id" = uuid::Uuid, Path, description = "Reservation UUID"),
    ),
    responses(
        (status = 200, description = "Fare quote", body = FareQuote),
        (status = 404, description = "Reservation or tariff not found", body = ErrorResponse),
    )
)]
pub async fn quote_fare(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ReservationError> {
    let quote = state
        .reservation_service
        .fare_quote(ReservationId::from_uuid(id))
        .await?;
    Ok(Json(quote))
}

/// `POST /reservations/:id/recompute-fare`: Re-bill a completed reservation.
///
/// # Errors
///
/// Returns [`ReservationError::NotCompleted`] unless `completada`.
#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/recompute-fare",
    tag = "Reservations",
    summary = "Recompute the final fare",
    description = "Re-bills the stored elapsed time against the tariff currently on file. Repeating the call without a tariff change yields the same fare.",
    params(
        ("id" = uuid::Uuid, Path, description = "Reservation UUID"),
    ),
    responses(
        (status = 200, description = "Fare recomputed", body = ReservationDto),
        (status = 404, description = "Reservation or tariff not found", body = ErrorResponse),
        (status = 409, description = "Reservation is not completed", body = ErrorResponse),
    )
)]
pub async fn recompute_fare(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ReservationError> {
    let reservation = state
        .reservation_service
        .recompute_final_fare(ReservationId::from_uuid(id))
        .await?;
    Ok(Json(ReservationDto::from(reservation)))
}

/// `GET /users/:id/reservations`: A driver's reservations, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/reservations",
    tag = "Reservations",
    summary = "List a user's reservations",
    params(
        ("id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 200, description = "Reservations, newest first", body = ReservationListResponse),
    )
)]
pub async fn list_user_reservations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let reservations = state
        .reservation_service
        .list_for_user(UserId::from_uuid(id))
        .await;
    Json(ReservationListResponse::from(reservations))
}

/// Reservation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reservations", post(create_reservation))
        .route("/reservations/{id}", get(get_reservation))
        .route("/reservations/{id}/authorize-entry", post(authorize_entry))
        .route("/reservations/{id}/arrival", post(authorize_entry))
        .route("/reservations/{id}/complete", post(complete_reservation))
        .route("/reservations/{id}/exit", post(complete_reservation))
        .route("/reservations/{id}/cancel", post(cancel_reservation))
        .route("/reservations/{id}/fare", get(quote_fare))
        .route("/reservations/{id}/recompute-fare", post(recompute_fare))
        .route("/users/{id}/reservations", get(list_user_reservations))
}
