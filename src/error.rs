//! Reservation error types with HTTP status code mapping.
//!
//! [`ReservationError`] is the single failure type returned by the ledger,
//! the state machine and the services. Each variant maps to a numeric code
//! and an HTTP status so the REST layer can render it without inspecting
//! messages.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{FacilityId, ReservationId, VehicleClass};

/// Structured JSON error response body.
///
/// ```json
/// {
///   "error": {
///     "code": 4001,
///     "message": "no free spots left in facility 5f0c..."
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Failure of a single core operation.
///
/// # Error Code Ranges
///
/// | Range     | Category             | HTTP Status                  |
/// |-----------|----------------------|------------------------------|
/// | 1000–1999 | Validation           | 400 Bad Request              |
/// | 2000–2999 | Not Found            | 404 Not Found                |
/// | 3000–3999 | Server / Storage     | 500 / 503                    |
/// | 4000–4999 | Capacity             | 409 Conflict                 |
/// | 5000–5999 | Lifecycle guard      | 409 Conflict                 |
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReservationError {
    /// A required creation field was absent.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Scheduled end is not after scheduled start.
    #[error("scheduled end must be after scheduled start")]
    InvalidWindow,

    /// Request payload is malformed (tariffs, capacity values).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No tariff on file for the facility and vehicle class.
    #[error("no tariff for vehicle class '{vehicle_class}' at facility {facility_id}")]
    RateNotFound {
        /// Facility that was queried.
        facility_id: FacilityId,
        /// Vehicle class that has no entry.
        vehicle_class: VehicleClass,
    },

    /// Every spot of the facility is occupied.
    #[error("no free spots left in facility {0}")]
    CapacityExhausted(FacilityId),

    /// A release would push `available` past `total`.
    #[error("release would exceed total capacity of facility {0}")]
    CapacityOverflow(FacilityId),

    /// Unknown reservation id, or the reservation is not awaiting entry.
    #[error("reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    /// Unknown facility id.
    #[error("facility not found: {0}")]
    FacilityNotFound(FacilityId),

    /// Completion requested on a reservation that is not `activa`.
    #[error("reservation {0} is not active")]
    NotActive(ReservationId),

    /// Cancellation requested on a reservation that is not `pendiente`.
    #[error("reservation {0} cannot be cancelled")]
    NotCancellable(ReservationId),

    /// Final fare recomputation requested before completion.
    #[error("reservation {0} is not completed")]
    NotCompleted(ReservationId),

    /// An active reservation without an arrival timestamp.
    #[error("arrival not recorded for reservation {0}")]
    ArrivalNotRecorded(ReservationId),

    /// A row lock could not be acquired in time. Transient and retried
    /// internally; callers only see [`Self::StorageUnavailable`].
    #[error("storage conflict")]
    StorageConflict,

    /// Conflict retries were exhausted.
    #[error("storage unavailable: {operation} gave up after {attempts} attempts")]
    StorageUnavailable {
        /// Operation that kept conflicting.
        operation: &'static str,
        /// Number of attempts made.
        attempts: u32,
    },

    /// Event log failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ReservationError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::MissingField(_) => 1001,
            Self::InvalidWindow => 1002,
            Self::InvalidRequest(_) => 1003,
            Self::ReservationNotFound(_) => 2001,
            Self::FacilityNotFound(_) => 2002,
            Self::RateNotFound { .. } => 2003,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::StorageConflict => 3002,
            Self::StorageUnavailable { .. } => 3003,
            Self::CapacityExhausted(_) => 4001,
            Self::CapacityOverflow(_) => 4002,
            Self::NotActive(_) => 5001,
            Self::NotCancellable(_) => 5002,
            Self::NotCompleted(_) => 5003,
            Self::ArrivalNotRecorded(_) => 5004,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingField(_) | Self::InvalidWindow | Self::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::ReservationNotFound(_) | Self::FacilityNotFound(_) | Self::RateNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            Self::CapacityExhausted(_)
            | Self::NotActive(_)
            | Self::NotCancellable(_)
            | Self::NotCompleted(_)
            | Self::ArrivalNotRecorded(_) => StatusCode::CONFLICT,
            Self::StorageConflict | Self::StorageUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::CapacityOverflow(_) | Self::PersistenceError(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns `true` for transient storage contention that may be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageConflict)
    }
}

impl IntoResponse for ReservationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_errors_map_to_conflict() {
        let err = ReservationError::CapacityExhausted(FacilityId::new());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), 4001);
    }

    #[test]
    fn only_storage_conflict_is_retryable() {
        assert!(ReservationError::StorageConflict.is_retryable());
        let exhausted = ReservationError::StorageUnavailable {
            operation: "ledger.reserve",
            attempts: 3,
        };
        assert!(!exhausted.is_retryable());
        assert_eq!(exhausted.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn into_response_sets_status() {
        let response = ReservationError::MissingField("user_id").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
