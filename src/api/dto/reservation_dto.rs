//! Reservation-related DTOs for create, get, list and fare operations.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    FacilityId, Reservation, ReservationId, ReservationRequest, ReservationState, UserId,
    VehicleClass,
};
use crate::error::ReservationError;

/// Request body for `POST /reservations`.
///
/// Every field is optional on the wire so that absent values surface as
/// `MissingField` rather than a generic body rejection.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateReservationRequest {
    /// Driver making the reservation.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Facility to reserve at.
    #[serde(default)]
    pub facility_id: Option<FacilityId>,
    /// Vehicle class (`"carro"`, `"moto"`, ...).
    #[serde(default)]
    pub vehicle_class: Option<String>,
    /// Requested date, `YYYY-MM-DD`.
    #[serde(default)]
    pub date: Option<String>,
    /// Free-text notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Scheduled start, `HH:MM` or `HH:MM:SS`.
    #[serde(default)]
    pub scheduled_start: Option<String>,
    /// Scheduled end, `HH:MM` or `HH:MM:SS`.
    #[serde(default)]
    pub scheduled_end: Option<String>,
}

impl CreateReservationRequest {
    /// Parses date and time strings into a domain request.
    ///
    /// Blank strings count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::InvalidRequest`] on a malformed date or
    /// time.
    pub fn into_request(self) -> Result<ReservationRequest, ReservationError> {
        Ok(ReservationRequest {
            user_id: self.user_id,
            facility_id: self.facility_id,
            vehicle_class: self.vehicle_class,
            date: non_blank(self.date).map(|d| parse_date(&d)).transpose()?,
            notes: self.notes,
            scheduled_start: non_blank(self.scheduled_start)
                .map(|t| parse_time(&t))
                .transpose()?,
            scheduled_end: non_blank(self.scheduled_end)
                .map(|t| parse_time(&t))
                .transpose()?,
        })
    }
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_date(raw: &str) -> Result<NaiveDate, ReservationError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ReservationError::InvalidRequest(format!("invalid date: {raw}")))
}

fn parse_time(raw: &str) -> Result<NaiveTime, ReservationError> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| ReservationError::InvalidRequest(format!("invalid time: {raw}")))
}

/// Reservation snapshot returned by every reservation endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationDto {
    /// Reservation identifier.
    pub reservation_id: ReservationId,
    /// Owning driver.
    pub user_id: UserId,
    /// Facility reserved at.
    pub facility_id: FacilityId,
    /// Vehicle class.
    pub vehicle_class: VehicleClass,
    /// Lifecycle state (`pendiente`, `activa`, `completada`, `cancelada`).
    pub state: ReservationState,
    /// Requested date.
    pub date: NaiveDate,
    /// Scheduled start, if booked with times.
    pub scheduled_start: Option<NaiveDateTime>,
    /// Scheduled end, if booked with times.
    pub scheduled_end: Option<NaiveDateTime>,
    /// Arrival deadline for unscheduled bookings.
    pub arrive_by: Option<DateTime<Utc>>,
    /// `true` when the client should count down to `arrive_by`.
    pub countdown_start: bool,
    /// Scheduled duration in hours.
    pub projected_hours: f64,
    /// Fare projected at creation.
    pub projected_fare: f64,
    /// Actual arrival.
    pub arrived_at: Option<DateTime<Utc>>,
    /// Actual departure.
    pub departed_at: Option<DateTime<Utc>>,
    /// Billed duration in hours.
    pub elapsed_hours: Option<f64>,
    /// Billed fare.
    pub fare: Option<f64>,
    /// Cancellation timestamp.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last transition timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationDto {
    fn from(r: Reservation) -> Self {
        Self {
            reservation_id: r.id,
            user_id: r.user_id,
            facility_id: r.facility_id,
            state: r.state(),
            countdown_start: r.requires_countdown(),
            arrived_at: r.arrived_at(),
            departed_at: r.departed_at(),
            elapsed_hours: r.elapsed_hours(),
            fare: r.fare(),
            cancelled_at: r.cancelled_at(),
            vehicle_class: r.vehicle_class,
            date: r.date,
            scheduled_start: r.scheduled_start,
            scheduled_end: r.scheduled_end,
            arrive_by: r.arrive_by,
            projected_hours: r.projected_hours,
            projected_fare: r.projected_fare,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// List response for reservation listings (newest first).
#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationListResponse {
    /// Reservations, newest first.
    pub data: Vec<ReservationDto>,
    /// Number of reservations returned.
    pub total: usize,
}

impl From<Vec<Reservation>> for ReservationListResponse {
    fn from(reservations: Vec<Reservation>) -> Self {
        let data: Vec<ReservationDto> = reservations.into_iter().map(ReservationDto::from).collect();
        Self {
            total: data.len(),
            data,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn times_accept_with_and_without_seconds() {
        let req = CreateReservationRequest {
            date: Some("2024-01-01".to_string()),
            scheduled_start: Some("10:00".to_string()),
            scheduled_end: Some("11:30:00".to_string()),
            ..CreateReservationRequest::default()
        };
        let Ok(parsed) = req.into_request() else {
            panic!("parse failed");
        };
        assert_eq!(parsed.scheduled_start, NaiveTime::from_hms_opt(10, 0, 0));
        assert_eq!(parsed.scheduled_end, NaiveTime::from_hms_opt(11, 30, 0));
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn blank_values_are_absent() {
        let req = CreateReservationRequest {
            date: Some("  ".to_string()),
            scheduled_start: Some(String::new()),
            ..CreateReservationRequest::default()
        };
        let Ok(parsed) = req.into_request() else {
            panic!("parse failed");
        };
        assert!(parsed.date.is_none());
        assert!(parsed.scheduled_start.is_none());
    }

    #[test]
    fn malformed_date_is_invalid() {
        let req = CreateReservationRequest {
            date: Some("01/01/2024".to_string()),
            ..CreateReservationRequest::default()
        };
        assert!(matches!(
            req.into_request(),
            Err(ReservationError::InvalidRequest(_))
        ));
    }
}
