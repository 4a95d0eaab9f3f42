//! Reservation aggregate and its lifecycle guards.
//!
//! ```text
//! pendiente ──► activa ──► completada
//!     │
//!     └──────► cancelada
//! ```
//!
//! Lifecycle fields are private and only change through the transition
//! methods, which check the current state first. `arrived_at` is set iff the
//! state is `activa` or `completada`; `departed_at`, `elapsed_hours` and
//! `fare` are set iff the state is `completada`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::fare::hours_between;
use super::{FacilityId, ReservationId, UserId, VehicleClass};
use crate::error::ReservationError;

/// Lifecycle state of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ReservationState {
    /// Created, not yet arrived. Holds no spot.
    #[serde(rename = "pendiente")]
    Pending,
    /// Vehicle on site, occupying a spot.
    #[serde(rename = "activa")]
    Active,
    /// Vehicle left and the stay was billed. Terminal.
    #[serde(rename = "completada")]
    Completed,
    /// Withdrawn before arrival. Terminal.
    #[serde(rename = "cancelada")]
    Cancelled,
}

impl ReservationState {
    /// Returns `true` if `next` is reachable from `self` in one step.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Active)
                | (Self::Active, Self::Completed)
                | (Self::Pending, Self::Cancelled)
        )
    }

    /// Returns `true` for `completada` and `cancelada`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Unvalidated creation input, as handed over by the calling layer.
#[derive(Debug, Clone, Default)]
pub struct ReservationRequest {
    /// Driver making the reservation.
    pub user_id: Option<UserId>,
    /// Facility to reserve at.
    pub facility_id: Option<FacilityId>,
    /// Vehicle class, used to resolve the tariff.
    pub vehicle_class: Option<String>,
    /// Requested date.
    pub date: Option<NaiveDate>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Scheduled start time on `date`.
    pub scheduled_start: Option<NaiveTime>,
    /// Scheduled end time on `date`.
    pub scheduled_end: Option<NaiveTime>,
}

/// Scheduled stay on the requested date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledWindow {
    /// Scheduled start.
    pub start: NaiveDateTime,
    /// Scheduled end, strictly after `start`.
    pub end: NaiveDateTime,
}

impl ScheduledWindow {
    /// Scheduled duration in hours.
    #[must_use]
    pub fn hours(&self) -> f64 {
        hours_between(self.start.and_utc(), self.end.and_utc())
    }
}

/// Creation input that passed field validation.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    /// Driver making the reservation.
    pub user_id: UserId,
    /// Facility to reserve at.
    pub facility_id: FacilityId,
    /// Normalized vehicle class.
    pub vehicle_class: VehicleClass,
    /// Requested date.
    pub date: NaiveDate,
    /// Trimmed notes, `None` when blank.
    pub notes: Option<String>,
    /// Present only when both scheduled times were given.
    pub window: Option<ScheduledWindow>,
    /// Start time given without an end; used as the arrival deadline.
    pub arrive_at: Option<NaiveDateTime>,
}

impl ReservationRequest {
    /// Checks required fields and the scheduled window.
    ///
    /// A window is only formed when both times are present. A start time
    /// without an end becomes the arrival deadline; a lone end time is
    /// ignored.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::MissingField`] for an absent user, facility,
    ///   date or vehicle class (blank counts as absent).
    /// - [`ReservationError::InvalidWindow`] if end is not after start.
    pub fn validate(self) -> Result<ValidatedRequest, ReservationError> {
        let user_id = self.user_id.ok_or(ReservationError::MissingField("user_id"))?;
        let facility_id = self
            .facility_id
            .ok_or(ReservationError::MissingField("facility_id"))?;
        let date = self.date.ok_or(ReservationError::MissingField("date"))?;
        let vehicle_class = self
            .vehicle_class
            .as_deref()
            .and_then(VehicleClass::parse)
            .ok_or(ReservationError::MissingField("vehicle_class"))?;

        let (window, arrive_at) = match (self.scheduled_start, self.scheduled_end) {
            (Some(start), Some(end)) => {
                let window = ScheduledWindow {
                    start: date.and_time(start),
                    end: date.and_time(end),
                };
                if window.end <= window.start {
                    return Err(ReservationError::InvalidWindow);
                }
                (Some(window), None)
            }
            (Some(start), None) => (None, Some(date.and_time(start))),
            (None, _) => (None, None),
        };

        let notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Ok(ValidatedRequest {
            user_id,
            facility_id,
            vehicle_class,
            date,
            notes,
            window,
            arrive_at,
        })
    }
}

/// How the reservation was booked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Booking {
    /// Booked with both times; carries the projected duration and fare.
    Scheduled {
        /// Scheduled stay.
        window: ScheduledWindow,
        /// Scheduled duration in hours.
        projected_hours: f64,
        /// Fare projected from the tariff at creation.
        projected_fare: f64,
    },
    /// Booked without times; the driver must arrive before `arrive_by`.
    ArriveBy(DateTime<Utc>),
}

/// A driver's reservation at a facility.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reservation {
    /// Reservation identifier.
    pub id: ReservationId,
    /// Owning driver.
    pub user_id: UserId,
    /// Facility reserved at.
    pub facility_id: FacilityId,
    /// Vehicle class; the tariff is resolved from it when billing.
    pub vehicle_class: VehicleClass,
    /// Requested date.
    pub date: NaiveDate,
    /// Scheduled start, if booked with times.
    pub scheduled_start: Option<NaiveDateTime>,
    /// Scheduled end, if booked with times.
    pub scheduled_end: Option<NaiveDateTime>,
    /// Arrival deadline for unscheduled bookings.
    pub arrive_by: Option<DateTime<Utc>>,
    /// Scheduled duration in hours (zero when unscheduled).
    pub projected_hours: f64,
    /// Fare projected at creation (zero when unscheduled).
    pub projected_fare: f64,
    /// Free-text notes.
    pub notes: Option<String>,
    state: ReservationState,
    arrived_at: Option<DateTime<Utc>>,
    departed_at: Option<DateTime<Utc>>,
    elapsed_hours: Option<f64>,
    fare: Option<f64>,
    cancelled_at: Option<DateTime<Utc>>,
    /// Creation timestamp; the sweeper measures pending age from it.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last transition.
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Opens a new reservation in `pendiente`.
    #[must_use]
    pub fn open(request: ValidatedRequest, booking: Booking, now: DateTime<Utc>) -> Self {
        let (scheduled_start, scheduled_end, arrive_by, projected_hours, projected_fare) =
            match booking {
                Booking::Scheduled {
                    window,
                    projected_hours,
                    projected_fare,
                } => (
                    Some(window.start),
                    Some(window.end),
                    None,
                    projected_hours,
                    projected_fare,
                ),
                Booking::ArriveBy(deadline) => (None, None, Some(deadline), 0.0, 0.0),
            };
        Self {
            id: ReservationId::new(),
            user_id: request.user_id,
            facility_id: request.facility_id,
            vehicle_class: request.vehicle_class,
            date: request.date,
            scheduled_start,
            scheduled_end,
            arrive_by,
            projected_hours,
            projected_fare,
            notes: request.notes,
            state: ReservationState::Pending,
            arrived_at: None,
            departed_at: None,
            elapsed_hours: None,
            fare: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ReservationState {
        self.state
    }

    /// Actual arrival, set on entry.
    #[must_use]
    pub const fn arrived_at(&self) -> Option<DateTime<Utc>> {
        self.arrived_at
    }

    /// Actual departure, set on completion.
    #[must_use]
    pub const fn departed_at(&self) -> Option<DateTime<Utc>> {
        self.departed_at
    }

    /// Billed duration in hours, set on completion.
    #[must_use]
    pub const fn elapsed_hours(&self) -> Option<f64> {
        self.elapsed_hours
    }

    /// Billed fare, set on completion.
    #[must_use]
    pub const fn fare(&self) -> Option<f64> {
        self.fare
    }

    /// Cancellation timestamp.
    #[must_use]
    pub const fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    /// `true` when the caller should run a countdown to [`Self::arrive_by`].
    #[must_use]
    pub const fn requires_countdown(&self) -> bool {
        self.arrive_by.is_some()
    }

    /// `true` if still `pendiente` and created strictly before `cutoff`.
    #[must_use]
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.state == ReservationState::Pending && self.created_at < cutoff
    }

    /// Checks that entry may be authorized.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::ReservationNotFound`] unless `pendiente`.
    pub fn ensure_awaiting_entry(&self) -> Result<(), ReservationError> {
        if self.state == ReservationState::Pending {
            Ok(())
        } else {
            Err(ReservationError::ReservationNotFound(self.id))
        }
    }

    /// `pendiente → activa`, recording the arrival.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::ReservationNotFound`] unless `pendiente`.
    pub fn activate(&mut self, now: DateTime<Utc>) -> Result<(), ReservationError> {
        self.ensure_awaiting_entry()?;
        self.state = ReservationState::Active;
        self.arrived_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Checks that the reservation may be completed and returns its arrival.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::NotActive`] unless `activa`.
    /// - [`ReservationError::ArrivalNotRecorded`] if the arrival is missing.
    pub fn ensure_completable(&self) -> Result<DateTime<Utc>, ReservationError> {
        if self.state != ReservationState::Active {
            return Err(ReservationError::NotActive(self.id));
        }
        self.arrived_at
            .ok_or(ReservationError::ArrivalNotRecorded(self.id))
    }

    /// `activa → completada`, recording the departure and the billed fare.
    ///
    /// # Errors
    ///
    /// Same as [`Self::ensure_completable`].
    pub fn complete(
        &mut self,
        departed_at: DateTime<Utc>,
        elapsed_hours: f64,
        fare: f64,
    ) -> Result<(), ReservationError> {
        self.ensure_completable()?;
        self.state = ReservationState::Completed;
        self.departed_at = Some(departed_at);
        self.elapsed_hours = Some(elapsed_hours);
        self.fare = Some(fare);
        self.updated_at = departed_at;
        Ok(())
    }

    /// `pendiente → cancelada`.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::NotCancellable`] unless `pendiente`.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), ReservationError> {
        if self.state != ReservationState::Pending {
            return Err(ReservationError::NotCancellable(self.id));
        }
        self.state = ReservationState::Cancelled;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Returns the billed duration of a completed reservation.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::NotCompleted`] unless `completada`.
    pub fn billed_hours(&self) -> Result<f64, ReservationError> {
        match (self.state, self.elapsed_hours) {
            (ReservationState::Completed, Some(hours)) => Ok(hours),
            _ => Err(ReservationError::NotCompleted(self.id)),
        }
    }

    /// Overwrites the fare of a completed reservation.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::NotCompleted`] unless `completada`.
    pub fn reprice(&mut self, fare: f64, now: DateTime<Utc>) -> Result<(), ReservationError> {
        self.billed_hours()?;
        self.fare = Some(fare);
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request() -> ReservationRequest {
        ReservationRequest {
            user_id: Some(UserId::new()),
            facility_id: Some(FacilityId::new()),
            vehicle_class: Some("carro".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 1, 1),
            notes: None,
            scheduled_start: NaiveTime::from_hms_opt(10, 0, 0),
            scheduled_end: NaiveTime::from_hms_opt(11, 30, 0),
        }
    }

    fn pending(now: DateTime<Utc>) -> Reservation {
        let mut req = request();
        req.scheduled_start = None;
        req.scheduled_end = None;
        let Ok(valid) = req.validate() else {
            panic!("valid request");
        };
        Reservation::open(valid, Booking::ArriveBy(now + Duration::minutes(15)), now)
    }

    #[test]
    fn missing_fields_are_reported_in_order() {
        let mut req = request();
        req.user_id = None;
        req.date = None;
        assert_eq!(
            req.validate().err(),
            Some(ReservationError::MissingField("user_id"))
        );

        let mut req = request();
        req.vehicle_class = Some("  ".to_string());
        assert_eq!(
            req.validate().err(),
            Some(ReservationError::MissingField("vehicle_class"))
        );
    }

    #[test]
    fn window_must_be_positive() {
        let mut req = request();
        req.scheduled_end = NaiveTime::from_hms_opt(10, 0, 0);
        assert_eq!(req.validate().err(), Some(ReservationError::InvalidWindow));
    }

    #[test]
    fn scheduled_window_hours() {
        let Ok(valid) = request().validate() else {
            panic!("valid request");
        };
        let Some(window) = valid.window else {
            panic!("window expected");
        };
        assert!((window.hours() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn start_without_end_is_the_arrival_deadline() {
        let mut req = request();
        req.scheduled_start = NaiveTime::from_hms_opt(12, 0, 0);
        req.scheduled_end = None;
        let Ok(valid) = req.validate() else {
            panic!("valid request");
        };
        assert!(valid.window.is_none());
        let Some(expected) = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
        else {
            panic!("valid instant");
        };
        assert_eq!(valid.arrive_at, Some(expected));
    }

    #[test]
    fn end_without_start_is_unscheduled() {
        let mut req = request();
        req.scheduled_start = None;
        let Ok(valid) = req.validate() else {
            panic!("valid request");
        };
        assert!(valid.window.is_none());
        assert!(valid.arrive_at.is_none());
    }

    #[test]
    fn happy_path_sets_fields_per_state() {
        let now = Utc::now();
        let mut r = pending(now);
        assert!(r.requires_countdown());
        assert!(r.arrived_at().is_none());

        assert!(r.activate(now).is_ok());
        assert_eq!(r.state(), ReservationState::Active);
        assert_eq!(r.arrived_at(), Some(now));
        assert!(r.fare().is_none());

        let later = now + Duration::hours(2);
        assert!(r.complete(later, 2.0, 3000.0).is_ok());
        assert_eq!(r.state(), ReservationState::Completed);
        assert_eq!(r.departed_at(), Some(later));
        assert_eq!(r.fare(), Some(3000.0));
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        let now = Utc::now();
        let mut r = pending(now);
        assert!(r.cancel(now).is_ok());
        assert_eq!(r.cancel(now), Err(ReservationError::NotCancellable(r.id)));
        assert_eq!(r.activate(now), Err(ReservationError::ReservationNotFound(r.id)));
        assert_eq!(
            r.complete(now, 1.0, 1.0),
            Err(ReservationError::NotActive(r.id))
        );
        assert_eq!(r.state(), ReservationState::Cancelled);
        assert!(r.arrived_at().is_none());
    }

    #[test]
    fn active_cannot_be_cancelled_or_repriced() {
        let now = Utc::now();
        let mut r = pending(now);
        assert!(r.activate(now).is_ok());
        assert_eq!(r.cancel(now), Err(ReservationError::NotCancellable(r.id)));
        assert_eq!(
            r.reprice(10.0, now),
            Err(ReservationError::NotCompleted(r.id))
        );
    }

    #[test]
    fn transition_table_matches_lifecycle() {
        use ReservationState::*;
        let all = [Pending, Active, Completed, Cancelled];
        let allowed = [(Pending, Active), (Active, Completed), (Pending, Cancelled)];
        for from in all {
            for to in all {
                assert_eq!(from.can_transition_to(to), allowed.contains(&(from, to)));
            }
        }
        assert!(Completed.is_terminal() && Cancelled.is_terminal());
    }

    #[test]
    fn staleness_requires_pending_and_strict_age() {
        let now = Utc::now();
        let r = pending(now);
        assert!(!r.is_stale(now));
        assert!(r.is_stale(now + Duration::seconds(1)));
    }

    #[test]
    fn state_serializes_with_wire_names() {
        let Ok(json) = serde_json::to_string(&ReservationState::Cancelled) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "\"cancelada\"");
    }
}
