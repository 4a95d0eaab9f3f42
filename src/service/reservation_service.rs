//! Reservation service: runs lifecycle transitions and emits events.
//!
//! Every transition follows the same pattern: take the reservation's row
//! lock, check the state guard, touch the capacity ledger if the transition
//! needs a spot, apply the transition, release the lock, publish the event.
//! Locks are always taken reservation row first, facility row second.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OwnedRwLockWriteGuard;
use utoipa::ToSchema;

use super::{LifecycleSettings, Stores};
use crate::domain::row_lock::{lock_row, retry_on_conflict};
use crate::domain::{
    Booking, CancelReason, EventBus, FacilityId, FareQuote, Reservation, ReservationEvent,
    ReservationId, ReservationRequest, ReservationState, UserId, compute_fare, hours_between,
};
use crate::error::ReservationError;

/// Outcome of one expiration sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    /// Reservations moved to `cancelada`.
    pub affected: usize,
    /// Candidates that could not be cancelled because of storage contention.
    pub failed: usize,
}

/// Orchestration layer for the reservation lifecycle.
#[derive(Debug, Clone)]
pub struct ReservationService {
    stores: Stores,
    event_bus: EventBus,
    settings: LifecycleSettings,
}

impl ReservationService {
    /// Creates a new `ReservationService`.
    #[must_use]
    pub fn new(stores: Stores, event_bus: EventBus, settings: LifecycleSettings) -> Self {
        Self {
            stores,
            event_bus,
            settings,
        }
    }

    /// Creates a reservation in `pendiente`.
    ///
    /// With both scheduled times the tariff is resolved and a projected fare
    /// is computed over the scheduled window. With only a start time, that
    /// start becomes the arrival deadline. Without times the deadline is now
    /// plus the arrival window. Both unscheduled forms carry zero
    /// projections and ask for a countdown. No spot is taken.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::MissingField`] / [`ReservationError::InvalidWindow`]
    ///   on invalid input.
    /// - [`ReservationError::FacilityNotFound`] for an unknown facility.
    /// - [`ReservationError::RateNotFound`] if a scheduled reservation has
    ///   no tariff for its vehicle class.
    pub async fn create(&self, request: ReservationRequest) -> Result<Reservation, ReservationError> {
        let request = request.validate()?;
        if !self.stores.ledger.contains(request.facility_id).await {
            return Err(ReservationError::FacilityNotFound(request.facility_id));
        }

        let now = self.stores.clock.now();
        let booking = match request.window {
            Some(window) => {
                let tariff = self
                    .stores
                    .tariffs
                    .resolve(request.facility_id, &request.vehicle_class)
                    .await?;
                let projected_hours = window.hours();
                Booking::Scheduled {
                    window,
                    projected_hours,
                    projected_fare: compute_fare(projected_hours, &tariff),
                }
            }
            None => Booking::ArriveBy(
                request
                    .arrive_at
                    .map_or(now + self.settings.arrival_window, |at| at.and_utc()),
            ),
        };

        let reservation = Reservation::open(request, booking, now);
        self.stores.book.insert(reservation.clone()).await?;

        let _ = self.event_bus.publish(ReservationEvent::ReservationCreated {
            reservation_id: reservation.id,
            facility_id: reservation.facility_id,
            user_id: reservation.user_id,
            vehicle_class: reservation.vehicle_class.clone(),
            projected_fare: reservation.projected_fare,
            timestamp: now,
        });
        tracing::info!(
            reservation_id = %reservation.id,
            facility_id = %reservation.facility_id,
            vehicle_class = %reservation.vehicle_class,
            scheduled = !reservation.requires_countdown(),
            "reservation created"
        );
        Ok(reservation)
    }

    /// `pendiente → activa`: takes one spot and records the arrival.
    ///
    /// The state check and the ledger reserve run under the reservation's
    /// row lock, so a concurrent cancel or second entry cannot interleave.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::ReservationNotFound`] for an unknown id or a
    ///   reservation that is not `pendiente`.
    /// - [`ReservationError::CapacityExhausted`] if the facility is full; the
    ///   reservation stays `pendiente`.
    /// - [`ReservationError::StorageUnavailable`] on persistent contention.
    pub async fn authorize_entry(&self, id: ReservationId) -> Result<Reservation, ReservationError> {
        let (reservation, available_spots) = self
            .transition(id, "reservation.authorize_entry", move |mut reservation| async move {
                reservation.ensure_awaiting_entry()?;
                let facility = self.stores.ledger.reserve(reservation.facility_id).await?;
                reservation.activate(self.stores.clock.now())?;
                Ok((reservation.clone(), facility.available_spots()))
            })
            .await?;

        let arrived_at = reservation.arrived_at().unwrap_or(reservation.updated_at);
        let _ = self.event_bus.publish(ReservationEvent::EntryAuthorized {
            reservation_id: id,
            facility_id: reservation.facility_id,
            available_spots,
            timestamp: arrived_at,
        });
        tracing::info!(
            reservation_id = %id,
            facility_id = %reservation.facility_id,
            available_spots,
            "entry authorized"
        );
        Ok(reservation)
    }

    /// `activa → completada`: bills the stay and returns the spot.
    ///
    /// Elapsed time runs from the recorded arrival to now. The fare uses the
    /// tariff on file at completion time.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::ReservationNotFound`] for an unknown id.
    /// - [`ReservationError::NotActive`] unless `activa`.
    /// - [`ReservationError::ArrivalNotRecorded`] if the arrival is missing.
    /// - [`ReservationError::RateNotFound`] if no tariff is on file; nothing
    ///   changes in that case.
    /// - [`ReservationError::StorageUnavailable`] on persistent contention.
    pub async fn complete(&self, id: ReservationId) -> Result<Reservation, ReservationError> {
        let reservation = self
            .transition(id, "reservation.complete", move |mut reservation| async move {
                let arrived_at = reservation.ensure_completable()?;
                let tariff = self
                    .stores
                    .tariffs
                    .resolve(reservation.facility_id, &reservation.vehicle_class)
                    .await?;
                let now = self.stores.clock.now();
                let elapsed_hours = hours_between(arrived_at, now);
                let fare = compute_fare(elapsed_hours, &tariff);
                self.stores.ledger.release(reservation.facility_id).await?;
                reservation.complete(now, elapsed_hours, fare)?;
                Ok(reservation.clone())
            })
            .await?;

        let elapsed_hours = reservation.elapsed_hours().unwrap_or_default();
        let fare = reservation.fare().unwrap_or_default();
        let _ = self.event_bus.publish(ReservationEvent::ReservationCompleted {
            reservation_id: id,
            facility_id: reservation.facility_id,
            elapsed_hours,
            fare,
            timestamp: reservation.updated_at,
        });
        tracing::info!(
            reservation_id = %id,
            facility_id = %reservation.facility_id,
            elapsed_hours,
            fare,
            "reservation completed"
        );
        Ok(reservation)
    }

    /// `pendiente → cancelada` on the driver's request.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::ReservationNotFound`] for an unknown id.
    /// - [`ReservationError::NotCancellable`] unless `pendiente`; nothing
    ///   changes in that case.
    /// - [`ReservationError::StorageUnavailable`] on persistent contention.
    pub async fn cancel(&self, id: ReservationId) -> Result<Reservation, ReservationError> {
        let reservation = self
            .transition(id, "reservation.cancel", move |mut reservation| async move {
                reservation.cancel(self.stores.clock.now())?;
                Ok(reservation.clone())
            })
            .await?;
        self.announce_cancel(&reservation, CancelReason::Requested);
        Ok(reservation)
    }

    /// Returns the fare breakdown of a reservation.
    ///
    /// Rates always come from the tariff currently on file. The amount is a
    /// live quote from arrival to now for `activa`, the billed fare for
    /// `completada`, and the projection for `pendiente` and `cancelada`.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::ReservationNotFound`] for an unknown id.
    /// - [`ReservationError::RateNotFound`] if no tariff is on file.
    pub async fn fare_quote(&self, id: ReservationId) -> Result<FareQuote, ReservationError> {
        let reservation = self.stores.book.get(id).await?;
        let tariff = self
            .stores
            .tariffs
            .resolve(reservation.facility_id, &reservation.vehicle_class)
            .await?;
        let quote = match reservation.state() {
            ReservationState::Active => {
                let arrived_at = reservation.ensure_completable()?;
                let elapsed = hours_between(arrived_at, self.stores.clock.now());
                FareQuote::compute(elapsed, &tariff)
            }
            ReservationState::Completed => FareQuote::with_amount(
                reservation.billed_hours()?,
                &tariff,
                reservation.fare().unwrap_or_default(),
            ),
            ReservationState::Pending | ReservationState::Cancelled => FareQuote::with_amount(
                reservation.projected_hours,
                &tariff,
                reservation.projected_fare,
            ),
        };
        Ok(quote)
    }

    /// Recomputes the fare of a completed reservation from its stored
    /// elapsed time and the tariff currently on file. Idempotent.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::ReservationNotFound`] for an unknown id.
    /// - [`ReservationError::NotCompleted`] unless `completada`.
    /// - [`ReservationError::RateNotFound`] if no tariff is on file.
    pub async fn recompute_final_fare(
        &self,
        id: ReservationId,
    ) -> Result<Reservation, ReservationError> {
        let (reservation, old_fare) = self
            .transition(id, "reservation.recompute_fare", move |mut reservation| async move {
                let elapsed_hours = reservation.billed_hours()?;
                let tariff = self
                    .stores
                    .tariffs
                    .resolve(reservation.facility_id, &reservation.vehicle_class)
                    .await?;
                let old_fare = reservation.fare().unwrap_or_default();
                reservation.reprice(compute_fare(elapsed_hours, &tariff), self.stores.clock.now())?;
                Ok((reservation.clone(), old_fare))
            })
            .await?;

        let new_fare = reservation.fare().unwrap_or_default();
        let _ = self.event_bus.publish(ReservationEvent::FareRecomputed {
            reservation_id: id,
            facility_id: reservation.facility_id,
            old_fare,
            new_fare,
            timestamp: reservation.updated_at,
        });
        tracing::info!(reservation_id = %id, old_fare, new_fare, "final fare recomputed");
        Ok(reservation)
    }

    /// Cancels every `pendiente` reservation older than the pending TTL.
    ///
    /// Each candidate goes through the guarded cancel path; one that left
    /// `pendiente` since it was listed is skipped. Never fails as a whole.
    pub async fn sweep_expired(&self) -> SweepReport {
        let cutoff = self.stores.clock.now() - self.settings.pending_ttl;
        let candidates = self.stores.book.stale_pending(cutoff).await;
        let mut report = SweepReport::default();

        for id in candidates {
            let outcome = self
                .transition(id, "reservation.expire", move |mut reservation| async move {
                    if !reservation.is_stale(cutoff) {
                        return Ok(None);
                    }
                    reservation.cancel(self.stores.clock.now())?;
                    Ok(Some(reservation.clone()))
                })
                .await;
            match outcome {
                Ok(Some(reservation)) => {
                    self.announce_cancel(&reservation, CancelReason::Expired);
                    report.affected += 1;
                }
                Ok(None) => {
                    tracing::debug!(reservation_id = %id, "sweep skipped: no longer pending");
                }
                Err(err) => {
                    tracing::warn!(reservation_id = %id, error = %err, "sweep failed to cancel");
                    report.failed += 1;
                }
            }
        }

        if report.affected > 0 || report.failed > 0 {
            tracing::info!(
                affected = report.affected,
                failed = report.failed,
                "expired reservations swept"
            );
        }
        report
    }

    /// Returns a reservation snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::ReservationNotFound`] for an unknown id.
    pub async fn get(&self, id: ReservationId) -> Result<Reservation, ReservationError> {
        self.stores.book.get(id).await
    }

    /// Returns a driver's reservations, newest first.
    pub async fn list_for_user(&self, user_id: UserId) -> Vec<Reservation> {
        self.stores.book.list_for_user(user_id).await
    }

    /// Returns a facility's reservations, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::FacilityNotFound`] for an unknown facility.
    pub async fn list_for_facility(
        &self,
        facility_id: FacilityId,
    ) -> Result<Vec<Reservation>, ReservationError> {
        if !self.stores.ledger.contains(facility_id).await {
            return Err(ReservationError::FacilityNotFound(facility_id));
        }
        Ok(self.stores.book.list_for_facility(facility_id).await)
    }

    fn announce_cancel(&self, reservation: &Reservation, reason: CancelReason) {
        let _ = self.event_bus.publish(ReservationEvent::ReservationCancelled {
            reservation_id: reservation.id,
            facility_id: reservation.facility_id,
            reason,
            timestamp: reservation.updated_at,
        });
        tracing::info!(
            reservation_id = %reservation.id,
            facility_id = %reservation.facility_id,
            ?reason,
            "reservation cancelled"
        );
    }

    /// Runs `step` with the reservation's row lock held, retrying when the
    /// lock cannot be acquired in time.
    async fn transition<T, F, Fut>(
        &self,
        id: ReservationId,
        operation: &'static str,
        step: F,
    ) -> Result<T, ReservationError>
    where
        F: Fn(OwnedRwLockWriteGuard<Reservation>) -> Fut,
        Fut: Future<Output = Result<T, ReservationError>>,
    {
        let row = self.stores.book.row(id).await?;
        let step = &step;
        let lock_timeout = self.settings.policy.lock_timeout;
        retry_on_conflict(&self.settings.policy, operation, move || {
            let row = Arc::clone(&row);
            async move {
                let reservation = lock_row(row, lock_timeout).await?;
                step(reservation).await
            }
        })
        .await
    }
}
