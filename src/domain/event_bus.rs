//! In-process fan-out of reservation and facility events.
//!
//! The services publish one [`ReservationEvent`] after each committed
//! mutation, after the row locks are released. Delivery is best effort: a
//! mutation never fails because nobody is listening, and a subscriber that
//! falls more than `capacity` events behind loses the oldest ones. The
//! event-log writer is the only durable subscriber.

use tokio::sync::broadcast::{self, error::TryRecvError};

use super::ReservationEvent;

/// Cloneable handle publishing [`ReservationEvent`]s to every subscriber.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ReservationEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` undelivered events per
    /// subscriber (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes a committed mutation and returns how many subscribers
    /// will see it. Zero subscribers is not an error.
    pub fn publish(&self, event: ReservationEvent) -> usize {
        tracing::debug!(
            event_type = event.event_type_str(),
            facility_id = %event.facility_id(),
            reservation_id = ?event.reservation_id(),
            "event published"
        );
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribes to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ReservationEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Takes every event already buffered for `events` without waiting.
///
/// Events lost to lag are logged and skipped. Used by the event-log writer
/// to flush what is left when it is told to stop.
pub fn drain_ready(events: &mut broadcast::Receiver<ReservationEvent>) -> Vec<ReservationEvent> {
    let mut ready = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => ready.push(event),
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "events dropped before drain");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    ready
}
