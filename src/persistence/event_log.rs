//! Background writer appending bus events to the PostgreSQL event log.

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::postgres::PostgresPersistence;
use crate::domain::{ReservationEvent, drain_ready};

/// Spawns a task that drains `events` into the event log.
///
/// A failed insert is logged and skipped; the in-memory state stays
/// authoritative. When `stop` flips to `true` (or its sender is dropped)
/// the events already buffered are written and the task ends. It also ends
/// once every bus sender is gone.
#[must_use]
pub fn spawn_event_writer(
    persistence: PostgresPersistence,
    mut events: broadcast::Receiver<ReservationEvent>,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => write(&persistence, &event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event writer lagged, events dropped from log");
                    }
                    Err(RecvError::Closed) => break,
                },
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        let pending = drain_ready(&mut events);
                        tracing::info!(pending = pending.len(), "flushing event log");
                        for event in &pending {
                            write(&persistence, event).await;
                        }
                        break;
                    }
                }
            }
        }
        tracing::info!("event writer stopped");
    })
}

async fn write(persistence: &PostgresPersistence, event: &ReservationEvent) {
    if let Err(err) = persistence.save_event(event).await {
        tracing::warn!(
            event_type = event.event_type_str(),
            error = %err,
            "failed to persist event"
        );
    }
}
