//! Periodic expiration of stale pending reservations.
//!
//! [`ExpirationSweeper`] ticks on a fixed interval and calls
//! [`ReservationService::sweep_expired`], which cancels through the same
//! guarded path as a driver's cancel. The loop stops when the shutdown
//! channel flips to `true` or its sender is dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{ReservationService, SweepReport};

/// Background task running the expiration sweep.
#[derive(Debug, Clone)]
pub struct ExpirationSweeper {
    service: Arc<ReservationService>,
    interval: Duration,
}

impl ExpirationSweeper {
    /// Creates a sweeper that runs every `interval` (minimum one second).
    #[must_use]
    pub fn new(service: Arc<ReservationService>, interval: Duration) -> Self {
        Self {
            service,
            interval: interval.max(Duration::from_secs(1)),
        }
    }

    /// Runs one sweep now.
    pub async fn run_once(&self) -> SweepReport {
        self.service.sweep_expired().await
    }

    /// Spawns the sweep loop on the current runtime.
    #[must_use]
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_secs = self.interval.as_secs(), "expiration sweeper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let _ = self.run_once().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("expiration sweeper stopped");
        })
    }
}
