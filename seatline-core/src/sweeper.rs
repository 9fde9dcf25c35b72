use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use seatline_domain::{Clock, SeatResult};
use crate::ledger::BookingLedger;

/// Periodically cancels pending bookings whose payment window has closed.
///
/// Keeps no state between passes. Each pass is a single atomic update, so
/// running several sweepers at once is harmless.
pub struct ExpirationSweeper {
    ledger: BookingLedger,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl ExpirationSweeper {
    pub fn new(ledger: BookingLedger, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self { ledger, clock, interval }
    }

    /// One pass at the clock's current time.
    pub async fn sweep_once(&self) -> SeatResult<u64> {
        self.ledger.expire_pending_older_than(self.clock.now()).await
    }

    /// Sweeps every `interval` until `shutdown` is cancelled. The first pass
    /// runs one interval after start. Failed passes are logged and skipped.
    pub async fn run(self, shutdown: CancellationToken) {
        info!("Expiration sweeper started, interval {:?}", self.interval);

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        error!("Expiration sweep failed: {}", e);
                    }
                }
            }
        }

        info!("Expiration sweeper stopped");
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
