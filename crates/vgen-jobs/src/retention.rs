//! Background eviction of finished jobs.
//!
//! Only terminal records are ever removed. Queued and running jobs stay in
//! the store until their execution unit finalizes them.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::metrics;
use crate::store::JobStore;

/// Periodically purges terminal jobs older than a TTL.
pub struct RetentionSweeper {
    store: Arc<JobStore>,
    ttl: Duration,
    sweep_interval: Duration,
}

impl RetentionSweeper {
    pub fn new(store: Arc<JobStore>, ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            store,
            ttl,
            // tokio intervals reject a zero period
            sweep_interval: sweep_interval.max(Duration::from_millis(1)),
        }
    }

    /// Run until the shutdown flag is raised or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting retention sweeper (ttl: {:?}, interval: {:?})",
            self.ttl, self.sweep_interval
        );

        let mut ticker = interval(self.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.sweep_once();
                }
            }
        }

        debug!("Retention sweeper stopped");
    }

    /// Remove every expired terminal record. Returns how many were removed.
    pub fn sweep_once(&self) -> usize {
        let ttl = match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => ttl,
            Err(e) => {
                warn!("Retention TTL out of range, skipping sweep: {}", e);
                return 0;
            }
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
            return 0;
        };

        let removed = self.store.purge_terminal_before(cutoff);
        if removed > 0 {
            info!("Retention sweep removed {} finished jobs", removed);
            metrics::record_purged(removed);
        }
        removed
    }
}
