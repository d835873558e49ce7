//! Scheduled background work: the upstream poll and the daily stats reset.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Local;
use fivemon_store::{PollSummary, Store};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::fetcher::SnapshotFetcher;
use crate::helpers;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// At least one source answered and the store was updated
    Updated(PollSummary),
    /// Every source failed; the store was left untouched
    NoData,
    /// Another poll was still in flight
    Skipped,
}

/// Drives `SnapshotFetcher` into the `Store`. At most one poll runs at a time.
#[derive(Clone)]
pub struct Poller {
    store: Store,
    fetcher: Arc<SnapshotFetcher>,
    interval: Duration,
    max_players: u32,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the poll finishes, however it finishes.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Poller {
    pub fn new(store: Store, fetcher: SnapshotFetcher, interval: Duration, max_players: u32) -> Self {
        Self {
            store,
            fetcher: Arc::new(fetcher),
            interval,
            max_players,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run one fetch-and-apply cycle.
    pub async fn poll_once(&self) -> PollOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("previous poll still in flight, skipping");
            return PollOutcome::Skipped;
        }
        let _guard = InFlightGuard(&self.in_flight);

        let snapshot = self.fetcher.fetch().await;
        let now = helpers::now();

        match self.store.apply_snapshot(snapshot, now).await {
            Some(summary) => {
                info!(
                    "Data updated - {}/{} players",
                    summary.player_count, self.max_players
                );
                if helpers::on_report_tick(&now, self.interval) {
                    info!(
                        points = summary.history_len,
                        players = summary.player_count,
                        "history size report"
                    );
                }
                PollOutcome::Updated(summary)
            }
            None => {
                warn!(upstream = self.fetcher.base_url(), "No data received from game server");
                PollOutcome::NoData
            }
        }
    }

    /// Poll every `interval` until `shutdown` is cancelled. The first poll
    /// starts immediately.
    ///
    /// Ticks are not delayed by a slow poll; a tick that lands while a poll
    /// is still running is skipped by the in-flight guard.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = self.interval.as_secs(), "data collection started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let poller = self.clone();
                    tokio::spawn(async move {
                        poller.poll_once().await;
                    });
                }
            }
        }
        info!("data collection stopped");
    }
}

/// Reset the daily peak at every local midnight until `shutdown` is cancelled.
pub async fn run_daily_reset(store: Store, shutdown: CancellationToken) {
    loop {
        let wait = helpers::until_next_midnight(&Local::now());
        debug!(secs = wait.as_secs(), "next daily reset scheduled");

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(wait) => {
                store.reset_daily().await;
                // don't fire twice if the timer woke just short of midnight
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}
