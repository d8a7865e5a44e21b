//! Polling scheduler.
//!
//! Once a day at the anchor time the scheduler fetches today's matches,
//! keeps the relevant ones and groups them into waves by kick-off time. Each
//! wave becomes a [`Batch`] watched by its own task:
//!
//! ```text
//!  anchor ──▶ fetch today ──▶ classify ──▶ plan waves ──┬─▶ batch A (15:00)
//!                                                       └─▶ batch B (17:30)
//!  batch task:  sleep ─▶ re-fetch ids ─▶ diff ─▶ dispatch ─▶ sleep ...
//!                 ▲ 20s on fetch failure, 10s while anything is in progress
//! ```
//!
//! A batch task sleeps only after its cycle has finished, so polls of the same
//! batch never overlap. Batches own disjoint match sets and share nothing but
//! the dispatcher. A batch stops by reaching DONE; there is no cancellation.

pub mod batch;
pub mod board;

pub use batch::{plan_waves, Batch, CycleOutcome, ScheduledPoll};
pub use board::{BatchView, MatchBoard};

use chrono::{DateTime, NaiveTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::football::{Classifier, FetchError, MatchProvider};
use crate::notify::Dispatcher;

/// Timing configuration.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    /// Daily fetch time, UTC
    pub anchor: NaiveTime,
    /// Delay between polls while any match is in progress
    pub poll_delay: Duration,
    /// Delay before retrying a failed fetch
    pub retry_delay: Duration,
    /// Retries of a failed daily fetch before giving up until tomorrow
    pub anchor_retries: u32,
}

impl From<&Config> for Cadence {
    fn from(config: &Config) -> Self {
        Cadence {
            anchor: config.anchor_time,
            poll_delay: Duration::from_secs(config.poll_interval_secs),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            anchor_retries: config.anchor_retries,
        }
    }
}

pub struct Scheduler {
    provider: Arc<dyn MatchProvider>,
    classifier: Classifier,
    dispatcher: Dispatcher,
    cadence: Cadence,
    board: MatchBoard,
    next_batch_id: AtomicU64,
}

impl Scheduler {
    pub fn new(
        provider: Arc<dyn MatchProvider>,
        classifier: Classifier,
        dispatcher: Dispatcher,
        cadence: Cadence,
        board: MatchBoard,
    ) -> Self {
        Scheduler {
            provider,
            classifier,
            dispatcher,
            cadence,
            board,
            next_batch_id: AtomicU64::new(1),
        }
    }

    /// Run the daily anchor loop forever. If started after today's anchor
    /// time, today's matches are fetched straight away.
    pub async fn run(self: Arc<Self>) {
        info!(
            "Scheduler started (provider={}, anchor={} UTC, poll={:?}, retry={:?})",
            self.provider.name(),
            self.cadence.anchor,
            self.cadence.poll_delay,
            self.cadence.retry_delay
        );

        if catches_up(Utc::now(), self.cadence.anchor) {
            info!("Started after today's anchor, fetching now");
            self.refresh_with_retry().await;
        }

        loop {
            let next = next_anchor_after(Utc::now(), self.cadence.anchor);
            info!("Next daily fetch at {}", next);
            tokio::time::sleep(until(next)).await;
            self.refresh_with_retry().await;
        }
    }

    async fn refresh_with_retry(self: &Arc<Self>) {
        let attempts = self.cadence.anchor_retries + 1;
        for attempt in 1..=attempts {
            match self.refresh_today().await {
                Ok(_) => return,
                Err(e) => {
                    warn!("Daily fetch failed (attempt {}/{}): {}", attempt, attempts, e);
                    if attempt < attempts {
                        tokio::time::sleep(self.cadence.retry_delay).await;
                    }
                }
            }
        }
        error!("Daily fetch abandoned after {} attempts", attempts);
    }

    /// Fetch today's matches and arm one batch per wave. Matches already being
    /// watched are skipped. Returns the number of batches armed.
    pub async fn refresh_today(self: &Arc<Self>) -> Result<usize, FetchError> {
        let today = Utc::now().date_naive();
        let raw = self.provider.matches_between(today, today).await?;
        let fetched = raw.len();
        let relevant = self.classifier.classify(raw);

        let tracked = self.board.tracked_ids().await;
        let fresh: Vec<_> = relevant
            .into_iter()
            .filter(|m| !tracked.contains(&m.id))
            .collect();
        info!(
            "Updating matches: {} fetched, {} new of interest",
            fetched,
            fresh.len()
        );
        for m in &fresh {
            info!(
                "  {} v {} at {} ({}, {})",
                m.home_team, m.away_team, m.kickoff, m.competition, m.status
            );
        }

        let waves = plan_waves(fresh, Utc::now());
        let armed = waves.len();
        for (due, matches) in waves {
            let id = self.next_batch_id.fetch_add(1, Ordering::Relaxed);
            self.arm(Batch::new(id, matches), due).await;
        }
        Ok(armed)
    }

    async fn arm(self: &Arc<Self>, batch: Batch, due: DateTime<Utc>) {
        info!("Batch {} ({} match(es)) armed for {}", batch.id, batch.matches().len(), due);
        // On the board before the task starts, so a concurrent refresh skips it.
        self.board
            .update(BatchView::new(&batch, ScheduledPoll::first(batch.id, due)))
            .await;
        let this = Arc::clone(self);
        tokio::spawn(async move { this.watch(batch, due).await });
    }

    /// Drive one batch from its first due time until DONE.
    pub async fn watch(self: Arc<Self>, mut batch: Batch, due: DateTime<Utc>) {
        let mut poll = ScheduledPoll::first(batch.id, due);
        let mut delay = until(due);

        loop {
            tokio::time::sleep(delay).await;
            let outcome = self.poll(&mut batch, poll.retries).await;
            let Some((next, next_delay)) = poll.after(
                outcome,
                self.cadence.poll_delay,
                self.cadence.retry_delay,
                Utc::now(),
            ) else {
                break;
            };
            poll = next;
            delay = next_delay;
            self.board.update(BatchView::new(&batch, poll)).await;
        }

        self.board.remove(batch.id).await;
        info!("Batch {} done", batch.id);
    }

    /// One fetch → diff → dispatch cycle.
    async fn poll(&self, batch: &mut Batch, retries: u32) -> CycleOutcome {
        let fetched = match batch.ids().as_slice() {
            // A 404 means the match is gone, same as absent from a list reply.
            [only] => match self.provider.match_by_id(*only).await {
                Ok(m) => Ok(vec![m]),
                Err(e) if e.is_not_found() => Ok(vec![]),
                Err(e) => Err(e),
            },
            ids => self.provider.matches_by_id(ids).await,
        };

        let fresh = match fetched {
            Ok(fresh) => fresh,
            Err(e) if e.is_retryable() => {
                warn!(
                    "Batch {}: fetch failed ({} previous), retrying in {:?}: {}",
                    batch.id, retries, self.cadence.retry_delay, e
                );
                return CycleOutcome::Retry;
            }
            Err(e) => {
                warn!("Batch {}: skipping cycle: {}", batch.id, e);
                return CycleOutcome::Pending;
            }
        };

        let notifications = batch.absorb(fresh);
        if notifications.is_empty() {
            debug!("Batch {}: no status change", batch.id);
        } else {
            let report = self.dispatcher.dispatch(notifications).await;
            info!(
                "Batch {}: {} message(s), {} delivered, {} failed",
                batch.id, report.messages, report.delivered, report.failed
            );
        }

        if batch.is_done() {
            CycleOutcome::Done
        } else {
            CycleOutcome::Pending
        }
    }
}

/// Whether a scheduler started at `now` has already missed today's anchor.
pub fn catches_up(now: DateTime<Utc>, anchor: NaiveTime) -> bool {
    now.time() > anchor
}

/// First anchor strictly after `now`.
pub fn next_anchor_after(now: DateTime<Utc>, anchor: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(anchor).and_utc();
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

fn until(due: DateTime<Utc>) -> Duration {
    (due - Utc::now()).to_std().unwrap_or(Duration::ZERO)
}
