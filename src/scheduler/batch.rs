use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, warn};

use crate::db::models::{MatchSnapshot, Notification};
use crate::football::diff;
use crate::notify::format;

pub type BatchId = u64;

/// Consecutive successful polls a member may be absent from before it is
/// treated as removed by the provider.
pub const MISSES_BEFORE_DROP: u32 = 3;

/// Matches that share a wake time. Holds the latest snapshot of each member,
/// which is the diff base for the next poll.
#[derive(Debug, Clone)]
pub struct Batch {
    pub id: BatchId,
    matches: Vec<MatchSnapshot>,
    /// Consecutive polls each member has been missing from
    misses: HashMap<u64, u32>,
}

impl Batch {
    pub fn new(id: BatchId, matches: Vec<MatchSnapshot>) -> Self {
        Batch {
            id,
            matches,
            misses: HashMap::new(),
        }
    }

    pub fn ids(&self) -> Vec<u64> {
        self.matches.iter().map(|m| m.id).collect()
    }

    pub fn matches(&self) -> &[MatchSnapshot] {
        &self.matches
    }

    /// True once every member is terminal (or nothing is left to watch).
    pub fn is_done(&self) -> bool {
        self.matches.iter().all(|m| m.status.is_terminal())
    }

    /// Fold a successful re-poll into the batch.
    ///
    /// Each member is diffed against its carried-forward snapshot and replaced
    /// by the fresh one whether or not anything changed. At most one
    /// notification is produced per match. A member missing from the response
    /// keeps its snapshot and is only dropped after [`MISSES_BEFORE_DROP`]
    /// consecutive absences; matches that were never members are ignored.
    pub fn absorb(&mut self, fresh: Vec<MatchSnapshot>) -> Vec<Notification> {
        let mut by_id: HashMap<u64, MatchSnapshot> =
            fresh.into_iter().map(|m| (m.id, m)).collect();
        let mut notifications = Vec::new();
        let mut kept = Vec::with_capacity(self.matches.len());

        for old in self.matches.drain(..) {
            let Some(new) = by_id.remove(&old.id) else {
                let misses = {
                    let count = self.misses.entry(old.id).or_insert(0);
                    *count += 1;
                    *count
                };
                if misses >= MISSES_BEFORE_DROP {
                    warn!(
                        "Batch {}: match {} ({} v {}) missing from {} polls, no longer tracked",
                        self.id, old.id, old.home_team, old.away_team, misses
                    );
                    self.misses.remove(&old.id);
                } else {
                    warn!(
                        "Batch {}: match {} missing from provider response ({}/{})",
                        self.id, old.id, misses, MISSES_BEFORE_DROP
                    );
                    kept.push(old);
                }
                continue;
            };
            self.misses.remove(&new.id);
            let changes = diff(Some(&old), &new);
            if !changes.is_empty() {
                debug!("Batch {}: match {} {:?}", self.id, new.id, changes);
            }
            if let Some(event) = changes.headline() {
                notifications.push(Notification {
                    match_id: new.id,
                    event,
                    text: format::render(event, &new),
                });
            }
            kept.push(new);
        }

        for stray in by_id.keys() {
            debug!("Batch {}: ignoring untracked match {}", self.id, stray);
        }
        self.matches = kept;
        notifications
    }
}

/// Result of one fetch → diff → dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Fetch failed in transit or at the provider; diff base untouched
    Retry,
    /// Something is still in progress (or the cycle was skipped)
    Pending,
    /// Every member is terminal
    Done,
}

/// The next poll armed for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduledPoll {
    pub batch_id: BatchId,
    pub due: DateTime<Utc>,
    /// Consecutive failed fetches leading up to this poll
    pub retries: u32,
}

impl ScheduledPoll {
    pub fn first(batch_id: BatchId, due: DateTime<Utc>) -> Self {
        ScheduledPoll {
            batch_id,
            due,
            retries: 0,
        }
    }

    /// Poll to arm after a cycle that ended at `now`, or `None` once done.
    pub fn after(
        &self,
        outcome: CycleOutcome,
        poll_delay: Duration,
        retry_delay: Duration,
        now: DateTime<Utc>,
    ) -> Option<(ScheduledPoll, Duration)> {
        let (delay, retries) = match outcome {
            CycleOutcome::Retry => (retry_delay, self.retries + 1),
            CycleOutcome::Pending => (poll_delay, 0),
            CycleOutcome::Done => return None,
        };
        let due =
            now + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
        Some((
            ScheduledPoll {
                batch_id: self.batch_id,
                due,
                retries,
            },
            delay,
        ))
    }
}

/// Group today's matches into waves keyed by wake time. Matches whose
/// kick-off has passed are due now and share one wave; matches that no
/// longer need polling are left out.
pub fn plan_waves(
    matches: Vec<MatchSnapshot>,
    now: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, Vec<MatchSnapshot>)> {
    let mut waves: BTreeMap<DateTime<Utc>, Vec<MatchSnapshot>> = BTreeMap::new();
    for m in matches {
        if !m.status.is_in_progress() {
            debug!("Match {} already {}, not watching", m.id, m.status);
            continue;
        }
        let wake = if m.kickoff > now { m.kickoff } else { now };
        waves.entry(wake).or_default().push(m);
    }
    waves.into_iter().collect()
}
