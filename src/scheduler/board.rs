//! Read-only view of armed batches for the dashboard.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::batch::{Batch, BatchId, ScheduledPoll};
use crate::db::models::MatchSnapshot;

#[derive(Debug, Clone, Serialize)]
pub struct BatchView {
    pub next_poll: ScheduledPoll,
    pub matches: Vec<MatchSnapshot>,
}

impl BatchView {
    pub fn new(batch: &Batch, next_poll: ScheduledPoll) -> Self {
        BatchView {
            next_poll,
            matches: batch.matches().to_vec(),
        }
    }
}

#[derive(Clone, Default)]
pub struct MatchBoard {
    inner: Arc<RwLock<BTreeMap<BatchId, BatchView>>>,
}

impl MatchBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn update(&self, view: BatchView) {
        self.inner
            .write()
            .await
            .insert(view.next_poll.batch_id, view);
    }

    pub async fn remove(&self, batch_id: BatchId) {
        self.inner.write().await.remove(&batch_id);
    }

    pub async fn list(&self) -> Vec<BatchView> {
        self.inner.read().await.values().cloned().collect()
    }

    /// IDs of every match currently being watched.
    pub async fn tracked_ids(&self) -> HashSet<u64> {
        self.inner
            .read()
            .await
            .values()
            .flat_map(|v| v.matches.iter().map(|m| m.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::fixtures::snapshot;
    use crate::db::models::{MatchStatus, Score};
    use chrono::Utc;

    #[tokio::test]
    async fn test_update_list_remove() {
        let board = MatchBoard::new();
        let batch = Batch::new(
            7,
            vec![
                snapshot(1, MatchStatus::Timed, Score::Tbd, Score::Tbd),
                snapshot(2, MatchStatus::Timed, Score::Tbd, Score::Tbd),
            ],
        );
        board
            .update(BatchView::new(&batch, ScheduledPoll::first(7, Utc::now())))
            .await;

        assert_eq!(board.list().await.len(), 1);
        assert_eq!(board.tracked_ids().await, HashSet::from([1, 2]));

        board.remove(7).await;
        assert!(board.list().await.is_empty());
        assert!(board.tracked_ids().await.is_empty());
    }
}
