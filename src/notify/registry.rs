//! Set of chat IDs that receive match notifications.
//!
//! The registry is a cheap cloneable handle over shared state. Dispatch takes a
//! snapshot copy with [`RecipientRegistry::list`] and never holds the lock while
//! sending, so adds and removes elsewhere are never blocked by a slow send and
//! a dispatch pass may see a slightly stale set.

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub type RecipientId = i64;

#[derive(Clone, Default)]
pub struct RecipientRegistry {
    inner: Arc<RwLock<BTreeSet<RecipientId>>>,
}

impl RecipientRegistry {
    pub fn with_recipients<I: IntoIterator<Item = RecipientId>>(ids: I) -> Self {
        RecipientRegistry {
            inner: Arc::new(RwLock::new(ids.into_iter().collect())),
        }
    }

    /// Returns `true` if the recipient was not already registered.
    pub async fn add(&self, id: RecipientId) -> bool {
        let added = self.inner.write().await.insert(id);
        if added {
            info!("Recipient {} added", id);
        }
        added
    }

    /// Returns `true` if the recipient was registered.
    pub async fn remove(&self, id: RecipientId) -> bool {
        let removed = self.inner.write().await.remove(&id);
        if removed {
            info!("Recipient {} removed", id);
        }
        removed
    }

    /// Snapshot of the current recipients in ascending order.
    pub async fn list(&self) -> Vec<RecipientId> {
        self.inner.read().await.iter().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
