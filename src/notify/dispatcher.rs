use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::registry::RecipientRegistry;
use super::sender::MessageSender;
use crate::db::models::{Notification, NotificationRecord};
use crate::db::Database;

/// Totals for one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub messages: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Fans notifications out to every registered recipient.
///
/// Sends are attempted once. A failing recipient is logged and skipped; it
/// never stops delivery to the others or to later notifications.
#[derive(Clone)]
pub struct Dispatcher {
    registry: RecipientRegistry,
    sender: Arc<dyn MessageSender>,
    journal: Option<Database>,
}

impl Dispatcher {
    pub fn new(
        registry: RecipientRegistry,
        sender: Arc<dyn MessageSender>,
        journal: Option<Database>,
    ) -> Self {
        Dispatcher {
            registry,
            sender,
            journal,
        }
    }

    /// Deliver each notification, in order, to a snapshot of the registry.
    pub async fn dispatch(&self, notifications: Vec<Notification>) -> DispatchReport {
        let mut report = DispatchReport::default();
        if notifications.is_empty() {
            return report;
        }

        let recipients = self.registry.list().await;
        if recipients.is_empty() {
            info!(
                "No recipients registered, {} notification(s) not sent",
                notifications.len()
            );
        }

        for n in notifications {
            info!("{} for match {}: {}", n.event, n.match_id, n.text.replace('\n', " | "));

            let sends = recipients.iter().map(|&recipient| {
                let sender = Arc::clone(&self.sender);
                let text = n.text.as_str();
                async move { (recipient, sender.send(recipient, text).await) }
            });
            let results = futures_util::future::join_all(sends).await;

            let mut delivered = 0usize;
            let mut failed = 0usize;
            for (recipient, result) in results {
                match result {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        failed += 1;
                        warn!(
                            "[{}] Failed to deliver {} to {}: {:#}",
                            self.sender.name(),
                            n.event,
                            recipient,
                            e
                        );
                    }
                }
            }

            report.messages += 1;
            report.delivered += delivered;
            report.failed += failed;

            if let Some(db) = &self.journal {
                let rec = NotificationRecord {
                    id: None,
                    match_id: n.match_id as i64,
                    event: n.event.as_str().to_string(),
                    message: n.text,
                    delivered: delivered as i64,
                    failed: failed as i64,
                    sent_at: Utc::now(),
                };
                if let Err(e) = db.insert_notification(&rec) {
                    warn!("Failed to journal notification for match {}: {}", rec.match_id, e);
                }
            }
        }

        report
    }
}
