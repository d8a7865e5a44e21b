use anyhow::Result;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;
use models::*;

/// Thread-safe SQLite connection pool (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        self.lock().execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // Poisoning is ignored: the connection carries no Rust-side invariants.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Notifications ─────────────────────────────────────────────────────────

    /// Append a dispatched notification to the journal
    pub fn insert_notification(&self, rec: &NotificationRecord) -> Result<i64> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO notifications (
                match_id, event, message, delivered, failed, sent_at
             ) VALUES (?1,?2,?3,?4,?5,?6)",
            params![
                rec.match_id,
                rec.event,
                rec.message,
                rec.delivered,
                rec.failed,
                rec.sent_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List recent notifications, newest first
    pub fn list_recent_notifications(&self, limit: i64) -> Result<Vec<NotificationRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, match_id, event, message, delivered, failed, sent_at
             FROM notifications ORDER BY sent_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], map_notification)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ── Stats ─────────────────────────────────────────────────────────────────

    /// Per-event notification counts
    pub fn get_stats(&self) -> Result<Stats> {
        let conn = self.lock();
        let count = |event: &str| -> rusqlite::Result<i64> {
            conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE event = ?1",
                params![event],
                |r| r.get(0),
            )
        };
        let kick_offs = count(MatchEvent::KickOff.as_str())?;
        let goals = count(MatchEvent::Goal.as_str())?;
        let full_times = count(MatchEvent::FullTime.as_str())?;
        let failed_sends: i64 = conn.query_row(
            "SELECT COALESCE(SUM(failed),0) FROM notifications",
            [],
            |r| r.get(0),
        )?;
        Ok(Stats {
            notifications: kick_offs + goals + full_times,
            kick_offs,
            goals,
            full_times,
            failed_sends,
        })
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_notification(row: &rusqlite::Row) -> rusqlite::Result<NotificationRecord> {
    Ok(NotificationRecord {
        id: row.get(0)?,
        match_id: row.get(1)?,
        event: row.get(2)?,
        message: row.get(3)?,
        delivered: row.get(4)?,
        failed: row.get(5)?,
        sent_at: row.get(6)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS notifications (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    match_id    INTEGER NOT NULL,
    event       TEXT    NOT NULL,
    message     TEXT    NOT NULL,
    delivered   INTEGER NOT NULL DEFAULT 0,
    failed      INTEGER NOT NULL DEFAULT 0,
    sent_at     TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notifications_match ON notifications(match_id);
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub notifications: i64,
    pub kick_offs: i64,
    pub goals: i64,
    pub full_times: i64,
    pub failed_sends: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record(match_id: i64, event: MatchEvent, failed: i64) -> NotificationRecord {
        NotificationRecord {
            id: None,
            match_id,
            event: event.as_str().to_string(),
            message: format!("{} for {}", event, match_id),
            delivered: 2,
            failed,
            sent_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_list_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let mut first = record(10, MatchEvent::KickOff, 0);
        first.sent_at = Utc::now() - Duration::minutes(5);
        db.insert_notification(&first).unwrap();
        let id = db.insert_notification(&record(10, MatchEvent::Goal, 0)).unwrap();

        let rows = db.list_recent_notifications(10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, Some(id));
        assert_eq!(rows[0].event, "goal");
        assert_eq!(rows[1].event, "kick_off");
    }

    #[test]
    fn test_list_respects_limit() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..5 {
            db.insert_notification(&record(i, MatchEvent::Goal, 0)).unwrap();
        }
        assert_eq!(db.list_recent_notifications(3).unwrap().len(), 3);
    }

    #[test]
    fn test_stats_counts_by_event() {
        let db = Database::open_in_memory().unwrap();
        db.insert_notification(&record(1, MatchEvent::KickOff, 0)).unwrap();
        db.insert_notification(&record(1, MatchEvent::Goal, 1)).unwrap();
        db.insert_notification(&record(1, MatchEvent::Goal, 0)).unwrap();
        db.insert_notification(&record(1, MatchEvent::FullTime, 2)).unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.notifications, 4);
        assert_eq!(stats.kick_offs, 1);
        assert_eq!(stats.goals, 2);
        assert_eq!(stats.full_times, 1);
        assert_eq!(stats.failed_sends, 3);
    }
}
