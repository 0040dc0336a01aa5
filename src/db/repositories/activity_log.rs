use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use crate::db::{parse_datetime, Database, DATETIME_FORMAT};
use crate::models::ProcessedEvent;

/// Access to the persisted activity log.
pub struct ActivityLogRepository<'a> {
    conn: &'a Connection,
}

impl<'a> ActivityLogRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert events, skipping ids that already exist so replaying a window
    /// never produces duplicate rows. Returns the number actually inserted.
    pub fn insert_events(&self, events: &[ProcessedEvent]) -> Result<usize> {
        let mut inserted = 0;
        for event in events {
            inserted += self
                .conn
                .execute(
                    "INSERT OR IGNORE INTO activity_log
                         (id, start_time, end_time, duration_seconds, app, title,
                          is_multipurpose, category_id, sub_category_id, goal_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        event.id,
                        event.start_time.format(DATETIME_FORMAT).to_string(),
                        event.end_time.format(DATETIME_FORMAT).to_string(),
                        event.duration_seconds,
                        event.app,
                        event.title,
                        event.is_multipurpose as i64,
                        event.category_id,
                        event.sub_category_id,
                        event.goal_id,
                    ],
                )
                .with_context(|| format!("failed to insert activity event {}", event.id))?;
        }
        Ok(inserted)
    }

    /// Latest persisted `end_time`, the starting point for incremental sync.
    pub fn latest_end_time(&self) -> Result<Option<NaiveDateTime>> {
        let latest: Option<String> = self
            .conn
            .query_row("SELECT MAX(end_time) FROM activity_log", [], |row| row.get(0))
            .context("failed to query latest end_time")?;

        latest
            .map(|value| parse_datetime(&value, "end_time"))
            .transpose()
    }

    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM activity_log", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn load_all(&self) -> Result<Vec<ProcessedEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, start_time, end_time, duration_seconds, app, title,
                    is_multipurpose, category_id, sub_category_id, goal_id
             FROM activity_log
             ORDER BY start_time",
        )?;

        let mut rows = stmt.query([])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(ProcessedEvent {
                id: row.get(0)?,
                start_time: parse_datetime(&row.get::<_, String>(1)?, "start_time")?,
                end_time: parse_datetime(&row.get::<_, String>(2)?, "end_time")?,
                duration_seconds: row.get(3)?,
                app: row.get(4)?,
                title: row.get(5)?,
                is_multipurpose: row.get::<_, i64>(6)? != 0,
                category_id: row.get(7)?,
                sub_category_id: row.get(8)?,
                goal_id: row.get(9)?,
                // Matching is a run-scoped notion; persisted rows either
                // carry a category or they do not.
                cache_matched: row.get::<_, Option<String>>(7)?.is_some(),
            });
        }

        Ok(events)
    }
}

// Database async wrappers for activity log operations
impl Database {
    pub async fn insert_activity_events(&self, events: Vec<ProcessedEvent>) -> Result<usize> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let inserted = ActivityLogRepository::new(&tx).insert_events(&events)?;
            tx.commit().context("failed to commit activity log insert")?;
            Ok(inserted)
        })
        .await
    }

    pub async fn latest_activity_end_time(&self) -> Result<Option<NaiveDateTime>> {
        self.execute(|conn| ActivityLogRepository::new(conn).latest_end_time())
            .await
    }

    pub async fn activity_event_count(&self) -> Result<u64> {
        self.execute(|conn| ActivityLogRepository::new(conn).count())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn connection() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        conn
    }

    fn event(id: &str, start: &str, end: &str) -> ProcessedEvent {
        ProcessedEvent {
            id: id.to_string(),
            start_time: parse_datetime(start, "start").unwrap(),
            end_time: parse_datetime(end, "end").unwrap(),
            duration_seconds: 300,
            app: "notepad".to_string(),
            title: "notes".to_string(),
            is_multipurpose: false,
            category_id: Some("work".to_string()),
            sub_category_id: None,
            goal_id: None,
            cache_matched: true,
        }
    }

    #[test]
    fn replaying_a_window_inserts_nothing_new() {
        let conn = connection();
        let repo = ActivityLogRepository::new(&conn);
        let events = vec![
            event("e1", "2025-11-19 09:00:00", "2025-11-19 09:05:00"),
            event("e2", "2025-11-19 09:05:00", "2025-11-19 09:10:00"),
        ];

        assert_eq!(repo.insert_events(&events).unwrap(), 2);
        assert_eq!(repo.insert_events(&events).unwrap(), 0);
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[test]
    fn latest_end_time_tracks_the_newest_row() {
        let conn = connection();
        let repo = ActivityLogRepository::new(&conn);
        assert!(repo.latest_end_time().unwrap().is_none());

        repo.insert_events(&[
            event("e1", "2025-11-19 09:00:00", "2025-11-19 09:05:00"),
            event("e2", "2025-11-19 10:00:00", "2025-11-19 10:05:00"),
        ])
        .unwrap();

        let latest = repo.latest_end_time().unwrap().unwrap();
        assert_eq!(latest.to_string(), "2025-11-19 10:05:00");
    }

    #[test]
    fn round_trips_events() {
        let conn = connection();
        let repo = ActivityLogRepository::new(&conn);
        repo.insert_events(&[event("e1", "2025-11-19 09:00:00", "2025-11-19 09:05:00")])
            .unwrap();

        let loaded = repo.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].app, "notepad");
        assert_eq!(loaded[0].category_id.as_deref(), Some("work"));
        assert_eq!(loaded[0].start_time.to_string(), "2025-11-19 09:00:00");
    }
}
