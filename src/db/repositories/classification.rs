use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::Database;
use crate::models::ClassificationRecord;

/// Access to the durable classification cache.
///
/// The table enforces uniqueness on `(app, title)` (title is '' for
/// single-purpose records), so writes are upserts and the cache can never
/// hold two records for one key.
pub struct ClassificationRepository<'a> {
    conn: &'a Connection,
}

impl<'a> ClassificationRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn load_all(&self) -> Result<Vec<ClassificationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT app, title, category_id, sub_category_id, goal_id,
                    is_multipurpose, enabled, app_description
             FROM classification_cache",
        )?;

        let records = stmt
            .query_map([], |row| {
                let title: String = row.get(1)?;
                Ok(ClassificationRecord {
                    app: row.get(0)?,
                    title: if title.is_empty() { None } else { Some(title) },
                    category_id: row.get(2)?,
                    sub_category_id: row.get(3)?,
                    goal_id: row.get(4)?,
                    is_multipurpose: row.get::<_, i64>(5)? != 0,
                    enabled: row.get::<_, i64>(6)? != 0,
                    app_description: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Insert or update one record, keyed by `(app, title)`. An incoming
    /// record without a description keeps whatever description is already
    /// stored.
    pub fn upsert(&self, record: &ClassificationRecord) -> Result<()> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO classification_cache
                     (id, app, title, category_id, sub_category_id, goal_id,
                      is_multipurpose, enabled, app_description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
                 ON CONFLICT(app, title) DO UPDATE SET
                     category_id = excluded.category_id,
                     sub_category_id = excluded.sub_category_id,
                     goal_id = excluded.goal_id,
                     is_multipurpose = excluded.is_multipurpose,
                     enabled = excluded.enabled,
                     app_description = COALESCE(excluded.app_description,
                                                classification_cache.app_description),
                     updated_at = excluded.updated_at",
                params![
                    id,
                    record.app,
                    record.title.as_deref().unwrap_or(""),
                    record.category_id,
                    record.sub_category_id,
                    record.goal_id,
                    record.is_multipurpose as i64,
                    record.enabled as i64,
                    record.app_description,
                    now,
                ],
            )
            .with_context(|| format!("failed to upsert classification record for {}", record.app))?;
        Ok(())
    }

    pub fn upsert_many(&self, records: &[ClassificationRecord]) -> Result<()> {
        for record in records {
            self.upsert(record)?;
        }
        Ok(())
    }
}

// Database async wrappers for classification cache operations
impl Database {
    pub async fn load_classification_records(&self) -> Result<Vec<ClassificationRecord>> {
        self.execute(|conn| ClassificationRepository::new(conn).load_all())
            .await
    }

    pub async fn upsert_classification_records(
        &self,
        records: Vec<ClassificationRecord>,
    ) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            ClassificationRepository::new(&tx).upsert_many(&records)?;
            tx.commit().context("failed to commit classification upsert")
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn record(app: &str, title: Option<&str>, category: Option<&str>) -> ClassificationRecord {
        ClassificationRecord {
            app: app.to_string(),
            title: title.map(str::to_string),
            category_id: category.map(str::to_string),
            sub_category_id: None,
            goal_id: None,
            is_multipurpose: title.is_some(),
            enabled: true,
            app_description: None,
        }
    }

    fn connection() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        conn
    }

    #[test]
    fn round_trips_records() {
        let conn = connection();
        let repo = ClassificationRepository::new(&conn);
        repo.upsert(&record("notepad", None, Some("work"))).unwrap();
        repo.upsert(&record("browserx", Some("docs"), Some("work")))
            .unwrap();

        let mut loaded = repo.load_all().unwrap();
        loaded.sort_by(|a, b| a.app.cmp(&b.app));
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].app, "notepad");
        assert_eq!(loaded[1].title, None);
        assert!(loaded[0].is_multipurpose);
        assert_eq!(loaded[0].title.as_deref(), Some("docs"));
    }

    #[test]
    fn upsert_never_duplicates_a_key() {
        let conn = connection();
        let repo = ClassificationRepository::new(&conn);
        repo.upsert(&record("notepad", None, Some("work"))).unwrap();
        repo.upsert(&record("notepad", None, Some("leisure"))).unwrap();

        let loaded = repo.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].category_id.as_deref(), Some("leisure"));
    }

    #[test]
    fn upsert_keeps_existing_description_when_update_has_none() {
        let conn = connection();
        let repo = ClassificationRepository::new(&conn);

        let mut first = record("notepad", None, None);
        first.app_description = Some("plain text editor".to_string());
        repo.upsert(&first).unwrap();
        repo.upsert(&record("notepad", None, Some("work"))).unwrap();

        let loaded = repo.load_all().unwrap();
        assert_eq!(loaded[0].app_description.as_deref(), Some("plain text editor"));
        assert_eq!(loaded[0].category_id.as_deref(), Some("work"));
    }

    #[test]
    fn same_title_under_different_apps_is_two_records() {
        let conn = connection();
        let repo = ClassificationRepository::new(&conn);
        repo.upsert(&record("browserx", Some("docs"), Some("work")))
            .unwrap();
        repo.upsert(&record("otherbrowser", Some("docs"), Some("leisure")))
            .unwrap();
        assert_eq!(repo.load_all().unwrap().len(), 2);
    }
}
