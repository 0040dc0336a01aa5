use anyhow::{bail, Context, Result};
use rusqlite::{Connection, Transaction};

const CURRENT_SCHEMA_VERSION: i32 = 1;

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let mut version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;

    if version > CURRENT_SCHEMA_VERSION {
        bail!(
            "database version ({}) is newer than supported schema ({})",
            version,
            CURRENT_SCHEMA_VERSION
        );
    }

    if version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;

    while version < CURRENT_SCHEMA_VERSION {
        let next_version = version + 1;
        apply_migration(&tx, next_version)
            .with_context(|| format!("migration to version {next_version} failed"))?;
        version = next_version;
    }

    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")?;

    Ok(())
}

fn apply_migration(tx: &Transaction<'_>, version: i32) -> Result<()> {
    match version {
        1 => {
            // `title` is stored as '' (never NULL) for single-purpose records
            // so the unique key covers both record kinds with plain columns.
            tx.execute_batch(
                "CREATE TABLE classification_cache (
                     id TEXT PRIMARY KEY,
                     app TEXT NOT NULL,
                     title TEXT NOT NULL DEFAULT '',
                     category_id TEXT,
                     sub_category_id TEXT,
                     goal_id TEXT,
                     is_multipurpose INTEGER NOT NULL DEFAULT 0,
                     enabled INTEGER NOT NULL DEFAULT 1,
                     app_description TEXT,
                     created_at TEXT NOT NULL,
                     updated_at TEXT NOT NULL,
                     UNIQUE (app, title)
                 );

                 CREATE TABLE activity_log (
                     id TEXT PRIMARY KEY,
                     start_time TEXT NOT NULL,
                     end_time TEXT NOT NULL,
                     duration_seconds INTEGER NOT NULL,
                     app TEXT NOT NULL,
                     title TEXT NOT NULL DEFAULT '',
                     is_multipurpose INTEGER NOT NULL DEFAULT 0,
                     category_id TEXT,
                     sub_category_id TEXT,
                     goal_id TEXT
                 );

                 CREATE INDEX idx_activity_log_end_time ON activity_log (end_time);
                 CREATE INDEX idx_activity_log_app ON activity_log (app);",
            )
            .context("failed to create initial schema")?;
            Ok(())
        }
        other => bail!("no migration registered for version {other}"),
    }
}
