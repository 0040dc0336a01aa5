use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use log::{info, warn};

use crate::classify::{pipeline, ClassificationIndex, PipelineConfig};
use crate::db::Database;
use crate::models::{
    CategoryAssignment, ClassificationBatch, ClassificationOutcome, ClassificationRecord,
    ProcessedEvent, RawEvent,
};

/// The external activity-tracking source. Fetch failures abort the run.
pub trait ActivitySource {
    fn fetch_events(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<RawEvent>>;
}

/// The external classification service. Called at most once per run, with
/// the deduplicated batch; a failure aborts the run before anything is
/// persisted, so the same items are re-collected next time.
pub trait Classifier {
    fn classify(&self, batch: &ClassificationBatch) -> Result<Vec<ClassificationOutcome>>;
}

/// Counters for one completed sync run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncReport {
    pub raw_events: usize,
    pub kept_events: usize,
    pub dropped_events: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub pending_items: usize,
    pub classified_records: usize,
    pub saved_events: usize,
}

/// Drives one full run: load cache, pipeline, classify, persist.
pub struct SyncService {
    db: Database,
}

impl SyncService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The next incremental window: from the latest persisted `end_time`
    /// (interpreted in the configured zone) to now, or the last 24 hours on
    /// an empty store.
    pub async fn next_window(&self, timezone: Tz) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let end = Utc::now();
        let start = match self.db.latest_activity_end_time().await? {
            Some(latest) => timezone
                .from_local_datetime(&latest)
                .earliest()
                .map(|local| local.with_timezone(&Utc))
                .unwrap_or_else(|| end - Duration::hours(24)),
            None => end - Duration::hours(24),
        };
        Ok((start, end))
    }

    /// Process one raw-event window end to end.
    ///
    /// All storage writes happen after the classifier has answered, so a
    /// failed run leaves the store exactly as it was and replaying the same
    /// window is safe.
    pub async fn sync_window(
        &self,
        source: &dyn ActivitySource,
        classifier: &dyn Classifier,
        config: &PipelineConfig,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<SyncReport> {
        let records = self
            .db
            .load_classification_records()
            .await
            .context("failed to load classification cache")?;
        let index = ClassificationIndex::build(&records);

        let raw_events = source
            .fetch_events(start, end)
            .context("failed to fetch raw activity events")?;
        let raw_count = raw_events.len();

        let run = pipeline::run(&raw_events, &index, config);
        let mut report = SyncReport {
            raw_events: raw_count,
            kept_events: run.events.len(),
            dropped_events: run.drops.total(),
            cache_hits: run.matches.matched,
            cache_misses: run.matches.missed,
            pending_items: run.batch.items.len(),
            ..SyncReport::default()
        };

        let mut events = run.events;
        let mut new_records = Vec::new();
        if !run.batch.is_empty() {
            let outcomes = classifier
                .classify(&run.batch)
                .context("classifier request failed")?;
            new_records = merge_outcomes(&run.batch, &outcomes);
            let applied = apply_new_classifications(&mut events, &new_records);
            info!(
                "classifier answered {} outcomes, {} records, {} events backfilled",
                outcomes.len(),
                new_records.len(),
                applied
            );
        }

        // Persistence is the only step with side effects.
        if !new_records.is_empty() {
            report.classified_records = new_records.len();
            self.db
                .upsert_classification_records(new_records)
                .await
                .context("failed to store classification records")?;
        }
        report.saved_events = self
            .db
            .insert_activity_events(events)
            .await
            .context("failed to store activity events")?;

        info!(
            "sync window {} ~ {}: {} raw, {} kept, {} hits, {} pending, {} saved",
            start, end, report.raw_events, report.kept_events, report.cache_hits,
            report.pending_items, report.saved_events
        );

        Ok(report)
    }
}

/// Turn classifier outcomes back into durable records, keyed by `(app)` for
/// single-purpose and `(app, title)` for multi-purpose items.
fn merge_outcomes(
    batch: &ClassificationBatch,
    outcomes: &[ClassificationOutcome],
) -> Vec<ClassificationRecord> {
    let items: HashMap<u64, _> = batch.items.iter().map(|item| (item.id, item)).collect();

    let mut records = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        let Some(item) = items.get(&outcome.item_id) else {
            warn!("classifier returned unknown item id {}", outcome.item_id);
            continue;
        };
        let Some(entry) = batch.app_registry.get(&item.app) else {
            warn!("classifier item {} has no registry entry for {}", item.id, item.app);
            continue;
        };

        records.push(ClassificationRecord {
            app: item.app.clone(),
            title: entry.is_multipurpose.then(|| item.title.clone()),
            category_id: outcome.category_id.clone(),
            sub_category_id: outcome.sub_category_id.clone(),
            goal_id: outcome.goal_id.clone(),
            is_multipurpose: entry.is_multipurpose,
            enabled: true,
            app_description: (!entry.description.is_empty()).then(|| entry.description.clone()),
        });
    }

    records
}

/// Backfill category fields on this run's unresolved events from the fresh
/// records, so the persisted log already reflects the new classifications.
fn apply_new_classifications(
    events: &mut [ProcessedEvent],
    records: &[ClassificationRecord],
) -> usize {
    let mut by_app: HashMap<&str, CategoryAssignment> = HashMap::new();
    let mut by_title: HashMap<(&str, &str), CategoryAssignment> = HashMap::new();
    for record in records {
        let Some(category_id) = record.category_id.clone() else {
            continue;
        };
        let assignment = CategoryAssignment {
            category_id,
            sub_category_id: record.sub_category_id.clone(),
            goal_id: record.goal_id.clone(),
        };
        match record.title.as_deref() {
            Some(title) => {
                by_title.insert((record.app.as_str(), title), assignment);
            }
            None => {
                by_app.insert(record.app.as_str(), assignment);
            }
        }
    }

    let mut applied = 0;
    for event in events.iter_mut() {
        if event.cache_matched || event.category_id.is_some() {
            continue;
        }
        let assignment = if event.is_multipurpose {
            by_title.get(&(event.app.as_str(), event.title.as_str()))
        } else {
            by_app.get(event.app.as_str())
        };
        if let Some(assignment) = assignment {
            event.category_id = Some(assignment.category_id.clone());
            event.sub_category_id = assignment.sub_category_id.clone();
            event.goal_id = assignment.goal_id.clone();
            applied += 1;
        }
    }
    applied
}
