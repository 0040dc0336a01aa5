use chrono::{DateTime, Duration, NaiveDateTime};
use log::{debug, warn};

use crate::classify::config::PipelineConfig;
use crate::models::{ProcessedEvent, RawEvent};

/// Counters for events rejected during normalization, split by reason so
/// dirty multi-purpose data is distinguishable from malformed input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropStats {
    pub below_threshold: u64,
    pub missing_app: u64,
    pub missing_title: u64,
    pub bad_timestamp: u64,
}

impl DropStats {
    pub fn total(&self) -> u64 {
        self.below_threshold + self.missing_app + self.missing_title + self.bad_timestamp
    }
}

/// Converts raw tracking-source events into canonical `ProcessedEvent`s.
///
/// Every rejection is a silent drop plus a counter bump; a malformed event
/// never aborts the batch.
pub struct EventNormalizer<'a> {
    config: &'a PipelineConfig,
    drops: DropStats,
}

impl<'a> EventNormalizer<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            drops: DropStats::default(),
        }
    }

    /// Normalize a single event. Returns `None` if the event is dropped.
    pub fn normalize(&mut self, raw: &RawEvent) -> Option<ProcessedEvent> {
        if raw.duration_seconds < self.config.min_duration_seconds {
            self.drops.below_threshold += 1;
            return None;
        }

        let app = match raw.app.as_deref().map(normalize_app_name) {
            Some(app) if !app.is_empty() => app,
            _ => {
                self.drops.missing_app += 1;
                debug!("dropping event {}: no app name", raw.id);
                return None;
            }
        };

        let title = raw
            .title
            .as_deref()
            .map(|t| normalize_title(t, &self.config.grouped_title_markers))
            .unwrap_or_default();

        let is_multipurpose = self.config.is_multipurpose(&app);

        // A multi-purpose app without a title cannot be classified.
        if is_multipurpose && title.is_empty() {
            self.drops.missing_title += 1;
            debug!("dropping event {}: multi-purpose app {app} has no title", raw.id);
            return None;
        }

        let start_time = match self.convert_timestamp(&raw.timestamp) {
            Some(start) => start,
            None => {
                self.drops.bad_timestamp += 1;
                warn!("dropping event {}: unparseable timestamp '{}'", raw.id, raw.timestamp);
                return None;
            }
        };
        let end_time = start_time + Duration::seconds(raw.duration_seconds);

        Some(ProcessedEvent {
            id: raw.id.clone(),
            start_time,
            end_time,
            duration_seconds: raw.duration_seconds,
            app,
            title,
            is_multipurpose,
            category_id: None,
            sub_category_id: None,
            goal_id: None,
            cache_matched: false,
        })
    }

    /// Normalize a batch, keeping input order for the survivors.
    pub fn normalize_batch(&mut self, raw_events: &[RawEvent]) -> Vec<ProcessedEvent> {
        raw_events
            .iter()
            .filter_map(|raw| self.normalize(raw))
            .collect()
    }

    pub fn drops(&self) -> DropStats {
        self.drops
    }

    /// UTC wire timestamp → local wall-clock time in the configured zone.
    fn convert_timestamp(&self, timestamp: &str) -> Option<NaiveDateTime> {
        let utc = DateTime::parse_from_rfc3339(timestamp).ok()?;
        Some(utc.with_timezone(&self.config.timezone).naive_local())
    }
}

/// Lower-case, trim, and strip a trailing executable extension.
fn normalize_app_name(app: &str) -> String {
    let app = app.trim().to_lowercase();
    match app.strip_suffix(".exe") {
        Some(stripped) => stripped.to_string(),
        None => app,
    }
}

/// Keep only the primary title when the source grouped several windows,
/// then trim and lower-case.
fn normalize_title(title: &str, markers: &[String]) -> String {
    let mut title = title;
    for marker in markers {
        if let Some(idx) = title.find(marker.as_str()) {
            title = &title[..idx];
        }
    }
    title.trim().to_lowercase()
}
