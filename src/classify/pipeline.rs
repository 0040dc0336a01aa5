use log::info;

use crate::classify::collector::{CollectStats, UnresolvedCollector};
use crate::classify::config::PipelineConfig;
use crate::classify::index::ClassificationIndex;
use crate::classify::normalizer::{DropStats, EventNormalizer};
use crate::classify::resolver::{CacheResolver, MatchStats};
use crate::models::{ClassificationBatch, ProcessedEvent, RawEvent};

/// Output of one synchronous pipeline pass over a raw-event window.
#[derive(Debug)]
pub struct PipelineRun {
    /// All surviving events, resolved or not, in input order.
    pub events: Vec<ProcessedEvent>,
    /// Deduplicated payload for the external classifier.
    pub batch: ClassificationBatch,
    pub drops: DropStats,
    pub matches: MatchStats,
    pub collected: CollectStats,
}

impl PipelineRun {
    /// Split the surviving events into cache-resolved and unresolved.
    pub fn partition(self) -> (Vec<ProcessedEvent>, Vec<ProcessedEvent>) {
        self.events.into_iter().partition(|event| event.cache_matched)
    }
}

/// Run the full pipeline: normalize, resolve against the index, and collect
/// the unresolved remainder into a classification batch.
///
/// No step here has side effects outside the returned value; callers may
/// discard a `PipelineRun` without cleanup.
pub fn run(
    raw_events: &[RawEvent],
    index: &ClassificationIndex,
    config: &PipelineConfig,
) -> PipelineRun {
    let mut normalizer = EventNormalizer::new(config);
    let mut resolver = CacheResolver::new(index);
    let mut collector = UnresolvedCollector::new(index);

    let mut events = normalizer.normalize_batch(raw_events);
    for event in &mut events {
        resolver.resolve(event);
        collector.collect(event);
    }

    let drops = normalizer.drops();
    let matches = resolver.stats();
    let collected = collector.stats();
    info!(
        "pipeline pass: {} raw -> {} kept ({} dropped), {} cache hits / {} misses, {} pending items across {} apps",
        raw_events.len(),
        events.len(),
        drops.total(),
        matches.matched,
        matches.missed,
        collected.total,
        collected.apps
    );

    PipelineRun {
        events,
        batch: collector.build_batch(),
        drops,
        matches,
        collected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassificationRecord;

    fn config() -> PipelineConfig {
        PipelineConfig {
            min_duration_seconds: 10,
            multipurpose_apps: ["browserx".to_string()].into_iter().collect(),
            timezone: chrono_tz::UTC,
            ..PipelineConfig::default()
        }
    }

    fn raw(id: &str, app: &str, title: &str, duration: i64) -> RawEvent {
        RawEvent {
            id: id.to_string(),
            timestamp: "2025-11-19T08:14:52Z".to_string(),
            duration_seconds: duration,
            app: Some(app.to_string()),
            title: Some(title.to_string()),
        }
    }

    #[test]
    fn threshold_and_dirty_events_never_reach_the_cache_layer() {
        let index = ClassificationIndex::default();
        let run = run(
            &[
                raw("e1", "browserx.exe", "Docs - Report", 5),
                raw("e2", "browserx.exe", "", 30),
                raw("e3", "Notepad.exe", "x", 30),
            ],
            &index,
            &config(),
        );

        assert_eq!(run.events.len(), 1);
        assert_eq!(run.events[0].app, "notepad");
        assert!(!run.events[0].is_multipurpose);
        assert_eq!(run.drops.below_threshold, 1);
        assert_eq!(run.drops.missing_title, 1);
        assert_eq!(run.matches.total(), 1);
    }

    #[test]
    fn cached_single_purpose_apps_resolve_every_event() {
        let index = ClassificationIndex::build(&[ClassificationRecord {
            app: "notepad".to_string(),
            title: None,
            category_id: Some("work".to_string()),
            sub_category_id: None,
            goal_id: None,
            is_multipurpose: false,
            enabled: true,
            app_description: None,
        }]);

        let run = run(
            &[
                raw("e1", "notepad.exe", "a", 30),
                raw("e2", "notepad.exe", "b", 30),
            ],
            &index,
            &config(),
        );

        assert!(run.events.iter().all(|e| e.cache_matched));
        assert!(run
            .events
            .iter()
            .all(|e| e.category_id.as_deref() == Some("work")));
        assert!(run.batch.is_empty());

        let (resolved, unresolved) = run.partition();
        assert_eq!(resolved.len(), 2);
        assert!(unresolved.is_empty());
    }

    #[test]
    fn disabling_a_record_turns_hits_into_misses() {
        let mut record = ClassificationRecord {
            app: "notepad".to_string(),
            title: None,
            category_id: Some("work".to_string()),
            sub_category_id: None,
            goal_id: None,
            is_multipurpose: false,
            enabled: true,
            app_description: None,
        };
        let events = [raw("e1", "notepad", "x", 30)];

        let enabled_index = ClassificationIndex::build(std::slice::from_ref(&record));
        assert_eq!(run(&events, &enabled_index, &config()).matches.matched, 1);

        record.enabled = false;
        let disabled_index = ClassificationIndex::build(std::slice::from_ref(&record));
        let rerun = run(&events, &disabled_index, &config());
        assert_eq!(rerun.matches.missed, 1);
        assert_eq!(rerun.batch.items.len(), 1);
    }

    #[test]
    fn misses_are_deduplicated_into_the_batch() {
        let index = ClassificationIndex::default();
        let run = run(
            &[
                raw("e1", "notepad", "a", 30),
                raw("e2", "notepad", "b", 30),
                raw("e3", "browserx", "docs", 30),
                raw("e4", "browserx", "docs", 45),
                raw("e5", "browserx", "mail", 30),
            ],
            &index,
            &config(),
        );

        assert_eq!(run.collected.total, 3);
        assert_eq!(run.collected.single, 1);
        assert_eq!(run.collected.multi, 2);
        assert_eq!(run.batch.app_registry.len(), 2);
    }
}
