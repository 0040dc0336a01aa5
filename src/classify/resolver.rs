use log::debug;

use crate::classify::index::ClassificationIndex;
use crate::models::ProcessedEvent;

/// Hit/miss counters for one resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub matched: u64,
    pub missed: u64,
}

impl MatchStats {
    pub fn total(&self) -> u64 {
        self.matched + self.missed
    }
}

/// Fills classification fields on normalized events from the index.
///
/// Mutates only the event and its own counters; never touches storage.
pub struct CacheResolver<'a> {
    index: &'a ClassificationIndex,
    stats: MatchStats,
}

impl<'a> CacheResolver<'a> {
    pub fn new(index: &'a ClassificationIndex) -> Self {
        Self {
            index,
            stats: MatchStats::default(),
        }
    }

    /// Resolve one event in place. On a hit the category fields are filled
    /// and `cache_matched` is set; on a miss the event is left untouched.
    pub fn resolve(&mut self, event: &mut ProcessedEvent) {
        if event.is_multipurpose {
            self.resolve_multipurpose(event);
        } else {
            self.resolve_single_purpose(event);
        }
    }

    fn resolve_single_purpose(&mut self, event: &mut ProcessedEvent) {
        match self.index.single_purpose_category(&event.app) {
            Some(assignment) => {
                event.category_id = Some(assignment.category_id.clone());
                event.sub_category_id = assignment.sub_category_id.clone();
                event.goal_id = assignment.goal_id.clone();
                event.cache_matched = true;
                self.stats.matched += 1;
                debug!("cache hit: app={} category={}", event.app, assignment.category_id);
            }
            None => self.stats.missed += 1,
        }
    }

    fn resolve_multipurpose(&mut self, event: &mut ProcessedEvent) {
        // If the app was never classified under any title there is no point
        // consulting the title map, and "app wholly unknown" stays
        // distinguishable from "app known, title unknown" in the debug log.
        if !self.index.is_app_cached(&event.app, true) {
            self.stats.missed += 1;
            return;
        }

        match self.index.multipurpose_category(&event.app, &event.title) {
            Some(assignment) => {
                event.category_id = Some(assignment.category_id.clone());
                event.sub_category_id = assignment.sub_category_id.clone();
                event.goal_id = assignment.goal_id.clone();
                event.cache_matched = true;
                self.stats.matched += 1;
                debug!(
                    "cache hit: app={} title={} category={}",
                    event.app, event.title, assignment.category_id
                );
            }
            None => {
                debug!("cache miss: app={} cached but title={} is not", event.app, event.title);
                self.stats.missed += 1;
            }
        }
    }

    pub fn stats(&self) -> MatchStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = MatchStats::default();
    }
}
