use std::collections::{HashMap, HashSet};

use log::debug;

use crate::classify::index::ClassificationIndex;
use crate::models::{AppRegistryEntry, ClassificationBatch, PendingClassificationItem, ProcessedEvent};

/// Counters over the collected batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub total: usize,
    pub single: usize,
    pub multi: usize,
    pub apps: usize,
}

/// Accumulates cache misses into the deduplicated payload for the external
/// classifier.
///
/// Dedup is intentionally two-grained: a single-purpose app is classified
/// once per run no matter how many events or titles reference it, while a
/// multi-purpose app gets one item per distinct title.
pub struct UnresolvedCollector<'a> {
    index: &'a ClassificationIndex,
    app_registry: HashMap<String, AppRegistryEntry>,
    items: Vec<PendingClassificationItem>,
    seen_apps: HashSet<String>,
    seen_titles: HashSet<String>,
    next_item_id: u64,
}

impl<'a> UnresolvedCollector<'a> {
    pub fn new(index: &'a ClassificationIndex) -> Self {
        Self {
            index,
            app_registry: HashMap::new(),
            items: Vec::new(),
            seen_apps: HashSet::new(),
            seen_titles: HashSet::new(),
            next_item_id: 0,
        }
    }

    /// Collect one unresolved event. Events that already matched the cache
    /// are ignored.
    pub fn collect(&mut self, event: &ProcessedEvent) {
        if event.cache_matched {
            return;
        }

        if event.is_multipurpose {
            self.collect_multipurpose(event);
        } else {
            self.collect_single_purpose(event);
        }
    }

    fn collect_single_purpose(&mut self, event: &ProcessedEvent) {
        if self.seen_apps.contains(&event.app) {
            return;
        }

        self.register_app(event, false);
        self.push_item(event);
        debug!("collected single-purpose app {}", event.app);
    }

    fn collect_multipurpose(&mut self, event: &ProcessedEvent) {
        if !self.seen_apps.contains(&event.app) {
            self.register_app(event, true);
        }

        if event.title.is_empty() || self.seen_titles.contains(&event.title) {
            return;
        }

        if let Some(entry) = self.app_registry.get_mut(&event.app) {
            entry.titles.push(event.title.clone());
        }
        self.seen_titles.insert(event.title.clone());
        self.push_item(event);
        debug!("collected title {} under {}", event.title, event.app);
    }

    fn register_app(&mut self, event: &ProcessedEvent, is_multipurpose: bool) {
        self.app_registry.insert(
            event.app.clone(),
            AppRegistryEntry {
                app: event.app.clone(),
                // Reuse a previously stored description; empty means the
                // classifier should produce one.
                description: self.index.description(&event.app).to_string(),
                is_multipurpose,
                titles: Vec::new(),
            },
        );
        self.seen_apps.insert(event.app.clone());
    }

    fn push_item(&mut self, event: &ProcessedEvent) {
        self.items.push(PendingClassificationItem {
            id: self.next_item_id,
            app: event.app.clone(),
            duration_seconds: event.duration_seconds,
            title: event.title.clone(),
        });
        self.next_item_id += 1;
    }

    /// Assemble the batch payload for the external classifier.
    pub fn build_batch(&self) -> ClassificationBatch {
        ClassificationBatch {
            app_registry: self.app_registry.clone(),
            items: self.items.clone(),
        }
    }

    pub fn stats(&self) -> CollectStats {
        let single = self
            .items
            .iter()
            .filter(|item| {
                self.app_registry
                    .get(&item.app)
                    .map(|entry| !entry.is_multipurpose)
                    .unwrap_or(false)
            })
            .count();
        CollectStats {
            total: self.items.len(),
            single,
            multi: self.items.len() - single,
            apps: self.app_registry.len(),
        }
    }

    /// Clear all run-scoped state so the collector can be reused.
    pub fn reset(&mut self) {
        self.app_registry.clear();
        self.items.clear();
        self.seen_apps.clear();
        self.seen_titles.clear();
        self.next_item_id = 0;
    }
}
