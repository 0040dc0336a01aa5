use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The category triple a cache hit resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAssignment {
    pub category_id: String,
    pub sub_category_id: Option<String>,
    pub goal_id: Option<String>,
}

/// A durable classification cache entry, keyed by `app` for single-purpose
/// apps and by `(app, title)` for multi-purpose apps.
///
/// A record may be enabled yet carry no `category_id` when it was only
/// written to cache an app description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRecord {
    pub app: String,
    pub title: Option<String>,
    pub category_id: Option<String>,
    pub sub_category_id: Option<String>,
    pub goal_id: Option<String>,
    pub is_multipurpose: bool,
    pub enabled: bool,
    pub app_description: Option<String>,
}

/// One app appearing among the cache misses of a run. `titles` is populated
/// for multi-purpose apps only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRegistryEntry {
    pub app: String,
    pub description: String,
    pub is_multipurpose: bool,
    pub titles: Vec<String>,
}

/// One unit of work for the external classifier: a distinct single-purpose
/// app, or a distinct title under a multi-purpose app. Ids are sequential
/// and scoped to the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingClassificationItem {
    pub id: u64,
    pub app: String,
    pub duration_seconds: i64,
    pub title: String,
}

/// The deduplicated payload handed to the external classifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationBatch {
    pub app_registry: HashMap<String, AppRegistryEntry>,
    pub items: Vec<PendingClassificationItem>,
}

impl ClassificationBatch {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The classifier's verdict for one pending item. A missing `category_id`
/// means the classifier could not decide; the record is still stored so the
/// app description is not lost, but it never participates in matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationOutcome {
    pub item_id: u64,
    pub category_id: Option<String>,
    pub sub_category_id: Option<String>,
    pub goal_id: Option<String>,
}
