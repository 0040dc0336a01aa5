use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A raw window event as delivered by the activity-tracking source.
///
/// `timestamp` is kept as the wire string (RFC 3339, UTC) and only parsed
/// during normalization so one bad timestamp never poisons a whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub id: String,
    pub timestamp: String,
    pub duration_seconds: i64,
    pub app: Option<String>,
    pub title: Option<String>,
}

/// A normalized event, ready for cache resolution and persistence.
///
/// `start_time`/`end_time` are local wall-clock times in the configured
/// timezone. `app` and `title` are lower-cased and trimmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedEvent {
    pub id: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub duration_seconds: i64,
    pub app: String,
    pub title: String,
    pub is_multipurpose: bool,
    pub category_id: Option<String>,
    pub sub_category_id: Option<String>,
    pub goal_id: Option<String>,
    pub cache_matched: bool,
}
