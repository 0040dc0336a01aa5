use std::collections::HashSet;

use chrono_tz::Tz;

/// Configuration for one pipeline run, with tunable thresholds.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Events shorter than this are dropped before any other processing.
    pub min_duration_seconds: i64,

    /// Apps whose category depends on the window title (browsers and the
    /// like). Entries are compared against the normalized app name.
    pub multipurpose_apps: HashSet<String>,

    /// Timezone events are converted into before persistence.
    pub timezone: Tz,

    /// Substrings the tracking source appends to a title when several
    /// windows are grouped under it ("和另外 N 个窗口" on Windows builds).
    /// Only the text before the first marker is kept.
    pub grouped_title_markers: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_duration_seconds: 60,
            multipurpose_apps: HashSet::new(),
            timezone: chrono_tz::UTC,
            grouped_title_markers: vec!["和另外".to_string()],
        }
    }
}

impl PipelineConfig {
    pub fn is_multipurpose(&self, app: &str) -> bool {
        self.multipurpose_apps.contains(app)
    }
}
