use std::collections::{HashMap, HashSet};

use log::debug;

use crate::models::{CategoryAssignment, ClassificationRecord};

/// In-memory index over the persisted classification cache, rebuilt once per
/// run and read-only afterwards.
///
/// Matching only considers enabled records that actually carry a category;
/// the description map is built from every record regardless, since an app
/// description stays reusable even when its classification was disabled.
#[derive(Debug, Default)]
pub struct ClassificationIndex {
    single_purpose_apps: HashSet<String>,
    multipurpose_apps: HashSet<String>,
    app_assignments: HashMap<String, CategoryAssignment>,
    title_assignments: HashMap<String, CategoryAssignment>,
    descriptions: HashMap<String, String>,
}

impl ClassificationIndex {
    pub fn build(records: &[ClassificationRecord]) -> Self {
        let mut index = Self::default();

        for record in records {
            let app = record.app.trim().to_lowercase();
            if app.is_empty() {
                continue;
            }

            // Descriptions are reusable independently of the classification,
            // so this map ignores `enabled` and the category filter.
            if let Some(desc) = record.app_description.as_deref() {
                if !desc.is_empty() && !index.descriptions.contains_key(&app) {
                    index.descriptions.insert(app.clone(), desc.to_string());
                }
            }

            if !record.enabled {
                continue;
            }
            let Some(category_id) = record.category_id.as_deref() else {
                continue;
            };
            let assignment = CategoryAssignment {
                category_id: category_id.to_string(),
                sub_category_id: record.sub_category_id.clone(),
                goal_id: record.goal_id.clone(),
            };

            if record.is_multipurpose {
                let Some(title) = record.title.as_deref() else {
                    continue;
                };
                let title = title.trim().to_lowercase();
                if title.is_empty() {
                    continue;
                }
                index.multipurpose_apps.insert(app);
                // First write wins so duplicate rows cannot flip the result
                // depending on load order.
                index.title_assignments.entry(title).or_insert(assignment);
            } else {
                index.single_purpose_apps.insert(app.clone());
                index.app_assignments.entry(app).or_insert(assignment);
            }
        }

        debug!(
            "classification index built: {} single-purpose apps, {} multi-purpose apps, {} titles, {} descriptions",
            index.single_purpose_apps.len(),
            index.multipurpose_apps.len(),
            index.title_assignments.len(),
            index.descriptions.len()
        );

        index
    }

    /// Category for a single-purpose app, if it was ever classified.
    pub fn single_purpose_category(&self, app: &str) -> Option<&CategoryAssignment> {
        self.app_assignments.get(app)
    }

    /// Category for a multi-purpose app's title. Misses immediately when the
    /// app itself has never been classified under any title, so a title
    /// written for one app can never answer for another.
    pub fn multipurpose_category(&self, app: &str, title: &str) -> Option<&CategoryAssignment> {
        if !self.multipurpose_apps.contains(app) {
            return None;
        }
        self.title_assignments.get(title)
    }

    /// Previously stored description for an app, empty if unknown.
    pub fn description(&self, app: &str) -> &str {
        self.descriptions.get(app).map(String::as_str).unwrap_or("")
    }

    /// Whether the app appears in the classified set for its kind.
    pub fn is_app_cached(&self, app: &str, is_multipurpose: bool) -> bool {
        if is_multipurpose {
            self.multipurpose_apps.contains(app)
        } else {
            self.single_purpose_apps.contains(app)
        }
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            single_purpose_apps: self.single_purpose_apps.len(),
            multipurpose_apps: self.multipurpose_apps.len(),
            titles: self.title_assignments.len(),
            descriptions: self.descriptions.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub single_purpose_apps: usize,
    pub multipurpose_apps: usize,
    pub titles: usize,
    pub descriptions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(app: &str, title: Option<&str>, category: Option<&str>, multi: bool) -> ClassificationRecord {
        ClassificationRecord {
            app: app.to_string(),
            title: title.map(str::to_string),
            category_id: category.map(str::to_string),
            sub_category_id: None,
            goal_id: None,
            is_multipurpose: multi,
            enabled: true,
            app_description: None,
        }
    }

    #[test]
    fn indexes_single_purpose_records_by_app() {
        let index = ClassificationIndex::build(&[record("notepad", None, Some("work"), false)]);
        assert!(index.is_app_cached("notepad", false));
        assert_eq!(
            index.single_purpose_category("notepad").unwrap().category_id,
            "work"
        );
        assert!(index.single_purpose_category("vim").is_none());
    }

    #[test]
    fn ignores_disabled_records_for_matching() {
        let mut disabled = record("notepad", None, Some("work"), false);
        disabled.enabled = false;
        let index = ClassificationIndex::build(&[disabled]);
        assert!(!index.is_app_cached("notepad", false));
        assert!(index.single_purpose_category("notepad").is_none());
    }

    #[test]
    fn ignores_records_without_category() {
        // An enabled record can exist purely to cache a description.
        let mut uncategorized = record("notepad", None, None, false);
        uncategorized.app_description = Some("plain text editor".to_string());
        let index = ClassificationIndex::build(&[uncategorized]);
        assert!(!index.is_app_cached("notepad", false));
        assert_eq!(index.description("notepad"), "plain text editor");
    }

    #[test]
    fn descriptions_survive_disabled_records() {
        let mut disabled = record("notepad", None, Some("work"), false);
        disabled.enabled = false;
        disabled.app_description = Some("plain text editor".to_string());
        let index = ClassificationIndex::build(&[disabled]);
        assert_eq!(index.description("notepad"), "plain text editor");
        assert_eq!(index.description("unknown"), "");
    }

    #[test]
    fn multipurpose_lookup_requires_the_app_to_be_cached() {
        let index = ClassificationIndex::build(&[record(
            "browserx",
            Some("docs - report"),
            Some("work"),
            true,
        )]);
        assert!(index.is_app_cached("browserx", true));
        assert_eq!(
            index
                .multipurpose_category("browserx", "docs - report")
                .unwrap()
                .category_id,
            "work"
        );
        // Same title under an unclassified app must miss.
        assert!(index.multipurpose_category("otherbrowser", "docs - report").is_none());
        // Known app, unknown title.
        assert!(index.multipurpose_category("browserx", "cat videos").is_none());
    }

    #[test]
    fn multipurpose_records_without_title_are_skipped() {
        let index = ClassificationIndex::build(&[record("browserx", None, Some("work"), true)]);
        assert!(!index.is_app_cached("browserx", true));
    }

    #[test]
    fn first_write_wins_on_duplicate_keys() {
        let index = ClassificationIndex::build(&[
            record("notepad", None, Some("work"), false),
            record("notepad", None, Some("leisure"), false),
        ]);
        assert_eq!(
            index.single_purpose_category("notepad").unwrap().category_id,
            "work"
        );
    }

    #[test]
    fn keys_are_normalized_to_lowercase() {
        let index = ClassificationIndex::build(&[record(
            "BrowserX",
            Some("  Docs - Report "),
            Some("work"),
            true,
        )]);
        assert!(index
            .multipurpose_category("browserx", "docs - report")
            .is_some());
    }
}
