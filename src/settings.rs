use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::classify::PipelineConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSettings {
    /// Events shorter than this many seconds are dropped.
    pub min_duration_seconds: i64,
    /// Apps classified per window title rather than per app identity.
    pub multipurpose_apps: Vec<String>,
    /// IANA timezone name events are converted into.
    pub timezone: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            min_duration_seconds: 60,
            multipurpose_apps: vec![
                "chrome".into(),
                "msedge".into(),
                "firefox".into(),
                "safari".into(),
            ],
            timezone: "UTC".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserSettings {
    pipeline: PipelineSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn pipeline(&self) -> PipelineSettings {
        self.data.read().unwrap().pipeline.clone()
    }

    pub fn update_pipeline(&self, settings: PipelineSettings) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.pipeline = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

impl PipelineSettings {
    /// Build the run configuration. Fails only on an unknown timezone name.
    pub fn to_pipeline_config(&self) -> Result<PipelineConfig> {
        let timezone = self
            .timezone
            .parse()
            .map_err(|err| anyhow::anyhow!("invalid timezone '{}': {err}", self.timezone))?;

        Ok(PipelineConfig {
            min_duration_seconds: self.min_duration_seconds,
            multipurpose_apps: self
                .multipurpose_apps
                .iter()
                .map(|app| app.trim().to_lowercase())
                .collect(),
            timezone,
            ..PipelineConfig::default()
        })
    }
}
