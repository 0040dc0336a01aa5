pub mod classify;
pub mod db;
pub mod models;
pub mod settings;
pub mod sync;

pub use classify::{run_pipeline, ClassificationIndex, PipelineConfig, PipelineRun};
pub use db::Database;
pub use models::{ClassificationBatch, ClassificationOutcome, ProcessedEvent, RawEvent};
pub use settings::{PipelineSettings, SettingsStore};
pub use sync::{ActivitySource, Classifier, SyncReport, SyncService};
