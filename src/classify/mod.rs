pub mod collector;
pub mod config;
pub mod index;
pub mod normalizer;
pub mod pipeline;
pub mod resolver;

pub use collector::{CollectStats, UnresolvedCollector};
pub use config::PipelineConfig;
pub use index::ClassificationIndex;
pub use normalizer::{DropStats, EventNormalizer};
pub use pipeline::{run as run_pipeline, PipelineRun};
pub use resolver::{CacheResolver, MatchStats};
