pub mod classification;
pub mod event;

pub use classification::{
    AppRegistryEntry, CategoryAssignment, ClassificationBatch, ClassificationOutcome,
    ClassificationRecord, PendingClassificationItem,
};
pub use event::{ProcessedEvent, RawEvent};
