pub mod activity_log;
pub mod classification;

pub use activity_log::ActivityLogRepository;
pub use classification::ClassificationRepository;
