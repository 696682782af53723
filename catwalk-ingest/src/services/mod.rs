//! Service modules for the crawl → review → learn → sync pipeline

pub mod batch_lock;
pub mod catalog_writer;
pub mod crawl_controller;
pub mod feedback;
pub mod feedback_learner;
pub mod review_manager;
pub mod rule_compiler;
pub mod scheduler;
pub mod wardrobe_sync;

pub use batch_lock::{BatchLock, JobGuard, JobKind, RunningJobInfo};
pub use catalog_writer::{CatalogWriter, InsertOutcome, PageWriteReport};
pub use crawl_controller::{CrawlController, CrawlStatus, CrawlSummary, Frontier};
pub use feedback::{FeedbackInput, FeedbackOutcome};
pub use feedback_learner::{LearningReport, LearningStats};
pub use review_manager::{ReviewSetup, ReviewStatusReport};
pub use rule_compiler::ActiveRules;
pub use scheduler::CrawlScheduler;
pub use wardrobe_sync::{SyncReport, SyncStats};
