//! Data models for the catalog pipeline

pub mod candidate;
pub mod catalog;
pub mod favorite;
pub mod learning_pattern;
pub mod review_session;

pub use candidate::ImageCandidate;
pub use catalog::{CatalogEntry, NewCatalogEntry, TrainingStatus};
pub use favorite::{UserCatalogEntry, UserFavorite};
pub use learning_pattern::LearningPattern;
pub use review_session::{ReviewSession, ReviewStatus, ReviewTally};
