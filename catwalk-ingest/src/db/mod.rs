//! Database access for catwalk-ingest
//!
//! Schema creation lives in `catwalk_common::db`; these modules hold the
//! queries.

pub mod catalog;
pub mod patterns;
pub mod rules;
pub mod sessions;
pub mod wardrobe;
