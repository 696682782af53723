//! # Catwalk Common Library
//!
//! Shared code for the catwalk services:
//! - Error type used across database and configuration code
//! - Root folder and TOML configuration resolution
//! - Timestamp helpers
//! - SQLite pool initialization and schema creation

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
