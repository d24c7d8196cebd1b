//! # Easel Common Library
//!
//! Shared code for the Easel catalog tools:
//! - Title normalization (the join key across all sources)
//! - Episode entity model and vocabulary kinds
//! - Database schema and vocabulary queries
//! - Configuration loading
//! - Common error type

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod title;

pub use error::{Error, Result};
pub use model::{Episode, VocabularyKind};
pub use title::NormalizedTitle;
