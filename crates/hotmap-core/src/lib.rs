//! Core types, configuration, and error handling for hotmap.
//!
//! This crate provides the shared foundation used by all other hotmap crates:
//! - [`HotmapError`]: unified error type using `thiserror`
//! - [`HotmapConfig`]: configuration loaded from `.hotmap.toml`
//! - Shared types: [`ScoreMode`], [`TimeWindow`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{AnalysisConfig, CacheConfig, HotmapConfig, CONFIG_TEMPLATE};
pub use error::HotmapError;
pub use types::{OutputFormat, ScoreMode, TimeWindow};

/// A convenience `Result` type for hotmap operations.
pub type Result<T> = std::result::Result<T, HotmapError>;
