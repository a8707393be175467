//! Git activity aggregation: churn, ownership, and age hotspots.
//!
//! Parses `git log --numstat` text into per-file statistics, keeps renamed
//! files attached to their current path, scores files for a [`ScoreMode`],
//! and rolls the scores up into folders.
//!
//! [`ScoreMode`]: hotmap_core::ScoreMode

pub mod aggregate;
pub mod files;
pub mod folders;
pub mod numstat;
pub mod pipeline;
pub mod rename;
pub mod scoring;
pub mod source;
