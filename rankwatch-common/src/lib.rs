//! # Rankwatch Common Library
//!
//! Shared code for the rankwatch crates:
//! - Canonical domain types (identifiers, observations, run reports)
//! - Configuration loading
//! - SQLite stores (tracked products, observation history)
//! - Error types

pub mod config;
pub mod db;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    CategoryId, RankObservation, ResolvedProduct, RunReport, SourceMethod, TrackedProduct,
};
