//! CycleLab Core: asset series ingestion, snapshot storage, and query engines.
//!
//! This crate contains:
//! - Domain types (supported assets, daily series, resolutions and periods)
//! - Market and rate providers (Yahoo Finance, FRED) behind a circuit breaker
//! - Daily reindexing and the date-keyed CSV snapshot store
//! - ResampleEngine and CorrelationEngine over the latest snapshot

pub mod analytics;
pub mod data;
pub mod domain;
pub mod error;

pub use error::{CycleError, CycleResult};
