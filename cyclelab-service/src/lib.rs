//! CycleLab Service: configuration and the query facade over `cyclelab-core`.
//!
//! - `ServiceConfig`: TOML file plus environment overrides
//! - `MemoizedSource`: per-snapshot in-memory series memo
//! - `AssetService`: `get_table`, `get_sliding_correlation`,
//!   `update_all_assets`, `supported_assets`

pub mod config;
pub mod memo;
pub mod service;

pub use config::{HttpConfig, ServiceConfig};
pub use memo::MemoizedSource;
pub use service::AssetService;
