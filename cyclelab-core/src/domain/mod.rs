//! Domain types: supported assets, daily series, query granularities.

pub mod asset;
pub mod granularity;
pub mod series;

pub use asset::{AssetKey, AssetKind, EPOCH};
pub use granularity::{Period, Resolution};
pub use series::{AssetSeries, SeriesPoint};
