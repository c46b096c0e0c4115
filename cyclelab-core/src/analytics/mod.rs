//! Query engines over stored snapshots: alignment, resampling, correlation.

pub mod align;
pub mod correlation;
pub mod resample;
pub mod source;
pub mod stats;

pub use align::{forward_fill, inner_join, outer_join, AlignedColumn, AlignedTable};
pub use correlation::{sliding_correlation, CorrelationEngine, CorrelationPoint};
pub use resample::{bucket_end, resample, ResampleEngine, ResampledTable, TableRow};
pub use source::SeriesSource;
pub use stats::{mean_finite, pearson, round4};
