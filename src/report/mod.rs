//! CSV summaries written next to the rasters.

pub mod statistics;
pub mod timeseries;

pub use statistics::{save_statistics, statistics_rows};
pub use timeseries::{point_series, save_point_series, Point};
