//! Handles serialising and saving rasters to disk in the _parquet_ file format.

pub mod raster;

pub use raster::{save_raster, Layer};
