//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use chrono::NaiveDate;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{date_range::parse_date, raster::BoundingBox, source::snodas::DEFAULT_BASE_URL};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
/// Computes daily liquid water flux, `SWE(t-1) - SWE(t) + P(t)`, from SNODAS
/// snow water equivalent and CaPA precipitation.
pub struct Cli {
    /// First date to compute, YYYY-MM-DD [default: yesterday]
    #[arg(long, value_parser = parse_date)]
    pub start_date: Option<NaiveDate>,

    /// Last date to compute, YYYY-MM-DD [default: yesterday]
    #[arg(long, value_parser = parse_date)]
    pub end_date: Option<NaiveDate>,

    /// Directory for the output files [default: ~/lwf]
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Area of interest as WEST,SOUTH,EAST,NORTH in degrees
    #[arg(long, default_value_t = BoundingBox::default(), allow_hyphen_values = true)]
    pub bbox: BoundingBox,

    /// Base URL or local mirror directory of the SNODAS archives
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub snodas_url: String,

    /// URL or path template of the daily CaPA grids, expanding {date},
    /// {iso}, {year}, {month} and {day}
    #[arg(long)]
    pub capa_source: Option<String>,

    /// Latitude of a single location; writes a CSV time series instead of
    /// rasters
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude of a single location
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Also write the resampled SWE and cropped precipitation rasters
    #[arg(long)]
    pub save_inputs: bool,

    /// Fail when any date is skipped for missing data
    #[arg(long)]
    pub strict: bool,
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    let style = ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

    ProgressBar::new(size).with_message(message).with_style(style)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_defaults() {
        let cli = Cli::try_parse_from(["lwf"]).unwrap();

        assert_eq!(cli.start_date, None);
        assert_eq!(cli.end_date, None);
        assert_eq!(cli.bbox, BoundingBox::default());
        assert_eq!(cli.snodas_url, DEFAULT_BASE_URL);
        assert!(!cli.save_inputs);
        assert!(!cli.strict);
    }

    #[test]
    fn should_parse_negative_bbox_and_point() {
        let cli = Cli::try_parse_from([
            "lwf",
            "--start-date",
            "2025-03-01",
            "--bbox",
            "-120,49,-110,54",
            "--lat",
            "51.05",
            "--lon",
            "-114.07",
        ])
        .unwrap();

        assert_eq!(cli.start_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(cli.bbox, BoundingBox::new(-120.0, 49.0, -110.0, 54.0).unwrap());
        assert_eq!(cli.lat, Some(51.05));
        assert_eq!(cli.lon, Some(-114.07));
    }

    #[test]
    fn should_reject_lat_without_lon() {
        assert!(Cli::try_parse_from(["lwf", "--lat", "51.0"]).is_err());
    }

    #[test]
    fn should_reject_malformed_date() {
        assert!(Cli::try_parse_from(["lwf", "--end-date", "2025/03/01"]).is_err());
    }
}
