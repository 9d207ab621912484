//! Run configuration resolved from the command line.

use std::path::PathBuf;

use chrono::NaiveDate;
use log::info;

use crate::{
    cli::Cli,
    date_range::{previous_day, DateRange},
    error::{LwfError, Result},
    raster::BoundingBox,
    report::Point,
    source::capa::DEFAULT_TEMPLATE,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub range: DateRange,
    pub output_dir: PathBuf,
    pub bbox: BoundingBox,
    pub snodas_url: String,
    pub capa_template: String,
    /// Single-location mode when set
    pub point: Option<Point>,
    pub save_inputs: bool,
    pub strict: bool,
}

impl Config {
    /// Validates `cli` and fills in defaults. Dates default to the day before
    /// `today`.
    pub fn from_cli(cli: &Cli, today: NaiveDate) -> Result<Self> {
        let yesterday = previous_day(today);
        let range = DateRange::new(
            cli.start_date.unwrap_or(yesterday),
            cli.end_date.unwrap_or(yesterday),
        )?;

        let point = match (cli.lat, cli.lon) {
            (Some(lat), Some(lon)) => Some(make_point(lat, lon)?),
            (None, None) => None,
            _ => {
                return Err(LwfError::InvalidConfig(
                    "--lat and --lon must be given together".to_string(),
                ))
            }
        };

        let output_dir = cli.output_dir.clone().unwrap_or_else(default_output_dir);
        let capa_template = cli.capa_source.clone().unwrap_or_else(default_capa_template);
        if capa_template.trim().is_empty() {
            return Err(LwfError::InvalidConfig("--capa-source is empty".to_string()));
        }
        if cli.snodas_url.trim().is_empty() {
            return Err(LwfError::InvalidConfig("--snodas-url is empty".to_string()));
        }

        Ok(Config {
            range,
            output_dir,
            bbox: cli.bbox,
            snodas_url: cli.snodas_url.clone(),
            capa_template,
            point,
            save_inputs: cli.save_inputs,
            strict: cli.strict,
        })
    }

    pub fn log(&self) {
        info!("Dates: {} to {}", self.range.start(), self.range.end());
        info!("Area of interest: {}", self.bbox);
        info!("SNODAS: {}", self.snodas_url);
        info!("CaPA: {}", self.capa_template);
        info!("Output directory: {}", self.output_dir.display());
        if let Some(point) = self.point {
            info!("Single location: ({}, {})", point.lat, point.lon);
        }
    }
}

fn make_point(lat: f64, lon: f64) -> Result<Point> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(LwfError::InvalidConfig(format!(
            "location ({}, {}) is not a valid latitude/longitude",
            lat, lon
        )));
    }

    Ok(Point { lat, lon })
}

fn default_output_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("lwf"))
        .unwrap_or_else(|| PathBuf::from("lwf"))
}

fn default_capa_template() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_TEMPLATE)
        .to_string_lossy()
        .to_string()
}

// -- Tests -------------------------------------------------------------------
