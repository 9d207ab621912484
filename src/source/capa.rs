//! CaPA daily precipitation.
//!
//! Each day is one ESRI ASCII grid of 24 h accumulated precipitation in mm,
//! optionally gzip-compressed. The location is a template expanded per date
//! and may be an `http(s)://` URL or a local path.

use std::{
    fs::{self, File},
    io::{BufRead, BufReader, ErrorKind},
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use flate2::read::GzDecoder;
use indicatif::ProgressBar;
use log::debug;
use reqwest::Client;

use crate::{
    download::{download_file, is_remote},
    error::{LwfError, Result},
    raster::{ascii_grid::read_ascii_grid, BoundingBox, Raster},
};

/// Default template, relative to the platform data directory.
pub const DEFAULT_TEMPLATE: &str = "lwf/capa/CaPA_{date}.asc";

#[derive(Debug, Clone)]
pub struct CapaSource {
    template: String,
    bbox: BoundingBox,
}

impl CapaSource {
    pub fn new(template: &str, bbox: BoundingBox) -> Self {
        CapaSource {
            template: template.to_string(),
            bbox,
        }
    }

    /// Expands `{date}`, `{iso}`, `{year}`, `{month}` and `{day}`.
    pub fn location(&self, date: NaiveDate) -> String {
        self.template
            .replace("{date}", &date.format("%Y%m%d").to_string())
            .replace("{iso}", &date.format("%Y-%m-%d").to_string())
            .replace("{year}", &date.format("%Y").to_string())
            .replace("{month}", &date.format("%m").to_string())
            .replace("{day}", &date.format("%d").to_string())
    }

    /// Fetches precipitation for `date` cropped to the area of interest.
    pub async fn fetch(
        &self,
        client: &Client,
        date: NaiveDate,
        work_dir: &Path,
        progress_bar: &ProgressBar,
    ) -> Result<Raster> {
        let location = self.location(date);

        let raster = if is_remote(&location) {
            let file_name = location.rsplit('/').next().unwrap_or("capa.asc");
            let file_path = work_dir.join(file_name);
            download_file(client, &location, &file_path, progress_bar).await?;
            let raster = read_grid_file(&file_path);
            fs::remove_file(&file_path)?;
            raster?
        } else {
            read_grid_file(&PathBuf::from(&location))?
        };

        debug!("CaPA {} on {}", date, raster.grid);

        raster.crop(&self.bbox)
    }
}

/// Reads a grid file, decompressing when the name ends in `.gz`.
pub fn read_grid_file(path: &Path) -> Result<Raster> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LwfError::NotFound(path.display().to_string()),
        _ => LwfError::Io(e),
    })?;

    let reader: Box<dyn BufRead> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    read_ascii_grid(reader)
}

// -- Tests -------------------------------------------------------------------
