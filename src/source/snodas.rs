//! SNODAS daily snow water equivalent.
//!
//! NSIDC publishes one tar per day holding gzip-compressed flat binary grids
//! for each SNODAS product. The SWE product is code `1034`. The unmasked grid
//! covers 8192 x 4096 cells of 30 arc seconds, stored as big-endian `i16`
//! millimetres with `-9999` for no-data.

use std::{
    fs::{self, File},
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use flate2::read::GzDecoder;
use indicatif::ProgressBar;
use log::debug;
use reqwest::Client;
use tar::Archive;

use crate::{
    download::{download_file, is_remote},
    error::{LwfError, Result},
    raster::{BoundingBox, Grid, Raster, Window},
};

pub const DEFAULT_BASE_URL: &str = "https://noaadata.apps.nsidc.org/NOAA/G02158/unmasked";

const SWE_PRODUCT: &str = "ssmv11034";
const NODATA: i16 = -9999;

/// The unmasked SNODAS grid.
pub fn snodas_grid() -> Grid {
    let west = -130.516_666_666_666_67;
    let north = 58.233_333_333_333_33;
    let east = -62.25;
    let south = 24.1;
    let ncols = 8192;
    let nrows = 4096;

    Grid {
        ncols,
        nrows,
        west,
        north,
        dx: (east - west) / ncols as f64,
        dy: (north - south) / nrows as f64,
    }
}

#[derive(Debug, Clone)]
pub struct SnodasSource {
    base_url: String,
    bbox: BoundingBox,
    grid: Grid,
}

impl SnodasSource {
    pub fn new(base_url: &str, bbox: BoundingBox) -> Self {
        SnodasSource {
            base_url: base_url.trim_end_matches('/').to_string(),
            bbox,
            grid: snodas_grid(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_grid(mut self, grid: Grid) -> Self {
        self.grid = grid;
        self
    }

    /// e.g. `{base}/2025/06_Jun/SNODAS_unmasked_20250601.tar`. The base
    /// may also be a local mirror directory.
    pub fn archive_url(&self, date: NaiveDate) -> String {
        format!(
            "{}/{}",
            self.base_url,
            date.format("%Y/%m_%b/SNODAS_unmasked_%Y%m%d.tar")
        )
    }

    /// Fetches the archive for `date` and returns SWE cropped to the area of
    /// interest. Remote archives are downloaded into `work_dir` and deleted
    /// once read; a local base is read in place.
    pub async fn fetch(
        &self,
        client: &Client,
        date: NaiveDate,
        work_dir: &Path,
        progress_bar: &ProgressBar,
    ) -> Result<Raster> {
        let location = self.archive_url(date);

        if !is_remote(&location) {
            let archive_path = PathBuf::from(&location);
            if !archive_path.exists() {
                return Err(LwfError::NotFound(location));
            }
            return read_swe_archive(&archive_path, date, &self.grid, &self.bbox);
        }

        let archive_path = work_dir.join(format!("SNODAS_unmasked_{}.tar", date.format("%Y%m%d")));
        download_file(client, &location, &archive_path, progress_bar).await?;
        let raster = read_swe_archive(&archive_path, date, &self.grid, &self.bbox);
        fs::remove_file(&archive_path)?;

        raster
    }
}

fn is_swe_member(name: &str, date: NaiveDate) -> bool {
    name.contains(SWE_PRODUCT)
        && name.ends_with(".dat.gz")
        && name.contains(&date.format("%Y%m%d").to_string())
}

/// Reads the SWE member of a daily archive laid out on `grid`, keeping only
/// the cells inside `bbox`.
pub fn read_swe_archive(
    archive_path: &Path,
    date: NaiveDate,
    grid: &Grid,
    bbox: &BoundingBox,
) -> Result<Raster> {
    // One cell beyond the box so edge targets keep all bilinear neighbours
    let window = grid.window(bbox)?.padded(1, grid);
    let mut archive = Archive::new(BufReader::new(File::open(archive_path)?));

    for entry in archive.entries()? {
        let entry = entry?;
        let name = entry.path()?.to_string_lossy().to_string();

        if is_swe_member(&name, date) {
            debug!("Decoding {} from {}", name, archive_path.display());
            return decode_dat(GzDecoder::new(entry), grid, &window);
        }
    }

    Err(LwfError::MissingMember {
        archive: archive_path.display().to_string(),
        pattern: format!("{}*{}*.dat.gz", SWE_PRODUCT, date.format("%Y%m%d")),
    })
}

/// Decodes a big-endian `i16` grid row by row, keeping the cells of `window`.
fn decode_dat<R: Read>(mut reader: R, grid: &Grid, window: &Window) -> Result<Raster> {
    let sub_grid = grid.sub_grid(window);
    let mut data = Vec::with_capacity(sub_grid.len());
    let mut row_bytes = vec![0u8; grid.ncols * 2];
    let col_range = window.col0 * 2..(window.col0 + window.ncols) * 2;

    for row in 0..window.row0 + window.nrows {
        reader.read_exact(&mut row_bytes).map_err(|e| {
            LwfError::GridParse(format!("SNODAS grid truncated at row {}: {}", row, e))
        })?;

        if !window.contains_row(row) {
            continue;
        }

        data.extend(row_bytes[col_range.clone()].chunks_exact(2).map(|pair| {
            match i16::from_be_bytes([pair[0], pair[1]]) {
                NODATA => f32::NAN,
                v => v as f32,
            }
        }));
    }

    Raster::new(sub_grid, data)
}

// -- Tests -------------------------------------------------------------------
