//! Fetching the SWE and precipitation series for a date range.

pub mod capa;
pub mod snodas;

use std::{collections::BTreeMap, path::Path};

use chrono::NaiveDate;
use indicatif::MultiProgress;
use log::{info, warn};
use reqwest::Client;

use crate::{
    cli::{create_progress_bar, create_spinner},
    date_range::DateRange,
    error::Result,
    raster::{resample_bilinear, Grid, Raster},
};

pub use capa::CapaSource;
pub use snodas::SnodasSource;

/// A raster per date. Dates with no published data are absent.
pub type Series = BTreeMap<NaiveDate, Raster>;

/// Both upstream datasets plus the HTTP client used to reach them.
pub struct Sources {
    pub client: Client,
    pub snodas: SnodasSource,
    pub capa: CapaSource,
}

impl Sources {
    /// Precipitation for every date in `range`, cropped to the area of
    /// interest.
    pub async fn fetch_precipitation(&self, range: DateRange, work_dir: &Path) -> Result<Series> {
        let bars = MultiProgress::new();
        let pb = bars.add(create_progress_bar(range.count() as u64, "Fetching CaPA precipitation".to_string()));
        let mut series = Series::new();

        for date in range {
            pb.set_message(format!("Fetching CaPA precipitation for {}", date));
            let bar = bars.add(create_spinner(format!("CaPA {}", date)));
            let fetched = self.capa.fetch(&self.client, date, work_dir, &bar).await;
            bar.finish_and_clear();
            bars.remove(&bar);

            if let Some(raster) = missing_ok(fetched, "CaPA precipitation", date)? {
                series.insert(date, raster);
            }
            pb.inc(1);
        }

        pb.finish_with_message(format!("CaPA precipitation: {} day(s)", series.len()));
        info!("Fetched CaPA precipitation for {} day(s)", series.len());

        Ok(series)
    }

    /// SWE for every date in `range`, resampled onto `target`.
    pub async fn fetch_swe(&self, range: DateRange, target: &Grid, work_dir: &Path) -> Result<Series> {
        let bars = MultiProgress::new();
        let pb = bars.add(create_progress_bar(range.count() as u64, "Fetching SNODAS SWE".to_string()));
        let mut series = Series::new();

        for date in range {
            pb.set_message(format!("Fetching SNODAS SWE for {}", date));
            let bar = bars.add(create_spinner(format!("SNODAS {}", date)));
            let fetched = self.snodas.fetch(&self.client, date, work_dir, &bar).await;
            bar.finish_and_clear();
            bars.remove(&bar);

            if let Some(raster) = missing_ok(fetched, "SNODAS SWE", date)? {
                series.insert(date, resample_bilinear(&raster, target));
            }
            pb.inc(1);
        }

        pb.finish_with_message(format!("SNODAS SWE: {} day(s)", series.len()));
        info!("Fetched SNODAS SWE for {} day(s)", series.len());

        Ok(series)
    }
}

/// Turns "not published" into `None`, keeping every other error.
fn missing_ok(fetched: Result<Raster>, what: &str, date: NaiveDate) -> Result<Option<Raster>> {
    match fetched {
        Ok(raster) => Ok(Some(raster)),
        Err(e) if e.is_missing() => {
            warn!("No {} for {}: {}", what, date, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

// -- Tests -------------------------------------------------------------------
