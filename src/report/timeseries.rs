//! Flux time series at a single location.

use std::path::Path;

use anyhow::{anyhow, Result};
use log::info;
use serde::Serialize;

use crate::{
    atomic::write_atomically,
    flux::{mm_per_day_to_m_per_s, DailyFlux},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointRow {
    pub date: String,
    pub lwf_mm_day: Option<f32>,
    pub lwf_m_s: Option<f64>,
}

/// Values of the cell containing `point` on each computed date. Skipped
/// dates are left out.
pub fn point_series(fluxes: &[DailyFlux], point: Point) -> Result<Vec<PointRow>> {
    let mut rows = Vec::new();

    for flux in fluxes {
        let (date, lwf) = match flux {
            DailyFlux::Computed { date, lwf } => (date, lwf),
            DailyFlux::Skipped { .. } => continue,
        };

        let (row, col) = lwf.grid.cell_at(point.lon, point.lat).ok_or_else(|| {
            anyhow!(
                "Point ({}, {}) lies outside the output grid {}",
                point.lat,
                point.lon,
                lwf.grid
            )
        })?;

        let value = lwf.value(row, col);
        rows.push(PointRow {
            date: date.format("%Y-%m-%d").to_string(),
            lwf_mm_day: value,
            lwf_m_s: value.map(|v| mm_per_day_to_m_per_s(v as f64)),
        });
    }

    info!(
        "Extracted {} day(s) at ({}, {})",
        rows.len(),
        point.lat,
        point.lon
    );

    Ok(rows)
}

/// Writes `rows` as CSV. The header is written even when there are no rows.
pub fn save_point_series(file_path: &Path, rows: &[PointRow]) -> Result<()> {
    write_atomically(file_path, |file| {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(["date", "lwf_mm_day", "lwf_m_s"])?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    })
}

// -- Tests -------------------------------------------------------------------
