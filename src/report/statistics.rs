//! Summary statistics of the computed flux.

use std::path::Path;

use anyhow::Result;
use log::info;
use serde::Serialize;

use crate::{
    atomic::write_atomically,
    flux::{mm_per_day_to_m_per_s, DailyFlux},
};

#[derive(Debug, Clone, Copy, PartialEq)]
/// Population statistics over the cells that hold data.
pub struct Statistics {
    pub cells: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std: f64,
}

impl Statistics {
    /// Returns `None` when no value holds data.
    pub fn from_values<'a, I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a f32>,
    {
        let mut cells = 0usize;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for &v in values.into_iter().filter(|v| !v.is_nan()) {
            let v = v as f64;
            cells += 1;
            sum += v;
            sum_sq += v * v;
            min = min.min(v);
            max = max.max(v);
        }

        if cells == 0 {
            return None;
        }

        let mean = sum / cells as f64;
        let variance = (sum_sq / cells as f64 - mean * mean).max(0.0);

        Some(Statistics {
            cells,
            mean,
            min,
            max,
            std: variance.sqrt(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsRow {
    /// `YYYY-MM-DD`, or `all` for the whole range
    pub period: String,
    pub cells: usize,
    pub mean_mm_day: f64,
    pub min_mm_day: f64,
    pub max_mm_day: f64,
    pub std_mm_day: f64,
    pub mean_m_s: f64,
    pub min_m_s: f64,
    pub max_m_s: f64,
    pub std_m_s: f64,
}

impl StatisticsRow {
    fn new(period: String, stats: Statistics) -> Self {
        StatisticsRow {
            period,
            cells: stats.cells,
            mean_mm_day: stats.mean,
            min_mm_day: stats.min,
            max_mm_day: stats.max,
            std_mm_day: stats.std,
            mean_m_s: mm_per_day_to_m_per_s(stats.mean),
            min_m_s: mm_per_day_to_m_per_s(stats.min),
            max_m_s: mm_per_day_to_m_per_s(stats.max),
            std_m_s: mm_per_day_to_m_per_s(stats.std),
        }
    }
}

/// One row per computed date with data, then an `all` row.
pub fn statistics_rows(fluxes: &[DailyFlux]) -> Vec<StatisticsRow> {
    let computed: Vec<_> = fluxes
        .iter()
        .filter_map(|flux| match flux {
            DailyFlux::Computed { date, lwf } => Some((date, lwf)),
            DailyFlux::Skipped { .. } => None,
        })
        .collect();

    let mut rows: Vec<StatisticsRow> = computed
        .iter()
        .filter_map(|(date, lwf)| {
            Statistics::from_values(&lwf.data)
                .map(|stats| StatisticsRow::new(date.format("%Y-%m-%d").to_string(), stats))
        })
        .collect();

    if let Some(stats) = Statistics::from_values(computed.iter().flat_map(|(_, lwf)| &lwf.data)) {
        info!(
            "LWF over {} cell-days: mean={:.2} mm/day, min={:.2}, max={:.2}, std={:.2}",
            stats.cells, stats.mean, stats.min, stats.max, stats.std
        );
        rows.push(StatisticsRow::new("all".to_string(), stats));
    }

    rows
}

const HEADER: [&str; 10] = [
    "period",
    "cells",
    "mean_mm_day",
    "min_mm_day",
    "max_mm_day",
    "std_mm_day",
    "mean_m_s",
    "min_m_s",
    "max_m_s",
    "std_m_s",
];

/// Writes `rows` as CSV. The header is written even when there are no rows.
pub fn save_statistics(file_path: &Path, rows: &[StatisticsRow]) -> Result<()> {
    write_atomically(file_path, |file| {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(HEADER)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    })
}

// -- Tests -------------------------------------------------------------------
