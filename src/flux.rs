//! Liquid water flux: `LWF(t) = SWE(t-1) - SWE(t) + P(t)`.
//!
//! All three rasters must sit on the same grid. A date with any input
//! missing is skipped. A cell that is no-data in any input is no-data in the
//! output. Values are neither rounded nor clamped, so a growing snowpack gives
//! a negative flux.

use std::fmt;

use chrono::NaiveDate;
use log::{debug, warn};

use crate::{
    date_range::{previous_day, DateRange},
    error::Result,
    raster::Raster,
    source::Series,
};

const SECONDS_PER_DAY: f64 = 86_400.0;
const MM_PER_M: f64 = 1_000.0;

/// Converts a flux in mm/day to m/s.
pub fn mm_per_day_to_m_per_s(value: f64) -> f64 {
    value / (SECONDS_PER_DAY * MM_PER_M)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// One of the three rasters a date needs.
pub enum Input {
    PreviousSwe,
    Swe,
    Precipitation,
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::PreviousSwe => write!(f, "SWE(t-1)"),
            Input::Swe => write!(f, "SWE(t)"),
            Input::Precipitation => write!(f, "P(t)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DailyFlux {
    /// Flux in mm/day on the shared grid
    Computed { date: NaiveDate, lwf: Raster },
    Skipped { date: NaiveDate, missing: Vec<Input> },
}

/// Cell-wise `previous_swe - swe + precipitation`.
pub fn compute_flux(previous_swe: &Raster, swe: &Raster, precipitation: &Raster) -> Result<Raster> {
    previous_swe.ensure_aligned(swe)?;
    previous_swe.ensure_aligned(precipitation)?;

    let data = previous_swe
        .data
        .iter()
        .zip(&swe.data)
        .zip(&precipitation.data)
        .map(|((prev, cur), p)| prev - cur + p)
        .collect();

    Raster::new(previous_swe.grid, data)
}

/// Flux for one date from the SWE series (which must reach back one day
/// before `date`) and the precipitation series.
pub fn flux_for_date(date: NaiveDate, swe: &Series, precipitation: &Series) -> Result<DailyFlux> {
    let previous = swe.get(&previous_day(date));
    let current = swe.get(&date);
    let p = precipitation.get(&date);

    match (previous, current, p) {
        (Some(previous), Some(current), Some(p)) => {
            let lwf = compute_flux(previous, current, p)?;
            debug!("LWF {}: {} of {} cells hold data", date, lwf.count_valid(), lwf.grid.len());
            Ok(DailyFlux::Computed { date, lwf })
        }
        _ => {
            let missing: Vec<Input> = [
                (previous.is_none(), Input::PreviousSwe),
                (current.is_none(), Input::Swe),
                (p.is_none(), Input::Precipitation),
            ]
            .into_iter()
            .filter_map(|(absent, input)| absent.then_some(input))
            .collect();

            warn!(
                "Skipping {}: missing {}",
                date,
                missing.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(", ")
            );

            Ok(DailyFlux::Skipped { date, missing })
        }
    }
}

/// Flux for every date in `range`, in date order.
pub fn compute_series(range: DateRange, swe: &Series, precipitation: &Series) -> Result<Vec<DailyFlux>> {
    range
        .map(|date| flux_for_date(date, swe, precipitation))
        .collect()
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::LwfError, raster::Grid};

    fn grid() -> Grid {
        Grid {
            ncols: 2,
            nrows: 2,
            west: -115.0,
            north: 55.0,
            dx: 0.1,
            dy: 0.1,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn series(entries: &[(NaiveDate, f32)]) -> Series {
        entries
            .iter()
            .map(|(date, value)| (*date, Raster::filled(grid(), *value)))
            .collect()
    }

    #[test]
    fn should_compute_melt_plus_rain() {
        let swe = series(&[(day(1), 10.0), (day(2), 7.0)]);
        let precipitation = series(&[(day(2), 3.0)]);

        let flux = flux_for_date(day(2), &swe, &precipitation).unwrap();

        match flux {
            DailyFlux::Computed { date, lwf } => {
                assert_eq!(date, day(2));
                assert_eq!(lwf.grid, grid());
                assert!(lwf.data.iter().all(|&v| v == 6.0));
            }
            other => panic!("expected computed flux, got {:?}", other),
        }
    }

    #[test]
    fn should_keep_negative_flux() {
        let swe = series(&[(day(1), 5.0), (day(2), 20.0)]);
        let precipitation = series(&[(day(2), 2.0)]);

        let flux = flux_for_date(day(2), &swe, &precipitation).unwrap();

        match flux {
            DailyFlux::Computed { lwf, .. } => assert!(lwf.data.iter().all(|&v| v == -13.0)),
            other => panic!("expected computed flux, got {:?}", other),
        }
    }

    #[test]
    fn should_propagate_no_data_cells() {
        let mut previous = Raster::filled(grid(), 4.0);
        previous.data[1] = f32::NAN;
        let mut precipitation = Raster::filled(grid(), 1.0);
        precipitation.data[3] = f32::NAN;

        let lwf = compute_flux(&previous, &Raster::filled(grid(), 2.0), &precipitation).unwrap();

        assert_eq!(lwf.value(0, 0), Some(3.0));
        assert_eq!(lwf.value(0, 1), None);
        assert_eq!(lwf.value(1, 0), Some(3.0));
        assert_eq!(lwf.value(1, 1), None);
    }

    #[test]
    fn should_skip_date_with_missing_precipitation() {
        let swe = series(&[(day(1), 10.0), (day(2), 7.0), (day(3), 6.0)]);
        let precipitation = series(&[(day(2), 3.0)]);

        let fluxes = compute_series(DateRange(day(2), day(3)), &swe, &precipitation).unwrap();

        assert_eq!(fluxes.len(), 2);
        assert!(matches!(fluxes[0], DailyFlux::Computed { .. }));
        assert_eq!(
            fluxes[1],
            DailyFlux::Skipped {
                date: day(3),
                missing: vec![Input::Precipitation]
            }
        );
    }

    #[test]
    fn should_need_previous_day_swe_for_single_day() {
        let swe = series(&[(day(2), 7.0)]);
        let precipitation = series(&[(day(2), 3.0)]);

        let fluxes = compute_series(DateRange(day(2), day(2)), &swe, &precipitation).unwrap();

        assert_eq!(
            fluxes,
            vec![DailyFlux::Skipped {
                date: day(2),
                missing: vec![Input::PreviousSwe]
            }]
        );
    }

    #[test]
    fn should_fail_on_misaligned_inputs() {
        let mut shifted = grid();
        shifted.north += 0.05;

        let err = compute_flux(
            &Raster::filled(grid(), 1.0),
            &Raster::filled(grid(), 1.0),
            &Raster::filled(shifted, 1.0),
        )
        .unwrap_err();

        assert!(matches!(err, LwfError::GridMismatch { .. }));
    }

    #[test]
    fn should_convert_to_metres_per_second() {
        assert!((mm_per_day_to_m_per_s(86.4) - 1e-6).abs() < 1e-12);
        assert_eq!(mm_per_day_to_m_per_s(0.0), 0.0);
    }
}
