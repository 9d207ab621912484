//! Regular lat/lon grids and the rasters laid on them.

pub mod ascii_grid;
pub mod resample;

use std::fmt;

use crate::error::{LwfError, Result};

pub use resample::resample_bilinear;

/// Georeferencing tolerance in degrees.
const TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
/// A regular lat/lon grid. Row 0 is the northernmost row.
pub struct Grid {
    pub ncols: usize,
    pub nrows: usize,
    /// Longitude of the left edge of column 0
    pub west: f64,
    /// Latitude of the top edge of row 0
    pub north: f64,
    pub dx: f64,
    pub dy: f64,
}

impl Grid {
    pub fn len(&self) -> usize {
        self.ncols * self.nrows
    }

    pub fn east(&self) -> f64 {
        self.west + self.ncols as f64 * self.dx
    }

    pub fn south(&self) -> f64 {
        self.north - self.nrows as f64 * self.dy
    }

    /// Longitude of the centre of `col`.
    pub fn lon(&self, col: usize) -> f64 {
        self.west + (col as f64 + 0.5) * self.dx
    }

    /// Latitude of the centre of `row`.
    pub fn lat(&self, row: usize) -> f64 {
        self.north - (row as f64 + 0.5) * self.dy
    }

    /// Same dimensions and georeferencing.
    pub fn aligned_with(&self, other: &Grid) -> bool {
        self.ncols == other.ncols
            && self.nrows == other.nrows
            && (self.west - other.west).abs() < TOLERANCE
            && (self.north - other.north).abs() < TOLERANCE
            && (self.dx - other.dx).abs() < TOLERANCE
            && (self.dy - other.dy).abs() < TOLERANCE
    }

    /// Returns the cell containing the point, if any.
    pub fn cell_at(&self, lon: f64, lat: f64) -> Option<(usize, usize)> {
        let col = ((lon - self.west) / self.dx).floor();
        let row = ((self.north - lat) / self.dy).floor();

        if col < 0.0 || row < 0.0 || col >= self.ncols as f64 || row >= self.nrows as f64 {
            return None;
        }

        Some((row as usize, col as usize))
    }

    /// Rows and columns whose cell centres fall inside `bbox`, edges inclusive.
    pub fn window(&self, bbox: &BoundingBox) -> Result<Window> {
        let first_col = ((bbox.west - self.west) / self.dx - 0.5 - TOLERANCE).ceil().max(0.0);
        let last_col = ((bbox.east - self.west) / self.dx - 0.5 + TOLERANCE)
            .floor()
            .min(self.ncols as f64 - 1.0);
        let first_row = ((self.north - bbox.north) / self.dy - 0.5 - TOLERANCE).ceil().max(0.0);
        let last_row = ((self.north - bbox.south) / self.dy - 0.5 + TOLERANCE)
            .floor()
            .min(self.nrows as f64 - 1.0);

        if first_col > last_col || first_row > last_row {
            return Err(LwfError::InvalidBoundingBox(format!(
                "{} does not overlap grid {}",
                bbox, self
            )));
        }

        Ok(Window {
            row0: first_row as usize,
            col0: first_col as usize,
            nrows: (last_row - first_row) as usize + 1,
            ncols: (last_col - first_col) as usize + 1,
        })
    }

    /// The grid covering `window`.
    pub fn sub_grid(&self, window: &Window) -> Grid {
        Grid {
            ncols: window.ncols,
            nrows: window.nrows,
            west: self.west + window.col0 as f64 * self.dx,
            north: self.north - window.row0 as f64 * self.dy,
            dx: self.dx,
            dy: self.dy,
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} cells from ({:.6}, {:.6}) step ({:.6}, {:.6})",
            self.ncols, self.nrows, self.west, self.north, self.dx, self.dy
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A rectangular block of cells within a grid.
pub struct Window {
    pub row0: usize,
    pub col0: usize,
    pub nrows: usize,
    pub ncols: usize,
}

impl Window {
    pub fn contains_row(&self, row: usize) -> bool {
        row >= self.row0 && row < self.row0 + self.nrows
    }

    /// Grows the window by `cells` on every side, clamped to `grid`.
    pub fn padded(&self, cells: usize, grid: &Grid) -> Window {
        let row0 = self.row0.saturating_sub(cells);
        let col0 = self.col0.saturating_sub(cells);
        let row_end = (self.row0 + self.nrows + cells).min(grid.nrows);
        let col_end = (self.col0 + self.ncols + cells).min(grid.ncols);

        Window {
            row0,
            col0,
            nrows: row_end - row0,
            ncols: col_end - col0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Area of interest in degrees.
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        if !(west < east && south < north) {
            return Err(LwfError::InvalidBoundingBox(format!(
                "expected WEST < EAST and SOUTH < NORTH, got {},{},{},{}",
                west, south, east, north
            )));
        }

        Ok(BoundingBox {
            west,
            south,
            east,
            north,
        })
    }
}

impl Default for BoundingBox {
    /// Alberta, Saskatchewan and British Columbia.
    fn default() -> Self {
        BoundingBox {
            west: -129.0,
            south: 46.0,
            east: -101.0,
            north: 63.5,
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

impl std::str::FromStr for BoundingBox {
    type Err = LwfError;

    /// Parses `WEST,SOUTH,EAST,NORTH`.
    fn from_str(s: &str) -> Result<Self> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| LwfError::InvalidBoundingBox(format!("`{}`: {}", s, e)))?;

        match parts.as_slice() {
            [west, south, east, north] => BoundingBox::new(*west, *south, *east, *north),
            _ => Err(LwfError::InvalidBoundingBox(format!(
                "`{}`: expected four comma-separated values",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Cell values on a grid, row-major. No-data cells hold `NaN`.
pub struct Raster {
    pub grid: Grid,
    pub data: Vec<f32>,
}

impl Raster {
    pub fn new(grid: Grid, data: Vec<f32>) -> Result<Self> {
        if data.len() != grid.len() {
            return Err(LwfError::GridMismatch {
                expected: format!("{} cells", grid.len()),
                found: format!("{} cells", data.len()),
            });
        }

        Ok(Raster { grid, data })
    }

    #[cfg(test)]
    pub fn filled(grid: Grid, value: f32) -> Self {
        Raster {
            grid,
            data: vec![value; grid.len()],
        }
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.grid.ncols + col]
    }

    /// Value as an option, `None` for no-data.
    pub fn value(&self, row: usize, col: usize) -> Option<f32> {
        let v = self.get(row, col);
        (!v.is_nan()).then_some(v)
    }

    pub fn crop(&self, bbox: &BoundingBox) -> Result<Raster> {
        let window = self.grid.window(bbox)?;
        let grid = self.grid.sub_grid(&window);
        let mut data = Vec::with_capacity(grid.len());

        for row in window.row0..window.row0 + window.nrows {
            let start = row * self.grid.ncols + window.col0;
            data.extend_from_slice(&self.data[start..start + window.ncols]);
        }

        Ok(Raster { grid, data })
    }

    pub fn ensure_aligned(&self, other: &Raster) -> Result<()> {
        if self.grid.aligned_with(&other.grid) {
            Ok(())
        } else {
            Err(LwfError::GridMismatch {
                expected: self.grid.to_string(),
                found: other.grid.to_string(),
            })
        }
    }

    pub fn count_valid(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }
}

// -- Tests -------------------------------------------------------------------
