//! ESRI ASCII grid reader.
//!
//! ```text
//! ncols        4
//! nrows        3
//! xllcorner    -110.0
//! yllcorner    49.0
//! cellsize     1.0
//! NODATA_value -9999
//! 0 1 2 3
//! ...
//! ```
//!
//! `xllcenter`/`yllcenter` are accepted in place of the corner keys. Rows run
//! from north to south.

use std::io::BufRead;

use super::{Grid, Raster};
use crate::error::{LwfError, Result};

#[derive(Debug, Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<f64>,
    yll: Option<f64>,
    centred: bool,
    cellsize: Option<f64>,
    nodata: Option<f32>,
}

impl Header {
    /// Applies a `key value` line. Returns false when the line is not a
    /// header line.
    fn apply(&mut self, line: &str) -> Result<bool> {
        let mut parts = line.split_whitespace();
        let (key, value) = match (parts.next(), parts.next()) {
            (Some(key), Some(value)) => (key.to_lowercase(), value),
            _ => return Ok(false),
        };

        match key.as_str() {
            "ncols" => self.ncols = Some(parse_header_value(&key, value)?),
            "nrows" => self.nrows = Some(parse_header_value(&key, value)?),
            "xllcorner" => self.xll = Some(parse_header_value(&key, value)?),
            "yllcorner" => self.yll = Some(parse_header_value(&key, value)?),
            "xllcenter" => {
                self.xll = Some(parse_header_value(&key, value)?);
                self.centred = true;
            }
            "yllcenter" => {
                self.yll = Some(parse_header_value(&key, value)?);
                self.centred = true;
            }
            "cellsize" => self.cellsize = Some(parse_header_value(&key, value)?),
            "nodata_value" => self.nodata = Some(parse_header_value(&key, value)?),
            _ => return Ok(false),
        }

        Ok(true)
    }

    fn grid(&self) -> Result<Grid> {
        let missing = |key: &str| LwfError::GridParse(format!("missing `{}` in header", key));

        let ncols = self.ncols.ok_or_else(|| missing("ncols"))?;
        let nrows = self.nrows.ok_or_else(|| missing("nrows"))?;
        let xll = self.xll.ok_or_else(|| missing("xllcorner"))?;
        let yll = self.yll.ok_or_else(|| missing("yllcorner"))?;
        let cellsize = self.cellsize.ok_or_else(|| missing("cellsize"))?;

        if ncols == 0 || nrows == 0 || cellsize <= 0.0 {
            return Err(LwfError::GridParse(format!(
                "degenerate grid {}x{} with cellsize {}",
                ncols, nrows, cellsize
            )));
        }

        let offset = if self.centred { cellsize / 2.0 } else { 0.0 };

        Ok(Grid {
            ncols,
            nrows,
            west: xll - offset,
            north: yll - offset + nrows as f64 * cellsize,
            dx: cellsize,
            dy: cellsize,
        })
    }
}

fn parse_header_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| LwfError::GridParse(format!("invalid value `{}` for `{}`", value, key)))
}

/// Reads an ASCII grid. No-data cells become `NaN`.
pub fn read_ascii_grid<R: BufRead>(reader: R) -> Result<Raster> {
    let mut header = Header::default();
    let mut data: Vec<f32> = Vec::new();
    let mut in_header = true;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        if in_header {
            if header.apply(&line)? {
                continue;
            }
            in_header = false;
            let grid = header.grid()?;
            data.reserve(grid.len());
        }

        for token in line.split_whitespace() {
            let value: f32 = token
                .parse()
                .map_err(|_| LwfError::GridParse(format!("invalid cell value `{}`", token)))?;
            match header.nodata {
                Some(nodata) if value == nodata => data.push(f32::NAN),
                _ => data.push(value),
            }
        }
    }

    let grid = header.grid()?;
    if data.len() != grid.len() {
        return Err(LwfError::GridParse(format!(
            "expected {} cells, found {}",
            grid.len(),
            data.len()
        )));
    }

    Raster::new(grid, data)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const GRID: &str = "ncols 3
nrows 2
xllcorner -110.0
yllcorner 50.0
cellsize 0.5
NODATA_value -9999
1.0 2.5 -9999
0 0.25 3
";

    #[test]
    fn should_read_grid() {
        let raster = read_ascii_grid(Cursor::new(GRID)).unwrap();

        assert_eq!(raster.grid.ncols, 3);
        assert_eq!(raster.grid.nrows, 2);
        assert_eq!(raster.grid.west, -110.0);
        assert_eq!(raster.grid.north, 51.0);
        assert_eq!(raster.grid.dx, 0.5);
        assert_eq!(raster.value(0, 1), Some(2.5));
        assert_eq!(raster.value(0, 2), None);
        assert_eq!(raster.value(1, 2), Some(3.0));
    }

    #[test]
    fn should_read_centred_header() {
        let text = "NCOLS 2\nNROWS 1\nXLLCENTER -109.75\nYLLCENTER 50.25\nCELLSIZE 0.5\n4 5\n";
        let raster = read_ascii_grid(Cursor::new(text)).unwrap();

        assert_eq!(raster.grid.west, -110.0);
        assert_eq!(raster.grid.north, 50.5);
        assert_eq!(raster.data, vec![4.0, 5.0]);
    }

    #[test]
    fn should_reject_short_grid() {
        let text = "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2 3\n";
        let err = read_ascii_grid(Cursor::new(text)).unwrap_err();

        assert!(matches!(err, LwfError::GridParse(_)));
    }

    #[test]
    fn should_reject_missing_header_key() {
        let text = "ncols 2\nnrows 1\nxllcorner 0\ncellsize 1\n1 2\n";
        let err = read_ascii_grid(Cursor::new(text)).unwrap_err();

        assert!(err.to_string().contains("yllcorner"));
    }
}
