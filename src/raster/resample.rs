//! Resampling a raster onto another grid.

use super::{Grid, Raster};

/// Bilinear interpolation of `source` at every cell centre of `target`.
///
/// Weights are renormalised over the neighbours that hold data, so a target
/// cell next to a no-data source cell still gets a value. Target cells whose
/// centre lies outside the source grid are no-data.
pub fn resample_bilinear(source: &Raster, target: &Grid) -> Raster {
    if source.grid.aligned_with(target) {
        return source.clone();
    }

    let src = &source.grid;
    let mut data = Vec::with_capacity(target.len());

    for row in 0..target.nrows {
        let lat = target.lat(row);
        for col in 0..target.ncols {
            let lon = target.lon(col);
            data.push(sample(source, src, lon, lat));
        }
    }

    Raster {
        grid: *target,
        data,
    }
}

fn sample(source: &Raster, src: &Grid, lon: f64, lat: f64) -> f32 {
    if lon < src.west || lon > src.east() || lat > src.north || lat < src.south() {
        return f32::NAN;
    }

    // Fractional index relative to cell centres, clamped so the half cell
    // along each edge samples the edge centre.
    let fx = ((lon - src.west) / src.dx - 0.5).clamp(0.0, (src.ncols - 1) as f64);
    let fy = ((src.north - lat) / src.dy - 0.5).clamp(0.0, (src.nrows - 1) as f64);

    let c0 = fx.floor() as usize;
    let r0 = fy.floor() as usize;
    let c1 = (c0 + 1).min(src.ncols - 1);
    let r1 = (r0 + 1).min(src.nrows - 1);
    let tx = fx - c0 as f64;
    let ty = fy - r0 as f64;

    let neighbours = [
        (r0, c0, (1.0 - tx) * (1.0 - ty)),
        (r0, c1, tx * (1.0 - ty)),
        (r1, c0, (1.0 - tx) * ty),
        (r1, c1, tx * ty),
    ];

    let mut sum = 0.0;
    let mut weight = 0.0;
    for (r, c, w) in neighbours {
        let v = source.get(r, c);
        if w > 0.0 && !v.is_nan() {
            sum += w * v as f64;
            weight += w;
        }
    }

    if weight > 0.0 {
        (sum / weight) as f32
    } else {
        f32::NAN
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn fine_raster() -> Raster {
        // 4x4 cells of 0.5 degrees, value = col + 10 * row
        let grid = Grid {
            ncols: 4,
            nrows: 4,
            west: -110.0,
            north: 52.0,
            dx: 0.5,
            dy: 0.5,
        };
        let data = (0..4)
            .flat_map(|r| (0..4).map(move |c| (c + 10 * r) as f32))
            .collect();

        Raster::new(grid, data).unwrap()
    }

    #[test]
    fn should_return_source_when_grids_match() {
        let source = fine_raster();
        let resampled = resample_bilinear(&source, &source.grid);

        assert_eq!(resampled, source);
    }

    #[test]
    fn should_interpolate_between_centres() {
        let source = fine_raster();
        let target = Grid {
            ncols: 2,
            nrows: 2,
            west: -110.0,
            north: 52.0,
            dx: 1.0,
            dy: 1.0,
        };

        let resampled = resample_bilinear(&source, &target);

        // Target centre (-109.5, 51.5) sits midway between source cells
        // (0,0), (0,1), (1,0), (1,1).
        assert!((resampled.get(0, 0) - 5.5).abs() < 1e-5);
        assert!((resampled.get(1, 1) - 27.5).abs() < 1e-5);
    }

    #[test]
    fn should_renormalise_around_no_data() {
        let mut source = fine_raster();
        source.data[0] = f32::NAN;
        let target = Grid {
            ncols: 1,
            nrows: 1,
            west: -110.0,
            north: 52.0,
            dx: 1.0,
            dy: 1.0,
        };

        let resampled = resample_bilinear(&source, &target);

        // Mean of 1, 10, 11
        assert!((resampled.get(0, 0) - 22.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn should_mark_outside_cells_as_no_data() {
        let source = fine_raster();
        let target = Grid {
            ncols: 2,
            nrows: 1,
            west: -109.0,
            north: 51.0,
            dx: 1.0,
            dy: 1.0,
        };

        let resampled = resample_bilinear(&source, &target);

        assert!(!resampled.get(0, 0).is_nan());
        assert!(resampled.get(0, 1).is_nan());
    }
}
