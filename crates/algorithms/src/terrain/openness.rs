//! Terrain openness (Yokoyama et al. 2002) via directional scanning
//!
//! Positive openness summarizes how exposed a cell is: the mean over 8
//! compass octants of `90° - max elevation angle` seen along the octant.
//! Negative openness is the complementary down-looking measure,
//! `90° + min elevation angle`. Flat open seabed scores ≈ 90° in both;
//! mounds score > 90° positive, depressions > 90° negative.
//!
//! The scan window is a disk of `radius` cells sampled along the 8
//! principal directions; diagonal rays are truncated to `round(r / √2)` so
//! sampled distances stay inside the disk. The grid is padded with NaN on
//! every side before scanning, so border cells are computed from whatever
//! valid neighbors fall inside the window instead of being left blank.
//! Grids larger than `tile_size` in either dimension are scanned tile by
//! tile with a radius-sized halo and mosaicked back, bounding peak memory.

use log::debug;
use ndarray::Array2;
use rayon::prelude::*;
use seamorph_core::raster::Raster;
use seamorph_core::{Error, Result};

/// Which extremal elevation angle a scan keeps per octant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Maximum elevation angle (positive openness)
    MaxAngle,
    /// Minimum elevation angle (negative openness)
    MinAngle,
}

/// Parameters for openness computation
#[derive(Debug, Clone)]
pub struct OpennessParams {
    /// Search radius in cells
    pub radius: usize,
    /// Tile edge length; grids exceeding this in either dimension are
    /// scanned in tiles
    pub tile_size: usize,
}

impl Default for OpennessParams {
    fn default() -> Self {
        Self {
            radius: 10,
            tile_size: 5000,
        }
    }
}

/// Compute positive terrain openness.
///
/// For each cell, the mean over the 8 octants of `90° - max elevation
/// angle` along the octant ray.
pub fn positive_openness(dem: &Raster<f64>, params: OpennessParams) -> Result<Raster<f64>> {
    scan(dem, &params, ScanMode::MaxAngle)
}

/// Compute negative terrain openness.
///
/// For each cell, the mean over the 8 octants of `90° + min elevation
/// angle` along the octant ray.
pub fn negative_openness(dem: &Raster<f64>, params: OpennessParams) -> Result<Raster<f64>> {
    scan(dem, &params, ScanMode::MinAngle)
}

/// Directional scan entry point: validates, then dispatches to the
/// single-pass or tiled implementation.
pub fn scan(dem: &Raster<f64>, params: &OpennessParams, mode: ScanMode) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();

    if params.radius == 0 {
        return Err(Error::InvalidParameter {
            name: "radius",
            value: "0".into(),
            reason: "scan radius must be > 0".into(),
        });
    }
    if params.radius > rows.min(cols) {
        return Err(Error::InvalidParameter {
            name: "radius",
            value: params.radius.to_string(),
            reason: format!("exceeds the grid's smaller dimension ({})", rows.min(cols)),
        });
    }
    if let Some(crs) = dem.crs() {
        if crs.is_geographic() {
            return Err(Error::GeographicCrs(crs.identifier()));
        }
    }

    if rows > params.tile_size || cols > params.tile_size {
        scan_tiled(dem, params, mode)
    } else {
        scan_untiled(dem, params.radius, mode)
    }
}

/// Integer shifts of one octant ray, with the per-cell distance factor
type OctantRay = Vec<(isize, isize, f64)>;

/// Build the 8 octant rays for a radius, clockwise from north.
///
/// Every shift in the window belongs to exactly one ray; cardinal rays
/// run to `radius`, diagonal rays to `round(radius / √2)`.
fn octant_rays(radius: usize) -> Vec<OctantRay> {
    let r = radius as isize;
    let rd = (radius as f64 / std::f64::consts::SQRT_2).round() as isize;

    let ray = |steps: isize, dr_unit: isize, dc_unit: isize| -> OctantRay {
        (1..=steps)
            .map(|k| {
                let dr = k * dr_unit;
                let dc = k * dc_unit;
                (dr, dc, ((dr * dr + dc * dc) as f64).sqrt())
            })
            .collect()
    };

    vec![
        ray(r, -1, 0),  // N
        ray(rd, -1, 1), // NE
        ray(r, 0, 1),   // E
        ray(rd, 1, 1),  // SE
        ray(r, 1, 0),   // S
        ray(rd, 1, -1), // SW
        ray(r, 0, -1),  // W
        ray(rd, -1, -1), // NW
    ]
}

/// Scan the whole grid in one pass.
fn scan_untiled(dem: &Raster<f64>, radius: usize, mode: ScanMode) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    let r = radius;
    let cell_size = dem.cell_size();

    // NaN padding lets the window run off every border without bounds
    // checks, and gives border cells their partial windows.
    let mut padded = Array2::from_elem((rows + 2 * r, cols + 2 * r), f64::NAN);
    for row in 0..rows {
        for col in 0..cols {
            let v = unsafe { dem.get_unchecked(row, col) };
            if !dem.is_nodata(v) {
                padded[(row + r, col + r)] = v;
            }
        }
    }

    let rays: Vec<OctantRay> = octant_rays(radius)
        .into_iter()
        .map(|ray| {
            ray.into_iter()
                .map(|(dr, dc, d)| (dr, dc, d * cell_size))
                .collect()
        })
        .collect();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let z0 = padded[(row + r, col + r)];
                if z0.is_nan() {
                    continue;
                }

                let mut angle_sum = 0.0;
                let mut octant_count = 0u32;

                for ray in &rays {
                    // Reduce over the slope ratio; atan is monotonic so the
                    // extremal ratio gives the extremal angle.
                    let mut best: Option<f64> = None;

                    for &(dr, dc, dist) in ray {
                        let pr = (row + r) as isize + dr;
                        let pc = (col + r) as isize + dc;
                        let z = padded[(pr as usize, pc as usize)];
                        if z.is_nan() {
                            continue;
                        }

                        let ratio = (z - z0) / dist;
                        best = Some(match (best, mode) {
                            (None, _) => ratio,
                            (Some(b), ScanMode::MaxAngle) => b.max(ratio),
                            (Some(b), ScanMode::MinAngle) => b.min(ratio),
                        });
                    }

                    if let Some(ratio) = best {
                        let angle = ratio.atan().to_degrees();
                        angle_sum += match mode {
                            ScanMode::MaxAngle => 90.0 - angle,
                            ScanMode::MinAngle => 90.0 + angle,
                        };
                        octant_count += 1;
                    }
                }

                if octant_count > 0 {
                    *out = angle_sum / octant_count as f64;
                }
            }

            row_data
        })
        .collect();

    let mut output = dem.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

/// Scan a large grid tile by tile and mosaic the interiors back.
///
/// Each tile carries a radius-sized halo so its interior cells see the
/// same window as in a single-pass scan; interiors are disjoint and the
/// mosaic keeps the first value written to a cell.
fn scan_tiled(dem: &Raster<f64>, params: &OpennessParams, mode: ScanMode) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    let ts = params.tile_size;
    let r = params.radius;

    let mut output = dem.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    output.data_mut().fill(f64::NAN);

    let mut tiles = Vec::new();
    for tile_row in (0..rows).step_by(ts) {
        for tile_col in (0..cols).step_by(ts) {
            tiles.push((tile_row, tile_col));
        }
    }
    debug!(
        "openness: scanning {}x{} grid in {} tiles of {} (halo {})",
        rows,
        cols,
        tiles.len(),
        ts,
        r
    );

    // Tiles are independent: scan them in parallel, then mosaic the
    // disjoint interiors back sequentially
    let scanned_tiles: Vec<(usize, usize, usize, usize, Raster<f64>)> = tiles
        .into_par_iter()
        .map(|(tile_row, tile_col)| {
            let row_end = (tile_row + ts).min(rows);
            let col_end = (tile_col + ts).min(cols);

            let halo_row = tile_row.saturating_sub(r);
            let halo_col = tile_col.saturating_sub(r);
            let halo_row_end = (row_end + r).min(rows);
            let halo_col_end = (col_end + r).min(cols);

            let tile = dem.window(
                halo_row,
                halo_col,
                halo_row_end - halo_row,
                halo_col_end - halo_col,
            )?;
            let scanned = scan_untiled(&tile, r, mode)?;
            Ok((tile_row, tile_col, halo_row, halo_col, scanned))
        })
        .collect::<Result<_>>()?;

    for (tile_row, tile_col, halo_row, halo_col, scanned) in scanned_tiles {
        let row_end = (tile_row + ts).min(rows);
        let col_end = (tile_col + ts).min(cols);

        for row in tile_row..row_end {
            for col in tile_col..col_end {
                let v = unsafe { scanned.get_unchecked(row - halo_row, col - halo_col) };
                // First tile wins on any mosaic overlap
                if unsafe { output.get_unchecked(row, col) }.is_nan() {
                    unsafe { output.set_unchecked(row, col, v) };
                }
            }
        }
    }

    Ok(output)
}
