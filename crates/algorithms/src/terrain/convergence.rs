//! Convergence Index
//!
//! Measures how much the aspect vectors of the surrounding cells point
//! toward (converge on) or away from (diverge from) each cell. Values
//! range from -90 (pure convergence: closed depressions) to +90 (pure
//! divergence: mounds), with 0 on planar slopes.
//!
//! Based on Köthe & Lehmeier (1996). The input is an aspect grid derived
//! from a sink-filled DEM; see [`crate::terrain::aspect`].

use ndarray::Array2;
use rayon::prelude::*;
use seamorph_core::raster::{CompassDirection, Kernel, Raster};
use seamorph_core::{Error, Result};

use crate::statistics::focal_sum_weighted;

/// Compute the Convergence Index from an aspect grid.
///
/// For each of the 8 compass directions a 3x3 kernel isolates the aspect
/// of that one neighbor. The deviation between the neighbor's aspect and
/// the bearing from that neighbor back toward the center is folded into
/// [0°, 180°]; the cell value is the mean deviation over all directions
/// with a valid aspect, minus 90. Cells with no valid neighbor aspect
/// (grid corners of a flat plane, isolated nodata cells) stay NaN.
pub fn convergence_index(aspect: &Raster<f64>) -> Result<Raster<f64>> {
    let (rows, cols) = aspect.shape();

    // Aspect of the neighbor in each direction, brought onto the center cell
    let mut shifted = Vec::with_capacity(8);
    for direction in CompassDirection::ALL {
        let grid = focal_sum_weighted(aspect, &Kernel::directional(direction))?;
        // Bearing from that neighbor back toward the center
        let back_bearing = (direction.bearing() + 180.0) % 360.0;
        shifted.push((grid, back_bearing));
    }

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let mut sum = 0.0;
                let mut count = 0u32;

                for (grid, back_bearing) in &shifted {
                    let neighbor_aspect = unsafe { grid.get_unchecked(row, col) };
                    if neighbor_aspect.is_nan() {
                        continue;
                    }

                    let mut deviation = (neighbor_aspect - back_bearing).abs();
                    if deviation > 180.0 {
                        deviation = 360.0 - deviation;
                    }

                    sum += deviation;
                    count += 1;
                }

                if count > 0 {
                    *out = sum / count as f64 - 90.0;
                }
            }

            row_data
        })
        .collect();

    let mut output = aspect.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
