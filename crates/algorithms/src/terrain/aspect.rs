//! Aspect calculation from DEMs
//!
//! Direction of the steepest descent using the Horn (1981) method.
//! Feeds the convergence index, which needs the aspect of every
//! neighborhood cell.

use ndarray::Array2;
use rayon::prelude::*;
use seamorph_core::raster::Raster;
use seamorph_core::{Algorithm, Error, Result};
use std::f64::consts::PI;

/// Aspect algorithm
#[derive(Debug, Clone, Default)]
pub struct Aspect;

/// Parameters for aspect (none; kept for the Algorithm trait)
#[derive(Debug, Clone, Copy, Default)]
pub struct AspectParams;

impl Algorithm for Aspect {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = AspectParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Aspect"
    }

    fn description(&self) -> &'static str {
        "Calculate aspect (direction of steepest descent) from a DEM"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        aspect(&input)
    }
}

/// Calculate aspect from a DEM, in degrees clockwise from north.
///
/// - 0° (or 360°) = North, 90° = East, 180° = South, 270° = West
///
/// Flat cells, edge cells and cells with a NaN neighbor are NaN: a flat
/// cell has no meaningful flow direction and must not bias the
/// convergence average.
pub fn aspect(dem: &Raster<f64>) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();

    const FLAT_THRESHOLD: f64 = 1e-10;

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for col in 0..cols {
                let e = unsafe { dem.get_unchecked(row, col) };
                if e.is_nan() {
                    continue;
                }
                if row == 0 || row == rows - 1 || col == 0 || col == cols - 1 {
                    continue;
                }

                let a = unsafe { dem.get_unchecked(row - 1, col - 1) };
                let b = unsafe { dem.get_unchecked(row - 1, col) };
                let c = unsafe { dem.get_unchecked(row - 1, col + 1) };
                let d = unsafe { dem.get_unchecked(row, col - 1) };
                let f = unsafe { dem.get_unchecked(row, col + 1) };
                let g = unsafe { dem.get_unchecked(row + 1, col - 1) };
                let h = unsafe { dem.get_unchecked(row + 1, col) };
                let i = unsafe { dem.get_unchecked(row + 1, col + 1) };

                if [a, b, c, d, f, g, h, i].iter().any(|v| v.is_nan()) {
                    continue;
                }

                // Horn's method for gradients
                let dz_dx = (c + 2.0 * f + i) - (a + 2.0 * d + g);
                let dz_dy = (g + 2.0 * h + i) - (a + 2.0 * b + c);

                if dz_dx.abs() < FLAT_THRESHOLD && dz_dy.abs() < FLAT_THRESHOLD {
                    continue;
                }

                // Descent direction in (east, north) space; pixel Y opposes
                // geographic Y, so dz_dy enters without negation.
                let bearing = (-dz_dx).atan2(dz_dy);
                let bearing = if bearing < 0.0 { bearing + 2.0 * PI } else { bearing };

                row_data[col] = bearing.to_degrees();
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
