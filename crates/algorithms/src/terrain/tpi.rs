//! Topographic Position Index (TPI)
//!
//! TPI is the difference between a cell's elevation and the mean elevation
//! of its circular neighborhood:
//!
//!   TPI = z_center - focal_mean(z, circle(radius))
//!
//! - Positive TPI → cell stands above its surroundings (bathymetric high)
//! - Negative TPI → cell sits below its surroundings (bathymetric low)
//!
//! Reference: Weiss (2001) "Topographic Position and Landforms Analysis"

use crate::statistics::{focal_statistics, FocalParams, FocalStatistic};
use ndarray::Array2;
use rayon::prelude::*;
use seamorph_core::raster::{Neighborhood, Raster};
use seamorph_core::{Algorithm, Error, Result};

/// Parameters for TPI calculation
#[derive(Debug, Clone)]
pub struct TpiParams {
    /// Neighborhood radius in cells (circular window)
    pub radius: usize,
}

impl Default for TpiParams {
    fn default() -> Self {
        Self { radius: 1 }
    }
}

/// TPI algorithm
#[derive(Debug, Clone, Default)]
pub struct Tpi;

impl Algorithm for Tpi {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = TpiParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "TPI"
    }

    fn description(&self) -> &'static str {
        "Topographic Position Index: elevation relative to circular neighborhood mean"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        tpi(&input, params)
    }
}

/// Calculate the Topographic Position Index.
///
/// The focal mean includes the center cell, so on a flat surface TPI is
/// exactly zero everywhere, borders included. Border cells use the partial
/// window that falls inside the grid; no further border handling is
/// applied.
pub fn tpi(dem: &Raster<f64>, params: TpiParams) -> Result<Raster<f64>> {
    let focal_mean = focal_statistics(
        dem,
        FocalParams {
            neighborhood: Neighborhood::Circle(params.radius),
            statistic: FocalStatistic::Mean,
        },
    )?;

    let (rows, cols) = dem.shape();
    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let center = unsafe { dem.get_unchecked(row, col) };
                let mean = unsafe { focal_mean.get_unchecked(row, col) };
                if !center.is_nan() && !mean.is_nan() {
                    *out = center - mean;
                }
            }
            row_data
        })
        .collect();

    let mut output = dem.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), output_data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use seamorph_core::GeoTransform;

    #[test]
    fn test_tpi_flat_surface() {
        let mut dem = Raster::filled(10, 10, 100.0);
        dem.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));

        let result = tpi(&dem, TpiParams::default()).unwrap();
        let val = result.get(5, 5).unwrap();
        assert!(val.abs() < 1e-10, "Expected TPI ~0 for flat surface, got {}", val);
        // No border band: corner is computed too
        assert!(result.get(0, 0).unwrap().abs() < 1e-10);
    }

    #[test]
    fn test_tpi_peak() {
        // Center peak: 100 surrounded by 50; circle r=1 window holds
        // center + 4 rook neighbors
        let mut dem = Raster::filled(5, 5, 50.0);
        dem.set_transform(GeoTransform::new(0.0, 5.0, 1.0, -1.0));
        dem.set(2, 2, 100.0).unwrap();

        let result = tpi(&dem, TpiParams { radius: 1 }).unwrap();
        let val = result.get(2, 2).unwrap();
        // mean = (100 + 4*50)/5 = 60, TPI = 40
        assert!((val - 40.0).abs() < 1e-10, "Expected TPI=40 for peak, got {}", val);
    }

    #[test]
    fn test_tpi_valley() {
        let mut dem = Raster::filled(5, 5, 50.0);
        dem.set_transform(GeoTransform::new(0.0, 5.0, 1.0, -1.0));
        dem.set(2, 2, 10.0).unwrap();

        let result = tpi(&dem, TpiParams { radius: 1 }).unwrap();
        let val = result.get(2, 2).unwrap();
        // mean = (10 + 4*50)/5 = 42, TPI = -32
        assert!((val - (-32.0)).abs() < 1e-10, "Expected TPI=-32 for valley, got {}", val);
    }

    #[test]
    fn test_tpi_nan_propagation() {
        let mut dem = Raster::filled(7, 7, 50.0);
        dem.set_transform(GeoTransform::new(0.0, 7.0, 1.0, -1.0));
        dem.set(3, 3, f64::NAN).unwrap();

        let result = tpi(&dem, TpiParams { radius: 2 }).unwrap();
        assert!(result.get(3, 3).unwrap().is_nan());
        // Neighbors of the hole are still computed from valid cells
        assert!(!result.get(3, 4).unwrap().is_nan());
    }
}
