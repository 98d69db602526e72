//! Local spatial autocorrelation (Local Moran's I)
//!
//! Highlights clusters of similar elevation relative to neighbors:
//! positive values mark cells inside high-high or low-low clusters,
//! negative values mark spatial outliers. Used to refine candidate
//! regions detected from TPI surfaces.

use crate::statistics::focal::focal_sum_weighted;
use ndarray::Array2;
use rayon::prelude::*;
use seamorph_core::raster::{Kernel, Raster};
use seamorph_core::{Error, Result};

/// Parameters for Local Moran's I
#[derive(Debug, Clone)]
pub struct LocalMoransParams {
    /// Neighborhood weight kernel (any shape, not necessarily circular)
    pub kernel: Kernel,
}

impl Default for LocalMoransParams {
    fn default() -> Self {
        Self {
            kernel: Kernel::queen(),
        }
    }
}

/// Compute Local Moran's I for each cell.
///
/// With global mean µ and population standard deviation σ:
///
/// ```text
/// I_i = ((x_i − µ) / σ²) · Σ_j w_ij (x_j − µ)
/// ```
///
/// where the weighted sum runs over the kernel's non-zero entries.
///
/// A degenerate input (fewer than 3 valid cells, or σ = 0) yields an
/// all-NaN raster: downstream thresholding then finds no cells, which is
/// the required behavior for statistically empty surfaces.
pub fn local_morans_i(raster: &Raster<f64>, params: LocalMoransParams) -> Result<Raster<f64>> {
    let (rows, cols) = raster.shape();
    let stats = raster.statistics();

    let degenerate = stats.valid_count < 3
        || stats.std_dev.map_or(true, |s| s.abs() < f64::EPSILON);
    if degenerate {
        let mut output = raster.with_same_meta::<f64>(rows, cols);
        output.set_nodata(Some(f64::NAN));
        *output.data_mut() = Array2::from_elem((rows, cols), f64::NAN);
        return Ok(output);
    }

    let mean = stats.mean.unwrap();
    let variance = stats.std_dev.unwrap().powi(2);

    // Deviation grid feeds both factors of the statistic
    let deviations_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let v = unsafe { raster.get_unchecked(row, col) };
                if !v.is_nan() {
                    *out = v - mean;
                }
            }
            row_data
        })
        .collect();

    let mut deviations = raster.with_same_meta::<f64>(rows, cols);
    deviations.set_nodata(Some(f64::NAN));
    *deviations.data_mut() = Array2::from_shape_vec((rows, cols), deviations_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    let lag = focal_sum_weighted(&deviations, &params.kernel)?;

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let dev = unsafe { deviations.get_unchecked(row, col) };
                let l = unsafe { lag.get_unchecked(row, col) };
                if !dev.is_nan() && !l.is_nan() {
                    *out = dev / variance * l;
                }
            }
            row_data
        })
        .collect();

    let mut output = raster.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use seamorph_core::GeoTransform;

    fn georef(mut r: Raster<f64>) -> Raster<f64> {
        let rows = r.rows();
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    #[test]
    fn test_lmi_uniform_is_nan() {
        // σ = 0: statistically empty surface
        let r = georef(Raster::filled(10, 10, 5.0));
        let result = local_morans_i(&r, LocalMoransParams::default()).unwrap();
        assert!(result.get(5, 5).unwrap().is_nan());
    }

    #[test]
    fn test_lmi_clustered_positive() {
        // Left half 0, right half 100: interiors of both halves are
        // high-high / low-low clusters
        let mut r = georef(Raster::new(10, 10));
        for row in 0..10 {
            for col in 0..10 {
                r.set(row, col, if col < 5 { 0.0 } else { 100.0 }).unwrap();
            }
        }

        let result = local_morans_i(&r, LocalMoransParams::default()).unwrap();
        assert!(result.get(5, 2).unwrap() > 0.0, "low-low cluster should be positive");
        assert!(result.get(5, 8).unwrap() > 0.0, "high-high cluster should be positive");
    }

    #[test]
    fn test_lmi_outlier_negative() {
        // Single spike in a flat-but-noisy field is a spatial outlier
        let mut r = georef(Raster::new(9, 9));
        for row in 0..9 {
            for col in 0..9 {
                // small checker perturbation keeps sigma > 0
                r.set(row, col, if (row + col) % 2 == 0 { 1.0 } else { -1.0 })
                    .unwrap();
            }
        }
        r.set(4, 4, 50.0).unwrap();

        let result = local_morans_i(&r, LocalMoransParams::default()).unwrap();
        assert!(
            result.get(4, 4).unwrap() < 0.0,
            "isolated spike should be a negative outlier"
        );
    }

    #[test]
    fn test_lmi_nan_propagation() {
        let mut r = georef(Raster::new(10, 10));
        for row in 0..10 {
            for col in 0..10 {
                r.set(row, col, (row * 10 + col) as f64).unwrap();
            }
        }
        r.set(3, 3, f64::NAN).unwrap();

        let result = local_morans_i(&r, LocalMoransParams::default()).unwrap();
        assert!(result.get(3, 3).unwrap().is_nan());
        // Neighbors of the hole still get values
        assert!(!result.get(3, 4).unwrap().is_nan());
    }
}
