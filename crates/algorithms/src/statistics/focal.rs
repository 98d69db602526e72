//! Focal (moving window) statistics
//!
//! Computes statistics within a moving window centered on each cell, and
//! weighted focal sums through an arbitrary kernel. Border cells use
//! whatever valid neighbors fall inside the window; NaN cells never
//! contribute.

use ndarray::Array2;
use rayon::prelude::*;
use seamorph_core::raster::{Kernel, Neighborhood, Raster};
use seamorph_core::{Error, Result};

/// Available focal statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FocalStatistic {
    /// Arithmetic mean
    Mean,
    /// Standard deviation (population)
    StdDev,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Sum of values
    Sum,
    /// Count of valid (non-NaN) values
    Count,
}

/// Parameters for focal statistics
#[derive(Debug, Clone)]
pub struct FocalParams {
    /// Window shape
    pub neighborhood: Neighborhood,
    /// Statistic to compute
    pub statistic: FocalStatistic,
}

impl Default for FocalParams {
    fn default() -> Self {
        Self {
            neighborhood: Neighborhood::Square(1),
            statistic: FocalStatistic::Mean,
        }
    }
}

/// Compute focal statistics on a raster
///
/// # Arguments
/// * `raster` - Input raster
/// * `params` - Window shape and statistic
///
/// # Returns
/// Raster with the computed statistic at each cell; NaN where the window
/// holds no valid value
pub fn focal_statistics(raster: &Raster<f64>, params: FocalParams) -> Result<Raster<f64>> {
    if params.neighborhood.radius() == 0 {
        return Err(Error::InvalidParameter {
            name: "neighborhood",
            value: "radius 0".into(),
            reason: "focal radius must be > 0".into(),
        });
    }

    let (rows, cols) = raster.shape();
    let offsets = params.neighborhood.offsets();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let mut acc = StatAccumulator::new();

                for &(dr, dc) in &offsets {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;

                    if nr >= 0 && nc >= 0 && (nr as usize) < rows && (nc as usize) < cols {
                        let v = unsafe { raster.get_unchecked(nr as usize, nc as usize) };
                        if !v.is_nan() {
                            acc.push(v);
                        }
                    }
                }

                *out = acc.finish(params.statistic);
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

/// Weighted focal sum through an arbitrary kernel.
///
/// For each cell, sums `weight * value` over the kernel's non-zero
/// entries. NaN neighbors are skipped; the center cell participates only
/// if the kernel weights it. A cell whose kernel covers no valid neighbor
/// stays NaN.
pub fn focal_sum_weighted(raster: &Raster<f64>, kernel: &Kernel) -> Result<Raster<f64>> {
    let (rows, cols) = raster.shape();
    let entries = kernel.offsets_weights();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let mut sum = 0.0;
                let mut any = false;

                for &(dr, dc, w) in &entries {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;

                    if nr >= 0 && nc >= 0 && (nr as usize) < rows && (nc as usize) < cols {
                        let v = unsafe { raster.get_unchecked(nr as usize, nc as usize) };
                        if !v.is_nan() {
                            sum += w * v;
                            any = true;
                        }
                    }
                }

                if any {
                    *out = sum;
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

/// Streaming accumulator so one window pass serves every statistic
struct StatAccumulator {
    sum: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
    count: usize,
}

impl StatAccumulator {
    fn new() -> Self {
        Self {
            sum: 0.0,
            sum_sq: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            count: 0,
        }
    }

    fn push(&mut self, v: f64) {
        self.sum += v;
        self.sum_sq += v * v;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        self.count += 1;
    }

    fn finish(&self, stat: FocalStatistic) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        let n = self.count as f64;

        match stat {
            FocalStatistic::Mean => self.sum / n,
            FocalStatistic::StdDev => {
                let mean = self.sum / n;
                (self.sum_sq / n - mean * mean).max(0.0).sqrt()
            }
            FocalStatistic::Min => self.min,
            FocalStatistic::Max => self.max,
            FocalStatistic::Sum => self.sum,
            FocalStatistic::Count => n,
        }
    }
}
