//! Statistical thresholding of derivative rasters
//!
//! A derivative surface (TPI, openness, LMI) is reduced to a boolean mask
//! by the rule `value >= mean + c·σ` (high-seeking) or
//! `value <= mean − c·σ` (low-seeking), with mean and σ taken over all
//! valid cells of the surface.

use seamorph_core::raster::Raster;
use seamorph_core::{Error, Result};

/// Which side of the statistical threshold a mask keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdDirection {
    /// Keep cells >= mean + c·σ (bathymetric highs)
    Above,
    /// Keep cells <= mean − c·σ (bathymetric lows)
    Below,
}

/// A computed statistical threshold for one derivative raster
#[derive(Debug, Clone, Copy)]
pub struct Threshold {
    pub mean: f64,
    pub std_dev: f64,
    pub scale: f64,
    pub direction: ThresholdDirection,
}

impl Threshold {
    /// Compute the threshold statistics of a derivative raster.
    ///
    /// A raster with no valid cells produces NaN statistics; the resulting
    /// mask is empty rather than an error.
    pub fn compute(raster: &Raster<f64>, scale: f64, direction: ThresholdDirection) -> Self {
        let stats = raster.statistics();
        Self {
            mean: stats.mean.unwrap_or(f64::NAN),
            std_dev: stats.std_dev.unwrap_or(f64::NAN),
            scale,
            direction,
        }
    }

    /// The cut value `mean ± scale·σ`
    pub fn value(&self) -> f64 {
        match self.direction {
            ThresholdDirection::Above => self.mean + self.scale * self.std_dev,
            ThresholdDirection::Below => self.mean - self.scale * self.std_dev,
        }
    }

    /// Apply the threshold, producing a mask raster (1 = selected).
    ///
    /// NaN cells never satisfy the predicate. Degenerate statistics — no
    /// valid cells, or σ = 0 on a constant surface — mean no cell is a
    /// statistical anomaly, so the mask is empty rather than an error.
    pub fn mask(&self, raster: &Raster<f64>) -> Raster<u8> {
        let (rows, cols) = raster.shape();
        let cut = self.value();

        let mut mask = raster.with_same_meta::<u8>(rows, cols);
        mask.set_nodata(Some(0));

        if cut.is_nan() || self.std_dev <= 0.0 {
            return mask;
        }

        for row in 0..rows {
            for col in 0..cols {
                let v = unsafe { raster.get_unchecked(row, col) };
                if v.is_nan() {
                    continue;
                }
                let selected = match self.direction {
                    ThresholdDirection::Above => v >= cut,
                    ThresholdDirection::Below => v <= cut,
                };
                if selected {
                    unsafe { mask.set_unchecked(row, col, 1) };
                }
            }
        }

        mask
    }
}

/// Threshold a derivative raster in one step
pub fn threshold_mask(raster: &Raster<f64>, scale: f64, direction: ThresholdDirection) -> Raster<u8> {
    Threshold::compute(raster, scale, direction).mask(raster)
}

/// Parse a decimal number that may use a comma decimal separator.
///
/// Host configuration layers report numbers in the process locale; a
/// comma-separated decimal parsed naively truncates to its integer part.
/// The first comma is normalized to a dot before parsing.
pub fn parse_decimal(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    let normalized = match trimmed.find(',') {
        Some(pos) => {
            let (head, tail) = trimmed.split_at(pos);
            format!("{}.{}", head, &tail[1..])
        }
        None => trimmed.to_string(),
    };

    normalized
        .parse::<f64>()
        .map_err(|_| Error::NumericParse(text.to_string()))
}
