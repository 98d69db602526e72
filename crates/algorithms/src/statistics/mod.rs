//! Focal statistics and spatial autocorrelation

mod autocorrelation;
mod focal;

pub use autocorrelation::{local_morans_i, LocalMoransParams};
pub use focal::{focal_statistics, focal_sum_weighted, FocalParams, FocalStatistic};
