//! Terrain-shape derivatives of bathymetry grids

mod aspect;
mod convergence;
mod openness;
mod tpi;

pub use aspect::{aspect, Aspect, AspectParams};
pub use convergence::convergence_index;
pub use openness::{negative_openness, positive_openness, scan, OpennessParams, ScanMode};
pub use tpi::{tpi, Tpi, TpiParams};
