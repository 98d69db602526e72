//! # Seamorph Core
//!
//! Core types and traits for the seamorph seabed-morphology library.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `CRS`: Coordinate Reference System handling with a projected-CRS check
//! - `Kernel` / `Neighborhood`: focal window definitions
//! - `RegionPolygon` / `MergedFeature`: extracted feature types
//! - Derivative cache keyed by grid fingerprint and scan parameters

pub mod cache;
pub mod crs;
pub mod error;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{CompassDirection, GeoTransform, Kernel, Neighborhood, Raster, RasterElement};
pub use vector::{Connectivity, MergedFeature, RegionPolygon};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cache::{CacheKey, DerivativeCache, DerivativeKind, MemoryCache};
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{
        CompassDirection, GeoTransform, Kernel, Neighborhood, Raster, RasterElement,
    };
    pub use crate::vector::{Connectivity, MergedFeature, RegionPolygon};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in seamorph.
///
/// Algorithms are pure functions that transform input data according to
/// parameters. There is no ambient state: every knob an algorithm honors
/// arrives through its `Params` struct.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
