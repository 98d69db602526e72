//! Raster grid types and neighborhood definitions

mod element;
mod geotransform;
mod grid;
mod kernel;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use kernel::{CompassDirection, Kernel, Neighborhood};
