//! # Seamorph Algorithms
//!
//! Terrain derivatives and morphological feature extraction for seabed
//! mapping.
//!
//! ## Module overview
//!
//! - **terrain**: openness (directional scanning), TPI, aspect,
//!   convergence index
//! - **statistics**: focal statistics, weighted focal sums, Local Moran's I
//! - **extraction**: statistical thresholding, mask polygonization,
//!   area filtering, feature merging, and the detection pipeline

pub mod extraction;
pub mod statistics;
pub mod terrain;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::extraction::{
        detect_features, eliminate_small, filter_by_area, mask_to_polygons, merge_features,
        threshold_mask, AreaUnit, DetectionConfig, DetectionMode, LmiRefinement, MergePolicy,
        Threshold, ThresholdDirection,
    };
    pub use crate::statistics::{
        focal_statistics, focal_sum_weighted, local_morans_i, FocalParams, FocalStatistic,
        LocalMoransParams,
    };
    pub use crate::terrain::{
        aspect, convergence_index, negative_openness, positive_openness, tpi, OpennessParams,
        ScanMode, TpiParams,
    };
    pub use seamorph_core::prelude::*;
}
