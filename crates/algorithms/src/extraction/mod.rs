//! Region extraction and connected-feature merging

mod area_filter;
mod merge;
mod pipeline;
mod polygonize;
mod threshold;
mod trace;
mod union_find;

pub use area_filter::{
    area_to_square_km, eliminate_small, filter_by_area, square_km_to, AreaUnit,
};
pub use merge::{merge_features, MergePolicy};
pub use pipeline::{detect_features, DetectionConfig, DetectionMode, LmiRefinement};
pub use polygonize::mask_to_polygons;
pub use threshold::{parse_decimal, threshold_mask, Threshold, ThresholdDirection};
pub use union_find::UnionFind;
