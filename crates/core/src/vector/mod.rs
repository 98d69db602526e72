//! Vector feature types for extracted morphological regions

use geo::{Area, MultiPolygon, Polygon};

/// A candidate region produced by thresholding a derivative raster.
///
/// Geometry is pixel-exact: every vertex lies on a cell corner of the
/// source grid, rings are simple and closed, holes are preserved.
#[derive(Debug, Clone)]
pub struct RegionPolygon {
    /// Stable identifier, assigned in scan order at polygonization time
    pub feat_id: u64,
    /// Pixel class the region was extracted from (1 for threshold masks)
    pub source_class: i32,
    /// Identifier of the merged feature this region belongs to, assigned
    /// by the feature merger
    pub cluster_id: Option<u64>,
    /// Region geometry (one exterior ring plus any holes)
    pub geometry: Polygon<f64>,
}

impl RegionPolygon {
    /// Create a region with no cluster assignment
    pub fn new(feat_id: u64, source_class: i32, geometry: Polygon<f64>) -> Self {
        Self {
            feat_id,
            source_class,
            cluster_id: None,
            geometry,
        }
    }

    /// Planar area in squared map units
    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }
}

/// How the members of a merged feature were spatially connected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Single fragment, nothing was merged
    Single,
    /// All members shared border segments; the dissolve produced one part
    Border,
    /// All members touched at single points only; every part survives the
    /// dissolve
    Point,
    /// Some members shared borders, others touched at points
    Mixed,
    /// Members were merged by proximity and alignment without touching
    Disjoint,
}

/// Final output of the feature merger: one connected component of region
/// fragments, dissolved into a single (possibly multi-part) feature.
#[derive(Debug, Clone)]
pub struct MergedFeature {
    /// Cluster id: the minimum `feat_id` among the members
    pub cluster_id: u64,
    /// Original `feat_id`s of the member regions, ascending
    pub members: Vec<u64>,
    /// Dissolved geometry
    pub geometry: MultiPolygon<f64>,
    /// Connection kind of the component
    pub connectivity: Connectivity,
}

impl MergedFeature {
    /// Planar area in squared map units
    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }

    /// Number of geometric parts after the dissolve
    pub fn part_count(&self) -> usize {
        self.geometry.0.len()
    }
}
