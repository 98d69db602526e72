//! Pixel-exact boundary tracing
//!
//! Region boundaries are sets of directed unit segments between cell
//! corners, with the region interior on the right-hand side (in pixel
//! space, rows growing downward). The same machinery serves three
//! operations:
//!
//! - polygonization: cell edges facing out of a labeled region are
//!   collected and stitched into closed rings;
//! - dissolve: the segment sets of several polygons are combined, shared
//!   borders cancel (opposite directions), and the remainder restitches
//!   into the union outline;
//! - shared-border measurement: segments of one polygon whose reverse
//!   belongs to another are exactly the common border.
//!
//! Stitching follows segments corner to corner, preferring the sharpest
//! right turn at junction corners. This keeps rings simple where two
//! same-region cells meet only diagonally, and splits point-touching
//! unions into separate parts.

use geo::{LineString, Polygon};
use seamorph_core::raster::GeoTransform;
use std::collections::HashSet;

/// Pixel corner index: (i = column corner, j = row corner)
pub(crate) type Corner = (i64, i64);

/// A set of directed unit segments with opposite-direction cancellation
#[derive(Debug, Clone, Default)]
pub(crate) struct SegmentSet {
    segments: HashSet<(Corner, Corner)>,
}

impl SegmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a directed segment; if its reverse is present the two cancel.
    pub fn insert_cancelling(&mut self, from: Corner, to: Corner) {
        if !self.segments.remove(&(to, from)) {
            self.segments.insert((from, to));
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn contains(&self, from: Corner, to: Corner) -> bool {
        self.segments.contains(&(from, to))
    }

    /// Number of unit segments shared (in opposite directions) with another
    /// boundary; multiplied by the cell size this is the shared border
    /// length.
    pub fn shared_count(&self, other: &SegmentSet) -> usize {
        self.segments
            .iter()
            .filter(|&&(from, to)| other.contains(to, from))
            .count()
    }

    /// Combine several boundaries into one, cancelling shared borders
    pub fn merged<'a>(sets: impl IntoIterator<Item = &'a SegmentSet>) -> SegmentSet {
        let mut out = SegmentSet::new();
        for set in sets {
            for &(from, to) in &set.segments {
                out.insert_cancelling(from, to);
            }
        }
        out
    }

    /// Segments in deterministic order
    fn sorted(&self) -> Vec<(Corner, Corner)> {
        let mut v: Vec<_> = self.segments.iter().copied().collect();
        v.sort_unstable();
        v
    }
}

/// Rotate a unit direction 90° clockwise on screen (right turn)
fn turn_right(d: Corner) -> Corner {
    (-d.1, d.0)
}

/// Rotate a unit direction 90° counterclockwise on screen (left turn)
fn turn_left(d: Corner) -> Corner {
    (d.1, -d.0)
}

/// Stitch a directed segment set into closed rings.
///
/// Every segment is consumed exactly once. Rings are returned open (the
/// closing vertex is implied) with vertices in trace order, and the
/// decomposition is deterministic: walks start from the lexicographically
/// smallest unused segment and junctions resolve right-most turn first.
pub(crate) fn stitch_rings(set: &SegmentSet) -> Vec<Vec<Corner>> {
    let ordered = set.sorted();
    let mut unused: HashSet<(Corner, Corner)> = ordered.iter().copied().collect();
    let mut rings = Vec::new();

    for &(start, second) in &ordered {
        if !unused.contains(&(start, second)) {
            continue;
        }
        unused.remove(&(start, second));

        let mut ring = vec![start, second];
        let mut prev = start;
        let mut cur = second;

        while cur != start {
            let dir = (cur.0 - prev.0, cur.1 - prev.1);
            let preferences = [turn_right(dir), dir, turn_left(dir)];

            let mut advanced = false;
            for d in preferences {
                let next = (cur.0 + d.0, cur.1 + d.1);
                if unused.remove(&(cur, next)) {
                    ring.push(next);
                    prev = cur;
                    cur = next;
                    advanced = true;
                    break;
                }
            }

            if !advanced {
                // Dead end: degenerate input, drop the partial walk
                break;
            }
        }

        if cur == start {
            ring.pop(); // drop the duplicated closing vertex
            rings.push(ring);
        }
    }

    rings
}

/// Twice the signed shoelace area of a ring in pixel corner coordinates.
///
/// Positive for exterior rings as traced by this module (interior on the
/// right, rows downward), negative for holes.
pub(crate) fn ring_signed_area2(ring: &[Corner]) -> i64 {
    let n = ring.len();
    let mut sum = 0i64;
    for k in 0..n {
        let (x0, y0) = ring[k];
        let (x1, y1) = ring[(k + 1) % n];
        sum += x0 * y1 - x1 * y0;
    }
    sum
}

/// Even-odd point-in-ring test in doubled corner coordinates.
///
/// The probe point has odd coordinates, ring vertices are even, so the
/// test never degenerates on a boundary.
fn point_in_ring_doubled(px: i64, py: i64, ring: &[Corner]) -> bool {
    let n = ring.len();
    let mut inside = false;
    for k in 0..n {
        let (x0, y0) = (ring[k].0 * 2, ring[k].1 * 2);
        let (x1, y1) = (ring[(k + 1) % n].0 * 2, ring[(k + 1) % n].1 * 2);
        if x0 == x1 {
            // vertical segment
            let (lo, hi) = if y0 < y1 { (y0, y1) } else { (y1, y0) };
            if x0 > px && lo < py && py < hi {
                inside = !inside;
            }
        }
    }
    inside
}

/// A probe point just inside the cavity a hole ring encloses, in doubled
/// corner coordinates: the midpoint of the first segment, pushed half a
/// cell to the left of the trace direction (the non-region side).
fn hole_probe_doubled(ring: &[Corner]) -> (i64, i64) {
    let p = ring[0];
    let q = ring[1];
    let d = (q.0 - p.0, q.1 - p.1);
    let l = turn_left(d);
    (p.0 + q.0 + l.0, p.1 + q.1 + l.1)
}

/// Group stitched rings into polygons: each positive ring becomes an
/// exterior, each negative ring is attached as a hole of the smallest
/// exterior containing it. Vertices are mapped to world coordinates
/// through the grid transform; no simplification is applied, collinear
/// vertices stay.
pub(crate) fn rings_to_polygons(rings: Vec<Vec<Corner>>, transform: &GeoTransform) -> Vec<Polygon<f64>> {
    let mut exteriors: Vec<(Vec<Corner>, i64)> = Vec::new();
    let mut holes: Vec<Vec<Corner>> = Vec::new();

    for ring in rings {
        if ring.len() < 4 {
            continue;
        }
        let area2 = ring_signed_area2(&ring);
        if area2 > 0 {
            exteriors.push((ring, area2));
        } else if area2 < 0 {
            holes.push(ring);
        }
    }

    let mut hole_assignment: Vec<Vec<Vec<Corner>>> = vec![Vec::new(); exteriors.len()];
    for hole in holes {
        let (px, py) = hole_probe_doubled(&hole);
        let mut best: Option<(usize, i64)> = None;
        for (idx, (ext, area2)) in exteriors.iter().enumerate() {
            if point_in_ring_doubled(px, py, ext) {
                if best.map_or(true, |(_, a)| *area2 < a) {
                    best = Some((idx, *area2));
                }
            }
        }
        if let Some((idx, _)) = best {
            hole_assignment[idx].push(hole);
        }
    }

    exteriors
        .into_iter()
        .zip(hole_assignment)
        .map(|((ext, _), ring_holes)| {
            let exterior = corners_to_linestring(&ext, transform);
            let interiors = ring_holes
                .iter()
                .map(|h| corners_to_linestring(h, transform))
                .collect();
            Polygon::new(exterior, interiors)
        })
        .collect()
}

fn corners_to_linestring(ring: &[Corner], transform: &GeoTransform) -> LineString<f64> {
    let mut coords: Vec<(f64, f64)> = ring
        .iter()
        .map(|&(i, j)| transform.corner_to_geo(i, j))
        .collect();
    coords.push(coords[0]); // close the ring
    LineString::from(coords)
}

/// Decompose a polygon's rings back into directed unit segments.
///
/// Vertices are mapped to the nearest pixel corner of the transform; the
/// polygon must be pixel-aligned (which every polygon produced by this
/// crate is).
pub(crate) fn polygon_segments(polygon: &Polygon<f64>, transform: &GeoTransform) -> SegmentSet {
    let mut set = SegmentSet::new();

    let mut add_ring = |ring: &LineString<f64>| {
        let corners: Vec<Corner> = ring
            .0
            .iter()
            .map(|c| {
                let (ci, rj) = transform.geo_to_pixel(c.x, c.y);
                (ci.round() as i64, rj.round() as i64)
            })
            .collect();

        for pair in corners.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            if from == to {
                continue;
            }
            let di = (to.0 - from.0).signum();
            let dj = (to.1 - from.1).signum();
            let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs());
            for k in 0..steps {
                let a = (from.0 + k * di, from.1 + k * dj);
                let b = (from.0 + (k + 1) * di, from.1 + (k + 1) * dj);
                set.insert_cancelling(a, b);
            }
        }
    };

    add_ring(polygon.exterior());
    for interior in polygon.interiors() {
        add_ring(interior);
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    /// Boundary of a set of cells, the way the polygonizer emits it
    fn cell_boundary(cells: &[(i64, i64)]) -> SegmentSet {
        let lookup: HashSet<(i64, i64)> = cells.iter().copied().collect();
        let mut set = SegmentSet::new();
        for &(r, c) in cells {
            if !lookup.contains(&(r - 1, c)) {
                set.insert_cancelling((c, r), (c + 1, r)); // top, east
            }
            if !lookup.contains(&(r, c + 1)) {
                set.insert_cancelling((c + 1, r), (c + 1, r + 1)); // right, south
            }
            if !lookup.contains(&(r + 1, c)) {
                set.insert_cancelling((c + 1, r + 1), (c, r + 1)); // bottom, west
            }
            if !lookup.contains(&(r, c - 1)) {
                set.insert_cancelling((c, r + 1), (c, r)); // left, north
            }
        }
        set
    }

    #[test]
    fn test_single_cell_ring() {
        let set = cell_boundary(&[(0, 0)]);
        let rings = stitch_rings(&set);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 4);
        assert_eq!(ring_signed_area2(&rings[0]), 2);
    }

    #[test]
    fn test_rectangle_keeps_unit_vertices() {
        let set = cell_boundary(&[(0, 0), (0, 1)]);
        let rings = stitch_rings(&set);
        assert_eq!(rings.len(), 1);
        // 2x1 rectangle: 6 unit segments, no simplification
        assert_eq!(rings[0].len(), 6);
        assert_eq!(ring_signed_area2(&rings[0]), 4);
    }

    #[test]
    fn test_donut_exterior_and_hole() {
        let mut cells = Vec::new();
        for r in 0..3 {
            for c in 0..3 {
                if !(r == 1 && c == 1) {
                    cells.push((r, c));
                }
            }
        }
        let set = cell_boundary(&cells);
        let rings = stitch_rings(&set);
        assert_eq!(rings.len(), 2);

        let areas: Vec<i64> = rings.iter().map(|r| ring_signed_area2(r)).collect();
        assert!(areas.contains(&18), "exterior 3x3, got {:?}", areas);
        assert!(areas.contains(&-2), "hole 1x1, got {:?}", areas);

        let polys = rings_to_polygons(rings, &GeoTransform::default());
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].interiors().len(), 1);
        assert!((polys[0].unsigned_area() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_diagonal_touch_splits_into_two_rings() {
        // Two cells sharing only a corner: right-most turns keep the
        // parts separate
        let set = cell_boundary(&[(0, 0), (1, 1)]);
        let rings = stitch_rings(&set);
        assert_eq!(rings.len(), 2);
        for ring in &rings {
            assert_eq!(ring_signed_area2(ring), 2);
        }
    }

    #[test]
    fn test_merge_cancels_shared_border() {
        let a = cell_boundary(&[(0, 0)]);
        let b = cell_boundary(&[(0, 1)]);
        assert_eq!(a.shared_count(&b), 1);

        let merged = SegmentSet::merged([&a, &b]);
        assert_eq!(merged.len(), 6);
        let rings = stitch_rings(&merged);
        assert_eq!(rings.len(), 1);
        assert_eq!(ring_signed_area2(&rings[0]), 4);
    }

    #[test]
    fn test_polygon_segment_roundtrip() {
        let transform = GeoTransform::new(100.0, 300.0, 5.0, -5.0);
        let set = cell_boundary(&[(2, 3), (2, 4), (3, 3)]);
        let rings = stitch_rings(&set);
        let polys = rings_to_polygons(rings, &transform);
        assert_eq!(polys.len(), 1);

        let back = polygon_segments(&polys[0], &transform);
        assert_eq!(back.len(), set.len());
        assert_eq!(back.shared_count(&set), 0); // same directions, no reverses
        let rering = stitch_rings(&back);
        assert_eq!(rering.len(), 1);
        assert_eq!(ring_signed_area2(&rering[0]), 6);
    }

    #[test]
    fn test_stitch_is_deterministic() {
        let set = cell_boundary(&[(0, 0), (0, 1), (1, 1), (2, 1), (2, 2)]);
        let a = stitch_rings(&set);
        let b = stitch_rings(&set);
        assert_eq!(a, b);
    }
}
