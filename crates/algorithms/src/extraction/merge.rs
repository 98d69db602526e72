//! Feature merger: graph clustering over polygon adjacency
//!
//! Thresholded detections arrive fragmented: one seabed feature often
//! surfaces as several polygons that touch, or as aligned pieces separated
//! by small gaps. The merger builds an adjacency graph under one of two
//! policies, collapses its connected components with union-find, assigns
//! every member the component's minimum feature id, and dissolves each
//! component into a single (possibly multi-part) feature.

use crate::extraction::trace::{polygon_segments, rings_to_polygons, stitch_rings, SegmentSet};
use crate::extraction::union_find::UnionFind;
use geo::{BoundingRect, EuclideanDistance, MinimumRotatedRect, MultiPolygon, Point, Polygon};
use log::debug;
use rayon::prelude::*;
use seamorph_core::raster::GeoTransform;
use seamorph_core::{Connectivity, MergedFeature, RegionPolygon, Result};
use std::collections::{BTreeMap, HashSet};

/// How polygon fragments qualify as connected
#[derive(Debug, Clone, PartialEq)]
pub enum MergePolicy {
    /// Fragments touch: pairwise nearest distance is zero (shared border
    /// or shared point). `search_radius` bounds the near-table
    /// computation.
    Touches { search_radius: f64 },
    /// Linear low-relief fragments: head-to-foot endpoint distance below
    /// `max_distance` and long-axis orientations aligned modulo 180°
    /// (absolute difference < 45° or > 135°).
    ProximityAlignment { max_distance: f64 },
}

/// Merge connected polygon fragments into clustered features.
///
/// An empty or edge-free input passes through unchanged (every polygon
/// becomes its own single-member feature). Cluster ids are the minimum
/// member `feat_id`, independent of input order.
pub fn merge_features(
    polygons: Vec<RegionPolygon>,
    policy: &MergePolicy,
    transform: &GeoTransform,
) -> Result<Vec<MergedFeature>> {
    if polygons.is_empty() {
        return Ok(Vec::new());
    }

    // Deterministic processing order regardless of caller ordering
    let mut polygons = polygons;
    polygons.sort_by_key(|p| p.feat_id);

    let edges = match policy {
        MergePolicy::Touches { search_radius } => touch_edges(&polygons, *search_radius),
        MergePolicy::ProximityAlignment { max_distance } => {
            alignment_edges(&polygons, *max_distance)
        }
    };
    debug!(
        "merge_features: {} polygons, {} edges under {:?}",
        polygons.len(),
        edges.len(),
        policy
    );

    let mut uf = UnionFind::new(polygons.len());
    for &(i, j) in &edges {
        uf.union(i, j);
    }

    // Components keyed by the minimum member feat_id
    let mut components: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
    let mut root_min: BTreeMap<usize, u64> = BTreeMap::new();
    for idx in 0..polygons.len() {
        let root = uf.find(idx);
        let id = polygons[idx].feat_id;
        root_min
            .entry(root)
            .and_modify(|m| *m = (*m).min(id))
            .or_insert(id);
    }
    for idx in 0..polygons.len() {
        let root = uf.find(idx);
        components.entry(root_min[&root]).or_default().push(idx);
    }

    let mut features = Vec::with_capacity(components.len());
    for (cluster_id, member_idx) in components {
        let members: Vec<u64> = member_idx.iter().map(|&i| polygons[i].feat_id).collect();

        if member_idx.len() == 1 {
            let polygon = &polygons[member_idx[0]];
            features.push(MergedFeature {
                cluster_id,
                members,
                geometry: MultiPolygon(vec![polygon.geometry.clone()]),
                connectivity: Connectivity::Single,
            });
            continue;
        }

        let boundaries: Vec<SegmentSet> = member_idx
            .iter()
            .map(|&i| polygon_segments(&polygons[i].geometry, transform))
            .collect();
        let dissolved = SegmentSet::merged(boundaries.iter());
        let parts = rings_to_polygons(stitch_rings(&dissolved), transform);

        let connectivity =
            classify_connectivity(parts.len(), member_idx.len(), &polygons, &member_idx, transform);

        features.push(MergedFeature {
            cluster_id,
            members,
            geometry: MultiPolygon(parts),
            connectivity,
        });
    }

    Ok(features)
}

/// Distinguish how a dissolved component was connected by comparing the
/// part count with the member count: one part means every merge shared a
/// border; one part per member means no border was shared (point contact
/// or disjoint proximity merge); anything in between is mixed.
fn classify_connectivity(
    parts: usize,
    members: usize,
    polygons: &[RegionPolygon],
    member_idx: &[usize],
    transform: &GeoTransform,
) -> Connectivity {
    if parts == 1 {
        return Connectivity::Border;
    }
    if parts == members {
        // Corner-touching members share a boundary vertex; proximity
        // merges do not touch at all.
        let vertex_sets: Vec<HashSet<(i64, i64)>> = member_idx
            .iter()
            .map(|&i| {
                polygons[i]
                    .geometry
                    .exterior()
                    .0
                    .iter()
                    .map(|c| {
                        let (ci, rj) = transform.geo_to_pixel(c.x, c.y);
                        (ci.round() as i64, rj.round() as i64)
                    })
                    .collect()
            })
            .collect();

        for a in 0..vertex_sets.len() {
            for b in a + 1..vertex_sets.len() {
                if !vertex_sets[a].is_disjoint(&vertex_sets[b]) {
                    return Connectivity::Point;
                }
            }
        }
        return Connectivity::Disjoint;
    }
    Connectivity::Mixed
}

/// All-pairs near table bounded by the search radius; an edge exists
/// where the nearest distance is zero (shared border or point).
fn touch_edges(polygons: &[RegionPolygon], search_radius: f64) -> Vec<(usize, usize)> {
    let boxes: Vec<_> = polygons
        .iter()
        .map(|p| p.geometry.bounding_rect())
        .collect();

    (0..polygons.len())
        .into_par_iter()
        .flat_map_iter(|i| {
            let polygons = &polygons;
            let boxes = &boxes;
            (i + 1..polygons.len()).filter_map(move |j| {
                // Bounding-box prefilter before the expensive distance
                if let (Some(a), Some(b)) = (&boxes[i], &boxes[j]) {
                    if a.min().x - b.max().x > search_radius
                        || b.min().x - a.max().x > search_radius
                        || a.min().y - b.max().y > search_radius
                        || b.min().y - a.max().y > search_radius
                    {
                        return None;
                    }
                }
                let dist = polygons[i]
                    .geometry
                    .euclidean_distance(&polygons[j].geometry);
                (dist <= search_radius && dist == 0.0).then_some((i, j))
            })
        })
        .collect()
}

/// Long-axis orientation and head/foot endpoints of each polygon; an edge
/// exists to the best-aligned candidate within the distance threshold.
fn alignment_edges(polygons: &[RegionPolygon], max_distance: f64) -> Vec<(usize, usize)> {
    let endpoints: Vec<Option<PolygonAxis>> =
        polygons.iter().map(|p| PolygonAxis::of(&p.geometry)).collect();

    let mut edges = Vec::new();
    for i in 0..polygons.len() {
        let Some(axis_i) = &endpoints[i] else { continue };

        // Best candidate: smallest folded angle difference, then lowest id
        let mut best: Option<(f64, u64, usize)> = None;
        for (j, axis_j) in endpoints.iter().enumerate() {
            if j == i {
                continue;
            }
            let Some(axis_j) = axis_j else { continue };

            let diff = (axis_i.orientation - axis_j.orientation).abs();
            if !(diff < 45.0 || diff > 135.0) {
                continue;
            }
            let folded = diff.min(180.0 - diff);

            let dist = axis_i
                .head
                .euclidean_distance(&axis_j.foot)
                .min(axis_i.foot.euclidean_distance(&axis_j.head));
            if dist >= max_distance {
                continue;
            }

            let id_j = polygons[j].feat_id;
            let better = match &best {
                None => true,
                Some((f, id, _)) => folded < *f || (folded == *f && id_j < *id),
            };
            if better {
                best = Some((folded, id_j, j));
            }
        }

        if let Some((_, _, j)) = best {
            edges.push((i.min(j), i.max(j)));
        }
    }

    edges
}

/// Long-axis orientation with the head/foot endpoint vertices
struct PolygonAxis {
    /// Azimuth of the minimum bounding rectangle's long side, degrees
    /// clockwise from north in [0, 180)
    orientation: f64,
    head: Point<f64>,
    foot: Point<f64>,
}

impl PolygonAxis {
    fn of(polygon: &Polygon<f64>) -> Option<Self> {
        let rect = polygon.minimum_rotated_rect()?;

        let mut best_len2 = 0.0;
        let mut best_dir = (0.0, 0.0);
        for pair in rect.exterior().0.windows(2) {
            let dx = pair[1].x - pair[0].x;
            let dy = pair[1].y - pair[0].y;
            let len2 = dx * dx + dy * dy;
            if len2 > best_len2 {
                best_len2 = len2;
                best_dir = (dx, dy);
            }
        }
        if best_len2 == 0.0 {
            return None;
        }

        let mut orientation = best_dir.0.atan2(best_dir.1).to_degrees();
        orientation = orientation.rem_euclid(180.0);

        // Head and foot: the extreme vertices along the dominant axis.
        // Near north-south orientations the spread is in Y, otherwise in
        // X; ties keep the first vertex encountered.
        let vertices = &polygon.exterior().0;
        let (mut head, mut foot) = (vertices[0], vertices[0]);
        if (45.0..=135.0).contains(&orientation) {
            for v in vertices.iter() {
                if v.x < head.x {
                    head = *v;
                }
                if v.x > foot.x {
                    foot = *v;
                }
            }
        } else {
            for v in vertices.iter() {
                if v.y < head.y {
                    head = *v;
                }
                if v.y > foot.y {
                    foot = *v;
                }
            }
        }

        Some(Self {
            orientation,
            head: Point::new(head.x, head.y),
            foot: Point::new(foot.x, foot.y),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::polygonize::mask_to_polygons;
    use seamorph_core::raster::Raster;

    fn polys_from(rows: usize, cols: usize, groups: &[&[(usize, usize)]]) -> Vec<RegionPolygon> {
        let mut out = Vec::new();
        let mut id = 1;
        for cells in groups {
            let mut mask: Raster<u8> = Raster::new(rows, cols);
            mask.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
            for &(r, c) in *cells {
                mask.set(r, c, 1).unwrap();
            }
            for mut p in mask_to_polygons(&mask).unwrap() {
                p.feat_id = id;
                id += 1;
                out.push(p);
            }
        }
        out
    }

    fn transform(rows: usize) -> GeoTransform {
        GeoTransform::new(0.0, rows as f64, 1.0, -1.0)
    }

    #[test]
    fn test_empty_input_passes_through() {
        let out = merge_features(
            Vec::new(),
            &MergePolicy::Touches { search_radius: 10.0 },
            &transform(8),
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_disconnected_polygons_stay_single() {
        let polys = polys_from(8, 8, &[&[(0, 0)], &[(5, 5)]]);
        let out = merge_features(
            polys,
            &MergePolicy::Touches { search_radius: 10.0 },
            &transform(8),
        )
        .unwrap();

        assert_eq!(out.len(), 2);
        for f in &out {
            assert_eq!(f.connectivity, Connectivity::Single);
            assert_eq!(f.members.len(), 1);
        }
        assert_eq!(out[0].cluster_id, 1);
        assert_eq!(out[1].cluster_id, 2);
    }

    #[test]
    fn test_touch_transitivity() {
        // A-B adjacent, B-C adjacent, A-C apart: all three share a cluster
        let polys = polys_from(
            8,
            8,
            &[&[(2, 2)], &[(2, 3)], &[(2, 4)]],
        );
        let out = merge_features(
            polys,
            &MergePolicy::Touches { search_radius: 5.0 },
            &transform(8),
        )
        .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].cluster_id, 1);
        assert_eq!(out[0].members, vec![1, 2, 3]);
        assert_eq!(out[0].connectivity, Connectivity::Border);
        assert_eq!(out[0].part_count(), 1);
    }

    #[test]
    fn test_cycle_collapses_to_one_id() {
        // 2x2 block as four mutually adjacent cells: a cyclic component
        let polys = polys_from(8, 8, &[&[(1, 1)], &[(1, 2)], &[(2, 1)], &[(2, 2)]]);
        let out = merge_features(
            polys,
            &MergePolicy::Touches { search_radius: 5.0 },
            &transform(8),
        )
        .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].cluster_id, 1);
        assert_eq!(out[0].members, vec![1, 2, 3, 4]);
        assert_eq!(out[0].connectivity, Connectivity::Border);
    }

    #[test]
    fn test_point_touch_classified() {
        // Two cells sharing only a corner: distance 0, but the dissolve
        // keeps two parts
        let polys = polys_from(8, 8, &[&[(1, 1)], &[(2, 2)]]);
        let out = merge_features(
            polys,
            &MergePolicy::Touches { search_radius: 5.0 },
            &transform(8),
        )
        .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].part_count(), 2);
        assert_eq!(out[0].connectivity, Connectivity::Point);
    }

    #[test]
    fn test_mixed_connectivity() {
        // Two cells merging along a border plus a third touching at a
        // corner only: parts is neither 1 nor the member count
        let polys = polys_from(8, 8, &[&[(1, 1)], &[(1, 2)], &[(2, 3)]]);
        let out = merge_features(
            polys,
            &MergePolicy::Touches { search_radius: 5.0 },
            &transform(8),
        )
        .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].part_count(), 2);
        assert_eq!(out[0].connectivity, Connectivity::Mixed);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let make = || {
            polys_from(
                10,
                10,
                &[&[(2, 2)], &[(2, 3)], &[(7, 7)], &[(7, 8)]],
            )
        };
        let forward = merge_features(
            make(),
            &MergePolicy::Touches { search_radius: 5.0 },
            &transform(10),
        )
        .unwrap();

        let mut reversed_input = make();
        reversed_input.reverse();
        let reversed = merge_features(
            reversed_input,
            &MergePolicy::Touches { search_radius: 5.0 },
            &transform(10),
        )
        .unwrap();

        let ids = |fs: &[MergedFeature]| -> Vec<(u64, Vec<u64>)> {
            fs.iter().map(|f| (f.cluster_id, f.members.clone())).collect()
        };
        assert_eq!(ids(&forward), ids(&reversed));
    }

    #[test]
    fn test_proximity_alignment_merges_aligned_strips() {
        // Two east-west strips with a 2-cell gap on the same line, plus a
        // north-south strip nearby: only the aligned pair merges
        let polys = polys_from(
            12,
            16,
            &[
                &[(5, 1), (5, 2), (5, 3), (5, 4)],
                &[(5, 7), (5, 8), (5, 9), (5, 10)],
                &[(6, 5), (7, 5), (8, 5), (9, 5)],
            ],
        );
        let out = merge_features(
            polys,
            &MergePolicy::ProximityAlignment { max_distance: 4.0 },
            &transform(12),
        )
        .unwrap();

        assert_eq!(out.len(), 2);
        let merged = out.iter().find(|f| f.members.len() == 2).expect("aligned pair");
        assert_eq!(merged.members, vec![1, 2]);
        assert_eq!(merged.connectivity, Connectivity::Disjoint);
        assert_eq!(merged.part_count(), 2);

        let single = out.iter().find(|f| f.members.len() == 1).unwrap();
        assert_eq!(single.connectivity, Connectivity::Single);
    }

    #[test]
    fn test_proximity_alignment_respects_distance() {
        let polys = polys_from(
            8,
            24,
            &[
                &[(4, 1), (4, 2), (4, 3)],
                &[(4, 15), (4, 16), (4, 17)],
            ],
        );
        let out = merge_features(
            polys,
            &MergePolicy::ProximityAlignment { max_distance: 4.0 },
            &transform(8),
        )
        .unwrap();
        assert_eq!(out.len(), 2, "gap beyond max_distance must not merge");
    }

    #[test]
    fn test_proximity_tie_breaks_to_lowest_id() {
        // One west strip with two identical aligned candidates east of it
        // at the same distance and angle: the edge goes to the lower id
        let polys = polys_from(
            12,
            20,
            &[
                &[(5, 6), (5, 7), (5, 8)],
                &[(5, 12), (5, 13), (5, 14)],
                &[(5, 0), (5, 1), (5, 2)],
            ],
        );
        // feat 1 center, feat 2 east at distance 3, feat 3 west at
        // distance 3; both candidates have identical orientation (fold 0)
        let out = merge_features(
            polys,
            &MergePolicy::ProximityAlignment { max_distance: 4.0 },
            &transform(12),
        )
        .unwrap();

        // feat 1 best = feat 2 (id 2 < id 3); feats 2,3 both choose feat 1
        // so the whole line chains into one component
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].cluster_id, 1);
        assert_eq!(out[0].members, vec![1, 2, 3]);
    }
}
