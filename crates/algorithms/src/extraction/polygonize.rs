//! Mask-to-polygon conversion
//!
//! Converts a boolean region mask into pixel-exact polygons: every
//! maximal 4-connected run of selected cells becomes one polygon, holes
//! preserved, boundaries unsimplified so feature edges stay on cell
//! corners.

use crate::extraction::trace::{rings_to_polygons, stitch_rings, SegmentSet};
use ndarray::Array2;
use seamorph_core::raster::Raster;
use seamorph_core::{RegionPolygon, Result};
use std::collections::VecDeque;

/// Convert a mask raster into region polygons.
///
/// Cells with value != 0 are region cells; connectivity is 4-connected
/// (cells touching only diagonally belong to different regions). Each
/// region yields one `RegionPolygon` with `feat_id` assigned in scan
/// order starting at 1 and `source_class` set to the mask value of the
/// region's first cell.
pub fn mask_to_polygons(mask: &Raster<u8>) -> Result<Vec<RegionPolygon>> {
    let (rows, cols) = mask.shape();
    let transform = *mask.transform();
    let (labels, regions) = connected_regions(mask);

    // Trace each region's boundary and build its polygon
    let mut polygons = Vec::new();
    let mut next_id: u64 = 1;

    for (class, cells) in regions {
        let mut boundary = SegmentSet::new();
        for &(r, c) in &cells {
            let (ri, ci) = (r as i64, c as i64);
            let same = |rr: i64, cc: i64| -> bool {
                rr >= 0
                    && cc >= 0
                    && (rr as usize) < rows
                    && (cc as usize) < cols
                    && labels[(rr as usize, cc as usize)] == labels[(r, c)]
            };

            if !same(ri - 1, ci) {
                boundary.insert_cancelling((ci, ri), (ci + 1, ri));
            }
            if !same(ri, ci + 1) {
                boundary.insert_cancelling((ci + 1, ri), (ci + 1, ri + 1));
            }
            if !same(ri + 1, ci) {
                boundary.insert_cancelling((ci + 1, ri + 1), (ci, ri + 1));
            }
            if !same(ri, ci - 1) {
                boundary.insert_cancelling((ci, ri + 1), (ci, ri));
            }
        }

        let rings = stitch_rings(&boundary);
        for polygon in rings_to_polygons(rings, &transform) {
            polygons.push(RegionPolygon::new(next_id, class as i32, polygon));
            next_id += 1;
        }
    }

    Ok(polygons)
}

/// 4-connected component labeling in scan order.
///
/// Returns the label grid (0 = background, labels from 1) and, per label,
/// the mask value of the region's first cell plus its cell list.
pub(crate) fn connected_regions(
    mask: &Raster<u8>,
) -> (Array2<u32>, Vec<(u8, Vec<(usize, usize)>)>) {
    let (rows, cols) = mask.shape();
    let mut labels: Array2<u32> = Array2::zeros((rows, cols));
    let mut regions: Vec<(u8, Vec<(usize, usize)>)> = Vec::new();

    for row in 0..rows {
        for col in 0..cols {
            let v = unsafe { mask.get_unchecked(row, col) };
            if v == 0 || labels[(row, col)] != 0 {
                continue;
            }

            let label = regions.len() as u32 + 1;
            let mut cells = Vec::new();
            let mut queue = VecDeque::new();
            labels[(row, col)] = label;
            queue.push_back((row, col));

            while let Some((r, c)) = queue.pop_front() {
                cells.push((r, c));

                let neighbors = [
                    (r.wrapping_sub(1), c),
                    (r + 1, c),
                    (r, c.wrapping_sub(1)),
                    (r, c + 1),
                ];
                for (nr, nc) in neighbors {
                    if nr < rows && nc < cols {
                        let nv = unsafe { mask.get_unchecked(nr, nc) };
                        if nv != 0 && labels[(nr, nc)] == 0 {
                            labels[(nr, nc)] = label;
                            queue.push_back((nr, nc));
                        }
                    }
                }
            }

            regions.push((v, cells));
        }
    }

    (labels, regions)
}
