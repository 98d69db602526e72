//! Area-based filtering of candidate regions
//!
//! Thresholding a derivative surface produces clouds of tiny fragments
//! alongside the real features. Undersized regions are either dropped
//! outright or dissolved into the touching neighbor they share the most
//! border with, repeated to a fixed point.
//!
//! Area thresholds arrive in one of twelve supported units and are
//! converted to the canonical unit (km²) through a fixed lookup table.

use crate::extraction::trace::{polygon_segments, rings_to_polygons, stitch_rings, SegmentSet};
use geo::Area;
use log::debug;
use seamorph_core::raster::GeoTransform;
use seamorph_core::{Error, RegionPolygon, Result};

/// Square map units (meters) per square kilometer
const SQ_METERS_PER_SQ_KM: f64 = 1_000_000.0;

/// Elimination passes allowed before reporting non-convergence
const MAX_ELIMINATION_PASSES: usize = 1000;

/// Supported area units. The conversion table is fixed; anything else is
/// rejected when the unit name is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaUnit {
    Acres,
    Ares,
    Hectares,
    SquareCentimeters,
    SquareDecimeters,
    SquareMeters,
    SquareFeet,
    SquareInches,
    SquareKilometers,
    SquareMiles,
    SquareMillimeters,
    SquareYards,
}

impl AreaUnit {
    /// Parse a unit name as reported by the host configuration layer
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim() {
            "Acres" => Ok(AreaUnit::Acres),
            "Ares" => Ok(AreaUnit::Ares),
            "Hectares" => Ok(AreaUnit::Hectares),
            "SquareCentimeters" => Ok(AreaUnit::SquareCentimeters),
            "SquareDecimeters" => Ok(AreaUnit::SquareDecimeters),
            "SquareMeters" => Ok(AreaUnit::SquareMeters),
            "SquareFeet" => Ok(AreaUnit::SquareFeet),
            "SquareInches" => Ok(AreaUnit::SquareInches),
            "SquareKilometers" => Ok(AreaUnit::SquareKilometers),
            "SquareMiles" => Ok(AreaUnit::SquareMiles),
            "SquareMillimeters" => Ok(AreaUnit::SquareMillimeters),
            "SquareYards" => Ok(AreaUnit::SquareYards),
            other => Err(Error::UnknownAreaUnit(other.to_string())),
        }
    }

    /// Square kilometers per one of this unit
    pub fn to_square_km(self) -> f64 {
        match self {
            AreaUnit::Acres => 0.004_046_86,
            AreaUnit::Ares => 0.000_1,
            AreaUnit::Hectares => 0.01,
            AreaUnit::SquareCentimeters => 1e-10,
            AreaUnit::SquareDecimeters => 1e-8,
            AreaUnit::SquareMeters => 1e-6,
            AreaUnit::SquareFeet => 9.290_3e-8,
            AreaUnit::SquareInches => 6.451_6e-10,
            AreaUnit::SquareKilometers => 1.0,
            AreaUnit::SquareMiles => 2.589_99,
            AreaUnit::SquareMillimeters => 1e-12,
            AreaUnit::SquareYards => 8.361_3e-7,
        }
    }

    /// All units, for exhaustive round-trip tests
    pub const ALL: [AreaUnit; 12] = [
        AreaUnit::Acres,
        AreaUnit::Ares,
        AreaUnit::Hectares,
        AreaUnit::SquareCentimeters,
        AreaUnit::SquareDecimeters,
        AreaUnit::SquareMeters,
        AreaUnit::SquareFeet,
        AreaUnit::SquareInches,
        AreaUnit::SquareKilometers,
        AreaUnit::SquareMiles,
        AreaUnit::SquareMillimeters,
        AreaUnit::SquareYards,
    ];
}

/// Convert an area value in the given unit to square kilometers
pub fn area_to_square_km(value: f64, unit: AreaUnit) -> f64 {
    value * unit.to_square_km()
}

/// Convert an area in square kilometers back to the given unit
pub fn square_km_to(value_km2: f64, unit: AreaUnit) -> f64 {
    value_km2 / unit.to_square_km()
}

/// Planar polygon area in square kilometers (map units are meters)
fn polygon_area_km2(polygon: &RegionPolygon) -> f64 {
    polygon.area() / SQ_METERS_PER_SQ_KM
}

/// Drop every polygon whose area falls below the threshold
pub fn filter_by_area(
    polygons: Vec<RegionPolygon>,
    min_area: f64,
    unit: AreaUnit,
) -> Vec<RegionPolygon> {
    let threshold_km2 = area_to_square_km(min_area, unit);
    polygons
        .into_iter()
        .filter(|p| polygon_area_km2(p) >= threshold_km2)
        .collect()
}

/// Dissolve undersized polygons into their neighbors.
///
/// Each pass selects the polygons below the threshold (ascending id) and
/// merges each into the touching neighbor with the longest shared border.
/// Areas are recomputed and passes repeat until no polygon is undersized
/// or a pass eliminates nothing (undersized polygons with no touching
/// neighbor are kept). More than 1000 passes is a non-convergence error.
pub fn eliminate_small(
    polygons: Vec<RegionPolygon>,
    min_area: f64,
    unit: AreaUnit,
    transform: &GeoTransform,
) -> Result<Vec<RegionPolygon>> {
    let threshold_km2 = area_to_square_km(min_area, unit);
    let mut polygons = polygons;
    let mut pass = 0;

    loop {
        let small: Vec<usize> = {
            let mut idx: Vec<usize> = (0..polygons.len())
                .filter(|&i| polygon_area_km2(&polygons[i]) < threshold_km2)
                .collect();
            idx.sort_by_key(|&i| polygons[i].feat_id);
            idx
        };
        if small.is_empty() {
            break;
        }

        let mut boundaries: Vec<SegmentSet> = polygons
            .iter()
            .map(|p| polygon_segments(&p.geometry, transform))
            .collect();

        let mut removed = vec![false; polygons.len()];
        let mut merged_any = false;

        for &i in &small {
            if removed[i] {
                continue;
            }

            // Touching neighbor with the longest shared border; ties break
            // toward the lowest feature id
            let mut best: Option<(usize, usize)> = None; // (shared, index)
            for j in 0..polygons.len() {
                if j == i || removed[j] {
                    continue;
                }
                let shared = boundaries[i].shared_count(&boundaries[j]);
                if shared == 0 {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((s, bj)) => {
                        shared > s || (shared == s && polygons[j].feat_id < polygons[bj].feat_id)
                    }
                };
                if better {
                    best = Some((shared, j));
                }
            }

            let Some((_, j)) = best else {
                continue; // isolated fragment, kept as-is
            };

            let merged = SegmentSet::merged([&boundaries[i], &boundaries[j]]);
            let mut parts = rings_to_polygons(stitch_rings(&merged), transform);
            // Border-touching polygons dissolve into a single outline
            parts.sort_by(|a, b| {
                b.unsigned_area()
                    .partial_cmp(&a.unsigned_area())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            if let Some(geometry) = parts.into_iter().next() {
                polygons[j].geometry = geometry;
                boundaries[j] = merged;
                removed[i] = true;
                merged_any = true;
            }
        }

        let mut keep = Vec::with_capacity(polygons.len());
        for (idx, polygon) in polygons.into_iter().enumerate() {
            if !removed[idx] {
                keep.push(polygon);
            }
        }
        polygons = keep;

        if !merged_any {
            break;
        }

        pass += 1;
        if pass >= MAX_ELIMINATION_PASSES {
            return Err(Error::NonConvergent {
                op: "eliminate_small",
                iterations: pass,
            });
        }
        debug!("eliminate_small: pass {} left {} polygons", pass, polygons.len());
    }

    Ok(polygons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::polygonize::mask_to_polygons;
    use seamorph_core::raster::Raster;

    fn polys_from(rows: usize, cols: usize, cells: &[(usize, usize)]) -> Vec<RegionPolygon> {
        let mut mask: Raster<u8> = Raster::new(rows, cols);
        // 1-meter cells so cell areas are 1 m²
        mask.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        for &(r, c) in cells {
            mask.set(r, c, 1).unwrap();
        }
        mask_to_polygons(&mask).unwrap()
    }

    #[test]
    fn test_unit_roundtrip() {
        for unit in AreaUnit::ALL {
            let v = 123.456;
            let back = square_km_to(area_to_square_km(v, unit), unit);
            assert!(
                ((back - v) / v).abs() < 1e-6,
                "{:?} round-trip: {} -> {}",
                unit,
                v,
                back
            );
        }
    }

    #[test]
    fn test_unknown_unit_rejected() {
        assert!(matches!(
            AreaUnit::parse("Unknown"),
            Err(Error::UnknownAreaUnit(_))
        ));
        assert!(AreaUnit::parse("SquareKilometers").is_ok());
    }

    #[test]
    fn test_filter_by_area() {
        // One 3x3 region and one single cell
        let mut cells: Vec<_> = (0..3).flat_map(|r| (0..3).map(move |c| (r, c))).collect();
        cells.push((5, 5));
        let polys = polys_from(8, 8, &cells);
        assert_eq!(polys.len(), 2);

        // 5 m² threshold keeps only the block
        let kept = filter_by_area(polys.clone(), 5.0, AreaUnit::SquareMeters);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].area() - 9.0).abs() < 1e-9);

        // Threshold above both drops everything
        let none = filter_by_area(polys, 20.0, AreaUnit::SquareMeters);
        assert!(none.is_empty());
    }

    #[test]
    fn test_eliminate_chain_converges_to_one() {
        // 5 touching column strips of widths 1,2,3,4,5 (heights 6): areas
        // 6,12,18,24,30 m²; threshold 25 m² leaves only the widest after
        // repeated dissolves
        let mut cells = Vec::new();
        let mut col = 0;
        for width in [1usize, 2, 3, 4, 5] {
            for c in col..col + width {
                for r in 0..6 {
                    cells.push((r, c));
                }
            }
            col += width;
        }
        let polys = polys_from(8, 16, &cells);
        // Strips touch, so the mask is one region; rebuild as separate
        // polygons by slicing columns apart
        let mut separate = Vec::new();
        let mut col = 0;
        let mut id = 1;
        for width in [1usize, 2, 3, 4, 5] {
            let strip: Vec<_> = (col..col + width)
                .flat_map(|c| (0..6).map(move |r| (r, c)))
                .collect();
            let mut p = polys_from(8, 16, &strip);
            p[0].feat_id = id;
            id += 1;
            separate.push(p.remove(0));
            col += width;
        }
        assert_eq!(polys.len(), 1); // sanity: strips really touch

        let transform = GeoTransform::new(0.0, 8.0, 1.0, -1.0);
        let out = eliminate_small(separate, 25.0, AreaUnit::SquareMeters, &transform).unwrap();
        assert_eq!(out.len(), 1);
        assert!((out[0].area() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_eliminate_terminates_on_isolated_fragments() {
        // Two far-apart single cells below threshold: nothing to dissolve
        // into, the pass eliminates zero polygons and must stop
        let polys = polys_from(8, 8, &[(0, 0), (7, 7)]);
        let transform = GeoTransform::new(0.0, 8.0, 1.0, -1.0);
        let out = eliminate_small(polys, 5.0, AreaUnit::SquareMeters, &transform).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_eliminate_prefers_longest_shared_border() {
        // A 1x2 domino below threshold, wedged between a strip sharing one
        // edge and a block sharing two edges: it must dissolve into the
        // block.
        let mut p1 = polys_from(6, 6, &[(2, 2), (2, 3)]).remove(0);
        p1.feat_id = 1;
        let mut strip = polys_from(6, 6, &[(2, 1), (1, 1), (3, 1)]).remove(0);
        strip.feat_id = 2;
        let mut block = polys_from(6, 6, &[(1, 2), (1, 3), (0, 2), (0, 3)]).remove(0);
        block.feat_id = 3;

        let transform = GeoTransform::new(0.0, 6.0, 1.0, -1.0);
        let out =
            eliminate_small(vec![p1, strip, block], 2.5, AreaUnit::SquareMeters, &transform)
                .unwrap();

        assert_eq!(out.len(), 2);
        let grown = out.iter().find(|p| p.feat_id == 3).expect("block kept");
        assert!((grown.area() - 6.0).abs() < 1e-9, "domino joined the block");
        let strip = out.iter().find(|p| p.feat_id == 2).unwrap();
        assert!((strip.area() - 3.0).abs() < 1e-9, "strip unchanged");
    }
}
