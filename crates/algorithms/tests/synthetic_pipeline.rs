//! End-to-end tests on synthetic bathymetry.
//!
//! The canonical scenario: a flat 100x100 grid of constant elevation 10 m
//! with one 5x5 block raised to 50 m in the center. A radius-3 TPI scan
//! must flag the block as a single high region; thresholding at c=1 must
//! produce exactly one polygon of (approximately) the block footprint;
//! the area filter must keep it below threshold and drop it above.

use seamorph_algorithms::extraction::{
    detect_features, filter_by_area, mask_to_polygons, threshold_mask, AreaUnit, DetectionConfig,
    DetectionMode, MergePolicy, ThresholdDirection,
};
use seamorph_algorithms::terrain::{positive_openness, tpi, OpennessParams, TpiParams};
use seamorph_core::cache::MemoryCache;
use seamorph_core::raster::Raster;
use seamorph_core::{GeoTransform, CRS};

const BLOCK_CELLS: f64 = 25.0;
/// One ring of boundary cells around the 5x5 block
const BOUNDARY_TOLERANCE: f64 = 24.0;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Flat 100x100 seafloor at 10 m, 5x5 block at 50 m in the center,
/// 1 m cells on a projected CRS.
fn block_dem() -> Raster<f64> {
    let mut dem = Raster::filled(100, 100, 10.0);
    dem.set_transform(GeoTransform::new(500_000.0, 6_000_000.0, 1.0, -1.0));
    dem.set_crs(Some(CRS::utm(55, false)));
    for r in 48..53 {
        for c in 48..53 {
            dem.set(r, c, 50.0).unwrap();
        }
    }
    dem
}

#[test]
fn tpi_flags_block_as_single_region() {
    let dem = block_dem();
    let tpi_raster = tpi(&dem, TpiParams { radius: 3 }).unwrap();

    // Block cells stand far above their neighborhoods
    assert!(tpi_raster.get(50, 50).unwrap() > 0.0);
    // Flat cells away from the block sit at zero
    assert!(tpi_raster.get(10, 10).unwrap().abs() < 1e-9);

    let mask = threshold_mask(&tpi_raster, 1.0, ThresholdDirection::Above);
    let polygons = mask_to_polygons(&mask).unwrap();

    assert_eq!(polygons.len(), 1, "the block must surface as one region");
    let area = polygons[0].area();
    assert!(
        (area - BLOCK_CELLS).abs() <= BOUNDARY_TOLERANCE,
        "region area {} should be the block footprint within one cell of boundary",
        area
    );
}

#[test]
fn area_filter_keeps_then_drops_the_block() {
    let dem = block_dem();
    let tpi_raster = tpi(&dem, TpiParams { radius: 3 }).unwrap();
    let mask = threshold_mask(&tpi_raster, 1.0, ThresholdDirection::Above);
    let polygons = mask_to_polygons(&mask).unwrap();
    let block_area_m2 = polygons[0].area();

    // Threshold below the block's area keeps it
    let kept = filter_by_area(polygons.clone(), block_area_m2 - 1.0, AreaUnit::SquareMeters);
    assert_eq!(kept.len(), 1);

    // Threshold above drops the output to zero polygons
    let dropped = filter_by_area(polygons, block_area_m2 + 1.0, AreaUnit::SquareMeters);
    assert!(dropped.is_empty());
}

#[test]
fn full_pipeline_detects_one_feature() {
    init_logging();
    let dem = block_dem();
    let config = DetectionConfig {
        mode: DetectionMode::Highs,
        tpi_radius: 3,
        threshold_scale: 1.0,
        min_area: 10.0,
        area_unit: AreaUnit::SquareMeters,
        merge_policy: MergePolicy::Touches { search_radius: 10.0 },
        eliminate_undersized: true,
        lmi_refinement: None,
    };

    let mut cache = MemoryCache::new();
    let features = detect_features(&dem, &config, Some(&mut cache)).unwrap();

    assert_eq!(features.len(), 1);
    let feature = &features[0];
    assert_eq!(feature.part_count(), 1);
    assert!((feature.area() - BLOCK_CELLS).abs() <= BOUNDARY_TOLERANCE);

    // Rerunning against the cache must reproduce the result exactly
    let again = detect_features(&dem, &config, Some(&mut cache)).unwrap();
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].members, feature.members);
    assert_eq!(again[0].geometry, feature.geometry);
}

#[test]
fn openness_separates_block_from_floor() {
    let dem = block_dem();
    let result = positive_openness(
        &dem,
        OpennessParams {
            radius: 8,
            tile_size: 5000,
        },
    )
    .unwrap();

    let on_block = result.get(50, 50).unwrap();
    let on_floor = result.get(10, 10).unwrap();
    let beside_block = result.get(50, 45).unwrap();

    // The block top sees open sky in every direction; the floor next to
    // the block has its horizon raised by the block wall
    assert!(on_block > 89.0, "block top should be open, got {}", on_block);
    assert!(
        beside_block < on_floor,
        "floor beside the block ({}) should be less open than distant floor ({})",
        beside_block,
        on_floor
    );
}

#[test]
fn openness_tiling_is_transparent_at_scale() {
    // A grid just over a small tile size, exercising the mosaic path on
    // the same data as the single pass
    let dem = block_dem();
    let single = positive_openness(
        &dem,
        OpennessParams {
            radius: 5,
            tile_size: 5000,
        },
    )
    .unwrap();
    let tiled = positive_openness(
        &dem,
        OpennessParams {
            radius: 5,
            tile_size: 40,
        },
    )
    .unwrap();

    for row in 0..100 {
        for col in 0..100 {
            let a = single.get(row, col).unwrap();
            let b = tiled.get(row, col).unwrap();
            assert!(
                (a - b).abs() < 1e-6,
                "tiled scan diverged at ({}, {}): {} vs {}",
                row,
                col,
                a,
                b
            );
        }
    }
}
