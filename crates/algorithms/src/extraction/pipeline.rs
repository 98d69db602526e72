//! End-to-end feature detection
//!
//! Composes the derivative, threshold, polygonization, area-filter and
//! merge stages into one call: bathymetry grid in, clustered seabed
//! features out. All knobs arrive through an explicit [`DetectionConfig`];
//! there is no ambient workspace or overwrite state.

use crate::extraction::area_filter::{eliminate_small, filter_by_area, AreaUnit};
use crate::extraction::merge::{merge_features, MergePolicy};
use crate::extraction::polygonize::{connected_regions, mask_to_polygons};
use crate::extraction::threshold::{parse_decimal, threshold_mask, ThresholdDirection};
use crate::statistics::{local_morans_i, LocalMoransParams};
use crate::terrain::{tpi, TpiParams};
use log::{debug, info};
use seamorph_core::cache::{CacheKey, DerivativeCache, DerivativeKind};
use seamorph_core::raster::{Kernel, Raster};
use seamorph_core::{Error, MergedFeature, Result};

/// Whether the pass hunts elevated or depressed features
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMode {
    /// Bathymetric highs: TPI above `mean + c·σ`
    Highs,
    /// Bathymetric lows: TPI below `mean − c·σ`
    Lows,
}

/// Optional LMI refinement of the largest candidate regions.
///
/// Refining every fragment is expensive on large surveys, so only the
/// `limit` largest candidates are intersected with the LMI mask; the rest
/// pass through unrefined.
#[derive(Debug, Clone)]
pub struct LmiRefinement {
    /// Neighborhood weight kernel for Local Moran's I
    pub kernel: Kernel,
    /// Threshold scale applied to the LMI surface
    pub threshold_scale: f64,
    /// How many of the largest candidate regions to refine
    pub limit: usize,
}

impl Default for LmiRefinement {
    fn default() -> Self {
        Self {
            kernel: Kernel::queen(),
            threshold_scale: 1.0,
            limit: 50,
        }
    }
}

/// Configuration of one detection pass
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    pub mode: DetectionMode,
    /// Radius of the circular TPI neighborhood, in cells
    pub tpi_radius: usize,
    /// Scale `c` of the statistical threshold `mean ± c·σ`
    pub threshold_scale: f64,
    /// Minimum feature area, in `area_unit`
    pub min_area: f64,
    pub area_unit: AreaUnit,
    pub merge_policy: MergePolicy,
    /// Dissolve undersized fragments into touching neighbors before the
    /// final area filter
    pub eliminate_undersized: bool,
    pub lmi_refinement: Option<LmiRefinement>,
}

impl DetectionConfig {
    /// Build a config from host-supplied textual parameters.
    ///
    /// Numbers are locale-normalized (comma decimal separators accepted)
    /// and the unit name is validated against the conversion table before
    /// any computation starts.
    pub fn from_text_params(
        mode: DetectionMode,
        tpi_radius: usize,
        threshold_scale: &str,
        min_area: &str,
        area_unit: &str,
        merge_policy: MergePolicy,
    ) -> Result<Self> {
        Ok(Self {
            mode,
            tpi_radius,
            threshold_scale: parse_decimal(threshold_scale)?,
            min_area: parse_decimal(min_area)?,
            area_unit: AreaUnit::parse(area_unit)?,
            merge_policy,
            eliminate_undersized: true,
            lmi_refinement: None,
        })
    }
}

/// Run one detection pass over a bathymetry grid.
///
/// Parameter and precondition errors surface before any derivative is
/// computed; statistical degeneracies (flat grid, all-NaN derivative)
/// yield an empty feature list instead of an error.
pub fn detect_features(
    dem: &Raster<f64>,
    config: &DetectionConfig,
    mut cache: Option<&mut dyn DerivativeCache>,
) -> Result<Vec<MergedFeature>> {
    if config.tpi_radius == 0 {
        return Err(Error::InvalidParameter {
            name: "tpi_radius",
            value: "0".into(),
            reason: "neighborhood radius must be > 0".into(),
        });
    }
    if let Some(crs) = dem.crs() {
        if crs.is_geographic() {
            return Err(Error::GeographicCrs(crs.identifier()));
        }
    }

    let transform = *dem.transform();
    let direction = match config.mode {
        DetectionMode::Highs => ThresholdDirection::Above,
        DetectionMode::Lows => ThresholdDirection::Below,
    };

    let tpi_raster = cached_derivative(
        &mut cache,
        dem,
        DerivativeKind::Tpi,
        &format!("radius={}", config.tpi_radius),
        || tpi(dem, TpiParams { radius: config.tpi_radius }),
    )?;

    let mut mask = threshold_mask(&tpi_raster, config.threshold_scale, direction);

    if let Some(refinement) = &config.lmi_refinement {
        let lmi_raster = cached_derivative(
            &mut cache,
            dem,
            DerivativeKind::LocalMoransI,
            &format!("kernel={:?}", refinement.kernel.offsets_weights()),
            || local_morans_i(dem, LocalMoransParams { kernel: refinement.kernel.clone() }),
        )?;
        // Clustered cells score high in LMI regardless of detection mode
        let lmi_mask = threshold_mask(&lmi_raster, refinement.threshold_scale, ThresholdDirection::Above);

        let (_, mut regions) = connected_regions(&mask);
        regions.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        let refined = regions.len().min(refinement.limit);
        info!(
            "lmi refinement: {} of {} candidate regions refined, {} carried through unrefined",
            refined,
            regions.len(),
            regions.len() - refined
        );

        for (_, cells) in regions.iter().take(refinement.limit) {
            for &(r, c) in cells {
                if unsafe { lmi_mask.get_unchecked(r, c) } == 0 {
                    unsafe { mask.set_unchecked(r, c, 0) };
                }
            }
        }
    }

    let mut polygons = mask_to_polygons(&mask)?;
    debug!("threshold produced {} candidate polygons", polygons.len());

    if config.eliminate_undersized {
        polygons = eliminate_small(polygons, config.min_area, config.area_unit, &transform)?;
    }
    let polygons = filter_by_area(polygons, config.min_area, config.area_unit);
    debug!("{} polygons above the area threshold", polygons.len());

    let features = merge_features(polygons, &config.merge_policy, &transform)?;
    info!(
        "detection pass ({:?}) produced {} merged features",
        config.mode,
        features.len()
    );

    Ok(features)
}

/// Look up or compute a derivative, memoized on the optional cache
fn cached_derivative<F>(
    cache: &mut Option<&mut dyn DerivativeCache>,
    dem: &Raster<f64>,
    kind: DerivativeKind,
    params: &str,
    compute: F,
) -> Result<Raster<f64>>
where
    F: FnOnce() -> Result<Raster<f64>>,
{
    match cache {
        Some(store) => {
            let key = CacheKey::new(dem, kind, params);
            if let Some(hit) = store.get(&key) {
                debug!("derivative cache hit: {:?} {}", kind, params);
                return Ok(hit);
            }
            let computed = compute()?;
            store.put(key, computed.clone());
            Ok(computed)
        }
        None => compute(),
    }
}
