//! Derivative raster cache
//!
//! Recomputing an openness or TPI surface over a large survey grid costs
//! minutes; the derivative is fully determined by the source grid and the
//! scan parameters. The cache memoizes computed derivatives behind an
//! injected storage backend, keyed by (grid fingerprint, derivative kind,
//! parameter string). A hit short-circuits recomputation entirely.

use crate::raster::Raster;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// The named derivatives the library computes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DerivativeKind {
    Tpi,
    PositiveOpenness,
    NegativeOpenness,
    ConvergenceIndex,
    LocalMoransI,
    Aspect,
}

/// Cache key: identity of the source grid plus the computation parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Fingerprint of the source grid contents and georeferencing
    pub fingerprint: u64,
    /// Which derivative was computed
    pub kind: DerivativeKind,
    /// Canonical parameter string, e.g. "radius=10"
    pub params: String,
}

impl CacheKey {
    pub fn new(source: &Raster<f64>, kind: DerivativeKind, params: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint(source),
            kind,
            params: params.into(),
        }
    }
}

/// Fingerprint of a raster: shape, transform and every cell bit pattern.
///
/// Bit patterns rather than float values so NaN cells hash stably.
pub fn fingerprint(raster: &Raster<f64>) -> u64 {
    let mut hasher = DefaultHasher::new();
    let (rows, cols) = raster.shape();
    rows.hash(&mut hasher);
    cols.hash(&mut hasher);

    let t = raster.transform();
    t.origin_x.to_bits().hash(&mut hasher);
    t.origin_y.to_bits().hash(&mut hasher);
    t.pixel_width.to_bits().hash(&mut hasher);
    t.pixel_height.to_bits().hash(&mut hasher);

    for &v in raster.data().iter() {
        v.to_bits().hash(&mut hasher);
    }

    hasher.finish()
}

/// Storage backend for computed derivative rasters
pub trait DerivativeCache {
    /// Look up a previously computed derivative
    fn get(&self, key: &CacheKey) -> Option<Raster<f64>>;

    /// Store a computed derivative
    fn put(&mut self, key: CacheKey, raster: Raster<f64>);
}

/// In-process cache backend
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<CacheKey, Raster<f64>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DerivativeCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Raster<f64>> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: CacheKey, raster: Raster<f64>) {
        self.entries.insert(key, raster);
    }
}
