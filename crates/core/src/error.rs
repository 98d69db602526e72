//! Error types for seamorph

use thiserror::Error;

/// Main error type for seamorph operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Coordinate system of input grid is geographic ({0}); a projected coordinate system is required")]
    GeographicCrs(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unknown area unit: {0}")]
    UnknownAreaUnit(String),

    #[error("{op} did not converge after {iterations} iterations")]
    NonConvergent { op: &'static str, iterations: usize },

    #[error("Cannot parse '{0}' as a decimal number")]
    NumericParse(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for seamorph operations
pub type Result<T> = std::result::Result<T, Error>;
