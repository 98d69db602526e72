//! Neighborhood shapes and weight kernels for focal operations

use crate::error::{Error, Result};
use ndarray::Array2;

/// Defines a neighborhood pattern around a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    /// Square window of the given radius (side = 2r + 1)
    Square(usize),
    /// Circular window of the given radius in cells
    Circle(usize),
}

impl Neighborhood {
    /// Get the radius of the neighborhood
    pub fn radius(&self) -> usize {
        match self {
            Neighborhood::Square(r) | Neighborhood::Circle(r) => *r,
        }
    }

    /// Check if a relative position is within this neighborhood
    pub fn contains(&self, dr: isize, dc: isize) -> bool {
        match self {
            Neighborhood::Square(r) => {
                let r = *r as isize;
                dr.abs() <= r && dc.abs() <= r
            }
            Neighborhood::Circle(r) => {
                let r2 = (r * r) as isize;
                dr * dr + dc * dc <= r2
            }
        }
    }

    /// Relative offsets of all member cells, center included
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        let r = self.radius() as isize;
        let mut offsets = Vec::new();

        for dr in -r..=r {
            for dc in -r..=r {
                if self.contains(dr, dc) {
                    offsets.push((dr, dc));
                }
            }
        }

        offsets
    }
}

/// The 8 compass directions, clockwise from north
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompassDirection {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl CompassDirection {
    /// All directions in clockwise order starting at north
    pub const ALL: [CompassDirection; 8] = [
        CompassDirection::North,
        CompassDirection::NorthEast,
        CompassDirection::East,
        CompassDirection::SouthEast,
        CompassDirection::South,
        CompassDirection::SouthWest,
        CompassDirection::West,
        CompassDirection::NorthWest,
    ];

    /// Azimuth of this direction in degrees, clockwise from north
    pub fn bearing(&self) -> f64 {
        match self {
            CompassDirection::North => 0.0,
            CompassDirection::NorthEast => 45.0,
            CompassDirection::East => 90.0,
            CompassDirection::SouthEast => 135.0,
            CompassDirection::South => 180.0,
            CompassDirection::SouthWest => 225.0,
            CompassDirection::West => 270.0,
            CompassDirection::NorthWest => 315.0,
        }
    }

    /// Grid offset (row, col) of the neighbor in this direction, for a
    /// north-up raster (row increases southward)
    pub fn offset(&self) -> (isize, isize) {
        match self {
            CompassDirection::North => (-1, 0),
            CompassDirection::NorthEast => (-1, 1),
            CompassDirection::East => (0, 1),
            CompassDirection::SouthEast => (1, 1),
            CompassDirection::South => (1, 0),
            CompassDirection::SouthWest => (1, -1),
            CompassDirection::West => (0, -1),
            CompassDirection::NorthWest => (-1, -1),
        }
    }
}

/// A small 2-D weight matrix with its anchor at the center.
///
/// Used as the neighborhood definition for weighted focal sums (local
/// spatial autocorrelation) and for the per-direction kernels of the
/// convergence index. Cells with weight 0 do not participate.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    weights: Array2<f64>,
}

impl Kernel {
    /// Create a kernel from a weight matrix. Both dimensions must be odd so
    /// the anchor is a cell, not a corner.
    pub fn from_weights(weights: Array2<f64>) -> Result<Self> {
        let (rows, cols) = weights.dim();
        if rows % 2 == 0 || cols % 2 == 0 {
            return Err(Error::InvalidParameter {
                name: "kernel",
                value: format!("{}x{}", rows, cols),
                reason: "kernel dimensions must be odd".into(),
            });
        }
        Ok(Self { weights })
    }

    /// 3x3 queen's-case contiguity kernel: all 8 neighbors weight 1,
    /// center 0
    pub fn queen() -> Self {
        let mut weights = Array2::from_elem((3, 3), 1.0);
        weights[(1, 1)] = 0.0;
        Self { weights }
    }

    /// 3x3 kernel isolating the single neighbor in the given compass
    /// direction
    pub fn directional(direction: CompassDirection) -> Self {
        let mut weights = Array2::zeros((3, 3));
        let (dr, dc) = direction.offset();
        weights[((dr + 1) as usize, (dc + 1) as usize)] = 1.0;
        Self { weights }
    }

    /// Kernel dimensions (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.weights.dim()
    }

    /// Anchor-relative offsets and weights of all non-zero entries
    pub fn offsets_weights(&self) -> Vec<(isize, isize, f64)> {
        let (rows, cols) = self.weights.dim();
        let (ar, ac) = (rows as isize / 2, cols as isize / 2);
        let mut out = Vec::new();

        for r in 0..rows {
            for c in 0..cols {
                let w = self.weights[(r, c)];
                if w != 0.0 {
                    out.push((r as isize - ar, c as isize - ac, w));
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_offsets() {
        // Circle r=2: dr²+dc² <= 4 → 13 cells
        let offsets = Neighborhood::Circle(2).offsets();
        assert_eq!(offsets.len(), 13);
        assert!(offsets.contains(&(0, 0)));
        assert!(!offsets.contains(&(2, 2)));
    }

    #[test]
    fn test_square_offsets() {
        let offsets = Neighborhood::Square(1).offsets();
        assert_eq!(offsets.len(), 9);
    }

    #[test]
    fn test_queen_kernel() {
        let k = Kernel::queen();
        let ow = k.offsets_weights();
        assert_eq!(ow.len(), 8);
        assert!(!ow.iter().any(|&(dr, dc, _)| dr == 0 && dc == 0));
    }

    #[test]
    fn test_directional_kernel() {
        let k = Kernel::directional(CompassDirection::NorthEast);
        let ow = k.offsets_weights();
        assert_eq!(ow, vec![(-1, 1, 1.0)]);
    }

    #[test]
    fn test_even_kernel_rejected() {
        assert!(Kernel::from_weights(Array2::zeros((2, 3))).is_err());
    }

    #[test]
    fn test_compass_bearings() {
        assert_eq!(CompassDirection::North.bearing(), 0.0);
        assert_eq!(CompassDirection::SouthWest.bearing(), 225.0);
        assert_eq!(CompassDirection::West.offset(), (0, -1));
    }
}
