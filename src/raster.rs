//! Simple 2D raster grids: elevation, categorical labels and RGB output.

use std::ops::{Index, IndexMut};

use crate::error::{EvalError, Result};
use crate::geometry::Pixel;

/// Categorical cell value of a segmentation raster. `[0, 0, 0]` is background.
pub type Label = [u32; 3];

/// The background label of a segmentation raster.
pub const BACKGROUND: Label = [0, 0, 0];

/// 8-bit RGB cell of a rendered map.
pub type Rgb = [u8; 3];

/// A 2D grid (row-major). Origin is top-left.
///
/// Cells are addressed either as `(row, col)` or through a [`Pixel`], whose
/// `x` is the column and `y` the row.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    pub nrow: usize,
    pub ncol: usize,
    pub data: Vec<T>,
}

/// Single-channel elevation / centre-marker raster.
pub type Raster = Grid<f64>;

/// Multi-channel categorical raster (watershed segmentation output).
pub type LabelRaster = Grid<Label>;

/// Colour raster used for the error map.
pub type ColorRaster = Grid<Rgb>;

impl<T: Clone> Grid<T> {
    /// Create a new grid filled with a constant value.
    pub fn new(nrow: usize, ncol: usize, fill: T) -> Self {
        Self {
            nrow,
            ncol,
            data: vec![fill; nrow * ncol],
        }
    }
}

impl<T> Grid<T> {
    /// Create a grid from an existing Vec (row-major).
    pub fn from_vec(nrow: usize, ncol: usize, data: Vec<T>) -> Self {
        assert_eq!(data.len(), nrow * ncol);
        Self { nrow, ncol, data }
    }

    /// `(nrow, ncol)`.
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.nrow, self.ncol)
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.nrow * self.ncol
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `p` lies inside the grid.
    #[inline]
    pub fn contains(&self, p: Pixel) -> bool {
        p.x >= 0 && p.y >= 0 && (p.y as usize) < self.nrow && (p.x as usize) < self.ncol
    }

    /// Iterate over every cell in row-major order with its pixel coordinate.
    pub fn cells(&self) -> impl Iterator<Item = (Pixel, &T)> + '_ {
        self.data.iter().enumerate().map(move |(i, v)| {
            let p = Pixel::new((i % self.ncol) as i32, (i / self.ncol) as i32);
            (p, v)
        })
    }

    /// Fail with [`EvalError::DimensionMismatch`] unless both grids share an extent.
    pub fn ensure_same_dims<U>(&self, name: &str, other: &Grid<U>, other_name: &str) -> Result<()> {
        if self.dims() != other.dims() {
            return Err(EvalError::DimensionMismatch {
                left: name.to_string(),
                right: other_name.to_string(),
                left_dims: self.dims(),
                right_dims: other.dims(),
            });
        }
        Ok(())
    }
}

impl<T: Copy> Grid<T> {
    /// Get value at (row, col), `None` if out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row < self.nrow && col < self.ncol {
            Some(self.data[row * self.ncol + col])
        } else {
            None
        }
    }

    /// Get value under a pixel, `None` if out of bounds.
    #[inline]
    pub fn at(&self, p: Pixel) -> Option<T> {
        if self.contains(p) {
            Some(self.data[p.y as usize * self.ncol + p.x as usize])
        } else {
            None
        }
    }

    /// Set value under a pixel. Out-of-bounds writes are ignored; returns
    /// whether the cell was written.
    #[inline]
    pub fn set(&mut self, p: Pixel, val: T) -> bool {
        if self.contains(p) {
            let idx = p.y as usize * self.ncol + p.x as usize;
            self.data[idx] = val;
            true
        } else {
            false
        }
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;
    fn index(&self, (r, c): (usize, usize)) -> &T {
        &self.data[r * self.ncol + c]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut T {
        &mut self.data[r * self.ncol + c]
    }
}
