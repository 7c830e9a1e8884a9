//! Regular evaluation mesh
//!
//! Both axes are sampled like `linspace`: `nx` evenly spaced points from
//! `x_min` to `x_max` inclusive, and likewise for `y`. Values laid over the
//! grid are stored row-major with `y` as the row index, so the cell at column
//! `i`, row `j` lives at `j * nx + i`.

use super::error::{PipelineError, Result};
use super::vec2::Vec2;
use serde::{Deserialize, Serialize};

/// Fixed coordinate mesh shared by density, concentration, and interpolated surfaces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationGrid {
    /// First x coordinate
    pub x_min: f64,
    /// Last x coordinate (inclusive)
    pub x_max: f64,
    /// Number of points along x
    pub nx: usize,
    /// First y coordinate
    pub y_min: f64,
    /// Last y coordinate (inclusive)
    pub y_max: f64,
    /// Number of points along y
    pub ny: usize,
}

impl EvaluationGrid {
    /// Create a validated grid
    ///
    /// # Errors
    /// Returns `InvalidParameter` if either axis has fewer than 2 points,
    /// non-finite bounds, or an empty extent
    pub fn new(x_min: f64, x_max: f64, nx: usize, y_min: f64, y_max: f64, ny: usize) -> Result<Self> {
        let grid = Self {
            x_min,
            x_max,
            nx,
            y_min,
            y_max,
            ny,
        };
        grid.validate()?;
        Ok(grid)
    }

    /// Square field `0..=extent` on both axes with `n` points per axis
    ///
    /// # Errors
    /// Same conditions as [`EvaluationGrid::new`]
    pub fn square(extent: f64, n: usize) -> Result<Self> {
        Self::new(0.0, extent, n, 0.0, extent, n)
    }

    /// Check the grid invariants
    ///
    /// # Errors
    /// Returns `InvalidParameter` describing the first violated constraint
    pub fn validate(&self) -> Result<()> {
        check_axis("grid.x", self.x_min, self.x_max, self.nx)?;
        check_axis("grid.y", self.y_min, self.y_max, self.ny)
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    /// True if the grid has no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spacing between neighbouring columns
    pub fn dx(&self) -> f64 {
        (self.x_max - self.x_min) / (self.nx - 1) as f64
    }

    /// Spacing between neighbouring rows
    pub fn dy(&self) -> f64 {
        (self.y_max - self.y_min) / (self.ny - 1) as f64
    }

    /// X coordinate of column `i`
    #[inline]
    pub fn x_at(&self, i: usize) -> f64 {
        linspace_at(self.x_min, self.x_max, self.nx, i)
    }

    /// Y coordinate of row `j`
    #[inline]
    pub fn y_at(&self, j: usize) -> f64 {
        linspace_at(self.y_min, self.y_max, self.ny, j)
    }

    /// Coordinate of the cell at column `i`, row `j`
    #[inline]
    pub fn point(&self, i: usize, j: usize) -> Vec2 {
        Vec2::new(self.x_at(i), self.y_at(j))
    }

    /// Flat index of column `i`, row `j`
    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }

    /// Column and row of a flat index
    #[inline]
    pub fn cell(&self, index: usize) -> (usize, usize) {
        (index % self.nx, index / self.nx)
    }
}

/// `linspace` element: the last point lands exactly on `stop`
#[inline]
fn linspace_at(start: f64, stop: f64, n: usize, k: usize) -> f64 {
    if k + 1 == n {
        stop
    } else {
        start + (stop - start) * k as f64 / (n - 1) as f64
    }
}

fn check_axis(name: &'static str, min: f64, max: f64, n: usize) -> Result<()> {
    if n < 2 {
        return Err(PipelineError::invalid(
            name,
            format!("needs at least 2 points, got {n}"),
        ));
    }
    if !min.is_finite() || !max.is_finite() {
        return Err(PipelineError::invalid(name, "bounds must be finite"));
    }
    if min >= max {
        return Err(PipelineError::invalid(
            name,
            format!("minimum {min} must be below maximum {max}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_endpoints() {
        let grid = EvaluationGrid::square(50.0, 50).unwrap();
        assert_eq!(grid.x_at(0), 0.0);
        assert_eq!(grid.x_at(49), 50.0);
        assert!((grid.dx() - 50.0 / 49.0).abs() < 1e-12);
        assert_eq!(grid.len(), 2500);
    }

    #[test]
    fn test_index_roundtrip() {
        let grid = EvaluationGrid::new(0.0, 1.0, 4, 0.0, 1.0, 3).unwrap();
        let idx = grid.index(3, 2);
        assert_eq!(idx, 11);
        assert_eq!(grid.cell(idx), (3, 2));
    }

    #[test]
    fn test_rejects_degenerate_axes() {
        assert!(EvaluationGrid::new(0.0, 1.0, 1, 0.0, 1.0, 5).is_err());
        assert!(EvaluationGrid::new(2.0, 1.0, 5, 0.0, 1.0, 5).is_err());
        assert!(EvaluationGrid::new(0.0, f64::NAN, 5, 0.0, 1.0, 5).is_err());
    }
}
