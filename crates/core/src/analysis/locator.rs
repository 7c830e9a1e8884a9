//! Low-concentration search over an interpolated surface
//!
//! Cells outside the sample hull carry no value and are ignored. Ties resolve
//! to the first cell in row-major scan order (row by row, columns left to
//! right within a row).

use super::interpolation::InterpolatedSurface;
use crate::core_types::{PipelineError, Result};
use serde::Serialize;
use tracing::debug;

/// Grid cell recommended for supplemental dispensing
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LowConcentrationPoint {
    /// Column index (latitude axis)
    pub column: usize,
    /// Row index (longitude axis)
    pub row: usize,
    /// Latitude of the cell
    pub latitude: f64,
    /// Longitude of the cell
    pub longitude: f64,
    /// Interpolated concentration at the cell
    pub concentration: f64,
}

impl LowConcentrationPoint {
    fn from_cell(surface: &InterpolatedSurface, index: usize, concentration: f64) -> Self {
        let grid = surface.grid();
        let (column, row) = grid.cell(index);
        Self {
            column,
            row,
            latitude: grid.x_at(column),
            longitude: grid.y_at(row),
            concentration,
        }
    }
}

/// Find the defined cell with the smallest interpolated value
///
/// # Errors
/// Returns `EmptySurface` if every cell lies outside the sample hull
pub fn locate_minimum(surface: &InterpolatedSurface) -> Result<LowConcentrationPoint> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, value) in surface.defined() {
        if best.is_none_or(|(_, lowest)| value < lowest) {
            best = Some((idx, value));
        }
    }

    let (idx, value) = best.ok_or(PipelineError::EmptySurface)?;
    let point = LowConcentrationPoint::from_cell(surface, idx, value);
    debug!(
        "Lowest interpolated concentration {:.3} at ({:.3}, {:.3})",
        point.concentration, point.latitude, point.longitude
    );
    Ok(point)
}

/// Every defined cell whose value is strictly below `threshold`
///
/// Results are ordered by ascending concentration, then scan order.
pub fn locate_below(surface: &InterpolatedSurface, threshold: f64) -> Vec<LowConcentrationPoint> {
    let mut cells: Vec<(usize, f64)> = surface
        .defined()
        .filter(|&(_, value)| value < threshold)
        .collect();
    cells.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    cells
        .into_iter()
        .map(|(idx, value)| LowConcentrationPoint::from_cell(surface, idx, value))
        .collect()
}
