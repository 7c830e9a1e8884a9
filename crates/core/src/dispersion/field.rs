//! Aggregate concentration field
//!
//! Plume densities from every source are summed on a shared grid, then the sum
//! is multiplied once by the global decay multiplier `exp(-decay_factor · t)`.
//! All sources share the same decay clock. Each time step is computed from
//! scratch; nothing carries over between calls.

use super::plume::{evaluate_plume, validate_time, PlumeParameters, Source, WindVector};
use crate::core_types::{EvaluationGrid, Result};
use serde::Serialize;
use tracing::debug;

/// Location and height of the highest grid value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridPeak {
    /// Column index
    pub column: usize,
    /// Row index
    pub row: usize,
    /// X coordinate of the cell
    pub x: f64,
    /// Y coordinate of the cell
    pub y: f64,
    /// Value at the cell
    pub value: f64,
}

/// Summed, decayed concentration of all sources at one time step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcentrationField {
    grid: EvaluationGrid,
    values: Vec<f64>,
    time: f64,
    spread: f64,
    decay_multiplier: f64,
}

impl ConcentrationField {
    /// Grid the field was evaluated on
    pub fn grid(&self) -> &EvaluationGrid {
        &self.grid
    }

    /// Row-major, non-negative concentration values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Time step the field was evaluated at
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Plume spread used at this time step (the "dispersion radius")
    pub fn spread(&self) -> f64 {
        self.spread
    }

    /// Decay multiplier applied to the summed plumes
    pub fn decay_multiplier(&self) -> f64 {
        self.decay_multiplier
    }

    /// Concentration at column `i`, row `j`
    pub fn value_at(&self, i: usize, j: usize) -> f64 {
        self.values[self.grid.index(i, j)]
    }

    /// Highest value on the grid; ties resolve to the first cell in row-major order
    pub fn peak(&self) -> GridPeak {
        self.peak_where(|_, _| true)
    }

    /// Highest value within `radius` (in grid coordinates) of `(x, y)`
    ///
    /// Useful for finding each source's local maximum when several plumes overlap.
    pub fn peak_near(&self, x: f64, y: f64, radius: f64) -> GridPeak {
        let r2 = radius * radius;
        self.peak_where(|px, py| {
            let dx = px - x;
            let dy = py - y;
            dx * dx + dy * dy <= r2
        })
    }

    fn peak_where(&self, include: impl Fn(f64, f64) -> bool) -> GridPeak {
        let mut best = GridPeak {
            column: 0,
            row: 0,
            x: self.grid.x_at(0),
            y: self.grid.y_at(0),
            value: f64::NEG_INFINITY,
        };
        for (idx, &value) in self.values.iter().enumerate() {
            let (column, row) = self.grid.cell(idx);
            let (x, y) = (self.grid.x_at(column), self.grid.y_at(row));
            if value > best.value && include(x, y) {
                best = GridPeak {
                    column,
                    row,
                    x,
                    y,
                    value,
                };
            }
        }
        best
    }

    /// Largest concentration anywhere on the grid
    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    /// Reporting annotation for this field
    pub fn annotate(&self, params: &PlumeParameters, wind: WindVector) -> FieldAnnotation {
        FieldAnnotation {
            time: self.time,
            decay_factor: params.decay_factor,
            decay_multiplier: self.decay_multiplier,
            wind_influence: wind.magnitude(),
            dispersion_radius: self.spread,
            peak_concentration: self.max_value(),
        }
    }
}

/// Scalar summary attached to a field for textual annotation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldAnnotation {
    /// Time step of the annotated field
    pub time: f64,
    /// Configured decay rate
    pub decay_factor: f64,
    /// `exp(-decay_factor · t)`
    pub decay_multiplier: f64,
    /// Wind magnitude
    pub wind_influence: f64,
    /// Plume spread at this time step
    pub dispersion_radius: f64,
    /// Highest concentration on the grid
    pub peak_concentration: f64,
}

/// Compute the concentration field of all sources at time `t`
///
/// # Arguments
///
/// * `sources` - Release points; an empty slice yields an all-zero field
/// * `t` - Elapsed time since release
/// * `wind` - Constant advection vector
/// * `params` - Spread, growth, and decay parameters
/// * `grid` - Evaluation mesh
///
/// # Errors
/// Returns `InvalidParameter` if the parameters, the time, or the grid are invalid
pub fn compute_field(
    sources: &[Source],
    t: f64,
    wind: WindVector,
    params: &PlumeParameters,
    grid: &EvaluationGrid,
) -> Result<ConcentrationField> {
    params.validate()?;
    validate_time(t)?;
    grid.validate()?;

    let mut values = vec![0.0; grid.len()];
    for &source in sources {
        let plume = evaluate_plume(source, t, wind, params, grid)?;
        for (total, contribution) in values.iter_mut().zip(plume.values()) {
            *total += contribution;
        }
    }

    let decay_multiplier = params.decay_multiplier(t);
    for value in &mut values {
        *value *= decay_multiplier;
    }

    let spread = params.spread_at(t);
    debug!(
        "Concentration field: t={:.2}, sources={}, spread={:.3}, decay={:.4}, grid={}x{}",
        t,
        sources.len(),
        spread,
        decay_multiplier,
        grid.nx,
        grid.ny
    );

    Ok(ConcentrationField {
        grid: *grid,
        values,
        time: t,
        spread,
        decay_multiplier,
    })
}

/// Compute one independent field per time step (animation frames)
///
/// # Errors
/// Returns the first error raised by [`compute_field`]
pub fn compute_series(
    sources: &[Source],
    times: &[f64],
    wind: WindVector,
    params: &PlumeParameters,
    grid: &EvaluationGrid,
) -> Result<Vec<ConcentrationField>> {
    times
        .iter()
        .map(|&t| compute_field(sources, t, wind, params, grid))
        .collect()
}
