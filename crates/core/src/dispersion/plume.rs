//! Single-source Gaussian plume
//!
//! A plume released at `source` is advected linearly by a constant wind and
//! widens linearly with age:
//!
//! ```text
//! mean(t)   = source + wind · t
//! spread(t) = base_spread + spread_growth_rate · t
//! ```
//!
//! Its contribution is the bivariate normal density with covariance
//! `diag(spread², spread²)`:
//!
//! ```text
//! p(x, y) = 1 / (2π σ²) · exp(-((x - mx)² + (y - my)²) / (2σ²))
//! ```
//!
//! Widening is isotropic and independent of wind direction.

use crate::core_types::{EvaluationGrid, PipelineError, Result, Vec2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Release point of one plume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Planar x coordinate
    pub x: f64,
    /// Planar y coordinate
    pub y: f64,
}

impl Source {
    /// Create a release point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Position as a vector
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Constant wind driving advection for a whole run
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindVector {
    /// Displacement per unit time along x
    pub x: f64,
    /// Displacement per unit time along y
    pub y: f64,
}

impl WindVector {
    /// Create a wind vector
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Wind as a vector
    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Magnitude of the wind, reported as "wind influence"
    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Advection displacement after `t` time units
    pub fn displacement(&self, t: f64) -> Vec2 {
        self.as_vec2() * t
    }
}

/// Parameters governing plume growth and attenuation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlumeParameters {
    /// Exponential decay rate of the aggregate field (per time unit, ≥ 0)
    pub decay_factor: f64,
    /// Standard deviation at release (> 0)
    pub base_spread: f64,
    /// Linear growth of the standard deviation per time unit (≥ 0)
    pub spread_growth_rate: f64,
}

impl Default for PlumeParameters {
    fn default() -> Self {
        Self {
            decay_factor: 0.05,
            base_spread: 5.0,
            spread_growth_rate: 0.2,
        }
    }
}

impl PlumeParameters {
    /// Check every parameter against its domain
    ///
    /// # Errors
    /// Returns `InvalidParameter` for a non-positive base spread, a negative
    /// growth rate, a negative decay factor, or any non-finite value
    pub fn validate(&self) -> Result<()> {
        if !self.base_spread.is_finite() || self.base_spread <= 0.0 {
            return Err(PipelineError::invalid(
                "base_spread",
                format!("must be positive and finite, got {}", self.base_spread),
            ));
        }
        if !self.spread_growth_rate.is_finite() || self.spread_growth_rate < 0.0 {
            return Err(PipelineError::invalid(
                "spread_growth_rate",
                format!(
                    "must be non-negative and finite, got {}",
                    self.spread_growth_rate
                ),
            ));
        }
        if !self.decay_factor.is_finite() || self.decay_factor < 0.0 {
            return Err(PipelineError::invalid(
                "decay_factor",
                format!("must be non-negative and finite, got {}", self.decay_factor),
            ));
        }
        Ok(())
    }

    /// Standard deviation of every plume at time `t`
    #[inline]
    pub fn spread_at(&self, t: f64) -> f64 {
        self.base_spread + self.spread_growth_rate * t
    }

    /// Global decay multiplier `exp(-decay_factor · t)`
    #[inline]
    pub fn decay_multiplier(&self, t: f64) -> f64 {
        (-self.decay_factor * t).exp()
    }
}

/// Reject times the model has no meaning for
///
/// # Errors
/// Returns `InvalidParameter` for negative or non-finite `t`
pub fn validate_time(t: f64) -> Result<()> {
    if !t.is_finite() || t < 0.0 {
        return Err(PipelineError::invalid(
            "time",
            format!("must be non-negative and finite, got {t}"),
        ));
    }
    Ok(())
}

/// Density of one plume sampled on an evaluation grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensitySurface {
    grid: EvaluationGrid,
    values: Vec<f64>,
    mean: Vec2,
    spread: f64,
}

impl DensitySurface {
    /// Grid the density was evaluated on
    pub fn grid(&self) -> &EvaluationGrid {
        &self.grid
    }

    /// Row-major density values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Plume center after advection
    pub fn mean(&self) -> Vec2 {
        self.mean
    }

    /// Standard deviation used on both axes
    pub fn spread(&self) -> f64 {
        self.spread
    }

    /// Density at column `i`, row `j`
    pub fn value_at(&self, i: usize, j: usize) -> f64 {
        self.values[self.grid.index(i, j)]
    }
}

/// Evaluate one plume on every grid point
///
/// # Arguments
///
/// * `source` - Release point
/// * `t` - Elapsed time since release
/// * `wind` - Constant advection vector
/// * `params` - Spread and decay parameters (decay is not applied here)
/// * `grid` - Evaluation mesh
///
/// # Errors
/// Returns `InvalidParameter` if the parameters, the time, or the grid are invalid
pub fn evaluate_plume(
    source: Source,
    t: f64,
    wind: WindVector,
    params: &PlumeParameters,
    grid: &EvaluationGrid,
) -> Result<DensitySurface> {
    params.validate()?;
    validate_time(t)?;
    grid.validate()?;

    let mean = source.position() + wind.displacement(t);
    let spread = params.spread_at(t);
    let variance = spread * spread;
    let norm = 1.0 / (2.0 * PI * variance);
    let inv_two_var = 1.0 / (2.0 * variance);

    let mut values = vec![0.0; grid.len()];
    values
        .par_chunks_mut(grid.nx)
        .enumerate()
        .for_each(|(j, row)| {
            let dy = grid.y_at(j) - mean.y;
            for (i, value) in row.iter_mut().enumerate() {
                let dx = grid.x_at(i) - mean.x;
                *value = norm * (-(dx * dx + dy * dy) * inv_two_var).exp();
            }
        });

    Ok(DensitySurface {
        grid: *grid,
        values,
        mean,
        spread,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_grid() -> EvaluationGrid {
        EvaluationGrid::square(50.0, 51).unwrap()
    }

    #[test]
    fn test_peak_value_matches_normalisation() {
        let params = PlumeParameters::default();
        let surface = evaluate_plume(
            Source::new(25.0, 25.0),
            0.0,
            WindVector::default(),
            &params,
            &unit_grid(),
        )
        .unwrap();

        assert_relative_eq!(
            surface.value_at(25, 25),
            1.0 / (2.0 * PI * 25.0),
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_density_integrates_to_one() {
        let params = PlumeParameters {
            decay_factor: 0.0,
            base_spread: 3.0,
            spread_growth_rate: 0.0,
        };
        let grid = EvaluationGrid::square(60.0, 241).unwrap();
        let surface = evaluate_plume(
            Source::new(30.0, 30.0),
            0.0,
            WindVector::default(),
            &params,
            &grid,
        )
        .unwrap();

        let cell_area = grid.dx() * grid.dy();
        let mass: f64 = surface.values().iter().sum::<f64>() * cell_area;
        assert_relative_eq!(mass, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_isotropic_widening() {
        let params = PlumeParameters::default();
        let surface = evaluate_plume(
            Source::new(25.0, 25.0),
            10.0,
            WindVector::default(),
            &params,
            &unit_grid(),
        )
        .unwrap();

        assert_eq!(surface.spread(), 7.0);
        assert_relative_eq!(surface.value_at(30, 25), surface.value_at(25, 30), epsilon = 1e-18);
        assert_relative_eq!(surface.value_at(20, 25), surface.value_at(25, 20), epsilon = 1e-18);
    }

    #[test]
    fn test_rejects_non_positive_spread() {
        let params = PlumeParameters {
            base_spread: 0.0,
            ..Default::default()
        };
        let err = evaluate_plume(
            Source::new(0.0, 0.0),
            1.0,
            WindVector::default(),
            &params,
            &unit_grid(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidParameter {
                name: "base_spread",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_negative_time() {
        let err = evaluate_plume(
            Source::new(0.0, 0.0),
            -1.0,
            WindVector::default(),
            &PlumeParameters::default(),
            &unit_grid(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidParameter { name: "time", .. }
        ));
    }

    #[test]
    fn test_wind_magnitude() {
        let wind = WindVector::new(0.5, -0.2);
        assert_relative_eq!(wind.magnitude(), 0.29_f64.sqrt(), epsilon = 1e-15);
        let shift = wind.displacement(30.0);
        assert_relative_eq!(shift.x, 15.0, epsilon = 1e-12);
        assert_relative_eq!(shift.y, -6.0, epsilon = 1e-12);
    }
}
