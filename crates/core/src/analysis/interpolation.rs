//! Cubic scattered-data interpolation
//!
//! Reconstructs a continuous concentration surface from irregular readings
//! using the Clough-Tocher C1 interpolant on a Delaunay triangulation of the
//! reading locations.
//!
//! # Method
//!
//! 1. Triangulate the distinct (latitude, longitude) locations.
//! 2. Estimate a gradient at every vertex by minimising the approximate
//!    curvature of the piecewise cubic along every edge (Nielson's global
//!    method), iterated to a fixed tolerance.
//! 3. Split each triangle at its centroid into three cubic Bezier patches
//!    whose control points follow from vertex values, vertex gradients, and a
//!    cross-boundary continuity condition shared with the neighbour triangle.
//!
//! The interpolant reproduces the input values exactly at the vertices and
//! is undefined outside the convex hull.
//!
//! # References
//!
//! - Clough, R.W. & Tocher, J.L. (1965). Finite element stiffness matrices for
//!   analysis of plates in bending.
//! - Nielson, G.M. (1983). A method for interpolating scattered data based upon
//!   a minimum norm network. Mathematics of Computation, 40(161), 253-271.
//! - Renka, R.J. & Cline, A.K. (1984). A triangle-based C1 interpolation method.
//!   Rocky Mountain Journal of Mathematics, 14(1), 223-237.

use super::triangulation::Triangulation;
use crate::core_types::{EvaluationGrid, PipelineError, Result, Vec2};
use crate::sampling::EnvironmentalSample;
use nalgebra::{Matrix2, Vector2};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::{debug, warn};

/// Convergence tolerance of the gradient estimation
const GRADIENT_TOLERANCE: f64 = 1.0e-6;

/// Iteration cap of the gradient estimation
const GRADIENT_MAX_ITERATIONS: usize = 400;

/// C1 cubic interpolant over a Delaunay triangulation
#[derive(Debug, Clone)]
pub struct CloughTocherInterpolator {
    triangulation: Triangulation,
    values: Vec<f64>,
    gradients: Vec<Vec2>,
    gradient_iterations: usize,
}

impl CloughTocherInterpolator {
    /// Build the interpolant from points and their values
    ///
    /// Repeated locations keep the value of their first occurrence.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if the two slices differ in length or any
    /// coordinate or value is non-finite
    pub fn new(points: &[Vec2], values: &[f64]) -> Result<Self> {
        if points.len() != values.len() {
            return Err(PipelineError::invalid(
                "values",
                format!("{} values for {} points", values.len(), points.len()),
            ));
        }
        if points
            .iter()
            .any(|p| !p.x.is_finite() || !p.y.is_finite())
            || values.iter().any(|v| !v.is_finite())
        {
            return Err(PipelineError::invalid(
                "points",
                "coordinates and values must be finite",
            ));
        }

        let mut seen = FxHashSet::default();
        let mut unique_points = Vec::with_capacity(points.len());
        let mut unique_values = Vec::with_capacity(values.len());
        for (p, &v) in points.iter().zip(values) {
            if seen.insert(location_key(*p)) {
                unique_points.push(*p);
                unique_values.push(v);
            }
        }
        if unique_points.len() < points.len() {
            debug!(
                "Dropped {} duplicate interpolation locations",
                points.len() - unique_points.len()
            );
        }

        let triangulation = Triangulation::new(unique_points);
        if triangulation.is_empty() {
            warn!(
                "No triangle could be formed from {} locations; surface will be undefined",
                triangulation.points().len()
            );
        }

        let (gradients, gradient_iterations) =
            estimate_gradients(&triangulation, &unique_values);

        debug!(
            "Clough-Tocher interpolant: {} vertices, {} triangles, gradient iterations={}",
            triangulation.points().len(),
            triangulation.len(),
            gradient_iterations
        );

        Ok(Self {
            triangulation,
            values: unique_values,
            gradients,
            gradient_iterations,
        })
    }

    /// Build the interpolant over sample locations and their derived concentration
    ///
    /// # Errors
    /// Returns `InvalidParameter` if any sample carries a non-finite field
    pub fn from_samples(samples: &[EnvironmentalSample]) -> Result<Self> {
        let points: Vec<Vec2> = samples.iter().map(EnvironmentalSample::location).collect();
        let values: Vec<f64> = samples.iter().map(|s| s.concentration).collect();
        Self::new(&points, &values)
    }

    /// Underlying triangulation
    pub fn triangulation(&self) -> &Triangulation {
        &self.triangulation
    }

    /// Estimated gradient at every vertex
    pub fn gradients(&self) -> &[Vec2] {
        &self.gradients
    }

    /// Iterations the gradient estimation used
    pub fn gradient_iterations(&self) -> usize {
        self.gradient_iterations
    }

    /// Interpolated value at `p`, or `None` outside the convex hull
    pub fn evaluate_at(&self, p: Vec2) -> Option<f64> {
        let (t, b) = self.triangulation.locate(p)?;
        let value = self.evaluate_in(t, b);
        value.is_finite().then_some(value)
    }

    /// Evaluate on every cell of `grid`
    pub fn surface(&self, grid: &EvaluationGrid) -> InterpolatedSurface {
        let mut values: Vec<Option<f64>> = vec![None; grid.len()];
        if !self.triangulation.is_empty() {
            values
                .par_chunks_mut(grid.nx)
                .enumerate()
                .for_each(|(j, row)| {
                    for (i, cell) in row.iter_mut().enumerate() {
                        *cell = self.evaluate_at(grid.point(i, j));
                    }
                });
        }
        let surface = InterpolatedSurface {
            grid: *grid,
            values,
        };
        debug!(
            "Interpolated surface: {}/{} cells defined",
            surface.defined_count(),
            grid.len()
        );
        surface
    }

    /// Evaluate the Bezier patches of triangle `t` at barycentric coordinates `b`
    fn evaluate_in(&self, t: usize, b: [f64; 3]) -> f64 {
        let tri = self.triangulation.triangles()[t];
        let pts = self.triangulation.points();
        let (x0, x1, x2) = (pts[tri[0]], pts[tri[1]], pts[tri[2]]);
        let (f1, f2, f3) = (self.values[tri[0]], self.values[tri[1]], self.values[tri[2]]);
        let (g1, g2, g3) = (
            self.gradients[tri[0]],
            self.gradients[tri[1]],
            self.gradients[tri[2]],
        );

        let e12 = x1 - x0;
        let e23 = x2 - x1;
        let e31 = x0 - x2;

        // Directional derivatives along the triangle edges
        let df12 = g1.dot(&e12);
        let df21 = -g2.dot(&e12);
        let df23 = g2.dot(&e23);
        let df32 = -g3.dot(&e23);
        let df31 = g3.dot(&e31);
        let df13 = -g1.dot(&e31);

        // Control points next to the vertices
        let c3000 = f1;
        let c2100 = (df12 + 3.0 * c3000) / 3.0;
        let c2010 = (df13 + 3.0 * c3000) / 3.0;
        let c0300 = f2;
        let c1200 = (df21 + 3.0 * c0300) / 3.0;
        let c0210 = (df23 + 3.0 * c0300) / 3.0;
        let c0030 = f3;
        let c1020 = (df31 + 3.0 * c0030) / 3.0;
        let c0120 = (df32 + 3.0 * c0030) / 3.0;

        let c2001 = (c2100 + c2010 + c3000) / 3.0;
        let c0201 = (c1200 + c0300 + c0210) / 3.0;
        let c0021 = (c1020 + c0120 + c0030) / 3.0;

        // Cross-boundary derivative must be linear along each edge. The
        // direction is taken towards the neighbour's centroid so both sides
        // agree; boundary edges fall back to the median direction.
        let mut g = [-0.5; 3];
        for (k, neighbor) in self.triangulation.neighbors(t).iter().enumerate() {
            let Some(n) = *neighbor else { continue };
            let c = self
                .triangulation
                .barycentric(t, self.triangulation.centroid(n));
            g[k] = match k {
                0 => (2.0 * c[2] + c[1] - 1.0) / (2.0 - 3.0 * c[2] - 3.0 * c[1]),
                1 => (2.0 * c[0] + c[2] - 1.0) / (2.0 - 3.0 * c[0] - 3.0 * c[2]),
                _ => (2.0 * c[1] + c[0] - 1.0) / (2.0 - 3.0 * c[1] - 3.0 * c[0]),
            };
        }

        let c0111 = (g[0] * (-c0300 + 3.0 * c0210 - 3.0 * c0120 + c0030)
            + (-c0300 + 2.0 * c0210 - c0120 + c0021 + c0201))
            / 2.0;
        let c1011 = (g[1] * (-c0030 + 3.0 * c1020 - 3.0 * c2010 + c3000)
            + (-c0030 + 2.0 * c1020 - c2010 + c2001 + c0021))
            / 2.0;
        let c1101 = (g[2] * (-c3000 + 3.0 * c2100 - 3.0 * c1200 + c0300)
            + (-c3000 + 2.0 * c2100 - c1200 + c2001 + c0201))
            / 2.0;

        let c1002 = (c1101 + c1011 + c2001) / 3.0;
        let c0102 = (c1101 + c0111 + c0201) / 3.0;
        let c0012 = (c1011 + c0111 + c0021) / 3.0;

        let c0003 = (c1002 + c0102 + c0012) / 3.0;

        // Coordinates within the micro-triangle; one of b1..b3 is zero
        let min = b[0].min(b[1]).min(b[2]);
        let b1 = b[0] - min;
        let b2 = b[1] - min;
        let b3 = b[2] - min;
        let b4 = 3.0 * min;

        b1.powi(3) * c3000
            + 3.0 * b1 * b1 * b2 * c2100
            + 3.0 * b1 * b1 * b3 * c2010
            + 3.0 * b1 * b1 * b4 * c2001
            + 3.0 * b1 * b2 * b2 * c1200
            + 6.0 * b1 * b2 * b4 * c1101
            + 3.0 * b1 * b3 * b3 * c1020
            + 6.0 * b1 * b3 * b4 * c1011
            + 3.0 * b1 * b4 * b4 * c1002
            + b2.powi(3) * c0300
            + 3.0 * b2 * b2 * b3 * c0210
            + 3.0 * b2 * b2 * b4 * c0201
            + 6.0 * b2 * b3 * b4 * c0111
            + 3.0 * b2 * b4 * b4 * c0102
            + b3.powi(3) * c0030
            + 3.0 * b3 * b3 * b4 * c0021
            + 3.0 * b3 * b4 * b4 * c0012
            + b4.powi(3) * c0003
    }
}

/// Hashable key for a location; `-0.0` and `0.0` collapse to one key
fn location_key(p: Vec2) -> (u64, u64) {
    ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits())
}

/// Nielson's minimum-norm-network gradient estimate, solved by Gauss-Seidel sweeps
fn estimate_gradients(triangulation: &Triangulation, values: &[f64]) -> (Vec<Vec2>, usize) {
    let points = triangulation.points();
    let mut gradients = vec![Vec2::zeros(); points.len()];
    if triangulation.is_empty() {
        return (gradients, 0);
    }
    let adjacency = triangulation.vertex_neighbors();

    for iteration in 1..=GRADIENT_MAX_ITERATIONS {
        let mut max_change: f64 = 0.0;

        for (i, neighbors) in adjacency.iter().enumerate() {
            if neighbors.is_empty() {
                continue;
            }
            let mut q = Matrix2::<f64>::zeros();
            let mut s = Vector2::<f64>::zeros();

            for &j in neighbors {
                let e = points[j] - points[i];
                let length = e.norm();
                let l3 = length * length * length;
                let df2 = -e.dot(&gradients[j]);
                let weight = 6.0 * (values[i] - values[j]) - 2.0 * df2;

                q += (e * e.transpose()) * (4.0 / l3);
                s += e * (weight / l3);
            }

            let Some(inverse) = q.try_inverse() else {
                continue;
            };
            let r = inverse * s;
            let updated = -r;

            let change = (gradients[i] - updated).amax() / r.amax().max(1.0);
            max_change = max_change.max(change);
            gradients[i] = updated;
        }

        if max_change < GRADIENT_TOLERANCE {
            return (gradients, iteration);
        }
    }

    warn!(
        "Gradient estimation hit the iteration cap ({}) before converging",
        GRADIENT_MAX_ITERATIONS
    );
    (gradients, GRADIENT_MAX_ITERATIONS)
}

/// Dense grid of interpolated values; `None` marks cells outside the hull
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterpolatedSurface {
    grid: EvaluationGrid,
    values: Vec<Option<f64>>,
}

impl InterpolatedSurface {
    /// Wrap precomputed cell values
    ///
    /// # Errors
    /// Returns `InvalidParameter` if the grid is invalid or the value count
    /// does not match the grid
    pub fn from_values(grid: EvaluationGrid, values: Vec<Option<f64>>) -> Result<Self> {
        grid.validate()?;
        if values.len() != grid.len() {
            return Err(PipelineError::invalid(
                "values",
                format!("{} cells for a {}x{} grid", values.len(), grid.nx, grid.ny),
            ));
        }
        Ok(Self { grid, values })
    }

    /// Grid the surface was evaluated on (x = latitude, y = longitude)
    pub fn grid(&self) -> &EvaluationGrid {
        &self.grid
    }

    /// Row-major cell values
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Value at column `i`, row `j`
    pub fn value_at(&self, i: usize, j: usize) -> Option<f64> {
        self.values[self.grid.index(i, j)]
    }

    /// Number of cells inside the hull
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// True if no cell is defined
    pub fn is_empty(&self) -> bool {
        self.defined_count() == 0
    }

    /// Defined cells in row-major scan order as `(flat index, value)`
    pub fn defined(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(idx, v)| v.map(|value| (idx, value)))
    }
}

/// Grid covering the bounding box of the sample locations
///
/// A degenerate extent along either axis is padded by half a unit on each
/// side so the grid stays valid; such inputs interpolate to an empty surface.
///
/// # Errors
/// Returns `InvalidParameter` if there are no samples or `resolution < 2`
pub fn spanning_grid(samples: &[EnvironmentalSample], resolution: usize) -> Result<EvaluationGrid> {
    let Some(first) = samples.first() else {
        return Err(PipelineError::invalid(
            "samples",
            "cannot span a grid over zero samples",
        ));
    };
    let (mut lat_min, mut lat_max) = (first.latitude, first.latitude);
    let (mut lon_min, mut lon_max) = (first.longitude, first.longitude);
    for s in samples {
        lat_min = lat_min.min(s.latitude);
        lat_max = lat_max.max(s.latitude);
        lon_min = lon_min.min(s.longitude);
        lon_max = lon_max.max(s.longitude);
    }
    if lat_min >= lat_max {
        lat_min -= 0.5;
        lat_max += 0.5;
    }
    if lon_min >= lon_max {
        lon_min -= 0.5;
        lon_max += 0.5;
    }
    EvaluationGrid::new(lat_min, lat_max, resolution, lon_min, lon_max, resolution)
}

/// Interpolate sample concentrations onto a grid
///
/// # Errors
/// Returns `InvalidParameter` if the grid is invalid or a sample is non-finite
pub fn interpolate_surface(
    samples: &[EnvironmentalSample],
    grid: &EvaluationGrid,
) -> Result<InterpolatedSurface> {
    grid.validate()?;
    let interpolator = CloughTocherInterpolator::from_samples(samples)?;
    Ok(interpolator.surface(grid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn scattered(n: usize) -> Vec<Vec2> {
        let mut rng = StdRng::seed_from_u64(11);
        (0..n)
            .map(|_| Vec2::new(rng.random_range(0.5..9.5), rng.random_range(0.5..9.5)))
            .collect()
    }

    #[test]
    fn test_exact_at_vertices() {
        let points = scattered(60);
        let values: Vec<f64> = points.iter().map(|p| (p.x * 0.7).sin() + p.y * p.y * 0.1).collect();
        let interp = CloughTocherInterpolator::new(&points, &values).unwrap();

        for (p, v) in points.iter().zip(&values) {
            if let Some(got) = interp.evaluate_at(*p) {
                assert_relative_eq!(got, *v, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_reproduces_linear_function() {
        let points = scattered(80);
        let f = |p: &Vec2| 2.0 * p.x - 3.0 * p.y + 1.0;
        let values: Vec<f64> = points.iter().map(f).collect();
        let interp = CloughTocherInterpolator::new(&points, &values).unwrap();

        for g in interp.gradients() {
            assert_relative_eq!(g.x, 2.0, epsilon = 1e-2);
            assert_relative_eq!(g.y, -3.0, epsilon = 1e-2);
        }
        let probe = Vec2::new(5.0, 5.0);
        if let Some(value) = interp.evaluate_at(probe) {
            assert_relative_eq!(value, f(&probe), epsilon = 1e-2);
        }
    }

    #[test]
    fn test_outside_hull_is_undefined() {
        let points = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
        ];
        let interp = CloughTocherInterpolator::new(&points, &[1.0, 2.0, 3.0]).unwrap();
        assert!(interp.evaluate_at(Vec2::new(0.9, 0.9)).is_none());
        assert!(interp.evaluate_at(Vec2::new(0.2, 0.2)).is_some());
    }

    #[test]
    fn test_duplicates_keep_first_value() {
        let points = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(0.0, 0.0),
        ];
        let interp = CloughTocherInterpolator::new(&points, &[1.0, 2.0, 3.0, 99.0]).unwrap();
        assert_relative_eq!(
            interp.evaluate_at(Vec2::new(0.0, 0.0)).unwrap(),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = CloughTocherInterpolator::new(&[Vec2::new(0.0, 0.0)], &[]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter { .. }));
    }

    #[test]
    fn test_collinear_surface_is_empty() {
        let samples: Vec<EnvironmentalSample> = (0..5)
            .map(|k| {
                let k = f64::from(k);
                EnvironmentalSample::new(
                    10.0 + k,
                    30.0 + k,
                    crate::MetersPerSecond::new(1.0),
                    crate::Percent::new(50.0),
                )
            })
            .collect();
        let grid = spanning_grid(&samples, 10).unwrap();
        let surface = interpolate_surface(&samples, &grid).unwrap();
        assert!(surface.is_empty());
    }
}
