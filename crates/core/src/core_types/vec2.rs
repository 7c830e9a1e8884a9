//! Vector type alias for planar positions and directions.

use nalgebra::Vector2;

/// 2D vector type for positions, displacements, and gradients.
///
/// This is a simple alias for `nalgebra::Vector2<f64>`, used for release
/// sources, wind advection, plume means, and interpolation gradients.
/// Double precision keeps density values meaningful far into the tails.
pub type Vec2 = Vector2<f64>;
