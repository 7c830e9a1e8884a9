//! Core types and utilities

pub mod error;
pub mod grid;
pub mod units;
pub mod vec2;

pub use error::{PipelineError, Result};
pub use grid::EvaluationGrid;
pub use units::{MetersPerSecond, Percent};
pub use vec2::Vec2;
