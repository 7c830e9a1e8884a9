//! Attractant Dispersion Core Library
//!
//! Models how a volatile attractant (a pheromone analog) spreads over a 2-D
//! field from multiple point release sources under wind advection and time
//! decay, and analyses independently sampled environmental readings to find
//! regions where supplemental dispensing is needed.
//!
//! ## Pipeline
//!
//! The modeled side and the sampled side are independent:
//! - `dispersion`: isotropic Gaussian plumes advected by wind, summed over all
//!   sources and attenuated by a single global decay clock
//! - `sampling`: seeded synthetic readings with a closed-form concentration estimate
//! - `analysis`: k-means clustering, Clough-Tocher cubic interpolation on a
//!   Delaunay triangulation, and low-concentration location
//! - `pipeline`: one explicit [`ScenarioConfig`] threaded through every stage
//!
//! Every stage is a pure function of its inputs. Randomness always comes from an
//! explicitly seeded generator, so identical configurations give identical output.

// Core types and utilities
pub mod core_types;

// Physically modeled concentration field
pub mod dispersion;

// Sample-based analysis
pub mod analysis;
pub mod sampling;

// Orchestration
pub mod pipeline;

// Re-export core types
pub use core_types::{EvaluationGrid, MetersPerSecond, Percent, PipelineError, Result, Vec2};

// Re-export dispersion types
pub use dispersion::{
    compute_field, compute_series, evaluate_plume, ConcentrationField, DensitySurface,
    FieldAnnotation, GridPeak, PlumeParameters, Source, WindVector,
};

// Re-export analysis types
pub use analysis::{
    fit_clusters, fit_clusters_with, interpolate_surface, locate_below, locate_minimum,
    summarize_clusters, ClusterAssignment, ClusterSummary, CloughTocherInterpolator,
    InterpolatedSurface, KMeansConfig, LowConcentrationPoint, Triangulation,
};
pub use sampling::{
    estimate_concentration, generate_samples, generate_samples_with, EnvironmentalSample,
    SampleRanges, ValueRange,
};

// Re-export orchestration types
pub use pipeline::{run_pipeline, PipelineOutput, ScenarioConfig};
