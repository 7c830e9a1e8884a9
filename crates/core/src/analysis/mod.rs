//! Sample-based analysis
//!
//! Clusters environmental readings, reconstructs a continuous concentration
//! surface from them, and locates where that surface is lowest.

pub mod clustering;
pub mod interpolation;
pub mod locator;
pub mod triangulation;

pub use clustering::{
    fit_clusters, fit_clusters_with, lowest_concentration_cluster, summarize_clusters,
    ClusterAssignment, ClusterSummary, KMeansConfig,
};
pub use interpolation::{
    interpolate_surface, spanning_grid, CloughTocherInterpolator, InterpolatedSurface,
};
pub use locator::{locate_below, locate_minimum, LowConcentrationPoint};
pub use triangulation::Triangulation;
