//! End-to-end scenario run
//!
//! The modeled side (plume field and animation frames) and the sampled side
//! (readings, clusters, interpolated surface, low point) never exchange data.
//! Both are driven from one [`ScenarioConfig`].

pub mod config;

pub use config::ScenarioConfig;

use crate::analysis::{
    fit_clusters_with, locate_minimum, lowest_concentration_cluster, spanning_grid,
    summarize_clusters, ClusterAssignment, ClusterSummary, CloughTocherInterpolator,
    InterpolatedSurface, LowConcentrationPoint,
};
use crate::core_types::Result;
use crate::dispersion::{compute_field, compute_series, ConcentrationField, FieldAnnotation};
use crate::sampling::{generate_samples, EnvironmentalSample};
use serde::Serialize;
use tracing::info;

/// Everything a scenario run produces
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    /// Display name of the attractant
    pub pheromone_name: String,
    /// Modeled field at the configured time step
    pub field: ConcentrationField,
    /// Scalar summary of `field`
    pub annotation: FieldAnnotation,
    /// Modeled field at every frame time
    pub frames: Vec<ConcentrationField>,
    /// Synthetic readings
    pub samples: Vec<EnvironmentalSample>,
    /// k-means partition of the readings
    pub clusters: ClusterAssignment,
    /// Per-cluster description, ordered by label
    pub cluster_summaries: Vec<ClusterSummary>,
    /// Interpolated concentration over the sample bounding box
    pub surface: InterpolatedSurface,
    /// Iterations the interpolant's gradient estimation needed
    pub gradient_iterations: usize,
    /// Lowest interpolated concentration
    pub low_point: LowConcentrationPoint,
    /// Label of the cluster with the lowest mean concentration
    pub dispensing_cluster: Option<usize>,
}

/// Run every stage of a scenario
///
/// # Errors
/// - `InvalidParameter` if the configuration is invalid
/// - `DegenerateInput` if the readings cannot support the requested clusters
/// - `EmptySurface` if the readings span no area to interpolate over
pub fn run_pipeline(config: &ScenarioConfig) -> Result<PipelineOutput> {
    config.validate()?;
    info!(
        "Running {} scenario: {} sources, t={:.1}, {} samples, k={}, seed={}",
        config.pheromone_name,
        config.sources.len(),
        config.time_step,
        config.sample_count,
        config.cluster_count,
        config.seed
    );

    let field = compute_field(
        &config.sources,
        config.time_step,
        config.wind,
        &config.plume,
        &config.field_grid,
    )?;
    let annotation = field.annotate(&config.plume, config.wind);
    let frames = compute_series(
        &config.sources,
        &config.frame_times,
        config.wind,
        &config.plume,
        &config.field_grid,
    )?;
    info!(
        "Modeled field: peak={:.6}, spread={:.2}, decay={:.4}, frames={}",
        annotation.peak_concentration,
        annotation.dispersion_radius,
        annotation.decay_multiplier,
        frames.len()
    );

    let samples = generate_samples(config.sample_count, &config.sample_ranges, Some(config.seed))?;
    let clusters = fit_clusters_with(&samples, config.cluster_count, config.seed, &config.kmeans)?;
    let cluster_summaries = summarize_clusters(&samples, &clusters)?;
    let dispensing_cluster = lowest_concentration_cluster(&cluster_summaries).map(|s| s.label);

    let grid = spanning_grid(&samples, config.interpolation_resolution)?;
    let interpolator = CloughTocherInterpolator::from_samples(&samples)?;
    let surface = interpolator.surface(&grid);
    let low_point = locate_minimum(&surface)?;
    info!(
        "Lowest interpolated concentration {:.2} at ({:.3}, {:.3}); {} of {} cells defined",
        low_point.concentration,
        low_point.latitude,
        low_point.longitude,
        surface.defined_count(),
        grid.len()
    );

    Ok(PipelineOutput {
        pheromone_name: config.pheromone_name.clone(),
        field,
        annotation,
        frames,
        samples,
        clusters,
        cluster_summaries,
        surface,
        gradient_iterations: interpolator.gradient_iterations(),
        low_point,
        dispensing_cluster,
    })
}
