//! Reference farm scenario run through the full pipeline

use approx::assert_relative_eq;
use ctor::ctor;
use pheromone_field_core::{run_pipeline, PipelineError, ScenarioConfig, Source};
use tracing_subscriber::EnvFilter;

#[ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn reference_scenario() {
    let config = ScenarioConfig::default();
    let output = run_pipeline(&config).unwrap();

    assert_eq!(output.pheromone_name, "Ferrugineol");
    assert_relative_eq!(output.annotation.time, 30.0);
    assert_relative_eq!(output.annotation.decay_multiplier, (-1.5_f64).exp(), epsilon = 1e-12);
    assert_relative_eq!(output.annotation.dispersion_radius, 11.0, epsilon = 1e-12);
    assert_eq!(output.field.grid().len(), 2500);
    assert_eq!(output.frames.len(), 4);

    assert_eq!(output.samples.len(), 500);
    assert_eq!(output.clusters.labels.len(), 500);
    assert_eq!(output.cluster_summaries.len(), 3);
    let dispensing = output.dispensing_cluster.unwrap();
    let lowest_mean = output
        .cluster_summaries
        .iter()
        .map(|s| s.mean_concentration)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(
        output.cluster_summaries[dispensing].mean_concentration,
        lowest_mean
    );

    // The low point lies inside the sampled box and beneath every reading nearby
    let grid = output.surface.grid();
    assert_eq!((grid.nx, grid.ny), (100, 100));
    let low = output.low_point;
    assert!((10.0..=20.0).contains(&low.latitude));
    assert!((30.0..=40.0).contains(&low.longitude));
    assert!(output
        .surface
        .defined()
        .all(|(_, v)| v >= low.concentration));
}

#[test]
fn identical_configs_give_identical_results() {
    let config = ScenarioConfig {
        sample_count: 120,
        interpolation_resolution: 30,
        ..Default::default()
    };
    let a = run_pipeline(&config).unwrap();
    let b = run_pipeline(&config).unwrap();

    assert_eq!(a.field, b.field);
    assert_eq!(a.samples, b.samples);
    assert_eq!(a.clusters, b.clusters);
    assert_eq!(a.surface, b.surface);
    assert_eq!(a.low_point, b.low_point);

    let reseeded = ScenarioConfig { seed: 43, ..config };
    let c = run_pipeline(&reseeded).unwrap();
    assert_ne!(a.samples, c.samples);
    assert_eq!(a.field, c.field);
}

#[test]
fn sources_can_be_reconfigured() {
    let config = ScenarioConfig {
        sources: vec![Source::new(5.0, 5.0)],
        time_step: 0.0,
        sample_count: 40,
        interpolation_resolution: 10,
        ..Default::default()
    };
    let output = run_pipeline(&config).unwrap();
    let peak = output.field.peak();
    assert!((peak.x - 5.0).abs() <= output.field.grid().dx());
    assert!((peak.y - 5.0).abs() <= output.field.grid().dy());
}

#[test]
fn too_many_clusters_is_degenerate() {
    let config = ScenarioConfig {
        sample_count: 4,
        cluster_count: 5,
        interpolation_resolution: 10,
        ..Default::default()
    };
    assert!(matches!(
        run_pipeline(&config),
        Err(PipelineError::DegenerateInput(_))
    ));
}
