//! Sample analysis integration tests
//!
//! Exercises the sampled side end to end: synthetic readings, k-means
//! clustering, Clough-Tocher interpolation, and the low-concentration search.

use approx::assert_relative_eq;
use ctor::ctor;
use pheromone_field_core::analysis::spanning_grid;
use pheromone_field_core::{
    estimate_concentration, fit_clusters, generate_samples, interpolate_surface, locate_below,
    locate_minimum, summarize_clusters, CloughTocherInterpolator, MetersPerSecond, Percent,
    PipelineError, SampleRanges, ValueRange,
};
use tracing_subscriber::EnvFilter;

#[ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn still_saturated_air_gives_reference_concentration() {
    let ranges = SampleRanges {
        wind_speed: ValueRange::fixed(0.0),
        humidity: ValueRange::fixed(100.0),
        ..Default::default()
    };
    let samples = generate_samples(500, &ranges, Some(42)).unwrap();
    assert_eq!(samples.len(), 500);
    assert!(samples.iter().all(|s| s.concentration == 100.0));
}

#[test]
fn concentration_falls_with_wind_and_rises_with_humidity() {
    let humidity = Percent::new(60.0);
    let speeds = [0.0, 1.0, 2.5, 5.0, 10.0];
    for pair in speeds.windows(2) {
        let calm = estimate_concentration(MetersPerSecond::new(pair[0]), humidity);
        let windy = estimate_concentration(MetersPerSecond::new(pair[1]), humidity);
        assert!(windy < calm);
    }

    let wind = MetersPerSecond::new(3.0);
    let humidities = [20.0, 40.0, 80.0, 100.0];
    for pair in humidities.windows(2) {
        let dry = estimate_concentration(wind, Percent::new(pair[0]));
        let humid = estimate_concentration(wind, Percent::new(pair[1]));
        assert!(humid > dry);
    }
}

#[test]
fn clustering_is_reproducible_for_a_seed() {
    let samples = generate_samples(500, &SampleRanges::default(), Some(42)).unwrap();
    let first = fit_clusters(&samples, 3, 42).unwrap();
    let second = fit_clusters(&samples, 3, 42).unwrap();

    assert_eq!(first.labels, second.labels);
    assert_eq!(first.centroids, second.centroids);
    assert_eq!(first.inertia, second.inertia);

    // Every cluster is populated and labels partition the readings
    let sizes = first.sizes();
    assert_eq!(sizes.len(), 3);
    assert!(sizes.iter().all(|&n| n > 0));
    assert_eq!(sizes.iter().sum::<usize>(), 500);

    let summaries = summarize_clusters(&samples, &first).unwrap();
    for (summary, centroid) in summaries.iter().zip(&first.centroids) {
        assert_relative_eq!(summary.centroid_latitude, centroid.x, max_relative = 1e-9);
        assert_relative_eq!(summary.mean_concentration, centroid.z, max_relative = 1e-9);
        assert!(summary.min_concentration <= summary.mean_concentration);
        assert!(summary.mean_concentration <= summary.max_concentration);
    }
}

#[test]
fn clustering_rejects_impossible_requests() {
    let samples = generate_samples(50, &SampleRanges::default(), Some(3)).unwrap();
    assert!(matches!(
        fit_clusters(&samples, 0, 3),
        Err(PipelineError::InvalidParameter { .. })
    ));

    let identical = SampleRanges {
        latitude: ValueRange::fixed(15.0),
        longitude: ValueRange::fixed(35.0),
        wind_speed: ValueRange::fixed(2.0),
        humidity: ValueRange::fixed(70.0),
    };
    let samples = generate_samples(20, &identical, Some(3)).unwrap();
    assert!(matches!(
        fit_clusters(&samples, 2, 3),
        Err(PipelineError::DegenerateInput(_))
    ));
    assert!(fit_clusters(&samples, 1, 3).is_ok());
}

#[test]
fn interpolation_reproduces_readings() {
    let samples = generate_samples(200, &SampleRanges::default(), Some(42)).unwrap();
    let interpolator = CloughTocherInterpolator::from_samples(&samples).unwrap();
    assert!(!interpolator.triangulation().is_empty());

    for s in samples.iter().take(50) {
        let value = interpolator.evaluate_at(s.location()).unwrap();
        assert_relative_eq!(value, s.concentration, epsilon = 1e-8);
    }

    // Far outside the sampled box there is nothing to interpolate
    assert!(interpolator
        .evaluate_at(pheromone_field_core::Vec2::new(0.0, 0.0))
        .is_none());
}

#[test]
fn low_point_is_the_surface_minimum() {
    let samples = generate_samples(300, &SampleRanges::default(), Some(7)).unwrap();
    let grid = spanning_grid(&samples, 40).unwrap();
    let surface = interpolate_surface(&samples, &grid).unwrap();
    assert!(surface.defined_count() > 0);

    let low = locate_minimum(&surface).unwrap();
    let minimum = surface
        .defined()
        .map(|(_, v)| v)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(low.concentration, minimum);
    assert_eq!(surface.value_at(low.column, low.row), Some(minimum));

    let below = locate_below(&surface, minimum + 5.0);
    assert_eq!(below.first().map(|p| (p.column, p.row)), Some((low.column, low.row)));
    assert!(below.iter().all(|p| p.concentration < minimum + 5.0));
    assert!(below.windows(2).all(|w| w[0].concentration <= w[1].concentration));
}

#[test]
fn collinear_readings_leave_an_empty_surface() {
    let ranges = SampleRanges {
        latitude: ValueRange::fixed(12.0),
        ..Default::default()
    };
    let samples = generate_samples(30, &ranges, Some(5)).unwrap();
    let grid = spanning_grid(&samples, 10).unwrap();
    let surface = interpolate_surface(&samples, &grid).unwrap();

    assert!(surface.is_empty());
    assert!(matches!(
        locate_minimum(&surface),
        Err(PipelineError::EmptySurface)
    ));
}
