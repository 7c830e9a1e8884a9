//! Scenario configuration
//!
//! One explicit bundle replaces every piece of ambient state a run needs.
//! Missing fields fall back to the reference farm scenario when deserialised.

use crate::analysis::KMeansConfig;
use crate::core_types::{EvaluationGrid, PipelineError, Result};
use crate::dispersion::{validate_time, PlumeParameters, Source, WindVector};
use crate::sampling::SampleRanges;
use serde::{Deserialize, Serialize};

/// Everything a pipeline run depends on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Display name of the attractant
    pub pheromone_name: String,
    /// Mesh the modeled field is evaluated on
    pub field_grid: EvaluationGrid,
    /// Release points
    pub sources: Vec<Source>,
    /// Constant advection vector
    pub wind: WindVector,
    /// Spread, growth, and decay parameters
    pub plume: PlumeParameters,
    /// Time step of the reported field
    pub time_step: f64,
    /// Time steps of the animation frames
    pub frame_times: Vec<f64>,
    /// Number of synthetic readings
    pub sample_count: usize,
    /// Ranges the readings are drawn from
    pub sample_ranges: SampleRanges,
    /// Number of k-means clusters
    pub cluster_count: usize,
    /// k-means iteration controls
    pub kmeans: KMeansConfig,
    /// Seed shared by sampling and clustering
    pub seed: u64,
    /// Points per axis of the interpolation grid
    pub interpolation_resolution: usize,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            pheromone_name: "Ferrugineol".to_string(),
            field_grid: EvaluationGrid {
                x_min: 0.0,
                x_max: 50.0,
                nx: 50,
                y_min: 0.0,
                y_max: 50.0,
                ny: 50,
            },
            sources: vec![Source::new(25.0, 25.0), Source::new(10.0, 40.0)],
            wind: WindVector::new(0.5, -0.2),
            plume: PlumeParameters::default(),
            time_step: 30.0,
            frame_times: vec![0.0, 10.0, 20.0, 30.0],
            sample_count: 500,
            sample_ranges: SampleRanges::default(),
            cluster_count: 3,
            kmeans: KMeansConfig::default(),
            seed: 42,
            interpolation_resolution: 100,
        }
    }
}

impl ScenarioConfig {
    /// Check every field before any computation starts
    ///
    /// # Errors
    /// Returns `InvalidParameter` naming the first invalid field
    pub fn validate(&self) -> Result<()> {
        self.field_grid.validate()?;
        self.plume.validate()?;
        validate_time(self.time_step)?;
        for &t in &self.frame_times {
            validate_time(t)?;
        }

        if self
            .sources
            .iter()
            .any(|s| !s.x.is_finite() || !s.y.is_finite())
        {
            return Err(PipelineError::invalid("sources", "coordinates must be finite"));
        }
        if !self.wind.x.is_finite() || !self.wind.y.is_finite() {
            return Err(PipelineError::invalid("wind", "components must be finite"));
        }

        self.sample_ranges.validate()?;
        if self.sample_count == 0 {
            return Err(PipelineError::invalid("sample_count", "must be at least 1"));
        }
        if self.cluster_count == 0 {
            return Err(PipelineError::invalid("cluster_count", "must be at least 1"));
        }
        self.kmeans.validate()?;
        if self.interpolation_resolution < 2 {
            return Err(PipelineError::invalid(
                "interpolation_resolution",
                format!("must be at least 2, got {}", self.interpolation_resolution),
            ));
        }
        Ok(())
    }
}
