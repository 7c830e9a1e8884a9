//! K-means partitioning of environmental readings
//!
//! Readings are clustered on the unnormalised feature vector
//! `(latitude, longitude, concentration)`.
//!
//! # Algorithm
//!
//! 1. **Seeding**: k-means++ driven by an explicitly seeded `StdRng`.
//! 2. **Lloyd iterations**: assign every reading to its nearest centroid
//!    (ties go to the lowest label), then move each centroid to the mean of
//!    its members.
//! 3. **Convergence**: stop once the summed squared centroid shift is at most
//!    `tolerance × mean feature variance`, or after `max_iterations`.
//! 4. **Restarts**: `restarts` independent seedings from the same generator;
//!    the lowest inertia wins, earliest on ties.
//!
//! # Empty clusters
//!
//! A cluster left without members is reseeded: the reading farthest from its
//! own centroid, taken from a cluster that can spare a member, moves into the
//! empty cluster (ties go to the lowest reading index). Only readings at a
//! positive distance from their centroid qualify; when none is left the fit
//! fails with `DegenerateInput`. Labels therefore always partition the
//! readings into exactly `k` non-empty groups.

use crate::core_types::{PipelineError, Result};
use crate::sampling::EnvironmentalSample;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Feature vector `(latitude, longitude, concentration)`
pub type Feature = Vector3<f64>;

/// Iteration controls for k-means
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KMeansConfig {
    /// Lloyd iteration cap per restart
    pub max_iterations: usize,
    /// Relative convergence tolerance on centroid movement
    pub tolerance: f64,
    /// Number of independent seedings
    pub restarts: usize,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            tolerance: 1e-4,
            restarts: 1,
        }
    }
}

impl KMeansConfig {
    /// Check the iteration controls
    ///
    /// # Errors
    /// Returns `InvalidParameter` for a zero iteration cap, zero restarts, or a
    /// negative or non-finite tolerance
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(PipelineError::invalid(
                "kmeans.max_iterations",
                "must be at least 1",
            ));
        }
        if self.restarts == 0 {
            return Err(PipelineError::invalid("kmeans.restarts", "must be at least 1"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(PipelineError::invalid(
                "kmeans.tolerance",
                format!("must be non-negative and finite, got {}", self.tolerance),
            ));
        }
        Ok(())
    }
}

/// Result of a k-means fit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAssignment {
    /// Cluster label of every reading, in input order
    pub labels: Vec<usize>,
    /// Final centroid of every cluster
    pub centroids: Vec<Feature>,
    /// Sum of squared distances from readings to their centroid
    pub inertia: f64,
    /// Lloyd iterations used by the winning restart
    pub iterations: usize,
    /// Whether the winning restart met the tolerance before the cap
    pub converged: bool,
    /// Empty-cluster reseeds performed by the winning restart
    pub reseeds: usize,
}

impl ClusterAssignment {
    /// Number of clusters
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Indices of the readings carrying `label`
    pub fn members(&self, label: usize) -> impl Iterator<Item = usize> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(move |(_, l)| **l == label)
            .map(|(idx, _)| idx)
    }

    /// Member count of every cluster
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Feature vector of a reading
pub fn feature(sample: &EnvironmentalSample) -> Feature {
    Feature::new(sample.latitude, sample.longitude, sample.concentration)
}

/// Cluster readings into `k` groups with default iteration controls
///
/// # Errors
/// See [`fit_clusters_with`]
pub fn fit_clusters(
    samples: &[EnvironmentalSample],
    k: usize,
    seed: u64,
) -> Result<ClusterAssignment> {
    fit_clusters_with(samples, k, seed, &KMeansConfig::default())
}

/// Cluster readings into `k` groups
///
/// # Errors
/// - `InvalidParameter` if `k == 0` or the configuration is invalid
/// - `DegenerateInput` if `k` exceeds the number of distinct feature vectors
pub fn fit_clusters_with(
    samples: &[EnvironmentalSample],
    k: usize,
    seed: u64,
    config: &KMeansConfig,
) -> Result<ClusterAssignment> {
    if k == 0 {
        return Err(PipelineError::invalid("cluster_count", "must be at least 1"));
    }
    config.validate()?;

    let features: Vec<Feature> = samples.iter().map(feature).collect();
    let distinct = count_distinct(&features);
    if k > distinct {
        return Err(PipelineError::DegenerateInput(format!(
            "requested {k} clusters but only {distinct} distinct readings are available"
        )));
    }

    let tolerance = config.tolerance * mean_variance(&features);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut best: Option<ClusterAssignment> = None;
    for restart in 0..config.restarts {
        let initial = kmeans_plus_plus(&features, k, &mut rng)?;
        let run = lloyd(&features, initial, config.max_iterations, tolerance)?;
        debug!(
            "k-means restart {}: inertia={:.4}, iterations={}, converged={}",
            restart, run.inertia, run.iterations, run.converged
        );
        if best.as_ref().is_none_or(|b| run.inertia < b.inertia) {
            best = Some(run);
        }
    }

    let best = best.ok_or_else(|| {
        PipelineError::DegenerateInput("k-means produced no result".to_string())
    })?;
    if !best.converged {
        warn!(
            "k-means stopped at the iteration cap ({}) without converging",
            config.max_iterations
        );
    }
    info!(
        "Clustered {} readings into {} groups: inertia={:.4}, iterations={}",
        samples.len(),
        k,
        best.inertia,
        best.iterations
    );
    Ok(best)
}

fn count_distinct(features: &[Feature]) -> usize {
    features
        .iter()
        .map(|f| {
            (
                (f.x + 0.0).to_bits(),
                (f.y + 0.0).to_bits(),
                (f.z + 0.0).to_bits(),
            )
        })
        .collect::<FxHashSet<_>>()
        .len()
}

/// Mean of the per-feature variances, used to scale the tolerance
fn mean_variance(features: &[Feature]) -> f64 {
    let n = features.len() as f64;
    let mean = features.iter().fold(Feature::zeros(), |acc, f| acc + f) / n;
    let variance = features
        .iter()
        .fold(Feature::zeros(), |acc, f| acc + (f - mean).component_mul(&(f - mean)))
        / n;
    variance.mean()
}

fn kmeans_plus_plus(features: &[Feature], k: usize, rng: &mut StdRng) -> Result<Vec<Feature>> {
    let n = features.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(features[rng.random_range(0..n)]);

    let mut closest: Vec<f64> = features
        .iter()
        .map(|f| (f - centroids[0]).norm_squared())
        .collect();

    while centroids.len() < k {
        let total: f64 = closest.iter().sum();
        if total <= 0.0 {
            return Err(PipelineError::DegenerateInput(
                "every reading coincides with an existing centroid".to_string(),
            ));
        }
        let target = rng.random::<f64>() * total;
        let mut cumulative = 0.0;
        let mut chosen = None;
        for (idx, &d) in closest.iter().enumerate() {
            if d <= 0.0 {
                continue;
            }
            cumulative += d;
            chosen = Some(idx);
            if cumulative > target {
                break;
            }
        }
        let Some(chosen) = chosen else {
            return Err(PipelineError::DegenerateInput(
                "no reading is left to seed a centroid".to_string(),
            ));
        };

        let centroid = features[chosen];
        for (d, f) in closest.iter_mut().zip(features) {
            *d = d.min((f - centroid).norm_squared());
        }
        centroids.push(centroid);
    }
    Ok(centroids)
}

fn nearest(feature: &Feature, centroids: &[Feature]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (label, c) in centroids.iter().enumerate() {
        let d = (feature - c).norm_squared();
        if d < best.1 {
            best = (label, d);
        }
    }
    best
}

fn assign(features: &[Feature], centroids: &[Feature], labels: &mut [usize]) {
    for (label, f) in labels.iter_mut().zip(features) {
        *label = nearest(f, centroids).0;
    }
}

fn centroid_means(features: &[Feature], labels: &[usize], k: usize) -> Vec<Feature> {
    let mut sums = vec![Feature::zeros(); k];
    let mut counts = vec![0usize; k];
    for (f, &label) in features.iter().zip(labels) {
        sums[label] += f;
        counts[label] += 1;
    }
    sums.into_iter()
        .zip(counts)
        .map(|(sum, count)| sum / count.max(1) as f64)
        .collect()
}

/// Move the farthest spare reading into every empty cluster; returns the reseed count
///
/// Donors must sit at a positive distance from their centroid, so a reseed
/// never recreates a centroid that already exists.
fn reseed_empty_clusters(
    features: &[Feature],
    labels: &mut [usize],
    centroids: &[Feature],
    k: usize,
) -> Result<usize> {
    let mut counts = vec![0usize; k];
    for &label in labels.iter() {
        counts[label] += 1;
    }

    let mut reseeds = 0;
    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }
        let mut donor: Option<(usize, f64)> = None;
        for (idx, f) in features.iter().enumerate() {
            let label = labels[idx];
            if counts[label] < 2 {
                continue;
            }
            let d = (f - centroids[label]).norm_squared();
            if d > 0.0 && donor.is_none_or(|(_, best)| d > best) {
                donor = Some((idx, d));
            }
        }
        let Some((idx, distance)) = donor else {
            return Err(PipelineError::DegenerateInput(format!(
                "cluster {empty} became empty and no reading can be moved into it"
            )));
        };

        warn!(
            "Cluster {} became empty; reseeding with reading {} (distance² {:.4})",
            empty, idx, distance
        );
        counts[labels[idx]] -= 1;
        labels[idx] = empty;
        counts[empty] = 1;
        reseeds += 1;
    }
    Ok(reseeds)
}

fn lloyd(
    features: &[Feature],
    initial: Vec<Feature>,
    max_iterations: usize,
    tolerance: f64,
) -> Result<ClusterAssignment> {
    let k = initial.len();
    let mut centroids = initial;
    let mut labels = vec![0usize; features.len()];
    let mut reseeds = 0;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations {
        iterations += 1;
        assign(features, &centroids, &mut labels);
        reseeds += reseed_empty_clusters(features, &mut labels, &centroids, k)?;

        let updated = centroid_means(features, &labels, k);
        let shift: f64 = centroids
            .iter()
            .zip(&updated)
            .map(|(old, new)| (old - new).norm_squared())
            .sum();
        centroids = updated;

        if shift <= tolerance {
            converged = true;
            break;
        }
    }

    // Final labels must agree with the final centroids
    assign(features, &centroids, &mut labels);
    let repaired = reseed_empty_clusters(features, &mut labels, &centroids, k)?;
    if repaired > 0 {
        reseeds += repaired;
        centroids = centroid_means(features, &labels, k);
    }

    let inertia = features
        .iter()
        .zip(&labels)
        .map(|(f, &label)| (f - centroids[label]).norm_squared())
        .sum();

    Ok(ClusterAssignment {
        labels,
        centroids,
        inertia,
        iterations,
        converged,
        reseeds,
    })
}

/// Per-cluster description used for reporting
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterSummary {
    /// Cluster label
    pub label: usize,
    /// Member count
    pub size: usize,
    /// Mean latitude of the members
    pub centroid_latitude: f64,
    /// Mean longitude of the members
    pub centroid_longitude: f64,
    /// Mean derived concentration of the members
    pub mean_concentration: f64,
    /// Lowest member concentration
    pub min_concentration: f64,
    /// Highest member concentration
    pub max_concentration: f64,
}

/// Summarise every cluster, ordered by label
///
/// # Errors
/// Returns `InvalidParameter` if the assignment does not label exactly these samples
pub fn summarize_clusters(
    samples: &[EnvironmentalSample],
    assignment: &ClusterAssignment,
) -> Result<Vec<ClusterSummary>> {
    if samples.len() != assignment.labels.len() {
        return Err(PipelineError::invalid(
            "assignment",
            format!(
                "{} labels for {} samples",
                assignment.labels.len(),
                samples.len()
            ),
        ));
    }

    Ok((0..assignment.k())
        .map(|label| {
            let mut summary = ClusterSummary {
                label,
                size: 0,
                centroid_latitude: 0.0,
                centroid_longitude: 0.0,
                mean_concentration: 0.0,
                min_concentration: f64::INFINITY,
                max_concentration: f64::NEG_INFINITY,
            };
            for idx in assignment.members(label) {
                let s = &samples[idx];
                summary.size += 1;
                summary.centroid_latitude += s.latitude;
                summary.centroid_longitude += s.longitude;
                summary.mean_concentration += s.concentration;
                summary.min_concentration = summary.min_concentration.min(s.concentration);
                summary.max_concentration = summary.max_concentration.max(s.concentration);
            }
            if summary.size > 0 {
                let n = summary.size as f64;
                summary.centroid_latitude /= n;
                summary.centroid_longitude /= n;
                summary.mean_concentration /= n;
            }
            summary
        })
        .collect())
}

/// Cluster with the lowest mean concentration, the preferred dispensing region
pub fn lowest_concentration_cluster(summaries: &[ClusterSummary]) -> Option<&ClusterSummary> {
    summaries
        .iter()
        .filter(|s| s.size > 0)
        .min_by(|a, b| a.mean_concentration.total_cmp(&b.mean_concentration))
}
