//! Synthetic environmental readings
//!
//! Each reading draws latitude, longitude, wind speed, and humidity
//! independently and uniformly from caller-supplied ranges. Its concentration
//! is not measured but derived with a closed-form attenuation estimate:
//!
//! ```text
//! concentration = 100 · exp(-0.1 · wind_speed) · (humidity / 100)
//! ```
//!
//! Stronger wind suppresses the estimate, higher humidity raises it. This
//! estimate is deliberately independent of the plume model.

use crate::core_types::{MetersPerSecond, Percent, PipelineError, Result, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Concentration reported in still, saturated air
pub const REFERENCE_CONCENTRATION: f64 = 100.0;

/// Exponential wind attenuation per m/s
pub const WIND_ATTENUATION: f64 = 0.1;

/// Estimate concentration from wind speed and relative humidity
#[inline]
pub fn estimate_concentration(wind_speed: MetersPerSecond, humidity: Percent) -> f64 {
    REFERENCE_CONCENTRATION
        * (-WIND_ATTENUATION * wind_speed.value()).exp()
        * humidity.fraction()
}

/// Inclusive uniform range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    /// Lower bound
    pub min: f64,
    /// Upper bound (inclusive)
    pub max: f64,
}

impl ValueRange {
    /// Create a range
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Range containing a single value
    pub const fn fixed(value: f64) -> Self {
        Self::new(value, value)
    }

    /// Check the bounds
    ///
    /// # Errors
    /// Returns `InvalidParameter` for non-finite bounds or `min > max`
    pub fn validate(&self, name: &'static str) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(PipelineError::invalid(name, "bounds must be finite"));
        }
        if self.min > self.max {
            return Err(PipelineError::invalid(
                name,
                format!("minimum {} exceeds maximum {}", self.min, self.max),
            ));
        }
        Ok(())
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> f64 {
        rng.random_range(self.min..=self.max)
    }
}

/// Ranges every reading is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRanges {
    /// Latitude coordinate
    pub latitude: ValueRange,
    /// Longitude coordinate
    pub longitude: ValueRange,
    /// Wind speed in m/s
    pub wind_speed: ValueRange,
    /// Relative humidity in percent
    pub humidity: ValueRange,
}

impl Default for SampleRanges {
    fn default() -> Self {
        Self {
            latitude: ValueRange::new(10.0, 20.0),
            longitude: ValueRange::new(30.0, 40.0),
            wind_speed: ValueRange::new(0.0, 10.0),
            humidity: ValueRange::new(20.0, 100.0),
        }
    }
}

impl SampleRanges {
    /// Check every range
    ///
    /// # Errors
    /// Returns `InvalidParameter` naming the first invalid range
    pub fn validate(&self) -> Result<()> {
        self.latitude.validate("sample_ranges.latitude")?;
        self.longitude.validate("sample_ranges.longitude")?;
        self.wind_speed.validate("sample_ranges.wind_speed")?;
        self.humidity.validate("sample_ranges.humidity")
    }
}

/// One environmental reading with its derived concentration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalSample {
    /// Latitude coordinate
    pub latitude: f64,
    /// Longitude coordinate
    pub longitude: f64,
    /// Local wind speed
    pub wind_speed: MetersPerSecond,
    /// Relative humidity
    pub humidity: Percent,
    /// Derived concentration estimate
    pub concentration: f64,
}

impl EnvironmentalSample {
    /// Create a reading, deriving its concentration
    pub fn new(latitude: f64, longitude: f64, wind_speed: MetersPerSecond, humidity: Percent) -> Self {
        Self {
            latitude,
            longitude,
            wind_speed,
            humidity,
            concentration: estimate_concentration(wind_speed, humidity),
        }
    }

    /// Planar location (latitude, longitude)
    pub fn location(&self) -> Vec2 {
        Vec2::new(self.latitude, self.longitude)
    }
}

/// Generate `n` readings
///
/// With `Some(seed)` the batch is reproducible; with `None` the generator is
/// seeded from operating-system entropy.
///
/// # Errors
/// Returns `InvalidParameter` if any range is invalid
pub fn generate_samples(
    n: usize,
    ranges: &SampleRanges,
    seed: Option<u64>,
) -> Result<Vec<EnvironmentalSample>> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    generate_samples_with(n, ranges, &mut rng)
}

/// Generate `n` readings from a caller-owned generator
///
/// # Errors
/// Returns `InvalidParameter` if any range is invalid
pub fn generate_samples_with<R: Rng>(
    n: usize,
    ranges: &SampleRanges,
    rng: &mut R,
) -> Result<Vec<EnvironmentalSample>> {
    ranges.validate()?;

    let samples: Vec<EnvironmentalSample> = (0..n)
        .map(|_| {
            let latitude = ranges.latitude.draw(rng);
            let longitude = ranges.longitude.draw(rng);
            let wind_speed = MetersPerSecond::new(ranges.wind_speed.draw(rng));
            let humidity = Percent::new(ranges.humidity.draw(rng));
            EnvironmentalSample::new(latitude, longitude, wind_speed, humidity)
        })
        .collect();

    debug!("Generated {} environmental samples", samples.len());
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_still_saturated_air() {
        let c = estimate_concentration(MetersPerSecond::new(0.0), Percent::new(100.0));
        assert_eq!(c, 100.0);
    }

    #[test]
    fn test_known_value() {
        let c = estimate_concentration(MetersPerSecond::new(10.0), Percent::new(50.0));
        assert_relative_eq!(c, 50.0 * (-1.0_f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_samples_stay_in_range() {
        let ranges = SampleRanges::default();
        let samples = generate_samples(200, &ranges, Some(7)).unwrap();
        assert_eq!(samples.len(), 200);
        for s in &samples {
            assert!((10.0..=20.0).contains(&s.latitude));
            assert!((30.0..=40.0).contains(&s.longitude));
            assert!((0.0..=10.0).contains(&s.wind_speed.value()));
            assert!((20.0..=100.0).contains(&s.humidity.value()));
            assert!(s.concentration > 0.0 && s.concentration <= 100.0);
        }
    }

    #[test]
    fn test_seed_reproducibility() {
        let ranges = SampleRanges::default();
        let a = generate_samples(50, &ranges, Some(42)).unwrap();
        let b = generate_samples(50, &ranges, Some(42)).unwrap();
        let c = generate_samples(50, &ranges, Some(43)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_rejects_inverted_range() {
        let ranges = SampleRanges {
            humidity: ValueRange::new(90.0, 10.0),
            ..Default::default()
        };
        let err = generate_samples(10, &ranges, Some(1)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidParameter {
                name: "sample_ranges.humidity",
                ..
            }
        ));
    }
}
