//! Semantic unit types for environmental readings
//!
//! Wind speed and relative humidity travel as distinct newtypes so they can
//! never be swapped when they flow into the concentration estimate. Both are
//! `f64`, ordered with `total_cmp` (NaN sorts last), and serialise as bare
//! numbers.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Wind speed in meters per second
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MetersPerSecond(f64);

impl Eq for MetersPerSecond {}

impl PartialOrd for MetersPerSecond {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetersPerSecond {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl MetersPerSecond {
    /// Create a new speed
    #[inline]
    pub const fn new(value: f64) -> Self {
        MetersPerSecond(value)
    }

    /// Raw value in m/s
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for MetersPerSecond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} m/s", self.0)
    }
}

/// Relative humidity, nominally 0-100
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Percent(f64);

impl Eq for Percent {}

impl PartialOrd for Percent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Percent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Percent {
    /// Create a new percentage
    #[inline]
    pub const fn new(value: f64) -> Self {
        Percent(value)
    }

    /// Raw value in percent
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Value as a 0-1 fraction
    #[inline]
    pub fn fraction(self) -> f64 {
        self.0 / 100.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_fraction() {
        assert_eq!(Percent::new(100.0).fraction(), 1.0);
        assert_eq!(Percent::new(25.0).fraction(), 0.25);
    }

    #[test]
    fn test_total_ordering_with_nan() {
        let a = MetersPerSecond::new(3.0);
        let nan = MetersPerSecond::new(f64::NAN);
        assert!(a.max(nan).value().is_nan());
        assert!(MetersPerSecond::new(1.0) < MetersPerSecond::new(2.0));
        assert!(Percent::new(20.0) < Percent::new(80.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(Percent::new(80.0).to_string(), "80.0%");
        assert_eq!(MetersPerSecond::new(4.166).to_string(), "4.17 m/s");
    }
}
