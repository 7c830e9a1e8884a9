//! Error taxonomy shared by every pipeline stage

use std::fmt;

/// Errors that can occur while modeling or analysing a concentration field
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A caller-supplied parameter is outside its valid domain.
    /// Raised before any computation starts; values are never silently clamped.
    InvalidParameter {
        /// Name of the offending parameter
        name: &'static str,
        /// Constraint that was violated
        reason: String,
    },
    /// The input data cannot support the requested analysis
    DegenerateInput(String),
    /// The interpolated surface has no defined cell
    EmptySurface,
}

impl PipelineError {
    /// Build an [`PipelineError::InvalidParameter`]
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        PipelineError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter `{name}`: {reason}")
            }
            PipelineError::DegenerateInput(msg) => write!(f, "Degenerate input: {msg}"),
            PipelineError::EmptySurface => {
                write!(f, "Interpolated surface has no defined cells")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_parameter() {
        let err = PipelineError::invalid("base_spread", "must be positive, got 0");
        assert_eq!(
            err.to_string(),
            "Invalid parameter `base_spread`: must be positive, got 0"
        );
    }

    #[test]
    fn test_empty_surface_display() {
        assert_eq!(
            PipelineError::EmptySurface.to_string(),
            "Interpolated surface has no defined cells"
        );
    }
}
