//! Physically modeled attractant dispersion
//!
//! Each release source contributes an isotropic Gaussian plume whose mean is
//! advected by a constant wind and whose spread grows linearly with time.
//! The field at time `t` is the sum over all sources, attenuated by one
//! global exponential decay.

pub mod field;
pub mod plume;

pub use field::{compute_field, compute_series, ConcentrationField, FieldAnnotation, GridPeak};
pub use plume::{
    evaluate_plume, validate_time, DensitySurface, PlumeParameters, Source, WindVector,
};
