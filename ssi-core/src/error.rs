//! Typed errors for the scoring core.
//!
//! Provider, cache and config plumbing reports through `anyhow`; the errors
//! here are the ones callers are expected to match on.

use thiserror::Error;

/// Why a field of an observation was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidReason {
    #[error("is missing")]
    Missing,

    #[error("is not finite ({value})")]
    NonFinite { value: f64 },

    #[error("= {value} is outside [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },
}

/// An observation the scorer refuses to score.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid observation: {field} {reason}")]
pub struct InvalidObservation {
    pub field: &'static str,
    pub reason: InvalidReason,
}

impl InvalidObservation {
    pub fn missing(field: &'static str) -> Self {
        Self { field, reason: InvalidReason::Missing }
    }

    pub fn non_finite(field: &'static str, value: f64) -> Self {
        Self { field, reason: InvalidReason::NonFinite { value } }
    }

    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self { field, reason: InvalidReason::OutOfRange { value, min, max } }
    }
}

/// Scoring a series stops at the first hour that cannot be scored.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("hour #{index} of the series could not be scored")]
    InvalidHour {
        index: usize,
        #[source]
        source: InvalidObservation,
    },
}

/// Rejected scoring curve parameters, usually coming from the `[scoring]`
/// section of the config file.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CurveError {
    #[error("scoring.{name} must be a finite number, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("scoring.{name} must be greater than {min}, got {value}")]
    TooSmall { name: &'static str, value: f64, min: f64 },
}
