//! Error types for the odometry publisher

use crate::lifecycle::State;
use std::fmt;
use thiserror::Error;

/// Drive wheel identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wheel {
    Left,
    Right,
}

impl fmt::Display for Wheel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wheel::Left => write!(f, "left"),
            Wheel::Right => write!(f, "right"),
        }
    }
}

/// Reasons a raw encoder message is rejected at the boundary
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleFault {
    #[error("expected {expected} fields, found {found}")]
    WrongArity { expected: usize, found: usize },

    #[error("field `{field}` is not finite ({value})")]
    NonFinite { field: &'static str, value: f64 },

    #[error("encoder count `{field}` is not a whole number ({value})")]
    FractionalCount { field: &'static str, value: f64 },

    #[error("encoder count `{field}` is outside the exactly representable range ({value})")]
    CountOutOfRange { field: &'static str, value: f64 },
}

/// Per-sample failures of the odometry update
///
/// All of these are recoverable: the sample is dropped (or used only to
/// resynchronise the encoder baseline) and processing continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OdometryError {
    #[error("degenerate geometry: wheel base is {wheel_base}")]
    DegenerateGeometry { wheel_base: f64 },

    #[error("invalid sample: {0}")]
    InvalidSample(#[from] SampleFault),

    #[error("{wheel} encoder went backwards ({previous} -> {current}), baseline resynchronised")]
    EncoderDiscontinuity {
        wheel: Wheel,
        previous: i64,
        current: i64,
    },
}

/// Coarse classification of [`OdometryError`], used for counting faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DegenerateGeometry,
    InvalidSample,
    EncoderDiscontinuity,
}

impl OdometryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OdometryError::DegenerateGeometry { .. } => ErrorKind::DegenerateGeometry,
            OdometryError::InvalidSample(_) => ErrorKind::InvalidSample,
            OdometryError::EncoderDiscontinuity { .. } => ErrorKind::EncoderDiscontinuity,
        }
    }
}

/// Errors raised by lifecycle transitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("`{node}` cannot {transition} from state {from:?}")]
    InvalidTransition {
        node: String,
        transition: &'static str,
        from: State,
    },

    #[error("`{node}` is not active (state {state:?}), sample dropped")]
    NotActive { node: String, state: State },
}

/// Invalid configuration values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("parameter `{0}` must not be empty")]
    Empty(&'static str),

    #[error("odom frame and base frame must differ (both `{0}`)")]
    SameFrames(String),

    #[error("startup delay must be a finite, non-negative number of seconds, got {0}")]
    InvalidStartupDelay(f64),
}
