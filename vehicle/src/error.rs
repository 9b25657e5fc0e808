//! Error types for vehicle construction and tuning.

use thiserror::Error;

/// Errors raised while building a vehicle or loading its tuning.
///
/// A vehicle that is merely waiting for its scene references is not an error;
/// see [`crate::VehicleController::try_new`].
#[derive(Debug, Error)]
pub enum VehicleError {
    /// A wheel's visual bounds collapsed to a zero or negative radius.
    #[error("wheel {index} has a degenerate radius ({radius})")]
    DegenerateWheel {
        /// Index of the offending wheel.
        index: usize,
        /// Radius derived from the wheel node's bounds.
        radius: f32,
    },

    /// The wheel nodes and wheel specs do not line up.
    #[error("expected {expected} wheels, got {nodes} nodes and {specs} specs")]
    WheelCountMismatch {
        /// Number of wheels a vehicle carries.
        expected: usize,
        /// Number of wheel nodes supplied.
        nodes: usize,
        /// Number of wheel specs supplied.
        specs: usize,
    },

    /// A control-surface call named a wheel the vehicle does not have.
    #[error("wheel index {0} is out of range")]
    WheelIndexOutOfRange(usize),

    /// A tuning value is outside its valid range.
    #[error("invalid tuning: {0}")]
    InvalidTuning(String),

    /// The tuning file could not be read or written.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Path of the tuning file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The tuning file is not valid TOML for [`crate::tuning::VehicleTuning`].
    #[error("failed to parse tuning: {0}")]
    Parse(#[from] toml::de::Error),

    /// The tuning could not be written back out as TOML.
    #[error("failed to serialize tuning: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl VehicleError {
    /// Creates an invalid tuning error.
    pub fn invalid_tuning(msg: impl Into<String>) -> Self {
        Self::InvalidTuning(msg.into())
    }
}
