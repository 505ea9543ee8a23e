// Error taxonomy for the drive runtime
//
// ConfigError covers everything that must be rejected before a motor moves.
// Error is the crate-wide type returned by controllers and hubs.

use std::time::Duration;

use crate::hub::Port;

/// Errors that abort a mission step before any motion is issued
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {kind} direction: {value:?}")]
    InvalidDirection { kind: &'static str, value: String },

    #[error("{name} must be strictly positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be a finite, non-negative number, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("{name} is out of range: {value}")]
    OutOfRange { name: &'static str, value: f64 },

    #[error("Reflectance thresholds must satisfy black < white <= 100, got black={black}, white={white}")]
    InvalidReflection { white: u8, black: u8 },

    #[error("Port {0} is not ready")]
    PortNotReady(Port),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Calibration found no heading zero crossing within {0:?}")]
    CalibrationTimeout(Duration),

    #[error("Hub fault on port {port}: {reason}")]
    Hardware { port: Port, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Check that a physical constant or speed is strictly positive
pub fn ensure_positive(name: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

/// Check that a distance or angle is finite and not negative
pub fn ensure_non_negative(
    name: &'static str,
    value: f64,
) -> std::result::Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

/// Check that a converted motor velocity can finish a non-zero rotation
pub fn ensure_moving(degrees: u32, velocity: i32) -> std::result::Result<(), ConfigError> {
    if degrees > 0 && velocity == 0 {
        Err(ConfigError::NonPositive {
            name: "velocity",
            value: 0.0,
        })
    } else {
        Ok(())
    }
}
