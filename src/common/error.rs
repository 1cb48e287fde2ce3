//! Error handling primitives shared across the core.
//!
//! Per-value data quality problems never show up here: the normalizer coerces
//! them to null and counts them in its report. Everything in `FleetError` is
//! structural and aborts the run.

use thiserror::Error;

/// Stable codes used as process exit status by the CLI.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FleetCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// Filesystem or CSV/JSON encoding failure.
    Io = 1,
    /// A feature column is missing or a feature name is unknown.
    Schema = 2,
    /// Training inputs cannot produce a meaningful model.
    TrainingConfiguration = 3,
    /// A fitted model was invoked with a different feature set.
    InferenceMismatch = 4,
    /// Configuration value could not be parsed or is out of range.
    InvalidConfig = 5,
}

/// Canonical error type for the core.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("schema error: {0}")]
    Schema(String),

    #[error("training configuration error: {0}")]
    TrainingConfiguration(String),

    #[error("inference mismatch: {0}")]
    InferenceMismatch(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type FleetResult<T> = Result<T, FleetError>;

impl FleetError {
    /// Schema helper.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Training configuration helper.
    pub fn training(msg: impl Into<String>) -> Self {
        Self::TrainingConfiguration(msg.into())
    }

    /// Inference mismatch helper.
    pub fn mismatch(msg: impl Into<String>) -> Self {
        Self::InferenceMismatch(msg.into())
    }

    /// Configuration helper.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Machine parsable code for this error.
    pub fn code(&self) -> FleetCode {
        match self {
            FleetError::Schema(_) => FleetCode::Schema,
            FleetError::TrainingConfiguration(_) => FleetCode::TrainingConfiguration,
            FleetError::InferenceMismatch(_) => FleetCode::InferenceMismatch,
            FleetError::Config(_) => FleetCode::InvalidConfig,
            FleetError::Io(_) | FleetError::Csv(_) | FleetError::Json(_) => FleetCode::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(FleetCode::Ok as u32, 0);
        assert_eq!(FleetCode::Io as u32, 1);
        assert_eq!(FleetCode::Schema as u32, 2);
        assert_eq!(FleetCode::TrainingConfiguration as u32, 3);
        assert_eq!(FleetCode::InferenceMismatch as u32, 4);
        assert_eq!(FleetCode::InvalidConfig as u32, 5);
    }

    #[test]
    fn errors_map_to_codes() {
        assert_eq!(FleetError::schema("x").code(), FleetCode::Schema);
        assert_eq!(FleetError::training("x").code(), FleetCode::TrainingConfiguration);
        assert_eq!(FleetError::mismatch("x").code(), FleetCode::InferenceMismatch);
        assert_eq!(FleetError::config("x").code(), FleetCode::InvalidConfig);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(FleetError::from(io).code(), FleetCode::Io);
    }
}
