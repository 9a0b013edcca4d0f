//! Extraction errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extraction result type
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Fatal model errors.
///
/// Each variant names the entity whose extraction failed and the structural
/// expectation it broke. Recoverable conditions are diagnostics, not errors.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractError {
    #[error("overall: dt_mechanics must be present and positive (found {value:?})")]
    InvalidTimeStep { value: Option<f64> },

    #[error("overall: max_time {max_time} with dt_mechanics {dt_mechanics} yields no discrete steps")]
    ZeroSteps { max_time: f64, dt_mechanics: f64 },

    #[error(
        "cell type '{cell_type}': no phase transition data \
         (expected phase_transition_rates or phase_durations)"
    )]
    MissingPhaseData { cell_type: String },

    #[error("{entity}: missing required field '{field}'")]
    MissingField { entity: String, field: String },

    #[error("{entity}: field '{field}' is not a number: '{value}'")]
    InvalidNumber {
        entity: String,
        field: String,
        value: String,
    },

    #[error("{} entities failed to extract: {}", .failures.len(), summarize(.failures))]
    Incomplete { failures: Vec<ExtractError> },
}

impl ExtractError {
    pub(crate) fn missing(entity: &str, field: &str) -> Self {
        ExtractError::MissingField {
            entity: entity.to_string(),
            field: field.to_string(),
        }
    }
}

fn summarize(errors: &[ExtractError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
