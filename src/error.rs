use std::time::Duration;

use thiserror::Error;

/// Failures surfaced by the decisioning engine.
///
/// Cloneable so a single in-flight model load can hand the same outcome to
/// every caller waiting on it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("failed to load model '{model}': {reason}")]
    ModelLoad { model: String, reason: String },

    #[error("model '{model}' failed to predict: {reason}")]
    ModelInvocation { model: String, reason: String },

    #[error("prediction cancelled")]
    Cancelled,

    #[error("model inference timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid loan features: {}", .0.join(", "))]
    InvalidInput(Vec<String>),

    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn model_load(model: &str, err: impl std::fmt::Display) -> Self {
        Self::ModelLoad {
            model: model.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn model_invocation(model: &str, err: impl std::fmt::Display) -> Self {
        Self::ModelInvocation {
            model: model.to_string(),
            reason: err.to_string(),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
