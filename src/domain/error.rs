use std::time::Duration;

use thiserror::Error;

use crate::domain::dependency::SourceType;
use crate::engine::convert::ConversionError;
use crate::engine::extract::ExtractError;
use crate::engine::generator::GeneratorError;

/// Failure reported by a dependency's data source for one attempt.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Backing store could not be reached or answered with an error.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// Key, variable or step output does not exist.
    #[error("`{key}` not found")]
    NotFound { key: String },

    /// Key exists but holds a different kind of value.
    #[error("`{key}` holds {actual}, expected {expected}")]
    WrongType {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Collaborator-side timeout. Retryable like any other source error.
    #[error("source timed out")]
    Timeout,

    #[error("scene output path failed: {0}")]
    Path(#[from] ExtractError),

    #[error(transparent)]
    Generator(#[from] GeneratorError),
}

/// Errors produced while resolving a dependency.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Declared source kind disagrees with the configuration payload.
    #[error("dependency `{id}`: declared source `{declared}` but configured `{configured}`")]
    SourceMismatch {
        id: String,
        declared: SourceType,
        configured: SourceType,
    },

    /// Source failed and the fetch strategy propagates the failure.
    #[error("dependency `{id}`: {source}")]
    Source {
        id: String,
        #[source]
        source: SourceError,
    },

    /// Every retry attempt failed.
    #[error("dependency `{id}`: gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        id: String,
        attempts: u32,
        #[source]
        last: SourceError,
    },

    /// Value was resolved but could not be coerced to the declared target.
    #[error("dependency `{id}`: {source}")]
    Conversion {
        id: String,
        #[source]
        source: ConversionError,
    },

    /// Resolution deadline passed before the source answered.
    #[error("dependency `{id}`: resolution deadline exceeded")]
    Timeout { id: String },

    /// Caller cancelled resolution.
    #[error("dependency `{id}`: resolution cancelled")]
    Cancelled { id: String },
}

impl ResolveError {
    pub fn dependency_id(&self) -> &str {
        match self {
            Self::SourceMismatch { id, .. }
            | Self::Source { id, .. }
            | Self::RetriesExhausted { id, .. }
            | Self::Conversion { id, .. }
            | Self::Timeout { id }
            | Self::Cancelled { id } => id,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Errors produced by assertion group orchestration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroupError {
    #[error("assertion group `{group}`: {reason}")]
    InvalidOptions { group: String, reason: String },

    #[error("assertion group `{group}` timed out after {timeout:?}")]
    Timeout { group: String, timeout: Duration },
}
