use std::path::PathBuf;

use crate::foundation::core::Stage;

/// Convenience result type used across vidsynth.
pub type AssemblyResult<T> = Result<T, AssemblyError>;

/// Top-level error taxonomy used by the assembly engine.
#[derive(thiserror::Error, Debug)]
pub enum AssemblyError {
    /// A required external binary could not be resolved. Fatal before any file IO.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// An external encoder invocation failed, could not be spawned, or timed out.
    #[error("encode error during {stage} ({context}): {}: {}", exit_display(.exit_code), .stderr.trim())]
    Encode {
        /// Pipeline stage that issued the invocation.
        stage: Stage,
        /// What the invocation was producing, including the offending input path.
        context: String,
        /// Process exit code. `None` when killed by a signal, timed out, or never spawned.
        exit_code: Option<i32>,
        /// Captured standard error of the encoder.
        stderr: String,
    },

    /// A referenced input did not exist (or could not be opened) at the point of use.
    #[error("asset missing during {stage}: '{}'", .path.display())]
    AssetMissing {
        /// Pipeline stage that needed the asset.
        stage: Stage,
        /// The missing path.
        path: PathBuf,
    },

    /// Zero narration texts or zero images were supplied.
    #[error("input empty: {0}")]
    InputEmpty(String),

    /// Invalid configuration, script, or settings data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Fieldless discriminant of [`AssemblyError`], for callers that branch on failure kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`AssemblyError::Precondition`].
    Precondition,
    /// See [`AssemblyError::Encode`].
    Encode,
    /// See [`AssemblyError::AssetMissing`].
    AssetMissing,
    /// See [`AssemblyError::InputEmpty`].
    InputEmpty,
    /// See [`AssemblyError::Validation`].
    Validation,
    /// See [`AssemblyError::Other`].
    Other,
}

impl AssemblyError {
    /// Build an [`AssemblyError::Precondition`] value.
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Build an [`AssemblyError::InputEmpty`] value.
    pub fn input_empty(msg: impl Into<String>) -> Self {
        Self::InputEmpty(msg.into())
    }

    /// Build an [`AssemblyError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build an [`AssemblyError::AssetMissing`] value.
    pub fn asset_missing(stage: Stage, path: impl Into<PathBuf>) -> Self {
        Self::AssetMissing {
            stage,
            path: path.into(),
        }
    }

    /// Return the failure kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::Encode { .. } => ErrorKind::Encode,
            Self::AssetMissing { .. } => ErrorKind::AssetMissing,
            Self::InputEmpty(_) => ErrorKind::InputEmpty,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Pipeline stage the error originated from, when known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Encode { stage, .. } | Self::AssetMissing { stage, .. } => Some(*stage),
            Self::Precondition(_) => Some(Stage::Preflight),
            _ => None,
        }
    }
}

fn exit_display(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "no exit code".to_string(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
