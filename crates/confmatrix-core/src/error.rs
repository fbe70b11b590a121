//! Error types for matrix orchestration.

use crate::exec::CapturedOutput;

/// Errors produced while driving the configuration matrix.
///
/// Every variant is fatal to the whole run: there is no per-entry retry and
/// no isolation between entries. Variants that correspond to a finished
/// subprocess carry the captured streams so the reporter can surface them
/// verbatim at the point of failure.
#[derive(Debug, thiserror::Error)]
pub enum MatrixError {
    #[error("configure exited with status {code}")]
    Configure { code: i32, output: CapturedOutput },

    #[error("build exited with status {code}")]
    Build { code: i32, output: CapturedOutput },

    /// The compile step exited zero but its diagnostic stream was not silent
    /// after dropping the known-benign archiver line.
    #[error("build succeeded but emitted diagnostics")]
    NoisyBuild { output: CapturedOutput },

    #[error("test suite '{suite}' exited with status {code}")]
    Suite {
        suite: String,
        code: i32,
        output: CapturedOutput,
    },

    #[error("distribution clean exited with status {code}")]
    Clean { code: i32, output: CapturedOutput },

    #[error("build area setup failed: {reason}")]
    Setup { reason: String },

    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl MatrixError {
    /// Captured streams of the failing stage, when the stage got far enough
    /// to produce any.
    pub fn captured(&self) -> Option<&CapturedOutput> {
        match self {
            MatrixError::Configure { output, .. }
            | MatrixError::Build { output, .. }
            | MatrixError::NoisyBuild { output }
            | MatrixError::Suite { output, .. }
            | MatrixError::Clean { output, .. } => Some(output),
            MatrixError::Setup { .. } | MatrixError::Spawn { .. } | MatrixError::Io(_) => None,
        }
    }
}

/// Result type for matrix operations.
pub type MatrixResult<T> = std::result::Result<T, MatrixError>;
