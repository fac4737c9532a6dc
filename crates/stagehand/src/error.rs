//! Errors surfaced by the command line.

use std::path::PathBuf;

use stagehand_pipeline::PipelineError;

/// Anything that stops a command.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Reading or writing a file failed.
    #[error("{}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A session file is not valid JSON control state.
    #[error("{}: invalid session file: {source}", path.display())]
    Session {
        /// Session file.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// Writing a displayed image failed.
    #[error("{}: {source}", path.display())]
    Encode {
        /// Output file.
        path: PathBuf,
        /// Underlying error.
        source: image::ImageError,
    },

    /// Serializing output failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    /// A `--set` override was not `KEY=VALUE`.
    #[error("invalid override `{0}`: expected KEY=VALUE")]
    Override(String),

    /// Building or running the pipeline failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl CliError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
