//! Common error types for the FeTS orchestrator

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for orchestrator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared across the orchestrator crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid operator input or missing prerequisite
    #[error("Configuration error: {0}")]
    Config(String),

    /// Child process could not be started at all
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// External task exited nonzero on a path where that is fatal
    #[error("External task '{task}' failed with exit code {code:?}")]
    TaskFailed { task: String, code: Option<i32> },

    /// Neither the best nor the init weight file exists for a plan
    #[error("No compatible model weight file for plan '{plan}' under {weights_dir}")]
    MissingWeights { plan: String, weights_dir: PathBuf },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
