use std::io;

use shared_std::commands::CommandType;
use thiserror::Error;

/// The single failure kind surfaced by command execution and dispatch.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The OS action was attempted and failed.
    #[error("failed to execute {command}: {source}")]
    ExecutionFailed {
        command: CommandType,
        #[source]
        source: io::Error,
    },

    /// Detected before any I/O was attempted.
    #[error("{command} is not configured correctly: {reason}")]
    InvalidConfiguration { command: CommandType, reason: String },

    #[error("the request was cancelled before any action was taken")]
    Cancelled,
}

impl CommandError {
    pub(crate) fn execution_failed(command: CommandType) -> impl FnOnce(io::Error) -> CommandError {
        move |source| CommandError::ExecutionFailed { command, source }
    }
}
