//! Error types for khalorg.

use thiserror::Error;

use crate::format::FormatError;

/// Errors that can occur in khalorg operations.
#[derive(Error, Debug)]
pub enum KhalOrgError {
    #[error("Timestamp missing in agenda item")]
    MissingTimestamp,

    #[error("No agenda item was found")]
    EmptyItem,

    #[error("Invalid org timestamp '{0}'")]
    TimestampParse(String),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("khal not found in PATH: {0}")]
    KhalNotInstalled(String),

    #[error(
        "The following arguments were sent to khal:\n\n{args}\n\n\
         Next, the following error was received from khal:\n\n{output}"
    )]
    Khal { args: String, output: String },

    #[error("Unexpected khal output: {0}")]
    KhalOutput(String),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("{0}")]
    CheckFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for khalorg operations.
pub type KhalOrgResult<T> = Result<T, KhalOrgError>;
