//! Crate-level error type.
//!
//! Filesystem failures during a scan never reach this type; the populator
//! swallows them. What is left are front-end failures and misuse of the
//! open-folder sequence.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("a folder is already being opened")]
    OpenInProgress,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GUI error: {0}")]
    Gui(String),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
