//! Error taxonomy of the blocking engine
//!
//! Every I/O or privilege failure is converted into one of these kinds at
//! the component that performed the I/O. Callers never see raw OS errors.

use thiserror::Error;

use crate::controller::Operation;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockingError {
    /// Bad site string or non-positive duration; nothing was mutated
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} is already blocked")]
    AlreadyBlocked(String),

    #[error("A focus session is already running")]
    SessionAlreadyActive,

    /// File could not be read, staged or written
    #[error("I/O failure: {0}")]
    Io(String),

    /// The elevation helper refused: user declined or policy denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The elevated script ran but exited non-zero
    #[error("Applying hosts changes failed (exit code {code:?}): {diagnostic}")]
    ApplyFailed { code: Option<i32>, diagnostic: String },

    #[error("Another operation is still running: {0}")]
    OperationInProgress(Operation),
}

impl BlockingError {
    /// Wrap an I/O error together with what was being attempted
    pub fn io(what: impl std::fmt::Display, err: std::io::Error) -> Self {
        BlockingError::Io(format!("{}: {}", what, err))
    }

    /// True for the non-fatal "nothing changed" outcomes
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            BlockingError::AlreadyBlocked(_) | BlockingError::SessionAlreadyActive
        )
    }
}

pub type Result<T> = std::result::Result<T, BlockingError>;
