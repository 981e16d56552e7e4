//! Session-level error type.

use std::error::Error;
use std::fmt;

use ferry_core::{ArenaError, AssetError, GuestError};

use crate::batch::BatchPhase;

/// Errors from loading a session or running a decode batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// An asset could not be fetched.
    Asset(AssetError),
    /// Instantiating or calling the guest failed.
    Guest(GuestError),
    /// A layout, memory or view operation failed.
    Arena(ArenaError),
    /// A batch operation was attempted in the wrong phase.
    BatchState {
        /// The operation that was attempted.
        operation: &'static str,
        /// The phase the batch was in.
        phase: BatchPhase,
    },
    /// Session configuration is invalid.
    Config {
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asset(e) => write!(f, "asset: {e}"),
            Self::Guest(e) => write!(f, "guest: {e}"),
            Self::Arena(e) => write!(f, "arena: {e}"),
            Self::BatchState { operation, phase } => {
                write!(f, "cannot {operation} a batch in the {phase} phase")
            }
            Self::Config { reason } => write!(f, "invalid session config: {reason}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Asset(e) => Some(e),
            Self::Guest(e) => Some(e),
            Self::Arena(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AssetError> for SessionError {
    fn from(e: AssetError) -> Self {
        Self::Asset(e)
    }
}

impl From<GuestError> for SessionError {
    fn from(e: GuestError) -> Self {
        match e {
            // Arena failures surface as `Arena` whichever layer hit them.
            GuestError::Arena(inner) => Self::Arena(inner),
            other => Self::Guest(other),
        }
    }
}

impl From<ArenaError> for SessionError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}
