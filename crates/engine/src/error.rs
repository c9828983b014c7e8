//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`Validation`] thrown when a precondition or a state transition is not
//!   legal.
//! - [`Permission`] thrown when the caller lacks the required capability.
//! - [`TerminalState`] thrown when an operation targets an absorbing state.
//! - [`Database`] thrown when the store fails.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`Permission`]: EngineError::Permission
//!  [`TerminalState`]: EngineError::TerminalState
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Permission denied: {0}")]
    Permission(String),
    #[error("Terminal state: {0}")]
    TerminalState(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::Permission(a), Self::Permission(b)) => a == b,
            (Self::TerminalState(a), Self::TerminalState(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
