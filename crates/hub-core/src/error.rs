//! # AppError
//!
//! Centralized error handling for the IdeaHub ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all hub-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Post, Comment, User)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., blank title, invalid vote value)
    #[error("validation error: {0}")]
    Validation(String),

    /// Concurrent modification detected; the caller should retry
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down, directory unreachable)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for `NotFound` with a displayable id.
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(what.to_string(), id.to_string())
    }

    /// Shorthand for wrapping an infrastructure error.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// A specialized Result type for IdeaHub logic.
pub type Result<T> = std::result::Result<T, AppError>;
