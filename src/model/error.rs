//! Error types for tablectl.
//!
//! Errors are split by how the caller is expected to react:
//!
//! - [`ValidationError`] - bad user input (page parameters, justification text).
//!   Handled locally and shown inline; the rejected input leaves state untouched.
//! - [`FetchError`] - a record source or backend call failed. Surfaced as a
//!   retryable error state; never corrupts the query.
//! - [`BulkError`] - a bulk action could not start or its backend call failed.
//!   Partial delete failures are NOT errors; see `DeleteReport`.
//! - [`InputError`] / [`AppError`] - the binary's file loading and top level.
//!
//! Nothing in this crate treats an error as fatal to the controller: after any
//! of these the controller stays usable.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::logging::LoggingError;

/// Rejected user input. The state the input targeted is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Page indices are 1-based.
    #[error("Page index must be at least 1, got {0}")]
    PageIndexOutOfRange(usize),

    /// A page must hold at least one row.
    #[error("Page size must be greater than zero")]
    PageSizeZero,

    /// Export justification below the configured minimum length.
    #[error("Justification must be at least {min} characters, got {actual}")]
    JustificationTooShort {
        /// Required minimum, in characters.
        min: usize,
        /// Characters provided after trimming.
        actual: usize,
    },
}

/// A remote call failed.
///
/// Cloneable so the fetch coordinator can keep the last failure in its
/// status for the UI to display next to a retry affordance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The backend could not be reached (network, timeout).
    #[error("Record service unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with an error.
    #[error("Record service rejected the request ({status}): {message}")]
    Rejected {
        /// Backend status code.
        status: u16,
        /// Backend-supplied message.
        message: String,
    },
}

/// The export collaborator failed to accept the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Export failed: {0}")]
pub struct ExportFailure(pub String);

impl From<std::io::Error> for ExportFailure {
    fn from(err: std::io::Error) -> Self {
        ExportFailure(err.to_string())
    }
}

/// Which bulk action an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    /// Bulk delete.
    Delete,
    /// Bulk export.
    Export,
}

impl std::fmt::Display for BulkAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BulkAction::Delete => f.write_str("delete"),
            BulkAction::Export => f.write_str("export"),
        }
    }
}

/// A bulk action could not be started or completed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BulkError {
    /// Another bulk action is still running.
    #[error("A bulk action is already in progress")]
    InFlight,

    /// Nothing is selected.
    #[error("No records selected")]
    EmptySelection,

    /// The caller's capabilities do not allow this action.
    #[error("Not permitted to {0} records")]
    NotPermitted(BulkAction),

    /// The ticket does not belong to the action currently in flight.
    #[error("Bulk action ticket does not match the action in flight")]
    StaleTicket,

    /// Input validation failed (e.g. justification too short).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The delete backend failed as a whole.
    #[error(transparent)]
    Backend(#[from] FetchError),

    /// The export collaborator failed.
    #[error(transparent)]
    Export(#[from] ExportFailure),
}

/// Errors encountered while loading a record file.
#[derive(Debug, Error)]
pub enum InputError {
    /// The record file does not exist.
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
    },

    /// A line is not a valid JSON record.
    #[error("Malformed record on line {line}: {reason}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// Parser message.
        reason: String,
    },

    /// Two records share an identifier.
    #[error("Duplicate record id {id} on line {line}")]
    DuplicateId {
        /// The repeated id, rendered.
        id: String,
        /// 1-based line number of the second occurrence.
        line: usize,
    },

    /// Other I/O failures.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error for the binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Record file could not be loaded.
    #[error("Failed to read records: {0}")]
    Input(#[from] InputError),

    /// Config file could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Logging could not be set up.
    #[error("Logging setup failed: {0}")]
    Logging(#[from] LoggingError),

    /// Rejected page input.
    #[error("Invalid argument: {0}")]
    Validation(#[from] ValidationError),

    /// Record service call failed.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Bulk delete or export failed.
    #[error("Bulk action failed: {0}")]
    Bulk(#[from] BulkError),

    /// Writing output failed.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}
