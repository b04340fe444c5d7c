//! Error types for resilient MySQL sessions.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Transient failures that happen inside an open transaction are carried by
//! [`TransactionFailure`], which travels through enclosing transaction scopes
//! until one of them absorbs it and retries.

use thiserror::Error;

/// Which transient condition discarded the server-side transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Deadlock found, or lock wait timeout exceeded.
    Deadlock,
    /// Server went away or the node is not ready; the connection was re-established.
    ServerUnavailable,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deadlock => write!(f, "deadlock"),
            Self::ServerUnavailable => write!(f, "server unavailable"),
        }
    }
}

/// A transient failure raised while a transaction was open.
///
/// The database has already rolled back the whole transaction. `bubble_count`
/// is the savepoint depth at the moment of failure: the number of enclosing
/// transaction scopes that must pass the failure outward before one of them
/// retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionFailure {
    pub kind: FailureKind,
    pub bubble_count: u32,
    pub message: String,
    pub code: u32,
}

impl TransactionFailure {
    pub fn new(kind: FailureKind, bubble_count: u32, message: impl Into<String>, code: u32) -> Self {
        Self {
            kind,
            bubble_count,
            message: message.into(),
            code,
        }
    }

    /// Pass through one enclosing scope.
    ///
    /// Returns `true` when the failure must keep bubbling (the count was
    /// decremented), `false` when the current scope absorbs it.
    pub fn bubble(&mut self) -> bool {
        if self.bubble_count > 0 {
            self.bubble_count -= 1;
            true
        } else {
            false
        }
    }
}

impl std::fmt::Display for TransactionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}]: {} (bubble count {})",
            self.kind, self.code, self.message, self.bubble_count
        )
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Connection failed [{code}]: {message}")]
    Connection { message: String, code: u32 },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Maximum attempts exceeded: {operation} failed {attempts} times")]
    MaxAttemptsExceeded {
        operation: &'static str,
        attempts: u32,
    },

    #[error("Transaction failure: {0}")]
    TransactionFailure(TransactionFailure),

    #[error("SQL error [{code}]: {message}")]
    General { message: String, code: u32 },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// Error raised by caller code inside a transaction scope, passed through as-is.
    #[error(transparent)]
    Application(Box<dyn std::error::Error + Send + Sync>),
}

impl DbError {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>, code: u32) -> Self {
        Self::Connection {
            message: message.into(),
            code,
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a max-attempts error for the given operation.
    pub fn max_attempts(operation: &'static str, attempts: u32) -> Self {
        Self::MaxAttemptsExceeded {
            operation,
            attempts,
        }
    }

    /// Create a general (non-retryable) SQL error.
    pub fn general(message: impl Into<String>, code: u32) -> Self {
        Self::General {
            message: message.into(),
            code,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wrap an application error so it can be returned from a transaction scope.
    pub fn application<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Application(Box::new(err))
    }

    /// Get the driver error code, if this error came from the server.
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Connection { code, .. } | Self::General { code, .. } => Some(*code),
            Self::TransactionFailure(failure) => Some(failure.code),
            _ => None,
        }
    }

    /// Check if this error is a transient failure that a transaction scope retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionFailure(_))
    }

    /// Borrow the wrapped application error, if any.
    pub fn as_application(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Application(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<TransactionFailure> for DbError {
    fn from(failure: TransactionFailure) -> Self {
        Self::TransactionFailure(failure)
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
