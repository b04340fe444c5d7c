//! Driver capability consumed by the connection handle.
//!
//! A driver owns one physical connection. Every call returns a structured
//! result; failures carry the server (or client) error number so the executor
//! can classify them.

use crate::config::ConnectionSettings;
use crate::models::QueryResult;
use thiserror::Error;

/// Failure reported by a driver call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct DriverError {
    pub code: u32,
    pub message: String,
}

impl DriverError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// One synchronous connection to a MySQL-compatible server.
pub trait Driver {
    /// Open the physical connection.
    fn connect(&mut self, settings: &ConnectionSettings) -> Result<(), DriverError>;

    /// Set the connection character set.
    fn set_charset(&mut self, charset: &str) -> Result<(), DriverError>;

    /// Close the physical connection. Closing an already broken connection is not an error.
    fn close(&mut self);

    /// Run one literal SQL statement.
    fn query(&mut self, sql: &str) -> Result<QueryResult, DriverError>;

    /// Escape a value for use inside a quoted SQL literal.
    fn escape(&self, value: &str) -> String {
        escape_string(value)
    }
}

/// Escape a string the way `mysql_real_escape_string` does.
///
/// The result is safe inside either single- or double-quoted literals.
pub fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '\0' => escaped.push_str("\\0"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\x1a' => escaped.push_str("\\Z"),
            _ => escaped.push(c),
        }
    }
    escaped
}
