//! Statement execution with retry and reconnect.
//!
//! A failed statement is classified by its error number:
//! - deadlock / lock wait timeout outside a transaction: the statement is retried as is
//! - connection lost outside a transaction: reconnect, then retry
//! - either of the above inside a transaction: the server has already discarded
//!   the transaction, so nesting is reset and a [`TransactionFailure`] is
//!   returned carrying the savepoint depth at the time of failure
//! - anything else: returned as a general error
//!
//! Retries stop after [`MAX_QUERY_ATTEMPTS`] statement attempts.

use crate::db::classify::ErrorClass;
use crate::db::connection::ConnectionHandle;
use crate::db::driver::{Driver, DriverError};
use crate::db::placeholders::substitute;
use crate::error::{DbError, DbResult, FailureKind, TransactionFailure};
use crate::models::{Placeholders, QueryResult, TransactionDepth};
use tracing::{debug, error, warn};

/// Maximum number of times a single statement is sent.
pub const MAX_QUERY_ATTEMPTS: u32 = 10;

/// Runs statements against a [`ConnectionHandle`] and owns the transaction depth.
pub struct StatementExecutor<D> {
    connection: ConnectionHandle<D>,
    depth: TransactionDepth,
}

impl<D: Driver> StatementExecutor<D> {
    pub fn new(connection: ConnectionHandle<D>) -> Self {
        Self {
            connection,
            depth: TransactionDepth::default(),
        }
    }

    pub fn connect(&mut self) -> DbResult<()> {
        self.connection.connect()
    }

    /// Close the connection and forget any transaction nesting.
    pub fn close(&mut self) -> DbResult<()> {
        self.connection.close()?;
        self.depth.reset();
        Ok(())
    }

    pub fn escape(&self, value: &str) -> DbResult<String> {
        self.connection.escape(value)
    }

    pub fn connection(&self) -> &ConnectionHandle<D> {
        &self.connection
    }

    pub fn depth(&self) -> TransactionDepth {
        self.depth
    }

    pub(crate) fn depth_mut(&mut self) -> &mut TransactionDepth {
        &mut self.depth
    }

    /// Execute one statement, substituting `placeholders` first.
    ///
    /// Fails with [`DbError::InvalidArgument`] before anything is sent when a
    /// placeholder name is malformed.
    pub fn execute(&mut self, sql: &str, placeholders: &Placeholders) -> DbResult<QueryResult> {
        self.connection.ensure_connected()?;

        let literal = {
            let driver = self.connection.driver();
            substitute(sql, placeholders, |value| driver.escape(value))?
        };

        for attempt in 0..MAX_QUERY_ATTEMPTS {
            debug!(attempt, sql = %literal, "Executing statement");

            let err = match self.connection.query(&literal) {
                Ok(result) => return Ok(result),
                Err(err) => err,
            };

            match ErrorClass::from_code(err.code) {
                ErrorClass::DeadlockOrLockTimeout => {
                    if self.depth.in_transaction() {
                        return Err(self.abort_transaction(FailureKind::Deadlock, err));
                    }
                    warn!(attempt, code = err.code, error = %err.message, "Lock conflict, retrying statement");
                }
                ErrorClass::ConnectionLost => {
                    let in_transaction = self.depth.in_transaction();
                    let failure = in_transaction
                        .then(|| self.abort_transaction(FailureKind::ServerUnavailable, err.clone()));

                    warn!(attempt, code = err.code, error = %err.message, "Connection lost");
                    self.connection.reconnect()?;

                    if let Some(failure) = failure {
                        return Err(failure);
                    }
                }
                ErrorClass::Fatal => {
                    debug!(code = err.code, error = %err.message, "Statement failed");
                    return Err(DbError::general(err.message, err.code));
                }
            }
        }

        error!(sql = %literal, attempts = MAX_QUERY_ATTEMPTS, "Statement retry limit reached");
        Err(DbError::max_attempts("statement", MAX_QUERY_ATTEMPTS))
    }

    /// The server has rolled back the whole transaction: zero the nesting and
    /// build the failure that enclosing scopes will bubble.
    fn abort_transaction(&mut self, kind: FailureKind, err: DriverError) -> DbError {
        let bubble_count = self.depth.take_savepoints();
        warn!(
            %kind,
            code = err.code,
            bubble_count,
            error = %err.message,
            "Transaction discarded by server"
        );
        TransactionFailure::new(kind, bubble_count, err.message, err.code).into()
    }
}
