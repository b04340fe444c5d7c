//! Nested transactions over one connection.
//!
//! The outermost scope issues `START TRANSACTION;`, every nested scope a
//! `SAVEPOINT sp_<n>;`. When the server discards the transaction (deadlock,
//! lock wait timeout, lost connection) the executor returns a
//! [`TransactionFailure`] whose bubble count is the savepoint depth at the time
//! of failure. Each enclosing scope decrements the count and passes the failure
//! outward until it reaches zero; that scope starts over from the beginning,
//! redoing everything that was nested inside it.

use crate::config::ConnectionSettings;
use crate::db::connection::ConnectionHandle;
use crate::db::driver::Driver;
use crate::db::executor::StatementExecutor;
use crate::error::{DbError, DbResult};
use crate::models::{Placeholders, QueryResult, TransactionDepth, savepoint_name};
use tracing::{debug, error, warn};

/// Maximum number of times one transaction scope is started.
pub const MAX_TRANSACTION_ATTEMPTS: u32 = 10;

/// A resilient session: one connection, its executor and the transaction scopes.
///
/// # Example
///
/// ```no_run
/// use mysql_resilient::{ConnectionSettings, MySqlDriver, Placeholders, Session};
///
/// # fn main() -> mysql_resilient::DbResult<()> {
/// let mut session = Session::new(MySqlDriver::new()?, ConnectionSettings::default());
/// session.connect()?;
/// session.transaction(|s| {
///     s.execute(
///         "UPDATE accounts SET balance = balance - 10 WHERE id = :id",
///         &Placeholders::new().bind("id", 1),
///     )?;
///     s.transaction(|s| s.query("INSERT INTO audit (note) VALUES ('debit')"))?;
///     Ok(())
/// })?;
/// session.close()?;
/// # Ok(())
/// # }
/// ```
pub struct Session<D> {
    executor: StatementExecutor<D>,
}

impl<D: Driver> Session<D> {
    /// Create a disconnected session.
    pub fn new(driver: D, settings: ConnectionSettings) -> Self {
        Self {
            executor: StatementExecutor::new(ConnectionHandle::new(driver, settings)),
        }
    }

    pub fn connect(&mut self) -> DbResult<()> {
        self.executor.connect()
    }

    /// Close the connection. Any open transaction is forgotten.
    pub fn close(&mut self) -> DbResult<()> {
        self.executor.close()
    }

    pub fn is_connected(&self) -> bool {
        self.executor.connection().is_connected()
    }

    pub fn settings(&self) -> &ConnectionSettings {
        self.executor.connection().settings()
    }

    /// Current transaction nesting.
    pub fn depth(&self) -> TransactionDepth {
        self.executor.depth()
    }

    pub fn executor(&self) -> &StatementExecutor<D> {
        &self.executor
    }

    /// Execute one statement with placeholders, retrying transient failures.
    pub fn execute(&mut self, sql: &str, placeholders: &Placeholders) -> DbResult<QueryResult> {
        self.executor.execute(sql, placeholders)
    }

    /// Execute one statement without placeholders.
    pub fn query(&mut self, sql: &str) -> DbResult<QueryResult> {
        self.executor.execute(sql, &Placeholders::new())
    }

    pub fn escape(&self, value: &str) -> DbResult<String> {
        self.executor.escape(value)
    }

    /// Run `work` inside a transaction scope.
    ///
    /// Nested calls open savepoints. When the server discards the transaction
    /// the failure bubbles out to the scope that has to start over, which then
    /// runs `work` again from the beginning, so `work` may run more than once.
    /// Any other error rolls back the current scope and is returned unchanged.
    pub fn transaction<T, F>(&mut self, mut work: F) -> DbResult<T>
    where
        F: FnMut(&mut Self) -> DbResult<T>,
    {
        for attempt in 0..MAX_TRANSACTION_ATTEMPTS {
            // A scope that failed to open has nothing to roll back.
            self.begin_scope()?;

            let outcome = match work(self) {
                Ok(value) => self.commit_scope().map(|()| value),
                Err(err) => Err(err),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(DbError::TransactionFailure(mut failure)) => {
                    if failure.bubble() {
                        debug!(
                            bubble_count = failure.bubble_count,
                            "Passing transaction failure to enclosing scope"
                        );
                        return Err(failure.into());
                    }
                    warn!(attempt, kind = %failure.kind, code = failure.code, "Retrying transaction scope");
                }
                Err(err) => {
                    if self.executor.depth().in_transaction() {
                        self.rollback_scope()?;
                    }
                    return Err(err);
                }
            }
        }

        error!(
            attempts = MAX_TRANSACTION_ATTEMPTS,
            "Transaction retry limit reached"
        );
        Err(DbError::max_attempts("transaction", MAX_TRANSACTION_ATTEMPTS))
    }

    /// Open a scope: `START TRANSACTION;` at the top level, a savepoint below it.
    pub fn begin_scope(&mut self) -> DbResult<()> {
        let depth = self.executor.depth();
        if !depth.in_transaction() {
            debug!("Beginning transaction");
            self.query("START TRANSACTION;")?;
            self.executor.depth_mut().open_transaction();
        } else {
            let name = savepoint_name(depth.savepoints() + 1);
            debug!(savepoint = %name, "Beginning nested scope");
            self.query(&format!("SAVEPOINT {name};"))?;
            self.executor.depth_mut().push_savepoint();
        }
        Ok(())
    }

    /// Commit the innermost scope.
    pub fn commit_scope(&mut self) -> DbResult<()> {
        let depth = self.open_depth()?;
        if depth.savepoints() > 0 {
            let name = savepoint_name(depth.savepoints());
            debug!(savepoint = %name, "Releasing savepoint");
            self.query(&format!("RELEASE SAVEPOINT {name};"))?;
            self.executor.depth_mut().pop_savepoint();
        } else {
            debug!("Committing transaction");
            self.query("COMMIT;")?;
            self.executor.depth_mut().close_transaction();
        }
        Ok(())
    }

    /// Roll back the innermost scope.
    pub fn rollback_scope(&mut self) -> DbResult<()> {
        let depth = self.open_depth()?;
        if depth.savepoints() > 0 {
            let name = savepoint_name(depth.savepoints());
            debug!(savepoint = %name, "Rolling back to savepoint");
            self.query(&format!("ROLLBACK TO SAVEPOINT {name};"))?;
            self.executor.depth_mut().pop_savepoint();
        } else {
            debug!("Rolling back transaction");
            self.query("ROLLBACK;")?;
            self.executor.depth_mut().close_transaction();
        }
        Ok(())
    }

    fn open_depth(&self) -> DbResult<TransactionDepth> {
        let depth = self.executor.depth();
        if !depth.in_transaction() {
            return Err(DbError::internal("Not in a transaction"));
        }
        Ok(depth)
    }
}
