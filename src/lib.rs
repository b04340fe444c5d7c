//! Resilient MySQL sessions.
//!
//! A [`Session`] runs statements over one synchronous connection and survives
//! deadlocks, lock wait timeouts and lost connections. Nested transactions are
//! implemented with savepoints; when the server discards a transaction the
//! failure is passed outward to the scope that must start over.

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::{Config, ConnectionSettings};
pub use db::{ConnectionHandle, Driver, DriverError, MySqlDriver, Session, StatementExecutor};
pub use error::{DbError, DbResult, FailureKind, TransactionFailure};
pub use models::{ParamValue, Placeholders, QueryParam, QueryResult, TransactionDepth};
