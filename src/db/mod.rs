//! Database layer.
//!
//! - `driver`: the capability a physical connection must provide
//! - `classify`: error number classification
//! - `placeholders`: `:name` substitution
//! - `connection`: connection lifecycle
//! - `executor`: statement retry and reconnect
//! - `session`: nested transaction scopes
//! - `mysql` / `types`: the sqlx-backed MySQL driver and its row decoding

pub mod classify;
pub mod connection;
pub mod driver;
pub mod executor;
pub mod mysql;
pub mod placeholders;
pub mod session;
pub mod types;

pub use classify::ErrorClass;
pub use connection::ConnectionHandle;
pub use driver::{Driver, DriverError, escape_string};
pub use executor::{MAX_QUERY_ATTEMPTS, StatementExecutor};
pub use mysql::MySqlDriver;
pub use session::{MAX_TRANSACTION_ATTEMPTS, Session};
