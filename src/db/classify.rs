//! Classification of driver error numbers.

use std::fmt;

/// Lock wait timeout exceeded; try restarting transaction.
pub const ER_LOCK_WAIT_TIMEOUT: u32 = 1205;
/// Deadlock found when trying to get lock; try restarting transaction.
pub const ER_LOCK_DEADLOCK: u32 = 1213;
/// Unknown command, returned by Galera nodes that are not ready for use.
pub const ER_UNKNOWN_COM_ERROR: u32 = 1047;
/// MySQL server has gone away.
pub const CR_SERVER_GONE_ERROR: u32 = 2006;
/// Can't connect to MySQL server.
pub const CR_CONN_HOST_ERROR: u32 = 2003;

/// How the executor reacts to a failed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The server rolled back the current transaction; the statement can be retried as is.
    DeadlockOrLockTimeout,
    /// The connection is unusable and must be re-established before retrying.
    ConnectionLost,
    /// Anything else. Never retried.
    Fatal,
}

impl ErrorClass {
    pub fn from_code(code: u32) -> Self {
        match code {
            ER_LOCK_DEADLOCK | ER_LOCK_WAIT_TIMEOUT => Self::DeadlockOrLockTimeout,
            ER_UNKNOWN_COM_ERROR | CR_SERVER_GONE_ERROR => Self::ConnectionLost,
            _ => Self::Fatal,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeadlockOrLockTimeout => write!(f, "deadlock or lock timeout"),
            Self::ConnectionLost => write!(f, "connection lost"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}
