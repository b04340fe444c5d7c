//! Connection-related data models.
//!
//! This module defines the connection lifecycle state and the transaction
//! nesting bookkeeping shared by the executor and the transaction scopes.

use serde::Serialize;

/// Lifecycle state of the underlying driver connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Transaction nesting depth.
///
/// `savepoints` counts the savepoints open beneath the outermost
/// `START TRANSACTION`; it is never non-zero outside a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TransactionDepth {
    in_transaction: bool,
    savepoints: u32,
}

impl TransactionDepth {
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn savepoints(&self) -> u32 {
        self.savepoints
    }

    /// Forget all nesting; the server has discarded (or committed) the transaction.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Reset and return the savepoint depth observed just before the reset.
    pub(crate) fn take_savepoints(&mut self) -> u32 {
        let savepoints = self.savepoints;
        self.reset();
        savepoints
    }

    pub(crate) fn open_transaction(&mut self) {
        self.in_transaction = true;
        self.savepoints = 0;
    }

    pub(crate) fn close_transaction(&mut self) {
        self.reset();
    }

    pub(crate) fn push_savepoint(&mut self) {
        debug_assert!(self.in_transaction, "savepoint outside transaction");
        self.savepoints += 1;
    }

    pub(crate) fn pop_savepoint(&mut self) {
        self.savepoints = self.savepoints.saturating_sub(1);
    }
}

/// Deterministic savepoint name for a 1-based nesting level.
pub fn savepoint_name(level: u32) -> String {
    format!("sp_{level}")
}
