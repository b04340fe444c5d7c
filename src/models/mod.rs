//! Data models for resilient sessions.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod query;

// Re-export commonly used types
pub use connection::{ConnectionState, TransactionDepth, savepoint_name};
pub use query::{ParamValue, Placeholders, QueryParam, QueryResult};
