//! Lifecycle of the single physical connection.

use crate::config::ConnectionSettings;
use crate::db::driver::{Driver, DriverError};
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionState, QueryResult};
use tracing::{debug, info, warn};

/// Owns one driver connection and tracks whether it is open.
///
/// The handle is not meant to be shared: one logical session per handle.
pub struct ConnectionHandle<D> {
    driver: D,
    settings: ConnectionSettings,
    state: ConnectionState,
}

impl<D: Driver> ConnectionHandle<D> {
    /// Create a disconnected handle.
    pub fn new(driver: D, settings: ConnectionSettings) -> Self {
        Self {
            driver,
            settings,
            state: ConnectionState::Disconnected,
        }
    }

    /// Open the connection and apply the configured charset.
    pub fn connect(&mut self) -> DbResult<()> {
        if self.state.is_connected() {
            return Err(DbError::AlreadyConnected);
        }

        debug!(url = %self.settings.masked_url(), "Connecting");

        self.driver
            .connect(&self.settings)
            .map_err(|e| connection_error("connect", e))?;

        if let Err(e) = self.driver.set_charset(&self.settings.charset) {
            self.driver.close();
            return Err(connection_error("set charset", e));
        }

        self.state = ConnectionState::Connected;
        info!(
            host = %self.settings.host,
            port = self.settings.port,
            database = %self.settings.database,
            charset = %self.settings.charset,
            "Connected"
        );
        Ok(())
    }

    /// Close the connection.
    pub fn close(&mut self) -> DbResult<()> {
        if !self.state.is_connected() {
            return Err(DbError::NotConnected);
        }
        self.driver.close();
        self.state = ConnectionState::Disconnected;
        info!(host = %self.settings.host, "Connection closed");
        Ok(())
    }

    /// Close (if open) and connect again.
    pub(crate) fn reconnect(&mut self) -> DbResult<()> {
        info!(host = %self.settings.host, "Reconnecting");
        if self.state.is_connected() {
            self.close()?;
        }
        self.connect()
    }

    /// Fail unless the connection is open.
    pub fn ensure_connected(&self) -> DbResult<()> {
        if self.state.is_connected() {
            Ok(())
        } else {
            Err(DbError::NotConnected)
        }
    }

    pub(crate) fn query(&mut self, sql: &str) -> Result<QueryResult, DriverError> {
        self.driver.query(sql)
    }

    /// Escape a value with the driver's rules.
    pub fn escape(&self, value: &str) -> DbResult<String> {
        self.ensure_connected()?;
        Ok(self.driver.escape(value))
    }

    pub(crate) fn driver(&self) -> &D {
        &self.driver
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }
}

fn connection_error(step: &str, e: DriverError) -> DbError {
    warn!(step, code = e.code, error = %e.message, "Connection failed");
    DbError::connection(e.message, e.code)
}
