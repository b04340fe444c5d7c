//! Blocking MySQL driver built on sqlx.
//!
//! The connection is driven by a private current-thread tokio runtime, so
//! every call blocks until the server answers. Statements are sent unprepared
//! (text protocol), which lets transaction control statements through.

use crate::config::ConnectionSettings;
use crate::db::classify::{CR_CONN_HOST_ERROR, CR_SERVER_GONE_ERROR};
use crate::db::driver::{Driver, DriverError, escape_string};
use crate::db::types::{column_names, row_to_json};
use crate::error::{DbError, DbResult};
use crate::models::QueryResult;
use futures_util::StreamExt;
use sqlx::error::DatabaseError;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlDatabaseError};
use sqlx::{Connection, Either, Executor};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// Unknown MySQL client error.
const CR_UNKNOWN_ERROR: u32 = 2000;

/// [`Driver`] over a single `sqlx::MySqlConnection`.
pub struct MySqlDriver {
    runtime: Runtime,
    conn: Option<MySqlConnection>,
    decode_binary: bool,
}

impl MySqlDriver {
    pub fn new() -> DbResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbError::internal(format!("Failed to start driver runtime: {e}")))?;
        Ok(Self {
            runtime,
            conn: None,
            decode_binary: false,
        })
    }

    /// Return valid UTF-8 in binary columns as text instead of base64.
    pub fn decode_binary(mut self, decode_binary: bool) -> Self {
        self.decode_binary = decode_binary;
        self
    }

    fn connect_options(settings: &ConnectionSettings) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.database)
    }
}

impl Driver for MySqlDriver {
    fn connect(&mut self, settings: &ConnectionSettings) -> Result<(), DriverError> {
        let options = Self::connect_options(settings);
        let conn = self
            .runtime
            .block_on(MySqlConnection::connect_with(&options))
            .map_err(|e| driver_error(e, CR_CONN_HOST_ERROR))?;
        self.conn = Some(conn);
        Ok(())
    }

    fn set_charset(&mut self, charset: &str) -> Result<(), DriverError> {
        self.query(&format!("SET NAMES '{}'", escape_string(charset)))
            .map(|_| ())
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = self.runtime.block_on(conn.close()) {
                debug!(error = %e, "Error while closing connection");
            }
        }
    }

    fn query(&mut self, sql: &str) -> Result<QueryResult, DriverError> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(DriverError::new(
                CR_SERVER_GONE_ERROR,
                "MySQL server has gone away",
            ));
        };
        let decode_binary = self.decode_binary;

        self.runtime
            .block_on(async move {
                let mut result = QueryResult::empty();
                let mut stream = conn.fetch_many(sql);
                while let Some(item) = stream.next().await {
                    match item? {
                        Either::Left(done) => {
                            result.rows_affected += done.rows_affected();
                            if done.last_insert_id() > 0 {
                                result.last_insert_id = Some(done.last_insert_id());
                            }
                        }
                        Either::Right(row) => {
                            if result.columns.is_empty() {
                                result.columns = column_names(&row);
                            }
                            result.rows.push(row_to_json(&row, decode_binary));
                        }
                    }
                }
                Ok::<_, sqlx::Error>(result)
            })
            .map_err(|e| driver_error(e, CR_SERVER_GONE_ERROR))
    }
}

/// Map a sqlx error onto a MySQL error number.
///
/// Server errors keep their own number; transport failures get `transport_code`.
fn driver_error(err: sqlx::Error, transport_code: u32) -> DriverError {
    match &err {
        sqlx::Error::Database(db) => match db.try_downcast_ref::<MySqlDatabaseError>() {
            Some(mysql) => DriverError::new(u32::from(mysql.number()), mysql.message()),
            None => DriverError::new(CR_UNKNOWN_ERROR, db.message()),
        },
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => DriverError::new(transport_code, err.to_string()),
        _ => DriverError::new(CR_UNKNOWN_ERROR, err.to_string()),
    }
}
