//! Shared test driver.
//!
//! `ScriptedDriver` records every call it receives and fails statements that
//! were scripted to fail. Clones share the same script, so a test keeps one
//! clone for assertions and hands the other to the session.

#![allow(dead_code)]

use mysql_resilient::{ConnectionSettings, Driver, DriverError, QueryResult, Session};
use std::cell::RefCell;
use std::rc::Rc;

pub const DEADLOCK: u32 = 1213;
pub const LOCK_WAIT_TIMEOUT: u32 = 1205;
pub const GONE_AWAY: u32 = 2006;
pub const NODE_NOT_READY: u32 = 1047;
pub const SYNTAX_ERROR: u32 = 1064;
pub const ACCESS_DENIED: u32 = 1045;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    SetCharset(String),
    Close,
    Query(String),
}

#[derive(Default)]
struct Script {
    calls: Vec<Call>,
    query_failures: Vec<(String, DriverError)>,
    connect_failures: Vec<DriverError>,
    charset_failures: Vec<DriverError>,
    responses: Vec<(String, QueryResult)>,
}

#[derive(Clone, Default)]
pub struct ScriptedDriver {
    script: Rc<RefCell<Script>>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next statement equal to `sql` with `code`.
    pub fn fail(&self, sql: &str, code: u32) -> &Self {
        self.fail_times(sql, code, 1)
    }

    /// Fail the next `times` statements equal to `sql` with `code`.
    pub fn fail_times(&self, sql: &str, code: u32, times: usize) -> &Self {
        let mut script = self.script.borrow_mut();
        for _ in 0..times {
            script
                .query_failures
                .push((sql.to_string(), DriverError::new(code, format!("error {code}"))));
        }
        self
    }

    /// Fail the next connect attempt.
    pub fn fail_connect(&self, code: u32) -> &Self {
        self.script
            .borrow_mut()
            .connect_failures
            .push(DriverError::new(code, "Access denied"));
        self
    }

    /// Fail the next charset change.
    pub fn fail_charset(&self, code: u32) -> &Self {
        self.script
            .borrow_mut()
            .charset_failures
            .push(DriverError::new(code, "Unknown character set"));
        self
    }

    /// Answer `sql` with `result` every time it succeeds.
    pub fn respond(&self, sql: &str, result: QueryResult) -> &Self {
        self.script
            .borrow_mut()
            .responses
            .push((sql.to_string(), result));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.borrow().calls.clone()
    }

    /// Statements sent, in order.
    pub fn queries(&self) -> Vec<String> {
        self.script
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Query(sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, sql: &str) -> usize {
        self.queries().iter().filter(|q| q.as_str() == sql).count()
    }

    pub fn clear(&self) {
        self.script.borrow_mut().calls.clear();
    }
}

impl Driver for ScriptedDriver {
    fn connect(&mut self, _settings: &ConnectionSettings) -> Result<(), DriverError> {
        let mut script = self.script.borrow_mut();
        script.calls.push(Call::Connect);
        if script.connect_failures.is_empty() {
            Ok(())
        } else {
            Err(script.connect_failures.remove(0))
        }
    }

    fn set_charset(&mut self, charset: &str) -> Result<(), DriverError> {
        let mut script = self.script.borrow_mut();
        script.calls.push(Call::SetCharset(charset.to_string()));
        if script.charset_failures.is_empty() {
            Ok(())
        } else {
            Err(script.charset_failures.remove(0))
        }
    }

    fn close(&mut self) {
        self.script.borrow_mut().calls.push(Call::Close);
    }

    fn query(&mut self, sql: &str) -> Result<QueryResult, DriverError> {
        let mut script = self.script.borrow_mut();
        script.calls.push(Call::Query(sql.to_string()));

        if let Some(pos) = script.query_failures.iter().position(|(s, _)| s == sql) {
            let (_, err) = script.query_failures.remove(pos);
            return Err(err);
        }

        Ok(script
            .responses
            .iter()
            .find(|(s, _)| s == sql)
            .map(|(_, result)| result.clone())
            .unwrap_or_default())
    }
}

/// A connected session over `driver`, with the connect calls cleared from the log.
pub fn connected_session(driver: &ScriptedDriver) -> Session<ScriptedDriver> {
    let mut session = Session::new(driver.clone(), ConnectionSettings::default());
    session.connect().unwrap();
    driver.clear();
    session
}

/// Run `levels` nested transactions, the innermost one executing `sql`.
pub fn nested(
    session: &mut Session<ScriptedDriver>,
    levels: u32,
    sql: &str,
) -> mysql_resilient::DbResult<()> {
    if levels == 0 {
        session.query(sql).map(|_| ())
    } else {
        session.transaction(|s| nested(s, levels - 1, sql))
    }
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
